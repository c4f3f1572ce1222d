//! Error types for the lr-watcher crate.
//!
//! - [`HostError`]: failures reported by a [`PluginHost`](crate::PluginHost)
//! - [`SessionError`]: malformed host session documents
//! - [`WatchError`]: everything that can stop the [`Engine`](crate::Engine)

use lr_core::{ConfigError, PluginId};
use lr_scanner::ScanError;

/// Errors reported by the host application.
///
/// # Error Recovery Strategy
///
/// - **Control unavailable** ([`HostError::ControlUnavailable`]): Recoverable - the
///   plugin keeps its state and the control is resolved again next tick
/// - **Operation failed** ([`HostError::Operation`]): Recoverable - logged with the
///   plugin identity, other plugins are unaffected
/// - **Disconnected** ([`HostError::Disconnected`]): Fatal - the engine stops
///
/// # Examples
///
/// ```
/// use lr_watcher::HostError;
///
/// let err = HostError::operation("reload", "exit status 1");
/// assert!(err.is_recoverable());
///
/// let err = HostError::disconnected("session file removed");
/// assert!(err.is_fatal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The reload control exists but cannot be used right now.
    #[error("reload control for {plugin} is unavailable: {reason}")]
    ControlUnavailable {
        /// The plugin whose control was requested.
        plugin: PluginId,
        /// Why the control cannot be used.
        reason: String,
    },

    /// A host operation failed.
    #[error("host operation '{operation}' failed: {reason}")]
    Operation {
        /// Name of the failed operation.
        operation: &'static str,
        /// Host-provided failure description.
        reason: String,
    },

    /// The host can no longer be reached.
    #[error("host disconnected: {0}")]
    Disconnected(String),
}

impl HostError {
    /// Creates a new [`HostError::ControlUnavailable`] error.
    #[inline]
    pub fn control_unavailable(plugin: PluginId, reason: impl Into<String>) -> Self {
        Self::ControlUnavailable {
            plugin,
            reason: reason.into(),
        }
    }

    /// Creates a new [`HostError::Operation`] error.
    #[inline]
    pub fn operation(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            reason: reason.into(),
        }
    }

    /// Creates a new [`HostError::Disconnected`] error.
    #[inline]
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected(reason.into())
    }

    /// Returns `true` if the failure can be contained to one plugin.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ControlUnavailable { .. } | Self::Operation { .. })
    }

    /// Returns `true` if the engine must stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the plugin this error refers to, if any.
    #[must_use]
    pub const fn plugin(&self) -> Option<&PluginId> {
        match self {
            Self::ControlUnavailable { plugin, .. } => Some(plugin),
            Self::Operation { .. } | Self::Disconnected(_) => None,
        }
    }
}

/// Errors raised while reading a host session document.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The document is not valid JSON.
    #[error("session document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is JSON but does not have the expected shape.
    #[error("unexpected session document layout at {location}: {reason}")]
    Schema {
        /// JSON pointer-like location of the offending value.
        location: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl SessionError {
    /// Creates a new [`SessionError::Schema`] error.
    #[inline]
    pub fn schema(location: impl Into<String>, reason: &'static str) -> Self {
        Self::Schema {
            location: location.into(),
            reason,
        }
    }
}

/// Errors that stop the live-reload engine.
///
/// # Examples
///
/// ```
/// use lr_watcher::{HostError, WatchError};
///
/// let err = WatchError::from(HostError::disconnected("gone"));
/// assert!(!err.is_disabled());
/// assert!(WatchError::Disabled.is_disabled());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A fatal host failure escaped a pass.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The scan configuration could not be compiled.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The engine stopped after an earlier fatal error.
    #[error("live reload is disabled after a previous fatal error")]
    Disabled,
}

impl WatchError {
    /// Returns `true` for [`WatchError::Disabled`].
    #[inline]
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_control_unavailable() {
        let id = PluginId::new("Person", "Custom/Scripts/me/Foo/Foo.cs");
        let err = HostError::control_unavailable(id.clone(), "row hidden");
        assert!(err.is_recoverable());
        assert_eq!(err.plugin(), Some(&id));
        insta::assert_snapshot!(
            err.to_string(),
            @"reload control for Person:Custom/Scripts/me/Foo/Foo.cs is unavailable: row hidden"
        );
    }

    #[test]
    fn test_host_error_operation() {
        let err = HostError::operation("reload", "exit status 2");
        assert!(err.is_recoverable());
        assert!(err.plugin().is_none());
        assert_eq!(err.to_string(), "host operation 'reload' failed: exit status 2");
    }

    #[test]
    fn test_host_error_disconnected_is_fatal() {
        let err = HostError::disconnected("session closed");
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::schema("/atoms", "expected an array");
        assert_eq!(
            err.to_string(),
            "unexpected session document layout at /atoms: expected an array"
        );

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(SessionError::from(json_err).to_string().starts_with("session document is not valid JSON"));
    }

    #[test]
    fn test_watch_error_transparent() {
        let err = WatchError::from(HostError::disconnected("gone"));
        assert_eq!(err.to_string(), "host disconnected: gone");

        let err = WatchError::from(ConfigError::invalid_option("x", "bad"));
        assert!(matches!(err, WatchError::Config(_)));
        assert!(!err.is_disabled());
    }
}
