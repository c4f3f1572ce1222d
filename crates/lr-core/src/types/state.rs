//! Plugin lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a watched plugin.
///
/// ```text
/// Discovering ──(control absent)──► WaitingForHostUi
///      │                                  │
///      └──────(control resolved)──────────┴──► Monitoring
///
/// any state ──(host reports plugin gone)──► PendingRemoval
/// ```
///
/// # Examples
///
/// ```
/// use lr_core::PluginState;
///
/// assert!(PluginState::Discovering.is_awaiting_control());
/// assert!(PluginState::PendingRemoval.is_terminal());
/// assert_eq!(PluginState::Monitoring.label(), "monitoring");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Just discovered; the host reload control has not been looked up yet.
    #[default]
    Discovering,

    /// The host has not rendered the UI holding the reload control.
    WaitingForHostUi,

    /// Steady state: files are diffed on every tick while monitoring is on.
    Monitoring,

    /// The host no longer lists the plugin; it leaves the registry this pass.
    PendingRemoval,
}

impl PluginState {
    /// Returns `true` while the reload control still has to be resolved.
    #[inline]
    #[must_use]
    pub const fn is_awaiting_control(self) -> bool {
        matches!(self, Self::Discovering | Self::WaitingForHostUi)
    }

    /// Returns `true` for the terminal state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::PendingRemoval)
    }

    /// Returns a short lowercase label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::WaitingForHostUi => "waiting for host UI",
            Self::Monitoring => "monitoring",
            Self::PendingRemoval => "pending removal",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_discovering() {
        assert_eq!(PluginState::default(), PluginState::Discovering);
    }

    #[test]
    fn test_awaiting_control() {
        assert!(PluginState::Discovering.is_awaiting_control());
        assert!(PluginState::WaitingForHostUi.is_awaiting_control());
        assert!(!PluginState::Monitoring.is_awaiting_control());
        assert!(!PluginState::PendingRemoval.is_awaiting_control());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&PluginState::WaitingForHostUi).unwrap(),
            r#""waiting_for_host_ui""#
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(PluginState::PendingRemoval.to_string(), "pending removal");
    }
}
