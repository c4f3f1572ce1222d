//! Events produced by check passes.
//!
//! Every tick of a [`WatchedPlugin`](crate::WatchedPlugin) yields at most one
//! [`PluginEvent`]; a [`CheckReport`] collects them for one registry pass.
//!
//! ```text
//! WatchRegistry::check_all
//!        │
//!        ├── WatchedPlugin::tick ──► Option<PluginEvent>
//!        ├── WatchedPlugin::tick ──► Option<PluginEvent>
//!        │
//!        ▼
//!   CheckReport
//! ```

use std::fmt;

use camino::Utf8PathBuf;
use lr_core::PluginId;
use serde::Serialize;
use smallvec::SmallVec;

/// Something noteworthy that happened to one plugin during a tick.
///
/// # Examples
///
/// ```
/// use lr_watcher::PluginEvent;
/// use lr_core::PluginId;
///
/// let event = PluginEvent::Removed {
///     plugin: PluginId::new("Person", "Custom/Scripts/me/Foo/Foo.cs"),
/// };
/// assert_eq!(event.kind(), "removed");
/// assert_eq!(event.to_string(), "Person: Foo removed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginEvent {
    /// The reload control was resolved and the initial scan done.
    Enabled {
        /// The plugin.
        plugin: PluginId,
        /// Number of files tracked after the initial scan.
        files: usize,
    },

    /// The host UI holding the reload control is not open.
    AwaitingHostUi {
        /// The plugin.
        plugin: PluginId,
    },

    /// Files changed and the reload was triggered.
    Reloaded {
        /// The plugin.
        plugin: PluginId,
        /// Files that changed since the last successful reload.
        changed: SmallVec<[Utf8PathBuf; 4]>,
    },

    /// Files changed but the reload could not be triggered; it is retried.
    ReloadFailed {
        /// The plugin.
        plugin: PluginId,
        /// Why the reload did not happen.
        reason: String,
    },

    /// The host no longer has the plugin loaded.
    Removed {
        /// The plugin.
        plugin: PluginId,
    },
}

impl PluginEvent {
    /// Returns the plugin the event is about.
    #[must_use]
    pub const fn plugin(&self) -> &PluginId {
        match self {
            Self::Enabled { plugin, .. }
            | Self::AwaitingHostUi { plugin }
            | Self::Reloaded { plugin, .. }
            | Self::ReloadFailed { plugin, .. }
            | Self::Removed { plugin } => plugin,
        }
    }

    /// Returns the snake_case event name, matching the serialized `kind`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Enabled { .. } => "enabled",
            Self::AwaitingHostUi { .. } => "awaiting_host_ui",
            Self::Reloaded { .. } => "reloaded",
            Self::ReloadFailed { .. } => "reload_failed",
            Self::Removed { .. } => "removed",
        }
    }
}

impl fmt::Display for PluginEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.plugin().label();
        match self {
            Self::Enabled { files, .. } => write!(f, "{label} enabled ({files} files)"),
            Self::AwaitingHostUi { .. } => write!(f, "{label} waiting for host UI"),
            Self::Reloaded { changed, .. } => write!(f, "{label} reloaded ({} changed)", changed.len()),
            Self::ReloadFailed { reason, .. } => write!(f, "{label} reload failed: {reason}"),
            Self::Removed { .. } => write!(f, "{label} removed"),
        }
    }
}

/// Outcome of one [`WatchRegistry::check_all`](crate::WatchRegistry::check_all) pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Plugins ticked in this pass.
    pub checked: usize,

    /// Plugins removed in this pass.
    pub removed: usize,

    /// Events in tick order.
    pub events: Vec<PluginEvent>,
}

impl CheckReport {
    /// Returns the number of reloads triggered in this pass.
    #[must_use]
    pub fn reloads(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, PluginEvent::Reloaded { .. }))
            .count()
    }

    /// Returns `true` if nothing happened.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty()
    }

    /// Appends the results of another pass.
    pub fn merge(&mut self, other: Self) {
        self.checked += other.checked;
        self.removed += other.removed;
        self.events.extend(other.events);
    }
}
