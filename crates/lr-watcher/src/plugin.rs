//! One watched plugin and its lifecycle.
//!
//! ```text
//!            resolve: None                 resolve: Some
//! Discovering ──────────────► WaitingForHostUi ──────────────► Monitoring
//!      │                                                           ▲
//!      └────────────────────── resolve: Some ──────────────────────┘
//!
//! any state ── report_presence: false ──► PendingRemoval
//! ```
//!
//! While monitoring, every tick diffs the tracked files. A change triggers,
//! in order: a refresh (new files start being tracked), the reload, and a
//! fresh lookup of the reload control.

use std::mem;

use camino::{Utf8Path, Utf8PathBuf};
use lr_core::{PluginId, PluginState};
use lr_scanner::{ChangeSet, FileSystem, PathFilterSet};
use smallvec::SmallVec;

use crate::error::HostError;
use crate::events::PluginEvent;
use crate::host::PluginHost;

/// A plugin whose source tree is being watched.
///
/// `C` is the host's reload control type ([`PluginHost::Control`]).
#[derive(Debug)]
pub struct WatchedPlugin<C> {
    id: PluginId,
    changes: ChangeSet,
    state: PluginState,
    monitoring: bool,
    control: Option<C>,
    /// Changed since the last successful reload. Non-empty means a reload is owed.
    unreloaded: SmallVec<[Utf8PathBuf; 4]>,
    reloads: u64,
}

impl<C> WatchedPlugin<C> {
    /// Creates a plugin in the [`PluginState::Discovering`] state.
    ///
    /// Nothing is scanned until the reload control has been resolved.
    #[must_use]
    pub fn new(id: PluginId, root: impl Into<Utf8PathBuf>, filter: PathFilterSet, monitoring: bool) -> Self {
        Self {
            id,
            changes: ChangeSet::new(root, filter),
            state: PluginState::Discovering,
            monitoring,
            control: None,
            unreloaded: SmallVec::new(),
            reloads: 0,
        }
    }

    /// Advances the plugin by one tick.
    ///
    /// Recoverable host errors are logged and contained. Fatal ones are
    /// returned and leave the plugin as it was before the failing call.
    pub fn tick<H, F>(
        &mut self,
        host: &mut H,
        fs: &F,
        log_changes: bool,
    ) -> Result<Option<PluginEvent>, HostError>
    where
        H: PluginHost<Control = C>,
        F: FileSystem + ?Sized,
    {
        if self.state.is_terminal() {
            return Ok(None);
        }

        match contain(host.report_presence(&self.id), &self.id, "presence check")? {
            Some(true) => {}
            Some(false) => {
                tracing::info!(plugin = %self.id, "Plugin unloaded, no longer watching {}", self.id.label());
                self.state = PluginState::PendingRemoval;
                self.control = None;
                return Ok(Some(PluginEvent::Removed {
                    plugin: self.id.clone(),
                }));
            }
            None => return Ok(None),
        }

        match self.state {
            PluginState::Discovering | PluginState::WaitingForHostUi => self.resolve(host, fs),
            PluginState::Monitoring if self.monitoring => self.check(host, fs, log_changes),
            PluginState::Monitoring | PluginState::PendingRemoval => Ok(None),
        }
    }

    fn resolve<H, F>(&mut self, host: &mut H, fs: &F) -> Result<Option<PluginEvent>, HostError>
    where
        H: PluginHost<Control = C>,
        F: FileSystem + ?Sized,
    {
        match contain(host.resolve_reload_control(&self.id), &self.id, "resolve reload control")? {
            Some(Some(control)) => {
                self.control = Some(control);
                let report = self.changes.scan(fs);
                self.state = PluginState::Monitoring;
                tracing::info!(
                    plugin = %self.id,
                    files = self.changes.len(),
                    skipped = report.skipped.len(),
                    "Enabled for {}",
                    self.id.label()
                );
                Ok(Some(PluginEvent::Enabled {
                    plugin: self.id.clone(),
                    files: self.changes.len(),
                }))
            }
            Some(None) if self.state == PluginState::Discovering => {
                self.state = PluginState::WaitingForHostUi;
                tracing::info!(
                    plugin = %self.id,
                    "Open the UI of {} to enable live reload",
                    self.id.container
                );
                Ok(Some(PluginEvent::AwaitingHostUi {
                    plugin: self.id.clone(),
                }))
            }
            Some(None) | None => Ok(None),
        }
    }

    fn check<H, F>(&mut self, host: &mut H, fs: &F, log_changes: bool) -> Result<Option<PluginEvent>, HostError>
    where
        H: PluginHost<Control = C>,
        F: FileSystem + ?Sized,
    {
        let outcome = self.changes.diff(fs);

        if outcome.has_changes() {
            self.log_changed(&outcome.changed, log_changes);
            let report = self.changes.refresh(fs);
            if report.files_added > 0 {
                tracing::debug!(plugin = %self.id, added = report.files_added, "Tracking new files");
            }
            for path in outcome.changed {
                if !self.unreloaded.contains(&path) {
                    self.unreloaded.push(path);
                }
            }
        } else if self.unreloaded.is_empty() {
            return Ok(None);
        }

        self.reload(host)
    }

    fn reload<H>(&mut self, host: &mut H) -> Result<Option<PluginEvent>, HostError>
    where
        H: PluginHost<Control = C>,
    {
        let control = match self.control.take() {
            Some(control) => Some(control),
            None => contain(host.resolve_reload_control(&self.id), &self.id, "resolve reload control")?.flatten(),
        };

        let Some(control) = control else {
            tracing::warn!(plugin = %self.id, "Reload control unavailable, retrying next tick");
            return Ok(Some(self.reload_failed("reload control unavailable")));
        };

        match host.invoke_reload(&control) {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => {
                tracing::warn!(plugin = %self.id, error = %err, "Reload failed, retrying next tick");
                return Ok(Some(self.reload_failed(err.to_string())));
            }
            Err(err) => {
                self.control = Some(control);
                return Err(err);
            }
        }

        self.reloads += 1;
        let changed = mem::take(&mut self.unreloaded);
        tracing::info!(plugin = %self.id, reloads = self.reloads, "Reloaded {}", self.id.label());

        // The host may rebuild the row holding the control after a reload.
        self.control = contain(host.resolve_reload_control(&self.id), &self.id, "resolve reload control")?.flatten();

        Ok(Some(PluginEvent::Reloaded {
            plugin: self.id.clone(),
            changed,
        }))
    }

    fn reload_failed(&self, reason: impl Into<String>) -> PluginEvent {
        PluginEvent::ReloadFailed {
            plugin: self.id.clone(),
            reason: reason.into(),
        }
    }

    fn log_changed(&self, changed: &[Utf8PathBuf], log_changes: bool) {
        let files = changed
            .iter()
            .map(|path| self.changes.relative(path).as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if log_changes {
            tracing::info!(plugin = %self.id, "Changed files in {}: {files}", self.id.label());
        } else {
            tracing::debug!(plugin = %self.id, files = %files, "Changed files");
        }
    }

    /// Returns the plugin identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &PluginId {
        &self.id
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> PluginState {
        self.state
    }

    /// Returns the watched root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.changes.root()
    }

    /// Returns the tracked file set.
    #[inline]
    #[must_use]
    pub const fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Returns `true` if changes are checked while monitoring.
    #[inline]
    #[must_use]
    pub const fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Turns change checking on or off. Takes effect on the next tick.
    pub fn set_monitoring(&mut self, enabled: bool) {
        self.monitoring = enabled;
    }

    /// Returns `true` if a reload control is currently held.
    #[inline]
    #[must_use]
    pub const fn has_control(&self) -> bool {
        self.control.is_some()
    }

    /// Returns `true` if detected changes still wait for a successful reload.
    #[inline]
    #[must_use]
    pub fn reload_pending(&self) -> bool {
        !self.unreloaded.is_empty()
    }

    /// Returns the number of successful reloads.
    #[inline]
    #[must_use]
    pub const fn reload_count(&self) -> u64 {
        self.reloads
    }
}

/// Turns a recoverable host error into `Ok(None)` after logging it.
fn contain<T>(result: Result<T, HostError>, id: &PluginId, operation: &str) -> Result<Option<T>, HostError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(plugin = %id, error = %err, "Host {operation} failed");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
