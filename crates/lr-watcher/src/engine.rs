//! The top-level live-reload engine.
//!
//! [`Engine`] owns the host adapter, the file system, the registry and the
//! scheduler. The embedder calls [`Engine::advance`] once per frame; due
//! passes run right there on the caller's stack, so the registry only ever
//! has one writer.
//!
//! A fatal error escaping a pass stops the engine for good: it is logged
//! once, and every later call returns [`WatchError::Disabled`].

use std::fmt;
use std::time::Duration;

use lr_core::{Config, PluginId};
use lr_scanner::FileSystem;

use crate::error::{HostError, WatchError};
use crate::events::CheckReport;
use crate::host::PluginHost;
use crate::registry::WatchRegistry;
use crate::scheduler::{DuePasses, Scheduler};

/// Drives discovery, change checks and reloads for a host.
///
/// # Examples
///
/// ```no_run
/// use lr_watcher::{Engine, PluginHost};
/// use lr_scanner::DiskFileSystem;
/// use lr_core::Config;
/// use std::time::Duration;
///
/// fn run<H: PluginHost>(config: &Config, host: H) -> Result<(), lr_watcher::WatchError> {
///     let mut engine = Engine::new(config, host, DiskFileSystem::new())?;
///     engine.set_focused(true);
///     loop {
///         let report = engine.advance(Duration::from_millis(16))?;
///         for event in &report.events {
///             println!("{event}");
///         }
///     }
/// }
/// ```
pub struct Engine<H: PluginHost, F> {
    host: H,
    fs: F,
    registry: WatchRegistry<H::Control>,
    scheduler: Scheduler,
}

impl<H: PluginHost, F> fmt::Debug for Engine<H, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("plugins", &self.registry.len())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<H, F> Engine<H, F>
where
    H: PluginHost,
    F: FileSystem,
{
    /// Validates the config, builds the registry and runs the startup discovery.
    ///
    /// Any host error during startup discovery is returned, including
    /// recoverable ones: there is nothing to fall back to yet.
    pub fn new(config: &Config, mut host: H, fs: F) -> Result<Self, WatchError> {
        config.validate()?;
        let mut registry = WatchRegistry::from_config(config)?;

        let discovered = host.discover_plugins()?;
        let added = registry.reconcile(&discovered);
        tracing::info!(
            plugins = added,
            interval_ms = config.schedule.check_interval_ms,
            "Live reload started"
        );

        Ok(Self {
            host,
            fs,
            registry,
            scheduler: Scheduler::new(&config.schedule),
        })
    }

    /// Lets `delta` pass and runs whatever came due.
    ///
    /// Returns the events of the check pass, if one ran.
    pub fn advance(&mut self, delta: Duration) -> Result<CheckReport, WatchError> {
        if self.scheduler.is_disabled() {
            return Err(WatchError::Disabled);
        }

        let due = self.scheduler.poll(delta);
        self.run(due).map_err(|err| self.fail_stop(err))
    }

    /// Runs a reconcile and a check pass immediately, ignoring the clock.
    pub fn check_now(&mut self) -> Result<CheckReport, WatchError> {
        if self.scheduler.is_disabled() {
            return Err(WatchError::Disabled);
        }

        let due = DuePasses {
            reconcile: true,
            check: true,
        };
        self.run(due).map_err(|err| self.fail_stop(err))
    }

    fn run(&mut self, due: DuePasses) -> Result<CheckReport, HostError> {
        if due.reconcile {
            self.reconcile()?;
        }
        if due.check {
            return self.registry.check_all(&mut self.host, &self.fs);
        }
        Ok(CheckReport::default())
    }

    fn reconcile(&mut self) -> Result<usize, HostError> {
        match self.host.discover_plugins() {
            Ok(discovered) => Ok(self.registry.reconcile(&discovered)),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(error = %err, "Plugin discovery failed, keeping the current list");
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }

    fn fail_stop(&mut self, err: HostError) -> WatchError {
        tracing::error!(error = %err, "Live reload stopped after an unexpected error");
        self.scheduler.disable();
        WatchError::Host(err)
    }

    /// Records whether the host application has focus.
    pub fn set_focused(&mut self, focused: bool) {
        self.scheduler.set_focused(focused);
    }

    /// Turns change checking on or off for one plugin. Returns `false` if
    /// the plugin is not watched.
    pub fn set_monitoring(&mut self, id: &PluginId, enabled: bool) -> bool {
        self.registry.set_monitoring(id, enabled)
    }

    /// Returns `true` once the engine stopped after a fatal error.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.scheduler.is_disabled()
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &WatchRegistry<H::Control> {
        &self.registry
    }

    /// Returns the scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the host adapter.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host adapter mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Returns the file system.
    #[must_use]
    pub const fn fs(&self) -> &F {
        &self.fs
    }
}
