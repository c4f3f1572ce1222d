//! A [`PluginHost`] backed by a session file on disk.
//!
//! The file is re-read on every call, so edits made by the host (or by hand)
//! show up on the next tick. A plugin's reload control resolves as soon as
//! the plugin is listed; reloading runs an optional external command.

use std::io;
use std::process::Command;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use lr_core::{Config, DiscoveredPlugins, PluginId};
use lr_watcher::{HostError, PluginHost, SessionFilter, session};
use serde_json::Value;

/// Environment variable holding the container of the reloaded plugin.
pub const CONTAINER_ENV: &str = "LIVE_RELOAD_CONTAINER";

/// Environment variable holding the path of the reloaded plugin.
pub const PLUGIN_ENV: &str = "LIVE_RELOAD_PLUGIN";

/// Default time a reload command may run before it is killed.
pub const DEFAULT_RELOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll period while waiting for a reload command to exit.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// External program run for every reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadCommand {
    program: String,
    args: Vec<String>,
}

impl ReloadCommand {
    /// Splits a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?.to_owned();
        let args = parts.map(str::to_owned).collect();
        Some(Self { program, args })
    }

    fn run(&self, working_dir: &Utf8Path, id: &PluginId, timeout: Duration) -> Result<(), HostError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(working_dir.as_std_path())
            .env(CONTAINER_ENV, &id.container)
            .env(PLUGIN_ENV, id.plugin_path.as_str())
            .spawn()
            .map_err(|err| HostError::operation("reload", format!("{}: {err}", self.program)))?;

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    if let Err(err) = child.kill() {
                        tracing::warn!(program = %self.program, error = %err, "Failed to kill reload command");
                    }
                    // Reap the killed child.
                    let _ = child.wait();
                    return Err(HostError::operation(
                        "reload",
                        format!("{} timed out after {timeout:?}", self.program),
                    ));
                }
                Ok(None) => std::thread::sleep(WAIT_POLL),
                Err(err) => {
                    return Err(HostError::operation("reload", format!("{}: {err}", self.program)));
                }
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(HostError::operation("reload", format!("{} exited with {status}", self.program)))
        }
    }
}

/// Host adapter reading plugin lists from a session JSON file.
#[derive(Debug, Clone)]
pub struct SessionFileHost {
    session_path: Utf8PathBuf,
    working_dir: Utf8PathBuf,
    filter: SessionFilter,
    reload_command: Option<ReloadCommand>,
    reload_timeout: Duration,
}

impl SessionFileHost {
    /// Creates an adapter for `session_path`. Reload commands run in the
    /// configured host root.
    pub fn new(session_path: impl Into<Utf8PathBuf>, config: &Config, reload_command: Option<&str>) -> Self {
        Self {
            session_path: session_path.into(),
            working_dir: config.scan.host_root.clone(),
            filter: SessionFilter::from_config(&config.session),
            reload_command: reload_command.and_then(ReloadCommand::parse),
            reload_timeout: DEFAULT_RELOAD_TIMEOUT,
        }
    }

    /// Sets how long a reload command may run before it is killed.
    #[must_use]
    pub fn with_reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = timeout;
        self
    }

    /// Returns the session file path.
    pub fn session_path(&self) -> &Utf8Path {
        &self.session_path
    }

    fn load(&self) -> Result<Value, HostError> {
        let text = match std::fs::read_to_string(&self.session_path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(HostError::disconnected(format!(
                    "session file {} is gone",
                    self.session_path
                )));
            }
            Err(err) => {
                return Err(HostError::operation(
                    "read session",
                    format!("{}: {err}", self.session_path),
                ));
            }
        };

        // A half-written file fails to parse; the next tick reads it again.
        session::parse(&text).map_err(|err| HostError::operation("parse session", err.to_string()))
    }

    fn is_listed(&self, id: &PluginId) -> Result<bool, HostError> {
        let doc = self.load()?;
        let listed = session::listed_plugins(&doc, &id.container)
            .map_err(|err| HostError::operation("read plugin list", err.to_string()))?;
        Ok(listed.contains(&id.plugin_path))
    }
}

impl PluginHost for SessionFileHost {
    type Control = PluginId;

    fn discover_plugins(&mut self) -> Result<DiscoveredPlugins, HostError> {
        let doc = self.load()?;
        session::discover(&doc, &self.filter)
            .map_err(|err| HostError::operation("discover plugins", err.to_string()))
    }

    fn resolve_reload_control(&mut self, id: &PluginId) -> Result<Option<PluginId>, HostError> {
        Ok(self.is_listed(id)?.then(|| id.clone()))
    }

    fn invoke_reload(&mut self, control: &PluginId) -> Result<(), HostError> {
        match &self.reload_command {
            Some(command) => command.run(&self.working_dir, control, self.reload_timeout),
            None => {
                tracing::info!(plugin = %control, "Reload requested (no reload command configured)");
                Ok(())
            }
        }
    }

    fn report_presence(&mut self, id: &PluginId) -> Result<bool, HostError> {
        self.is_listed(id)
    }

    fn release_ui(&mut self, id: &PluginId) {
        tracing::debug!(plugin = %id, "Released");
    }
}
