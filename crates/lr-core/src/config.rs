//! Configuration structures for live-reload.
//!
//! This module provides configuration types for all components of the engine:
//!
//! - [`ScanConfig`] - Which files under a plugin root are tracked
//! - [`ScheduleConfig`] - Check interval and deferred reconcile delay
//! - [`SessionConfig`] - Which plugins of the host session are watched
//! - [`ReloadConfig`] - Per-plugin reload behaviour
//! - [`Config`] - Root configuration combining all settings
//!
//! The engine receives these as plain values. Only the CLI reads them from a
//! JSON file via [`Config::from_json_file`].

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest accepted check interval in milliseconds.
pub const MIN_CHECK_INTERVAL_MS: u64 = 500;

/// Largest accepted check interval in milliseconds.
pub const MAX_CHECK_INTERVAL_MS: u64 = 2000;

/// Configuration for per-plugin file discovery.
///
/// # Examples
///
/// ```
/// use lr_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.include_patterns, vec!["*.cs", "*.cslist", "*.json"]);
/// assert!(config.exclude_dirs.contains(&".git".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory that host plugin paths are relative to.
    pub host_root: Utf8PathBuf,

    /// Shell-style globs matched against file names (e.g. `*.cs`).
    pub include_patterns: Vec<String>,

    /// Directories skipped during traversal.
    ///
    /// Relative entries are joined onto each plugin root; absolute entries
    /// are used as they are.
    pub exclude_dirs: Vec<String>,

    /// Whether globs and exclude prefixes compare case-sensitively.
    pub case_sensitive: bool,

    /// Whether to follow symbolic links while listing directories.
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            host_root: Utf8PathBuf::from("."),
            include_patterns: vec!["*.cs".to_owned(), "*.cslist".to_owned(), "*.json".to_owned()],
            exclude_dirs: vec![
                ".git".to_owned(),
                ".vscode".to_owned(),
                "bin".to_owned(),
                "obj".to_owned(),
            ],
            case_sensitive: true,
            follow_links: false,
        }
    }
}

/// Configuration for the periodic scheduler.
///
/// # Examples
///
/// ```
/// use lr_core::ScheduleConfig;
/// use std::time::Duration;
///
/// let config = ScheduleConfig::default();
/// assert_eq!(config.check_interval(), Duration::from_secs(1));
/// assert_eq!(config.reconcile_delay(), Duration::from_millis(670));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time between check passes in milliseconds.
    pub check_interval_ms: u64,

    /// Delay between a check pass and the registry reconcile it schedules.
    ///
    /// Gives the host time to settle after a reload before its plugin list
    /// is read again.
    pub reconcile_delay_ms: u64,

    /// Whether ticks stop while the host is not focused.
    pub pause_when_unfocused: bool,
}

impl ScheduleConfig {
    /// Returns the check interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Returns the reconcile delay as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 1000,
            reconcile_delay_ms: 670,
            pause_when_unfocused: true,
        }
    }
}

/// Configuration for discovering plugins in the host session.
///
/// # Examples
///
/// ```
/// use lr_core::SessionConfig;
///
/// let config = SessionConfig {
///     creator_name: "everlaster".to_owned(),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.scripts_dir(), "Custom/Scripts/everlaster");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Creator name; only plugins under `<scripts_root>/<creator_name>` are watched.
    pub creator_name: String,

    /// Host-relative scripts directory.
    pub scripts_root: String,

    /// Plugin paths containing this marker are never watched (the engine itself).
    pub self_marker: String,

    /// Restricts discovery to one container. `None` watches the whole scene;
    /// `Session` watches the whole scene plus the session plugins.
    pub container: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            creator_name: String::new(),
            scripts_root: "Custom/Scripts".to_owned(),
            self_marker: "LiveReload".to_owned(),
            container: None,
        }
    }
}

impl SessionConfig {
    /// Returns the directory watched plugins must live under, using `/` separators.
    #[must_use]
    pub fn scripts_dir(&self) -> String {
        let root = self.scripts_root.replace('\\', "/");
        format!(
            "{}/{}",
            root.trim_end_matches('/'),
            self.creator_name.trim()
        )
    }
}

/// Per-plugin reload behaviour.
///
/// # Examples
///
/// ```
/// use lr_core::ReloadConfig;
///
/// let config = ReloadConfig::default();
/// assert!(config.monitor_by_default);
/// assert!(!config.log_changes);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Initial value of each plugin's monitoring toggle.
    pub monitor_by_default: bool,

    /// Log the changed file list at info level before each reload.
    pub log_changes: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            monitor_by_default: true,
            log_changes: false,
        }
    }
}

/// Root configuration for live-reload.
///
/// # Examples
///
/// ```
/// use lr_core::Config;
///
/// let mut config = Config::default();
/// assert!(config.validate().is_err()); // creator name is required
///
/// config.session.creator_name = "me".to_owned();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File discovery configuration.
    pub scan: ScanConfig,

    /// Scheduler configuration.
    pub schedule: ScheduleConfig,

    /// Session discovery configuration.
    pub session: SessionConfig,

    /// Reload behaviour.
    pub reload: ReloadConfig,
}

impl Config {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks option values that the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.creator_name.trim().is_empty() {
            return Err(ConfigError::invalid_option(
                "session.creator_name",
                "set your creator name",
            ));
        }

        let interval = self.schedule.check_interval_ms;
        if !(MIN_CHECK_INTERVAL_MS..=MAX_CHECK_INTERVAL_MS).contains(&interval) {
            return Err(ConfigError::invalid_option(
                "schedule.check_interval_ms",
                format!(
                    "{interval} is outside {MIN_CHECK_INTERVAL_MS}..={MAX_CHECK_INTERVAL_MS}"
                ),
            ));
        }

        if self.scan.include_patterns.is_empty() {
            return Err(ConfigError::invalid_option(
                "scan.include_patterns",
                "at least one pattern is required",
            ));
        }

        Ok(())
    }
}
