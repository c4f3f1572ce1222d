//! Core types, configuration, and errors for live-reload.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Configuration structures ([`Config`] and its sections)
//! - The [`ConfigError`] type for configuration loading and validation
//! - Domain types ([`PluginId`], [`PluginState`], [`DiscoveredPlugins`])
//!
//! # Crate Dependencies
//!
//! ```text
//! lr-cli ──► lr-watcher ──► lr-scanner ──► lr-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ReloadConfig, ScanConfig, ScheduleConfig, SessionConfig};
pub use error::ConfigError;
pub use types::{DiscoveredPlugins, PluginId, PluginState, SCENE_CONTAINER, SESSION_CONTAINER};
