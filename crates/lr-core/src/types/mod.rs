//! Domain types for live-reload.
//!
//! # Module Organization
//!
//! - [`plugin`] - Plugin identity and host discovery results
//! - [`state`] - Per-plugin lifecycle state
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use lr_core::{PluginId, PluginState};
//! ```

pub mod plugin;
pub mod state;

pub use plugin::{DiscoveredPlugins, PluginId, SCENE_CONTAINER, SESSION_CONTAINER};
pub use state::PluginState;
