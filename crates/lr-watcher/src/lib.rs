//! Plugin lifecycle, watch registry and tick scheduling for live reload.
//!
//! This crate decides *when* to look for changes and *what* to do about
//! them. Change detection itself lives in `lr-scanner`; everything the
//! engine needs from the host application goes through [`PluginHost`].
//!
//! # Overview
//!
//! - [`Engine`]: owns host, file system, registry and scheduler; driven by [`Engine::advance`]
//! - [`Scheduler`]: turns frames into check passes and deferred reconciles
//! - [`WatchRegistry`]: the watched plugins, keyed by [`PluginId`](lr_core::PluginId)
//! - [`WatchedPlugin`]: per-plugin state machine (discover, wait for UI, monitor, reload)
//! - [`session`]: plugin discovery from a host session document
//!
//! # Example
//!
//! ```
//! use lr_watcher::Scheduler;
//! use lr_core::ScheduleConfig;
//! use std::time::Duration;
//!
//! let mut scheduler = Scheduler::new(&ScheduleConfig::default());
//! scheduler.set_focused(true);
//!
//! let due = scheduler.poll(Duration::from_millis(1000));
//! assert!(due.check);
//! assert!(scheduler.reconcile_pending());
//! ```
//!
//! # Architecture
//!
//! ```text
//! Engine::advance(delta)
//!     │
//!     ├── Scheduler::poll ──► DuePasses { reconcile, check }
//!     │
//!     ├── reconcile: PluginHost::discover_plugins ──► WatchRegistry::reconcile
//!     │
//!     └── check: WatchRegistry::check_all
//!                    └── WatchedPlugin::tick ──► ChangeSet (lr-scanner)
//!                                            └─► PluginHost::invoke_reload
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod plugin;
pub mod registry;
pub mod scheduler;
pub mod session;

pub use engine::Engine;
pub use error::{HostError, SessionError, WatchError};
pub use events::{CheckReport, PluginEvent};
pub use host::PluginHost;
pub use plugin::WatchedPlugin;
pub use registry::WatchRegistry;
pub use scheduler::{Clock, DeferredQueue, DeferredTask, DuePasses, Scheduler};
pub use session::{ContainerScope, SessionFilter};
