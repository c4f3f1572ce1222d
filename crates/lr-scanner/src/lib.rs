//! Per-plugin file discovery, content snapshots and diffing.
//!
//! This crate decides *whether* a plugin changed. It knows nothing about
//! hosts or reloads; `lr-watcher` drives it once per tick.
//!
//! # Overview
//!
//! - [`PathFilterSet`]: include globs plus exclude directories for one root
//! - [`DirectoryScanner`]: iterative, cycle-safe walk that fills a snapshot
//! - [`FileSnapshot`]: insertion-ordered path to content map with [`FileSnapshot::diff`]
//! - [`ChangeSet`]: root + filter + snapshot, the unit a watched plugin owns
//! - [`FileSystem`]: the only way this crate touches disk
//!
//! # Example
//!
//! ```
//! use lr_scanner::{ChangeSet, FilterSpec, MemoryFileSystem};
//! use lr_core::ScanConfig;
//! use camino::Utf8Path;
//!
//! let fs = MemoryFileSystem::new();
//! fs.write("/scripts/Foo/Foo.cs", "v1");
//! fs.write("/scripts/Foo/bin/Foo.dll.json", "{}");
//!
//! let spec = FilterSpec::from_config(&ScanConfig::default())?;
//! let root = Utf8Path::new("/scripts/Foo");
//! let mut changes = ChangeSet::new(root, spec.for_root(root));
//!
//! let report = changes.scan(&fs);
//! assert_eq!(report.files_added, 1);
//!
//! fs.write("/scripts/Foo/Foo.cs", "v2");
//! assert!(changes.diff(&fs).has_changes());
//! # Ok::<(), lr_scanner::ScanError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ChangeSet
//!     │
//!     ├── PathFilterSet (glob crate, prefix excludes)
//!     │
//!     ├── DirectoryScanner ──► FileSystem
//!     │                          ├── DiskFileSystem (ignore crate listings)
//!     │                          └── MemoryFileSystem (shared in-memory tree)
//!     │
//!     └── FileSnapshot (diff)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod changeset;
pub mod error;
pub mod filter;
pub mod fs;
pub mod snapshot;
pub mod walker;

pub use changeset::ChangeSet;
pub use error::ScanError;
pub use filter::{FilterSpec, PathFilterSet};
pub use fs::{DirEntries, DiskFileSystem, FileSystem, MemoryFileSystem};
pub use snapshot::{DiffOutcome, FileSnapshot};
pub use walker::{DirectoryScanner, ScanReport};
