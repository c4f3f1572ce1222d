//! Recursive discovery of tracked files under a plugin root.
//!
//! [`DirectoryScanner`] walks a tree through a [`FileSystem`], one listing
//! at a time, with an explicit stack instead of recursion. Every directory
//! is identified by its canonical path and listed at most once per walk, so
//! link cycles terminate.
//!
//! Failures on single entries never abort a walk: the entry is skipped,
//! logged and recorded in the returned [`ScanReport`].
//!
//! # Examples
//!
//! ```
//! use lr_scanner::{DirectoryScanner, MemoryFileSystem, PathFilterSet};
//! use camino::Utf8Path;
//!
//! let fs = MemoryFileSystem::new();
//! fs.write("/plugins/Foo/Foo.cs", "class Foo {}");
//! fs.write("/plugins/Foo/obj/Gen.cs", "generated");
//!
//! let filter = PathFilterSet::new(&["*.cs"], &["/plugins/Foo/obj"], true)?;
//! let (snapshot, report) = DirectoryScanner::new(&fs).scan(Utf8Path::new("/plugins/Foo"), &filter);
//!
//! assert_eq!(snapshot.paths().collect::<Vec<_>>(), vec!["/plugins/Foo/Foo.cs"]);
//! assert_eq!(report.files_added, 1);
//! # Ok::<(), lr_core::ConfigError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;

use crate::error::ScanError;
use crate::filter::PathFilterSet;
use crate::fs::FileSystem;
use crate::snapshot::FileSnapshot;

/// Summary of one walk.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Files newly added to the snapshot.
    pub files_added: usize,

    /// Directories successfully listed.
    pub dirs_visited: usize,

    /// Entries that were skipped, with the reason.
    pub skipped: Vec<ScanError>,
}

impl ScanReport {
    /// Returns `true` if nothing was skipped.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Walks plugin trees through a [`FileSystem`].
#[derive(Debug, Clone, Copy)]
pub struct DirectoryScanner<'a, F: ?Sized> {
    fs: &'a F,
}

impl<'a, F: FileSystem + ?Sized> DirectoryScanner<'a, F> {
    /// Creates a scanner reading through `fs`.
    #[must_use]
    pub const fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Builds a fresh snapshot of every tracked file under `root`.
    pub fn scan(&self, root: &Utf8Path, filter: &PathFilterSet) -> (FileSnapshot, ScanReport) {
        let mut snapshot = FileSnapshot::new();
        let report = self.refresh(&mut snapshot, root, filter);
        (snapshot, report)
    }

    /// Adds files under `root` that the snapshot does not track yet.
    ///
    /// Tracked files are neither re-read nor removed, so content only
    /// changes through [`FileSnapshot::diff`].
    pub fn refresh(
        &self,
        snapshot: &mut FileSnapshot,
        root: &Utf8Path,
        filter: &PathFilterSet,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        if filter.is_excluded(root) {
            tracing::debug!(root = %root, "Plugin root is excluded, nothing to scan");
            return report;
        }

        let mut visited: FxHashSet<Utf8PathBuf> = FxHashSet::default();
        let mut pending = vec![root.to_owned()];

        while let Some(dir) = pending.pop() {
            if !visited.insert(self.fs.canonicalize(&dir)) {
                tracing::trace!(dir = %dir, "Directory already visited");
                continue;
            }

            let entries = match self.fs.list_entries(&dir) {
                Ok(entries) => entries,
                Err(source) => {
                    tracing::warn!(dir = %dir, error = %source, "Skipping unreadable directory");
                    report.skipped.push(ScanError::list(dir, source));
                    continue;
                }
            };
            report.dirs_visited += 1;

            for raw in entries.non_utf8 {
                tracing::warn!(path = %raw.display(), "Skipping entry with non UTF-8 name");
                report.skipped.push(ScanError::NonUtf8Path(raw));
            }

            for file in entries.files {
                if !filter.matches(&file) || snapshot.contains(&file) {
                    continue;
                }
                match self.fs.read_file(&file) {
                    Ok(contents) => {
                        tracing::trace!(path = %file, bytes = contents.len(), "Tracking file");
                        snapshot.insert(file, contents);
                        report.files_added += 1;
                    }
                    Err(source) => {
                        tracing::warn!(path = %file, error = %source, "Skipping unreadable file");
                        report.skipped.push(ScanError::read(file, source));
                    }
                }
            }

            // Reversed so the stack pops subdirectories in name order.
            for subdir in entries.subdirs.into_iter().rev() {
                if filter.is_excluded(&subdir) {
                    tracing::trace!(dir = %subdir, "Skipping excluded directory");
                    continue;
                }
                pending.push(subdir);
            }
        }

        report
    }
}
