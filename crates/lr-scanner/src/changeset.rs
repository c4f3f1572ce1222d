//! One plugin's tracked file set.

use camino::{Utf8Path, Utf8PathBuf};

use crate::filter::PathFilterSet;
use crate::fs::FileSystem;
use crate::snapshot::{DiffOutcome, FileSnapshot};
use crate::walker::{DirectoryScanner, ScanReport};

/// Root directory, filter and snapshot of a single plugin.
///
/// # Examples
///
/// ```
/// use lr_scanner::{ChangeSet, MemoryFileSystem, PathFilterSet};
/// use camino::Utf8Path;
///
/// let fs = MemoryFileSystem::new();
/// fs.write("/plugins/Foo/Foo.cs", "v1");
///
/// let filter = PathFilterSet::new(&["*.cs"], &[], true)?;
/// let mut changes = ChangeSet::new("/plugins/Foo", filter);
/// changes.scan(&fs);
///
/// fs.write("/plugins/Foo/Foo.cs", "v2");
/// let outcome = changes.diff(&fs);
/// assert_eq!(changes.relative(&outcome.changed[0]), "Foo.cs");
/// # Ok::<(), lr_core::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ChangeSet {
    root: Utf8PathBuf,
    filter: PathFilterSet,
    snapshot: FileSnapshot,
}

impl ChangeSet {
    /// Creates an empty change set. Nothing is tracked until [`scan`](Self::scan).
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, filter: PathFilterSet) -> Self {
        Self {
            root: root.into(),
            filter,
            snapshot: FileSnapshot::new(),
        }
    }

    /// Replaces the snapshot with a fresh scan of the root.
    pub fn scan<F: FileSystem + ?Sized>(&mut self, fs: &F) -> ScanReport {
        let (snapshot, report) = DirectoryScanner::new(fs).scan(&self.root, &self.filter);
        self.snapshot = snapshot;
        report
    }

    /// Starts tracking files created since the last scan.
    pub fn refresh<F: FileSystem + ?Sized>(&mut self, fs: &F) -> ScanReport {
        DirectoryScanner::new(fs).refresh(&mut self.snapshot, &self.root, &self.filter)
    }

    /// Re-reads tracked files; see [`FileSnapshot::diff`].
    pub fn diff<F: FileSystem + ?Sized>(&mut self, fs: &F) -> DiffOutcome {
        self.snapshot.diff(fs)
    }

    /// Returns `path` relative to the plugin root, or `path` itself if it lies elsewhere.
    #[must_use]
    pub fn relative<'p>(&self, path: &'p Utf8Path) -> &'p Utf8Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Returns the plugin root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the filter applied under the root.
    #[inline]
    #[must_use]
    pub const fn filter(&self) -> &PathFilterSet {
        &self.filter
    }

    /// Returns the current snapshot.
    #[inline]
    #[must_use]
    pub const fn snapshot(&self) -> &FileSnapshot {
        &self.snapshot
    }

    /// Returns the number of tracked files.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Returns `true` if no files are tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn change_set(fs: &MemoryFileSystem) -> ChangeSet {
        let filter = PathFilterSet::new(&["*.ext"], &["/root/skip"], true).unwrap();
        let mut changes = ChangeSet::new("/root", filter);
        changes.scan(fs);
        changes
    }

    #[test]
    fn test_edit_then_new_file_scenario() {
        let fs = MemoryFileSystem::new();
        fs.write("/root/a.ext", "1");
        let mut changes = change_set(&fs);

        fs.write("/root/a.ext", "2");
        let outcome = changes.diff(&fs);
        assert_eq!(outcome.changed, vec!["/root/a.ext"]);

        fs.write("/root/b.ext", "x");
        let report = changes.refresh(&fs);
        assert_eq!(report.files_added, 1);

        let paths: Vec<_> = changes.snapshot().paths().collect();
        assert_eq!(paths, vec!["/root/a.ext", "/root/b.ext"]);
        assert!(!changes.diff(&fs).has_changes());
    }

    #[test]
    fn test_scan_replaces_snapshot() {
        let fs = MemoryFileSystem::new();
        fs.write("/root/a.ext", "1");
        let mut changes = change_set(&fs);

        fs.remove(Utf8Path::new("/root/a.ext"));
        fs.write("/root/c.ext", "3");
        changes.scan(&fs);

        let paths: Vec<_> = changes.snapshot().paths().collect();
        assert_eq!(paths, vec!["/root/c.ext"]);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_excluded_files_never_tracked() {
        let fs = MemoryFileSystem::new();
        fs.write("/root/skip/hidden.ext", "1");
        let mut changes = change_set(&fs);
        assert!(changes.is_empty());

        fs.write("/root/skip/later.ext", "1");
        changes.refresh(&fs);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_relative() {
        let fs = MemoryFileSystem::new();
        let changes = change_set(&fs);
        assert_eq!(changes.relative(Utf8Path::new("/root/sub/a.ext")), "sub/a.ext");
        assert_eq!(changes.relative(Utf8Path::new("/other/a.ext")), "/other/a.ext");
        assert_eq!(changes.root(), "/root");
        assert_eq!(changes.filter().include_patterns().count(), 1);
    }
}
