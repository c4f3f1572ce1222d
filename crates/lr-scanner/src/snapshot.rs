//! Content snapshots of tracked files and byte-level diffing.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;

use crate::fs::FileSystem;

/// Insertion-ordered map from absolute file path to its last seen content.
///
/// Entries are only ever added by a scan and only ever overwritten by
/// [`diff`](Self::diff). Nothing removes them: a file deleted from disk keeps
/// its last good content until the plugin itself goes away.
///
/// # Examples
///
/// ```
/// use lr_scanner::{FileSnapshot, MemoryFileSystem};
///
/// let fs = MemoryFileSystem::new();
/// fs.write("/p/a.cs", "v1");
///
/// let mut snapshot = FileSnapshot::new();
/// snapshot.insert("/p/a.cs".into(), b"v1".to_vec());
/// assert!(snapshot.diff(&fs).changed.is_empty());
///
/// fs.write("/p/a.cs", "v2");
/// assert_eq!(snapshot.diff(&fs).changed, vec!["/p/a.cs"]);
/// assert!(snapshot.diff(&fs).changed.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    entries: Vec<(Utf8PathBuf, Vec<u8>)>,
    index: FxHashMap<Utf8PathBuf, usize>,
}

/// Result of one [`FileSnapshot::diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Paths whose content differs from the snapshot, in snapshot order.
    pub changed: Vec<Utf8PathBuf>,

    /// Tracked files that could not be read this time.
    pub unreadable: usize,
}

impl DiffOutcome {
    /// Returns `true` if at least one file changed.
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

impl FileSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file if it is not tracked yet. Returns `false` if it already was;
    /// the stored content is then left untouched.
    pub fn insert(&mut self, path: Utf8PathBuf, contents: Vec<u8>) -> bool {
        if self.index.contains_key(&path) {
            return false;
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push((path, contents));
        true
    }

    /// Returns `true` if the path is tracked.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.index.contains_key(path)
    }

    /// Returns the stored content of a tracked file.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<&[u8]> {
        self.index
            .get(path)
            .and_then(|&i| self.entries.get(i))
            .map(|(_, contents)| contents.as_slice())
    }

    /// Iterates over tracked paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.entries.iter().map(|(path, _)| path.as_path())
    }

    /// Returns the number of tracked files.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-reads every tracked file and records the ones whose bytes changed.
    ///
    /// Changed content replaces the stored content, so a second call without
    /// disk changes reports nothing. A file that cannot be read counts as
    /// unchanged and keeps its previous content.
    pub fn diff<F: FileSystem + ?Sized>(&mut self, fs: &F) -> DiffOutcome {
        let mut outcome = DiffOutcome::default();

        for (path, stored) in &mut self.entries {
            match fs.read_file(path) {
                Ok(current) if current != *stored => {
                    *stored = current;
                    outcome.changed.push(path.clone());
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::trace!(path = %path, error = %err, "Tracked file unreadable, treating as unchanged");
                    outcome.unreadable += 1;
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn tracked(fs: &MemoryFileSystem, paths: &[&str]) -> FileSnapshot {
        let mut snapshot = FileSnapshot::new();
        for path in paths {
            let path = Utf8PathBuf::from(*path);
            let contents = fs.contents(&path).unwrap();
            snapshot.insert(path, contents);
        }
        snapshot
    }

    #[test]
    fn test_insert_never_overwrites() {
        let mut snapshot = FileSnapshot::new();
        assert!(snapshot.insert("/p/a.cs".into(), b"old".to_vec()));
        assert!(!snapshot.insert("/p/a.cs".into(), b"new".to_vec()));
        assert_eq!(snapshot.get(Utf8Path::new("/p/a.cs")), Some(&b"old"[..]));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_paths_keep_insertion_order() {
        let mut snapshot = FileSnapshot::new();
        snapshot.insert("/p/z.cs".into(), Vec::new());
        snapshot.insert("/p/a.cs".into(), Vec::new());
        let paths: Vec<_> = snapshot.paths().collect();
        assert_eq!(paths, vec!["/p/z.cs", "/p/a.cs"]);
    }

    #[test]
    fn test_diff_is_idempotent() {
        let fs = MemoryFileSystem::new();
        fs.write("/p/a.cs", "1");
        fs.write("/p/b.cs", "1");
        let mut snapshot = tracked(&fs, &["/p/a.cs", "/p/b.cs"]);

        fs.write("/p/b.cs", "2");
        fs.write("/p/a.cs", "2");

        let first = snapshot.diff(&fs);
        assert_eq!(first.changed, vec!["/p/a.cs", "/p/b.cs"]);
        assert!(first.has_changes());

        let second = snapshot.diff(&fs);
        assert!(!second.has_changes());
        assert_eq!(snapshot.get(Utf8Path::new("/p/a.cs")), Some(&b"2"[..]));
    }

    #[test]
    fn test_unreadable_file_is_unchanged_and_kept() {
        let fs = MemoryFileSystem::new();
        fs.write("/p/a.cs", "1");
        let mut snapshot = tracked(&fs, &["/p/a.cs"]);

        fs.write("/p/a.cs", "2");
        fs.set_read_failure("/p/a.cs", true);
        let outcome = snapshot.diff(&fs);
        assert!(outcome.changed.is_empty());
        assert_eq!(outcome.unreadable, 1);
        assert_eq!(snapshot.get(Utf8Path::new("/p/a.cs")), Some(&b"1"[..]));

        fs.set_read_failure("/p/a.cs", false);
        assert_eq!(snapshot.diff(&fs).changed, vec!["/p/a.cs"]);
    }

    #[test]
    fn test_deleted_file_stays_tracked() {
        let fs = MemoryFileSystem::new();
        fs.write("/p/a.cs", "1");
        let mut snapshot = tracked(&fs, &["/p/a.cs"]);

        fs.remove(Utf8Path::new("/p/a.cs"));
        let outcome = snapshot.diff(&fs);
        assert!(outcome.changed.is_empty());
        assert!(snapshot.contains(Utf8Path::new("/p/a.cs")));
    }
}
