//! File system access used by the scanner and the diff.
//!
//! Everything that touches disk goes through the [`FileSystem`] trait so the
//! engine can run against the real disk ([`DiskFileSystem`]) or a fully
//! in-memory tree ([`MemoryFileSystem`]) with injectable failures.
//!
//! Listings are one level deep. Recursion, cycle detection and filtering
//! belong to [`DirectoryScanner`](crate::DirectoryScanner).

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

/// Direct children of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntries {
    /// Regular files, sorted by name.
    pub files: Vec<Utf8PathBuf>,

    /// Subdirectories, sorted by name.
    pub subdirs: Vec<Utf8PathBuf>,

    /// Entries whose names are not valid UTF-8. They cannot be tracked.
    pub non_utf8: Vec<PathBuf>,
}

/// Read-only file system operations needed to scan and diff plugin trees.
pub trait FileSystem {
    /// Reads the full content of a file.
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>>;

    /// Lists the direct children of a directory.
    fn list_entries(&self, dir: &Utf8Path) -> io::Result<DirEntries>;

    /// Returns the canonical form of a directory, used to detect cycles.
    ///
    /// Implementations without links can keep the default identity.
    fn canonicalize(&self, dir: &Utf8Path) -> Utf8PathBuf {
        dir.to_owned()
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn list_entries(&self, dir: &Utf8Path) -> io::Result<DirEntries> {
        (**self).list_entries(dir)
    }

    fn canonicalize(&self, dir: &Utf8Path) -> Utf8PathBuf {
        (**self).canonicalize(dir)
    }
}

/// The real file system.
///
/// Directory listings go through the `ignore` crate with its standard
/// filters switched off: hidden files and `.gitignore` rules do not hide
/// plugin sources, only the configured exclude directories do.
///
/// # Examples
///
/// ```no_run
/// use lr_scanner::{DiskFileSystem, FileSystem};
/// use camino::Utf8Path;
///
/// let fs = DiskFileSystem::new().with_follow_links(true);
/// let entries = fs.list_entries(Utf8Path::new("Custom/Scripts/me/Foo"))?;
/// for file in &entries.files {
///     println!("{file}");
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem {
    follow_links: bool,
}

impl DiskFileSystem {
    /// Creates a disk file system that does not follow symbolic links.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            follow_links: false,
        }
    }

    /// Configures whether symbolic links are followed while listing.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Returns `true` if symbolic links are followed.
    #[inline]
    #[must_use]
    pub const fn follows_links(&self) -> bool {
        self.follow_links
    }

    /// Files behind a link are always listed. Directory links only when
    /// links are followed.
    fn sort_link(&self, path: Utf8PathBuf, entries: &mut DirEntries) {
        match path.metadata() {
            Ok(meta) if meta.is_file() => entries.files.push(path),
            Ok(meta) if meta.is_dir() && self.follow_links => entries.subdirs.push(path),
            Ok(_) => tracing::debug!(path = %path, "Skipping unfollowed link"),
            Err(err) => tracing::debug!(path = %path, error = %err, "Skipping dangling link"),
        }
    }
}

impl FileSystem for DiskFileSystem {
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn list_entries(&self, dir: &Utf8Path) -> io::Result<DirEntries> {
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(self.follow_links)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut entries = DirEntries::default();
        let mut listed_root = false;

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                // The root itself could not be read: the whole listing failed.
                Err(err) if !listed_root => return Err(into_io_error(err)),
                Err(err) => {
                    tracing::debug!(dir = %dir, error = %err, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if entry.depth() == 0 {
                listed_root = true;
                continue;
            }

            let Some(file_type) = entry.file_type() else {
                continue;
            };

            let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => path,
                Err(raw) => {
                    entries.non_utf8.push(raw);
                    continue;
                }
            };

            if file_type.is_file() {
                entries.files.push(path);
            } else if file_type.is_dir() {
                entries.subdirs.push(path);
            } else if file_type.is_symlink() {
                self.sort_link(path, &mut entries);
            }
        }

        Ok(entries)
    }

    fn canonicalize(&self, dir: &Utf8Path) -> Utf8PathBuf {
        dir.canonicalize_utf8().unwrap_or_else(|_| dir.to_owned())
    }
}

fn into_io_error(err: ignore::Error) -> io::Error {
    let message = err.to_string();
    err.into_io_error()
        .unwrap_or_else(|| io::Error::other(message))
}

/// Maximum number of directory links followed while resolving one path.
const MAX_LINK_HOPS: usize = 32;

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<Utf8PathBuf, Vec<u8>>,
    dirs: BTreeSet<Utf8PathBuf>,
    /// Directory links: link path to target directory.
    links: BTreeMap<Utf8PathBuf, Utf8PathBuf>,
    failing_reads: FxHashSet<Utf8PathBuf>,
    failing_lists: FxHashSet<Utf8PathBuf>,
}

impl MemoryTree {
    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        let mut current = path.to_owned();
        for _ in 0..MAX_LINK_HOPS {
            let hop = self.links.iter().find_map(|(link, target)| {
                let rest = current.strip_prefix(link).ok()?;
                Some(if rest.as_str().is_empty() {
                    target.clone()
                } else {
                    target.join(rest)
                })
            });
            match hop {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn add_ancestors(&mut self, path: &Utf8Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_owned());
        }
    }
}

/// An in-memory file tree.
///
/// Clones share the same tree, so a test can keep one handle to edit files
/// while the engine owns another. Directory links can be added to build
/// cycles, and reads or listings of chosen paths can be made to fail.
///
/// # Examples
///
/// ```
/// use lr_scanner::{FileSystem, MemoryFileSystem};
/// use camino::Utf8Path;
///
/// let fs = MemoryFileSystem::new();
/// fs.write("/plugins/Foo/Foo.cs", "class Foo {}");
///
/// let entries = fs.list_entries(Utf8Path::new("/plugins/Foo"))?;
/// assert_eq!(entries.files, vec!["/plugins/Foo/Foo.cs"]);
///
/// fs.set_read_failure("/plugins/Foo/Foo.cs", true);
/// assert!(fs.read_file(Utf8Path::new("/plugins/Foo/Foo.cs")).is_err());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    tree: Arc<RwLock<MemoryTree>>,
}

impl MemoryFileSystem {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites a file, creating missing parent directories.
    pub fn write(&self, path: impl Into<Utf8PathBuf>, contents: impl AsRef<[u8]>) {
        let path = path.into();
        let mut tree = self.tree.write();
        tree.add_ancestors(&path);
        tree.files.insert(path, contents.as_ref().to_vec());
    }

    /// Removes a file. Returns `true` if it existed.
    pub fn remove(&self, path: &Utf8Path) -> bool {
        self.tree.write().files.remove(path).is_some()
    }

    /// Creates a directory and its missing parents.
    pub fn create_dir(&self, path: impl Into<Utf8PathBuf>) {
        let path = path.into();
        let mut tree = self.tree.write();
        tree.add_ancestors(&path);
        tree.dirs.insert(path);
    }

    /// Adds a directory link at `link` pointing to `target`.
    pub fn link_dir(&self, link: impl Into<Utf8PathBuf>, target: impl Into<Utf8PathBuf>) {
        let link = link.into();
        let mut tree = self.tree.write();
        tree.add_ancestors(&link);
        tree.links.insert(link, target.into());
    }

    /// Makes reads of `path` fail (or succeed again).
    pub fn set_read_failure(&self, path: impl Into<Utf8PathBuf>, failing: bool) {
        let path = path.into();
        let mut tree = self.tree.write();
        if failing {
            tree.failing_reads.insert(path);
        } else {
            tree.failing_reads.remove(&path);
        }
    }

    /// Makes listings of `dir` fail (or succeed again).
    pub fn set_list_failure(&self, dir: impl Into<Utf8PathBuf>, failing: bool) {
        let dir = dir.into();
        let mut tree = self.tree.write();
        if failing {
            tree.failing_lists.insert(dir);
        } else {
            tree.failing_lists.remove(&dir);
        }
    }

    /// Returns the stored content of a file, ignoring injected failures.
    #[must_use]
    pub fn contents(&self, path: &Utf8Path) -> Option<Vec<u8>> {
        let tree = self.tree.read();
        tree.files.get(&tree.resolve(path)).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>> {
        let tree = self.tree.read();
        if tree.failing_reads.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read of {path} is blocked"),
            ));
        }
        tree.files
            .get(&tree.resolve(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")))
    }

    fn list_entries(&self, dir: &Utf8Path) -> io::Result<DirEntries> {
        let tree = self.tree.read();
        if tree.failing_lists.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("listing of {dir} is blocked"),
            ));
        }

        let real = tree.resolve(dir);
        if !tree.dirs.contains(&real) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {dir}"),
            ));
        }

        let child = |path: &Utf8PathBuf| match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) if parent == real.as_path() => Some(dir.join(name)),
            _ => None,
        };

        let files = tree.files.keys().filter_map(child).collect();
        let mut subdirs: Vec<_> = tree
            .dirs
            .iter()
            .chain(tree.links.keys())
            .filter_map(child)
            .collect();
        subdirs.sort();
        subdirs.dedup();

        Ok(DirEntries {
            files,
            subdirs,
            non_utf8: Vec::new(),
        })
    }

    fn canonicalize(&self, dir: &Utf8Path) -> Utf8PathBuf {
        self.tree.read().resolve(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_owned()).unwrap()
    }

    #[test]
    fn test_disk_lists_one_level_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(dir.path());
        std::fs::write(root.join("b.cs"), "b").unwrap();
        std::fs::write(root.join("a.cs"), "a").unwrap();
        std::fs::write(root.join(".hidden.cs"), "h").unwrap();
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::write(root.join("sub/c.cs"), "c").unwrap();

        let entries = DiskFileSystem::new().list_entries(&root).unwrap();

        assert_eq!(
            entries.files,
            vec![root.join(".hidden.cs"), root.join("a.cs"), root.join("b.cs")]
        );
        assert_eq!(entries.subdirs, vec![root.join("sub")]);
        assert!(entries.non_utf8.is_empty());
    }

    #[test]
    fn test_disk_gitignore_does_not_hide_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(dir.path());
        std::fs::write(root.join(".gitignore"), "*.cs\n").unwrap();
        std::fs::write(root.join("Main.cs"), "x").unwrap();

        let entries = DiskFileSystem::new().list_entries(&root).unwrap();
        assert!(entries.files.contains(&root.join("Main.cs")));
    }

    #[test]
    fn test_disk_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = utf8(dir.path()).join("missing");
        assert!(DiskFileSystem::new().list_entries(&missing).is_err());
    }

    #[test]
    fn test_disk_read_and_canonicalize() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(dir.path());
        std::fs::write(root.join("a.cs"), "hello").unwrap();

        let fs = DiskFileSystem::default();
        assert_eq!(fs.read_file(&root.join("a.cs")).unwrap(), b"hello");
        assert_eq!(fs.canonicalize(&root.join(".")), root.canonicalize_utf8().unwrap());
        assert!(!fs.follows_links());
    }

    #[cfg(unix)]
    #[test]
    fn test_disk_lists_linked_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(dir.path());
        std::fs::create_dir_all(root.join("real/nested")).unwrap();
        std::fs::create_dir_all(root.join("plugin")).unwrap();
        std::fs::write(root.join("real/Main.cs"), "main").unwrap();
        std::fs::write(root.join("plugin/Own.cs"), "own").unwrap();
        std::os::unix::fs::symlink(root.join("real/Main.cs"), root.join("plugin/Linked.cs")).unwrap();
        std::os::unix::fs::symlink(root.join("real/nested"), root.join("plugin/nested")).unwrap();
        std::os::unix::fs::symlink(root.join("real/Gone.cs"), root.join("plugin/Dangling.cs")).unwrap();

        let entries = DiskFileSystem::new().list_entries(&root.join("plugin")).unwrap();
        assert_eq!(
            entries.files,
            vec![root.join("plugin/Linked.cs"), root.join("plugin/Own.cs")]
        );
        assert!(entries.subdirs.is_empty());

        let followed = DiskFileSystem::new()
            .with_follow_links(true)
            .list_entries(&root.join("plugin"))
            .unwrap();
        assert!(followed.files.contains(&root.join("plugin/Linked.cs")));
        assert_eq!(followed.subdirs, vec![root.join("plugin/nested")]);
    }

    #[test]
    fn test_memory_listing() {
        let fs = MemoryFileSystem::new();
        fs.write("/p/a.cs", "a");
        fs.write("/p/sub/b.cs", "b");
        fs.create_dir("/p/empty");

        let entries = fs.list_entries(Utf8Path::new("/p")).unwrap();
        assert_eq!(entries.files, vec!["/p/a.cs"]);
        assert_eq!(entries.subdirs, vec!["/p/empty", "/p/sub"]);

        assert!(fs.list_entries(Utf8Path::new("/nope")).is_err());
    }

    #[test]
    fn test_memory_clones_share_tree() {
        let fs = MemoryFileSystem::new();
        let other = fs.clone();
        other.write("/p/a.cs", "v1");
        assert_eq!(fs.contents(Utf8Path::new("/p/a.cs")).unwrap(), b"v1");

        assert!(fs.remove(Utf8Path::new("/p/a.cs")));
        assert!(other.contents(Utf8Path::new("/p/a.cs")).is_none());
    }

    #[test]
    fn test_memory_links_resolve() {
        let fs = MemoryFileSystem::new();
        fs.write("/p/real/a.cs", "a");
        fs.link_dir("/p/alias", "/p/real");

        assert_eq!(fs.canonicalize(Utf8Path::new("/p/alias")), "/p/real");
        assert_eq!(fs.read_file(Utf8Path::new("/p/alias/a.cs")).unwrap(), b"a");

        let entries = fs.list_entries(Utf8Path::new("/p/alias")).unwrap();
        assert_eq!(entries.files, vec!["/p/alias/a.cs"]);

        let parent = fs.list_entries(Utf8Path::new("/p")).unwrap();
        assert_eq!(parent.subdirs, vec!["/p/alias", "/p/real"]);
    }

    #[test]
    fn test_memory_injected_failures() {
        let fs = MemoryFileSystem::new();
        fs.write("/p/a.cs", "a");

        fs.set_read_failure("/p/a.cs", true);
        let err = fs.read_file(Utf8Path::new("/p/a.cs")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        fs.set_read_failure("/p/a.cs", false);
        assert!(fs.read_file(Utf8Path::new("/p/a.cs")).is_ok());

        fs.set_list_failure("/p", true);
        assert!(fs.list_entries(Utf8Path::new("/p")).is_err());
    }
}
