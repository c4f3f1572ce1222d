//! Include/exclude filtering for plugin source trees.
//!
//! A [`PathFilterSet`] decides which files under one plugin root are tracked:
//!
//! - **Include**: the file name matches at least one shell-style glob
//!   (`*.cs`, `*.cslist`, ...)
//! - **Exclude**: the path is not under any excluded directory
//!
//! Exclusion always wins over inclusion. Exclude directories compare as
//! normalized string prefixes that must end on a separator boundary, so
//! `/plugin/bin` excludes `/plugin/bin/out.cs` but not `/plugin/binary.cs`.
//!
//! [`FilterSpec`] is the root-independent form compiled once from
//! [`ScanConfig`]; it stamps out one [`PathFilterSet`] per plugin root.
//!
//! # Examples
//!
//! ```
//! use lr_scanner::PathFilterSet;
//! use camino::Utf8Path;
//!
//! let filter = PathFilterSet::new(&["*.cs"], &["/plugins/Foo/obj"], true)?;
//!
//! assert!(filter.matches(Utf8Path::new("/plugins/Foo/Foo.cs")));
//! assert!(!filter.matches(Utf8Path::new("/plugins/Foo/obj/Gen.cs")));
//! assert!(!filter.matches(Utf8Path::new("/plugins/Foo/readme.md")));
//! # Ok::<(), lr_core::ConfigError>(())
//! ```

use camino::Utf8Path;
use glob::{MatchOptions, Pattern};
use lr_core::{ConfigError, ScanConfig};
use smallvec::SmallVec;

use crate::error::ScanError;

/// Compiled include patterns and exclude directory names, not yet bound to a root.
///
/// # Examples
///
/// ```
/// use lr_scanner::FilterSpec;
/// use lr_core::ScanConfig;
/// use camino::Utf8Path;
///
/// let spec = FilterSpec::from_config(&ScanConfig::default())?;
/// let filter = spec.for_root(Utf8Path::new("/plugins/Foo"));
///
/// assert!(filter.matches(Utf8Path::new("/plugins/Foo/src/Main.cs")));
/// assert!(filter.is_excluded(Utf8Path::new("/plugins/Foo/.git")));
/// # Ok::<(), lr_scanner::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FilterSpec {
    include: SmallVec<[Pattern; 4]>,
    exclude_dirs: SmallVec<[String; 4]>,
    case_sensitive: bool,
}

impl FilterSpec {
    /// Compiles the include patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for a malformed glob.
    pub fn new<S: AsRef<str>>(
        include_patterns: &[S],
        exclude_dirs: &[S],
        case_sensitive: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_patterns(include_patterns)?,
            exclude_dirs: exclude_dirs
                .iter()
                .map(|dir| dir.as_ref().to_owned())
                .collect(),
            case_sensitive,
        })
    }

    /// Compiles the filter section of a [`ScanConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] for a malformed include pattern.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self::new(
            &config.include_patterns,
            &config.exclude_dirs,
            config.case_sensitive,
        )?)
    }

    /// Binds the exclude directories to a plugin root.
    ///
    /// Relative exclude entries are joined onto `root`, absolute ones are kept.
    #[must_use]
    pub fn for_root(&self, root: &Utf8Path) -> PathFilterSet {
        let excludes = self
            .exclude_dirs
            .iter()
            .map(|dir| {
                let dir = Utf8Path::new(dir);
                if dir.is_absolute() {
                    dir.to_owned()
                } else {
                    root.join(dir)
                }
            })
            .map(|dir| normalize(dir.as_str(), self.case_sensitive))
            .collect();

        PathFilterSet {
            include: self.include.clone(),
            excludes,
            case_sensitive: self.case_sensitive,
        }
    }
}

/// Include globs plus absolute exclude directories for one plugin root.
///
/// Fixed for the lifetime of the plugin it belongs to. Pure predicate logic,
/// no I/O.
#[derive(Debug, Clone)]
pub struct PathFilterSet {
    include: SmallVec<[Pattern; 4]>,
    /// Normalized (trailing separators trimmed, case folded if insensitive).
    excludes: SmallVec<[String; 4]>,
    case_sensitive: bool,
}

impl PathFilterSet {
    /// Creates a filter from include globs and absolute exclude directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for a malformed glob.
    pub fn new<S: AsRef<str>>(
        include_patterns: &[S],
        exclude_dirs: &[S],
        case_sensitive: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_patterns(include_patterns)?,
            excludes: exclude_dirs
                .iter()
                .map(|dir| normalize(dir.as_ref(), case_sensitive))
                .collect(),
            case_sensitive,
        })
    }

    /// Returns `true` if the path is tracked: its file name matches an
    /// include pattern and it is not under an excluded directory.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        self.is_included(path) && !self.is_excluded(path)
    }

    /// Returns `true` if the file name matches at least one include pattern.
    #[must_use]
    pub fn is_included(&self, path: &Utf8Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let options = MatchOptions {
            case_sensitive: self.case_sensitive,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.include
            .iter()
            .any(|pattern| pattern.matches_with(name, options))
    }

    /// Returns `true` if the path is an excluded directory or lies under one.
    #[must_use]
    pub fn is_excluded(&self, path: &Utf8Path) -> bool {
        let path = normalize(path.as_str(), self.case_sensitive);
        self.excludes.iter().any(|dir| is_under(&path, dir))
    }

    /// Returns the include patterns in configured order.
    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(Pattern::as_str)
    }

    /// Returns the normalized exclude directories.
    #[must_use]
    pub fn exclude_dirs(&self) -> &[String] {
        &self.excludes
    }
}

fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<SmallVec<[Pattern; 4]>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Pattern::new(pattern).map_err(|e| ConfigError::invalid_pattern(pattern, e.msg))
        })
        .collect()
}

const fn is_separator(c: char) -> bool {
    matches!(c, '/' | '\\')
}

fn normalize(path: &str, case_sensitive: bool) -> String {
    let mut trimmed = path;
    while trimmed.len() > 1 && trimmed.ends_with(is_separator) {
        trimmed = &trimmed[..trimmed.len() - 1];
    }
    if case_sensitive {
        trimmed.to_owned()
    } else {
        trimmed.to_lowercase()
    }
}

fn is_under(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return false;
    }
    let Some(rest) = path.strip_prefix(dir) else {
        return false;
    };
    rest.is_empty() || rest.starts_with(is_separator) || dir.ends_with(is_separator)
}
