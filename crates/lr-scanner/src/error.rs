//! Error types for the lr-scanner crate.
//!
//! This module provides the [`ScanError`] type for errors that can occur
//! during directory traversal and content reads.

use camino::Utf8PathBuf;
use lr_core::ConfigError;

/// Errors that can occur during scanning operations.
///
/// # Error Recovery Strategy
///
/// - **File read errors** ([`ScanError::Read`]): Log warning, skip file, continue scan
/// - **Listing errors** ([`ScanError::List`]): Log warning, skip directory, continue scan
/// - **Non-UTF-8 paths** ([`ScanError::NonUtf8Path`]): Log warning, skip entry
/// - **Configuration errors** ([`ScanError::Config`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use lr_scanner::ScanError;
///
/// fn handle_error(err: ScanError) {
///     match err {
///         ScanError::Read { path, .. } => eprintln!("Read error: {path}"),
///         ScanError::List { path, .. } => eprintln!("List error: {path}"),
///         ScanError::NonUtf8Path(p) => eprintln!("Invalid path: {}", p.display()),
///         ScanError::Config(e) => eprintln!("Config error: {e}"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Failed to read a file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to list a directory.
    #[error("failed to list directory {path}: {source}")]
    List {
        /// The directory that couldn't be listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A directory entry is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The scan configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScanError {
    /// Creates a new [`ScanError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::List`] error.
    #[inline]
    pub fn list(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::List {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::List { .. } | Self::NonUtf8Path(_)
        )
    }

    /// Returns `true` if this error is fatal.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. } | Self::List { path, .. } => Some(path),
            Self::NonUtf8Path(_) | Self::Config(_) => None,
        }
    }
}
