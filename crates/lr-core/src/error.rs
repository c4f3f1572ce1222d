//! Error types for the lr-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration-related errors
//! that can occur across the workspace.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use lr_core::ConfigError;
///
/// let error = ConfigError::invalid_option("check_interval_ms", "must be at least 500");
/// assert!(error.to_string().contains("check_interval_ms"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An include pattern is not a valid glob.
    #[error("invalid include pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Explanation from the glob compiler.
        reason: String,
    },

    /// An I/O error occurred while reading a configuration file.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ConfigError::InvalidPattern`] error.
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("creator_name", "must not be empty");
        insta::assert_snapshot!(
            error.to_string(),
            @"invalid configuration option 'creator_name': must not be empty"
        );
    }

    #[test]
    fn test_invalid_pattern_display() {
        let error = ConfigError::invalid_pattern("[*.cs", "invalid range pattern");
        let msg = error.to_string();
        assert!(msg.contains("[*.cs"));
        assert!(msg.contains("invalid range pattern"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let error = ConfigError::Io {
            path: Utf8PathBuf::from("/etc/live-reload.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(error.to_string().contains("/etc/live-reload.json"));
    }
}
