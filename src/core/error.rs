//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Filesystem query failures during a rescan are *not* reported through
/// this type; they are recorded on the item itself (`lstat_errno`,
/// `BaseType::Error`). `CoreError` covers the auxiliary operations that can
/// legitimately fail as a whole: loading the icon-override table and
/// refreshing the mount table.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An I/O error, typically from reading a table file.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// An error during the parsing or building of a glob pattern.
    #[error("Invalid glob pattern: {0}")]
    GlobPattern(#[from] globset::Error),

    /// A malformed icon-override table file.
    #[error("Malformed icon table: {0}")]
    IconTable(#[from] serde_json::Error),
}
