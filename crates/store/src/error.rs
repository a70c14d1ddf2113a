//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// A stored value could not be converted (or a value could not be stored).
    #[display("invalid storage data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// A path could not be normalised into a workspace-relative path.
    #[display("invalid source path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A synchronization package broke one of its own invariants.
    #[display("inconsistent synchronization package: {_0}")]
    Constraint(#[error(not(source))] String),
    /// An id that was never handed out by this database.
    #[display("unknown {kind} id {id}")]
    UnknownId {
        kind: &'static str,
        id: i64,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A busy or locked database is the only thing that goes away by itself.
        matches!(self, Self::Database)
    }
}
