//! Citation workflow error types.
//!
//! Footnote-level problems are never errors: they end up as
//! [`Outcome`](crate::Outcome)s in a [`DocumentReport`](crate::DocumentReport).
//! Only failures that stop a whole document (or the whole run) are raised.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A citation workflow error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for citation workflow operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Documents could not be enumerated; nothing else can happen.
    #[display("failed to discover documents")]
    Discovery,
    /// The document could not be read, or is not valid UTF-8.
    #[display("failed to read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("failed to write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    /// Whether the error ends the run instead of a single document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Discovery)
    }
}
