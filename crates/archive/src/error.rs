//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection could not be established or was dropped. The Wayback
    /// Machine closes connections when it is under load, so this doubles as
    /// a rate limit signal.
    #[display("connection failed: {_0}")]
    Connection(#[error(not(source))] String),
    #[display("request timed out")]
    Timeout,
    /// Any other transport-level failure.
    #[display("request failed: {_0}")]
    Request(#[error(not(source))] String),
    #[display("failed to build HTTP client")]
    Client,
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// Capture was requested for a host on the denylist.
    #[display("{_0} is denylisted for this run")]
    Denylisted(#[error(not(source))] String),
    /// The service refuses further captures of this host today. The host has
    /// been added to the denylist.
    #[display("the Wayback Machine has created too many captures of {_0} today; added to denylist for this run")]
    HostQuotaExceeded(#[error(not(source))] String),
    /// Credentials are missing or were rejected.
    #[display("the Wayback Machine rejected the archive credentials (HTTP {_0})")]
    Unauthorized(#[error(not(source))] u16),
    /// The service reported a machine-readable error code.
    #[display("Wayback Machine reported {code} with the following message: {message}")]
    Service { code: String, message: String },
    #[display("unexpected response from the Wayback Machine: {_0}")]
    UnexpectedResponse(#[error(not(source))] String),
    /// The configured maximum number of attempts was used up while the
    /// service kept asking us to back off.
    #[display("gave up after {_0} attempts")]
    AttemptsExhausted(#[error(not(source))] u32),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout | Self::AttemptsExhausted(_))
    }
}
