//! Save-page-now capture strategies.
//!
//! The Wayback Machine exposes two generations of its capture API. Both are
//! implemented behind [`CaptureStrategy`] and selected with
//! [`CaptureApi`](crate::CaptureApi):
//!
//! - [`JobCapture`]: authenticated job submission followed by status polling.
//! - [`RedirectCapture`]: a single anonymous GET answered by a redirect to
//!   the new snapshot.
//!
//! Each strategy owns its retry loop. Rate limits, dropped connections and
//! session limits are waited out locally; everything else is returned to the
//! caller.

mod jobs;
mod redirect;

pub use self::jobs::JobCapture;
pub use self::redirect::RedirectCapture;
use crate::Snapshot;
use crate::error::{ErrorKind, Result};
use crate::transport::Reply;
use async_trait::async_trait;
use exn::ResultExt;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Capture `url`, whose lowercased host is `host`.
    async fn capture(&self, url: &str, host: &str) -> Result<Snapshot>;
}

/// What a single submission attempt decided.
enum Attempt {
    Captured(Snapshot),
    RetryAfter(Duration),
}

const SNIPPET_LEN: usize = 200;

/// First few hundred characters of a body, for error messages.
pub(crate) fn snippet(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(SNIPPET_LEN) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(reply: &Reply) -> Result<T> {
    serde_json::from_str(&reply.body)
        .or_raise(|| ErrorKind::UnexpectedResponse(format!("HTTP {}: {}", reply.status, snippet(&reply.body))))
}

pub(crate) fn is_connection(kind: &ErrorKind) -> bool {
    matches!(kind, ErrorKind::Connection(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let long = "é".repeat(SNIPPET_LEN + 10);
        let cut = snippet(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), SNIPPET_LEN + 3);
        assert_eq!(snippet("  short  "), "short");
    }

    #[test]
    fn test_parse_json_error_mentions_status() {
        let err = parse_json::<serde_json::Value>(&Reply::new(502)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnexpectedResponse(message) if message.starts_with("HTTP 502")));
    }
}
