use crate::transport::Reply;
use std::time::Duration;

/// Counts attempts against an optional limit.
///
/// With no limit the loops it guards retry for as long as the service keeps
/// asking them to.
pub(crate) struct Attempts {
    made: u32,
    limit: Option<u32>,
}
impl Attempts {
    pub(crate) fn new(limit: Option<u32>) -> Self {
        Self { made: 0, limit }
    }

    /// Records the start of an attempt. Returns `false` once the limit has
    /// been reached, in which case no attempt should be made.
    pub(crate) fn begin(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        self.made = self.made.saturating_add(1);
        true
    }

    /// Whether another attempt would exceed the limit. Checked before
    /// sleeping so that the last attempt doesn't wait for nothing.
    pub(crate) fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.made >= limit)
    }

    pub(crate) fn made(&self) -> u32 {
        self.made
    }
}

/// Delay requested by a rate-limited reply.
///
/// Only the delta-seconds form of `Retry-After` is understood; HTTP dates
/// and garbage fall back to `fallback`.
pub(crate) fn retry_after(reply: &Reply, fallback: Duration) -> Duration {
    reply
        .header("retry-after")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}
