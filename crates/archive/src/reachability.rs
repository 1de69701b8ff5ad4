use crate::transport::{Request, TransportHandle};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a single reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCheck {
    pub ok: bool,
    /// Final HTTP status after redirects; `None` when no response arrived.
    pub status: Option<u16>,
}

/// Checks whether a cited page still answers.
///
/// One GET, redirects followed, never retried: a flaky page is reported as
/// broken rather than slowing the run down.
#[derive(Clone)]
pub struct Reachability {
    transport: TransportHandle,
    timeout: Duration,
}
impl Reachability {
    pub fn new(transport: TransportHandle, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn check(&self, url: &str) -> LinkCheck {
        let request = Request::get(url).timeout(self.timeout).without_body();
        match self.transport.send(request).await {
            Ok(reply) => LinkCheck {
                ok: reply.status < 400,
                status: Some(reply.status),
            },
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "Link unreachable");
                LinkCheck { ok: false, status: None }
            },
        }
    }
}
