use super::{CaptureStrategy, is_connection, snippet};
use crate::error::{ErrorKind, Result};
use crate::retry::{Attempts, retry_after};
use crate::settings::Settings;
use crate::snapshot::Snapshot;
use crate::transport::{Reply, Request, TransportHandle};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::sync::Arc;
use url::Url;

/// Anonymous capture through `GET /save/<url>`.
///
/// The service crawls the page while the request is open and answers with a
/// redirect to the fresh snapshot, so requests use the long capture timeout.
pub struct RedirectCapture {
    transport: TransportHandle,
    settings: Arc<Settings>,
}

impl RedirectCapture {
    pub fn new(transport: TransportHandle, settings: Arc<Settings>) -> Self {
        Self { transport, settings }
    }

    fn snapshot_from(&self, reply: &Reply) -> Result<Snapshot> {
        let location = reply
            .header("location")
            .ok_or_raise(|| ErrorKind::UnexpectedResponse(format!("HTTP {} without a Location header", reply.status)))?;
        let base = Url::parse(&self.settings.web_base).or_raise(|| ErrorKind::InvalidUrl(self.settings.web_base.clone()))?;
        let resolved = base.join(location).or_raise(|| ErrorKind::InvalidUrl(location.to_string()))?;
        Ok(Snapshot::new(resolved.as_str()))
    }
}

#[async_trait]
impl CaptureStrategy for RedirectCapture {
    fn name(&self) -> &'static str {
        "redirect"
    }

    async fn capture(&self, url: &str, _host: &str) -> Result<Snapshot> {
        let save_url = format!("{}/{}", self.settings.save_endpoint.trim_end_matches('/'), url);
        let mut attempts = Attempts::new(self.settings.max_attempts);
        loop {
            if !attempts.begin() {
                exn::bail!(ErrorKind::AttemptsExhausted(attempts.made()));
            }
            let request = Request::get(&save_url).no_redirects().timeout(self.settings.capture_timeout);
            let delay = match self.transport.send(request).await {
                Ok(reply) if reply.is_redirect() => return self.snapshot_from(&reply),
                Ok(reply) if reply.status == 429 => {
                    let delay = retry_after(&reply, self.settings.rate_limit_wait);
                    tracing::info!(url = %url, delay_secs = delay.as_secs(), "Capture rate limited");
                    delay
                },
                Ok(reply) if matches!(reply.status, 401 | 403) => exn::bail!(ErrorKind::Unauthorized(reply.status)),
                Ok(reply) => exn::bail!(ErrorKind::Service {
                    code: format!("HTTP {}", reply.status),
                    message: snippet(&reply.body),
                }),
                Err(err) if is_connection(&err) => {
                    tracing::warn!(url = %url, error = %err, "Connection dropped while capturing; will retry");
                    self.settings.connection_retry
                },
                Err(err) => return Err(err),
            };
            if attempts.exhausted() {
                exn::bail!(ErrorKind::AttemptsExhausted(attempts.made()));
            }
            tokio::time::sleep(delay).await;
        }
    }
}
