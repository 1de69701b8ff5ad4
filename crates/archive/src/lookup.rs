//! Availability lookup ("find snapshot").

use crate::client::WaybackClient;
use crate::error::{ErrorKind, Result};
use crate::retry::{Attempts, retry_after};
use crate::snapshot::Snapshot;
use crate::transport::{Reply, Request};
use exn::ResultExt;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Availability {
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchivedSnapshots {
    closest: Option<Closest>,
}

#[derive(Debug, Deserialize)]
struct Closest {
    #[serde(default)]
    available: bool,
    url: String,
}

enum Lookup {
    Done(Option<Snapshot>),
    RateLimited(Reply),
}

impl WaybackClient {
    /// Look up the closest existing snapshot of `url`.
    ///
    /// Best effort: rate limits are waited out, anything else that goes wrong
    /// is logged and reported as "no snapshot".
    #[instrument(skip(self))]
    pub async fn find_snapshot(&self, url: &str) -> Option<Snapshot> {
        let mut attempts = Attempts::new(self.settings.max_attempts);
        loop {
            if !attempts.begin() {
                tracing::warn!(url = %url, attempts = attempts.made(), "Gave up looking for a snapshot while rate limited");
                return None;
            }
            match self.lookup_once(url).await {
                Ok(Lookup::Done(snapshot)) => return snapshot,
                Ok(Lookup::RateLimited(reply)) => {
                    if attempts.exhausted() {
                        tracing::warn!(url = %url, attempts = attempts.made(), "Gave up looking for a snapshot while rate limited");
                        return None;
                    }
                    let delay = retry_after(&reply, self.settings.rate_limit_wait);
                    tracing::info!(url = %url, delay_secs = delay.as_secs(), "Availability lookup rate limited");
                    tokio::time::sleep(delay).await;
                },
                Err(err) => {
                    tracing::error!(url = %url, error = %err, "Availability lookup failed");
                    return None;
                },
            }
        }
    }

    async fn lookup_once(&self, url: &str) -> Result<Lookup> {
        let endpoint = Url::parse_with_params(&self.settings.availability_endpoint, [("url", url)])
            .or_raise(|| ErrorKind::InvalidUrl(self.settings.availability_endpoint.clone()))?;
        let request = Request::get(endpoint.as_str()).timeout(self.settings.request_timeout);
        let reply = self.transport.send(request).await?;
        if reply.status == 429 {
            return Ok(Lookup::RateLimited(reply));
        }
        if !reply.is_success() {
            exn::bail!(ErrorKind::UnexpectedResponse(format!("HTTP {}", reply.status)));
        }
        let availability: Availability = crate::capture::parse_json(&reply)?;
        let snapshot = availability
            .archived_snapshots
            .closest
            .filter(|closest| closest.available)
            .map(|closest| Snapshot::new(closest.url));
        match &snapshot {
            Some(snapshot) => tracing::debug!(url = %url, snapshot = %snapshot, "Found existing snapshot"),
            None => tracing::debug!(url = %url, "No existing snapshot"),
        }
        Ok(Lookup::Done(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use crate::transport::{Method, MockReply, MockTransport, Reply};
    use crate::{HostDenylist, Settings, WaybackClient};
    use std::sync::Arc;
    use std::time::Duration;

    const AVAILABLE: &str = "https://archive.org/wayback/available";

    fn client(transport: Arc<MockTransport>, settings: Settings) -> WaybackClient {
        WaybackClient::new(transport, settings, Arc::new(HostDenylist::new()))
    }

    fn found() -> Reply {
        Reply::json(
            200,
            r#"{"url":"example.com","archived_snapshots":{"closest":{"status":"200","available":true,"url":"http://web.archive.org/web/20130919044612/http://example.com/","timestamp":"20130919044612"}}}"#,
        )
    }

    #[tokio::test]
    async fn test_found() {
        let transport = Arc::new(MockTransport::new().on(Method::Get, AVAILABLE, found()));
        let snapshot = client(transport.clone(), Settings::default()).find_snapshot("http://example.com/").await.unwrap();
        assert_eq!(snapshot.url, "http://web.archive.org/web/20130919044612/http://example.com/");
        let request = transport.requests().await.pop().unwrap();
        assert_eq!(request.url, "https://archive.org/wayback/available?url=http%3A%2F%2Fexample.com%2F");
    }

    #[tokio::test]
    async fn test_not_found() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Get, AVAILABLE, Reply::json(200, r#"{"url":"a","archived_snapshots":{}}"#))
                .on(
                    Method::Get,
                    AVAILABLE,
                    Reply::json(200, r#"{"archived_snapshots":{"closest":{"available":false,"url":"http://x"}}}"#),
                ),
        );
        let client = client(transport, Settings::default());
        assert_eq!(client.find_snapshot("http://a.example").await, None);
        assert_eq!(client.find_snapshot("http://a.example").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_then_requeries() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Get, AVAILABLE, Reply::new(429).with_header("Retry-After", "3"))
                .on(Method::Get, AVAILABLE, found()),
        );
        let started = tokio::time::Instant::now();
        let snapshot = client(transport.clone(), Settings::default()).find_snapshot("http://example.com/").await;
        assert!(snapshot.is_some());
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(transport.count(Method::Get, AVAILABLE).await, 2);
        assert_eq!(transport.count(Method::Post, "https://web.archive.org/save").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_after_max_attempts() {
        let transport = Arc::new(MockTransport::new().on(Method::Get, AVAILABLE, Reply::new(429)));
        let settings = Settings {
            max_attempts: Some(2),
            ..Settings::default()
        };
        assert_eq!(client(transport.clone(), settings).find_snapshot("http://example.com").await, None);
        assert_eq!(transport.count(Method::Get, AVAILABLE).await, 2);
    }

    #[tokio::test]
    async fn test_failures_are_best_effort() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Get, AVAILABLE, Reply::new(503))
                .on(Method::Get, AVAILABLE, Reply::json(200, "<html>oops</html>"))
                .on(Method::Get, AVAILABLE, MockReply::ConnectionError),
        );
        let client = client(transport.clone(), Settings::default());
        for _ in 0..3 {
            assert_eq!(client.find_snapshot("http://example.com").await, None);
        }
        assert_eq!(transport.count(Method::Get, AVAILABLE).await, 3);
    }
}
