use super::{Attempt, CaptureStrategy, is_connection, parse_json, snippet};
use crate::denylist::HostDenylist;
use crate::error::{ErrorKind, Result};
use crate::retry::{Attempts, retry_after};
use crate::settings::Settings;
use crate::snapshot::Snapshot;
use crate::transport::{Reply, Request, TransportHandle};
use async_trait::async_trait;
use exn::OptionExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const QUOTA_EXCEEDED: &str = "error:too-many-daily-captures-host";
const SESSION_LIMIT: &str = "error:user-session-limit";

/// Body of both the submission and the status endpoints. Submission answers
/// with a `job_id` or an error; status answers with everything else.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobResponse {
    job_id: Option<String>,
    status: Option<String>,
    status_ext: Option<String>,
    message: Option<String>,
    timestamp: Option<String>,
}

/// Authenticated capture through `POST /save` and `/save/status/<job_id>`.
pub struct JobCapture {
    transport: TransportHandle,
    settings: Arc<Settings>,
    denylist: Arc<HostDenylist>,
}

impl JobCapture {
    pub fn new(transport: TransportHandle, settings: Arc<Settings>, denylist: Arc<HostDenylist>) -> Self {
        Self {
            transport,
            settings,
            denylist,
        }
    }

    fn save_endpoint(&self) -> &str {
        self.settings.save_endpoint.trim_end_matches('/')
    }

    fn authorized(&self, request: Request) -> Request {
        request
            .header("Accept", "application/json")
            .header("authorization", self.settings.credentials.authorization())
            .timeout(self.settings.request_timeout)
    }

    async fn submit(&self, url: &str, host: &str) -> Result<Attempt> {
        let request = self.authorized(
            Request::post(self.save_endpoint())
                .form("url", url)
                .form("skip_first_archive", "1"),
        );
        let reply = match self.transport.send(request).await {
            Ok(reply) => reply,
            Err(err) if is_connection(&err) => {
                tracing::warn!(url = %url, error = %err, "Connection dropped while submitting capture; will resubmit");
                return Ok(Attempt::RetryAfter(self.settings.connection_retry));
            },
            Err(err) => return Err(err),
        };
        match reply.status {
            401 | 403 => exn::bail!(ErrorKind::Unauthorized(reply.status)),
            429 => {
                let delay = retry_after(&reply, self.settings.rate_limit_wait);
                tracing::info!(url = %url, delay_secs = delay.as_secs(), "Capture rate limited");
                return Ok(Attempt::RetryAfter(delay));
            },
            _ => {},
        }
        let response: JobResponse = match parse_json(&reply) {
            Ok(response) => response,
            Err(_) if !reply.is_success() => exn::bail!(Self::http_error(&reply)),
            Err(err) => return Err(err),
        };
        if let Some(job_id) = response.job_id {
            tracing::debug!(url = %url, job_id = %job_id, "Capture job submitted");
            return self.poll(url, host, &job_id).await;
        }
        if response.status.as_deref() == Some("error") {
            return self.service_error(url, host, response).await;
        }
        if !reply.is_success() {
            exn::bail!(Self::http_error(&reply));
        }
        exn::bail!(ErrorKind::UnexpectedResponse(format!("no job_id in {}", snippet(&reply.body))))
    }

    async fn poll(&self, url: &str, host: &str, job_id: &str) -> Result<Attempt> {
        let status_url = format!("{}/status/{}", self.save_endpoint(), job_id);
        let mut throttled = Attempts::new(self.settings.max_attempts);
        loop {
            tokio::time::sleep(self.settings.poll_interval).await;
            let reply = match self.transport.send(self.authorized(Request::get(&status_url))).await {
                Ok(reply) => reply,
                Err(err) if is_connection(&err) => {
                    tracing::warn!(url = %url, job_id = %job_id, error = %err, "Connection dropped while polling; will resubmit");
                    return Ok(Attempt::RetryAfter(self.settings.connection_retry));
                },
                Err(err) => return Err(err),
            };
            if reply.status == 429 {
                if !throttled.begin() || throttled.exhausted() {
                    exn::bail!(ErrorKind::AttemptsExhausted(throttled.made()));
                }
                let delay = retry_after(&reply, self.settings.rate_limit_wait);
                tracing::info!(url = %url, job_id = %job_id, delay_secs = delay.as_secs(), "Status polling rate limited");
                tokio::time::sleep(delay).await;
                continue;
            }
            let response: JobResponse = parse_json(&reply)?;
            match response.status.as_deref() {
                Some("pending") => tracing::trace!(job_id = %job_id, "Capture pending"),
                Some("success") => {
                    let timestamp = response
                        .timestamp
                        .as_deref()
                        .ok_or_raise(|| ErrorKind::UnexpectedResponse(format!("job {job_id} succeeded without a timestamp")))?;
                    return Ok(Attempt::Captured(Snapshot::from_capture(&self.settings.web_base, timestamp, url)));
                },
                Some("error") => return self.service_error(url, host, response).await,
                _ => exn::bail!(ErrorKind::UnexpectedResponse(format!("job {job_id}: {}", snippet(&reply.body)))),
            }
        }
    }

    async fn service_error(&self, url: &str, host: &str, response: JobResponse) -> Result<Attempt> {
        let code = response.status_ext.unwrap_or_else(|| "error:unknown".to_string());
        let message = response.message.unwrap_or_default();
        match code.as_str() {
            QUOTA_EXCEEDED => {
                self.denylist.add(host).await;
                exn::bail!(ErrorKind::HostQuotaExceeded(host.to_string()))
            },
            SESSION_LIMIT => {
                tracing::info!(url = %url, "Too many concurrent captures for this account; will resubmit");
                Ok(Attempt::RetryAfter(self.settings.session_retry))
            },
            _ => exn::bail!(ErrorKind::Service { code, message }),
        }
    }

    fn http_error(reply: &Reply) -> ErrorKind {
        ErrorKind::Service {
            code: format!("HTTP {}", reply.status),
            message: snippet(&reply.body),
        }
    }
}

#[async_trait]
impl CaptureStrategy for JobCapture {
    fn name(&self) -> &'static str {
        "jobs"
    }

    async fn capture(&self, url: &str, host: &str) -> Result<Snapshot> {
        let mut attempts = Attempts::new(self.settings.max_attempts);
        loop {
            if !attempts.begin() {
                exn::bail!(ErrorKind::AttemptsExhausted(attempts.made()));
            }
            let delay: Duration = match self.submit(url, host).await? {
                Attempt::Captured(snapshot) => return Ok(snapshot),
                Attempt::RetryAfter(delay) => delay,
            };
            if attempts.exhausted() {
                exn::bail!(ErrorKind::AttemptsExhausted(attempts.made()));
            }
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockReply, MockTransport};

    const SAVE: &str = "https://web.archive.org/save";
    const STATUS: &str = "https://web.archive.org/save/status/";
    const PAGE: &str = "http://example.com/page";

    fn capture(transport: Arc<MockTransport>, settings: Settings) -> (JobCapture, Arc<HostDenylist>) {
        let denylist = Arc::new(HostDenylist::new());
        (JobCapture::new(transport, Arc::new(settings), denylist.clone()), denylist)
    }

    fn job(id: &str) -> Reply {
        Reply::json(200, format!(r#"{{"url":"{PAGE}","job_id":"{id}"}}"#))
    }

    fn success() -> Reply {
        Reply::json(200, r#"{"status":"success","timestamp":"20240101000000","original_url":"http://example.com/page"}"#)
    }

    fn error(code: &str) -> Reply {
        Reply::json(200, format!(r#"{{"status":"error","status_ext":"{code}","message":"computer says no"}}"#))
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_poll_success() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Post, SAVE, job("spn2-abc"))
                .on(Method::Get, STATUS, Reply::json(200, r#"{"status":"pending"}"#))
                .on(Method::Get, STATUS, success()),
        );
        let settings = Settings {
            credentials: crate::Credentials::new(Some("key".to_string()), Some("secret".to_string())),
            ..Settings::default()
        };
        let (strategy, _) = capture(transport.clone(), settings);
        let snapshot = strategy.capture(PAGE, "example.com").await.unwrap();
        assert_eq!(snapshot.url, "https://web.archive.org/web/20240101000000/http://example.com/page");
        assert_eq!(transport.count(Method::Get, "https://web.archive.org/save/status/spn2-abc").await, 2);

        let submission = transport.requests().await.remove(0);
        assert!(submission.form.contains(&("url".to_string(), PAGE.to_string())));
        assert!(submission.form.contains(&("skip_first_archive".to_string(), "1".to_string())));
        assert!(submission.headers.contains(&("authorization".to_string(), "LOW key:secret".to_string())));
        assert!(submission.headers.contains(&("Accept".to_string(), "application/json".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_error_denylists_host() {
        let transport = Arc::new(MockTransport::new().on(Method::Post, SAVE, error(QUOTA_EXCEEDED)));
        let (strategy, denylist) = capture(transport, Settings::default());
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert_eq!(*err, ErrorKind::HostQuotaExceeded("example.com".to_string()));
        assert!(denylist.contains("example.com").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_error_while_polling_denylists_host() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Post, SAVE, job("j1"))
                .on(Method::Get, STATUS, error(QUOTA_EXCEEDED)),
        );
        let (strategy, denylist) = capture(transport, Settings::default());
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::HostQuotaExceeded(_)));
        assert!(denylist.contains("example.com").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_limit_resubmits() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Post, SAVE, error(SESSION_LIMIT))
                .on(Method::Post, SAVE, job("j2"))
                .on(Method::Get, STATUS, success()),
        );
        let (strategy, denylist) = capture(transport.clone(), Settings::default());
        let started = tokio::time::Instant::now();
        strategy.capture(PAGE, "example.com").await.unwrap();
        assert_eq!(transport.count(Method::Post, SAVE).await, 2);
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(denylist.hosts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_error_while_polling_resubmits() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Post, SAVE, job("j3"))
                .on(Method::Get, STATUS, MockReply::ConnectionError)
                .on(Method::Get, STATUS, success()),
        );
        let (strategy, _) = capture(transport.clone(), Settings::default());
        strategy.capture(PAGE, "example.com").await.unwrap();
        assert_eq!(transport.count(Method::Post, SAVE).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_service_error_fails() {
        let transport = Arc::new(MockTransport::new().on(Method::Post, SAVE, error("error:bad-request")));
        let (strategy, denylist) = capture(transport, Settings::default());
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert_eq!(
            *err,
            ErrorKind::Service {
                code: "error:bad-request".to_string(),
                message: "computer says no".to_string()
            }
        );
        assert!(denylist.hosts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized() {
        let transport = Arc::new(MockTransport::new().on(Method::Post, SAVE, Reply::new(401)));
        let (strategy, _) = capture(transport, Settings::default());
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Unauthorized(401));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_escape_hatch() {
        let transport = Arc::new(MockTransport::new().on(Method::Post, SAVE, Reply::new(429)));
        let settings = Settings {
            max_attempts: Some(3),
            ..Settings::default()
        };
        let (strategy, _) = capture(transport.clone(), settings);
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert_eq!(*err, ErrorKind::AttemptsExhausted(3));
        assert_eq!(transport.count(Method::Post, SAVE).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_polling_waits_then_continues() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Post, SAVE, job("j4"))
                .on(Method::Get, STATUS, Reply::new(429).with_header("Retry-After", "7"))
                .on(Method::Get, STATUS, success()),
        );
        let (strategy, _) = capture(transport.clone(), Settings::default());
        let started = tokio::time::Instant::now();
        strategy.capture(PAGE, "example.com").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(7));
        assert_eq!(transport.count(Method::Post, SAVE).await, 1);
        assert_eq!(transport.count(Method::Get, STATUS).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_polling_honours_max_attempts() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::Post, SAVE, job("j5"))
                .on(Method::Get, STATUS, Reply::new(429)),
        );
        let settings = Settings {
            max_attempts: Some(3),
            ..Settings::default()
        };
        let (strategy, _) = capture(transport.clone(), settings);
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert_eq!(*err, ErrorKind::AttemptsExhausted(3));
        assert_eq!(transport.count(Method::Get, STATUS).await, 3);
        assert_eq!(transport.count(Method::Post, SAVE).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_error_status() {
        let transport = Arc::new(MockTransport::new().on(Method::Post, SAVE, Reply::new(502)));
        let (strategy, _) = capture(transport, Settings::default());
        let err = strategy.capture(PAGE, "example.com").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Service { code, .. } if code == "HTTP 502"));
    }
}
