use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const AVAILABILITY_ENDPOINT: &str = "https://archive.org/wayback/available";
pub const SAVE_ENDPOINT: &str = "https://web.archive.org/save";
pub const WEB_BASE: &str = "https://web.archive.org";

/// Which generation of the save-page-now API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureApi {
    /// Authenticated `POST /save`, then poll `/save/status/<job_id>`.
    #[default]
    Jobs,
    /// Anonymous `GET /save/<url>`, answered with a redirect to the snapshot.
    Redirect,
}
impl FromStr for CaptureApi {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jobs" | "job" => Ok(Self::Jobs),
            "redirect" => Ok(Self::Redirect),
            other => Err(format!("unknown capture API `{other}` (expected `jobs` or `redirect`)")),
        }
    }
}
impl fmt::Display for CaptureApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jobs => "jobs",
            Self::Redirect => "redirect",
        })
    }
}

/// S3-style key pair for the save-page-now API.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}
impl Credentials {
    pub fn new(access_key: Option<String>, secret_key: Option<String>) -> Self {
        Self { access_key, secret_key }
    }

    pub fn is_complete(&self) -> bool {
        self.access_key.as_deref().is_some_and(|k| !k.is_empty()) && self.secret_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Value of the `authorization` header. Missing keys are sent empty so
    /// that the service, not us, rejects the request.
    pub(crate) fn authorization(&self) -> String {
        format!(
            "LOW {}:{}",
            self.access_key.as_deref().unwrap_or_default(),
            self.secret_key.as_deref().unwrap_or_default()
        )
    }
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .finish()
    }
}

/// Everything the [`WaybackClient`](crate::WaybackClient) needs to know about
/// the service and how politely to talk to it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub capture_api: CaptureApi,
    pub availability_endpoint: String,
    pub save_endpoint: String,
    /// Base for snapshot URLs built from a capture timestamp.
    pub web_base: String,
    pub credentials: Credentials,
    /// Timeout for lookup and job API calls.
    pub request_timeout: Duration,
    /// Timeout for a synchronous (redirect API) capture, which may involve
    /// a full crawl of the page.
    pub capture_timeout: Duration,
    /// Wait after a 429 that did not suggest one via `Retry-After`.
    pub rate_limit_wait: Duration,
    /// Wait after a dropped connection before resubmitting.
    pub connection_retry: Duration,
    /// Wait after `error:user-session-limit` before resubmitting.
    pub session_retry: Duration,
    pub poll_interval: Duration,
    /// Escape hatch for the otherwise unbounded retry loops.
    pub max_attempts: Option<u32>,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            capture_api: CaptureApi::default(),
            availability_endpoint: AVAILABILITY_ENDPOINT.to_string(),
            save_endpoint: SAVE_ENDPOINT.to_string(),
            web_base: WEB_BASE.to_string(),
            credentials: Credentials::default(),
            request_timeout: Duration::from_secs(60),
            capture_timeout: Duration::from_secs(600),
            rate_limit_wait: Duration::from_secs(10),
            connection_retry: Duration::from_secs(10),
            session_retry: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}
