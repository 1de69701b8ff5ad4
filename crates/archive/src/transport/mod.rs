//! HTTP transport seam.
//!
//! Every request the archive client and the reachability checker make goes
//! through [`Transport::send`]. Production code uses [`HttpTransport`]
//! (`reqwest`); tests script replies with `MockTransport`.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::http::HttpTransport;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockReply, MockTransport};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub type TransportHandle = Arc<dyn Transport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// URL-encoded form body; empty means no body.
    pub form: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
    /// Whether the caller cares about the response body at all.
    pub read_body: bool,
}
impl Request {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            form: Vec::new(),
            timeout: None,
            follow_redirects: true,
            read_body: true,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn without_body(mut self) -> Self {
        self.read_body = false;
        self
    }
}

/// A received HTTP response, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}
impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn json(status: u16, body: impl Into<String>) -> Self {
        let mut reply = Self::new(status).with_header("content-type", "application/json");
        reply.body = body.into();
        reply
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup; first value wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and buffer the response.
    ///
    /// Failures are classified into [`Connection`](crate::error::ErrorKind::Connection),
    /// [`Timeout`](crate::error::ErrorKind::Timeout) and
    /// [`Request`](crate::error::ErrorKind::Request); any HTTP status,
    /// including 4xx/5xx, is a successful [`Reply`].
    async fn send(&self, request: Request) -> Result<Reply>;
}
