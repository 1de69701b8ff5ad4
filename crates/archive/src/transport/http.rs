//! `reqwest`-backed transport.

use super::{Method, Reply, Request, Transport};
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::error::Error as _;
use std::io;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// Production transport.
///
/// Redirect handling is a client-level setting in `reqwest`, so two clients
/// are kept: one that follows redirects (reachability, API calls) and one
/// that never does (the redirect-based capture API reads `Location` itself).
#[derive(Clone)]
pub struct HttpTransport {
    following: Client,
    direct: Client,
}
impl HttpTransport {
    pub fn new() -> Result<Self> {
        let following = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        let direct = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { following, direct })
    }

    fn classify(err: reqwest::Error) -> Error {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() || Self::is_dropped(&err) {
            ErrorKind::Connection(err.to_string())
        } else {
            ErrorKind::Request(err.to_string())
        };
        exn::Exn::from(err).raise(kind)
    }

    /// The peer accepted the connection and then closed or reset it before
    /// answering. The archive does this when it is shedding load.
    fn is_dropped(err: &reqwest::Error) -> bool {
        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(hyper_err) = cause.downcast_ref::<hyper::Error>()
                && hyper_err.is_incomplete_message()
            {
                return true;
            }
            if let Some(io_err) = cause.downcast_ref::<io::Error>()
                && matches!(
                    io_err.kind(),
                    io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::BrokenPipe
                        | io::ErrorKind::UnexpectedEof
                )
            {
                return true;
            }
            source = cause.source();
        }
        false
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Reply> {
        let client = if request.follow_redirects { &self.following } else { &self.direct };
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(Self::classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let body = if request.read_body {
            response.text().await.map_err(Self::classify)?
        } else {
            String::new()
        };
        tracing::trace!(url = %request.url, status, "HTTP request completed");
        Ok(Reply { status, headers, body })
    }
}
