//! Scripted transport for testing.

use super::{Method, Reply, Request, Transport};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// What a scripted route answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Reply(Reply),
    ConnectionError,
    Timeout,
}
impl From<Reply> for MockReply {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

struct Route {
    method: Method,
    prefix: String,
    replies: VecDeque<MockReply>,
}

/// Transport that answers from a script instead of the network.
///
/// Routes match on method and URL prefix; the longest matching prefix wins.
/// Queued replies for a route are handed out in order and the last one
/// repeats forever. Requests without a route fail with a connection error,
/// which is what an unreachable host looks like. Every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for requests whose URL starts with `prefix`.
    pub fn on(mut self, method: Method, prefix: impl Into<String>, reply: impl Into<MockReply>) -> Self {
        let prefix = prefix.into();
        let routes = self.routes.get_mut();
        match routes.iter_mut().find(|route| route.method == method && route.prefix == prefix) {
            Some(route) => route.replies.push_back(reply.into()),
            None => routes.push(Route {
                method,
                prefix,
                replies: VecDeque::from([reply.into()]),
            }),
        }
        self
    }

    /// Every request sent so far, in order.
    pub async fn requests(&self) -> Vec<Request> {
        self.requests.lock().await.clone()
    }

    /// Number of requests sent with `method` to a URL starting with `prefix`.
    pub async fn count(&self, method: Method, prefix: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.method == method && request.url.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Reply> {
        let url = request.url.clone();
        let method = request.method;
        self.requests.lock().await.push(request);

        let mut routes = self.routes.lock().await;
        let reply = routes
            .iter_mut()
            .filter(|route| route.method == method && url.starts_with(&route.prefix))
            .max_by_key(|route| route.prefix.len())
            .and_then(|route| match route.replies.len() {
                0 => None,
                1 => route.replies.front().cloned(),
                _ => route.replies.pop_front(),
            });
        match reply {
            Some(MockReply::Reply(reply)) => Ok(reply),
            Some(MockReply::Timeout) => exn::bail!(ErrorKind::Timeout),
            Some(MockReply::ConnectionError) => exn::bail!(ErrorKind::Connection(format!("connection refused: {url}"))),
            None => exn::bail!(ErrorKind::Connection(format!("no route to {url}"))),
        }
    }
}
