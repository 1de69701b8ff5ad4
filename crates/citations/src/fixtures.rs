//! Shared test scaffolding.

use crate::Context;
use citekeeper_archive::transport::{MockTransport, Reply};
use citekeeper_archive::{HostDenylist, Reachability, Settings, WaybackClient};
use citekeeper_storage::backend::MockStore;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const AVAILABLE: &str = "https://archive.org/wayback/available";
pub(crate) const SAVE: &str = "https://web.archive.org/save";
pub(crate) const STATUS: &str = "https://web.archive.org/save/status/";

pub(crate) fn context(transport: Arc<MockTransport>, denylisted: &[&str]) -> Context {
    context_with_store(transport, denylisted, Arc::new(MockStore::default()))
}

pub(crate) fn context_with_store(transport: Arc<MockTransport>, denylisted: &[&str], store: Arc<MockStore>) -> Context {
    let denylist = Arc::new(HostDenylist::with_hosts(denylisted));
    let client = WaybackClient::new(transport.clone(), Settings::default(), denylist);
    let reachability = Reachability::new(transport, Duration::from_secs(10));
    Context::new(Arc::new(client), reachability, store)
}

pub(crate) fn found(url: &str) -> Reply {
    Reply::json(
        200,
        format!(
            r#"{{"archived_snapshots":{{"closest":{{"available":true,"url":"http://web.archive.org/web/20200101000000/{url}","timestamp":"20200101000000"}}}}}}"#
        ),
    )
}

pub(crate) fn not_found() -> Reply {
    Reply::json(200, r#"{"archived_snapshots":{}}"#)
}

pub(crate) fn capture_job(id: &str) -> Reply {
    Reply::json(200, format!(r#"{{"job_id":"{id}"}}"#))
}

pub(crate) fn capture_success() -> Reply {
    Reply::json(200, r#"{"status":"success","timestamp":"20240101000000"}"#)
}
