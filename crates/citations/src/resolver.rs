use crate::Context;
use citekeeper_archive::error::ErrorKind as ArchiveErrorKind;
use citekeeper_archive::{Snapshot, host_of};
use citekeeper_footnotes::is_archive_link;
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Why a footnote whose page is alive still has no archive link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The host refuses captures for the rest of this run.
    Denylisted(String),
    /// The Wayback Machine could not, or would not, capture the page.
    CaptureFailed(String),
    /// Resolution took longer than the per-footnote deadline.
    TimedOut(Duration),
}
impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denylisted(host) => write!(f, "{host} is denylisted for this run"),
            Self::CaptureFailed(reason) => f.write_str(reason),
            Self::TimedOut(after) => write!(f, "gave up after {}s", after.as_secs()),
        }
    }
}

/// What the decision policy concluded for one footnote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The footnote already links to an archive; nothing was contacted.
    AlreadyArchived,
    /// An existing or freshly created snapshot of the primary URL.
    Resolved(Snapshot),
    /// The primary URL is reachable but no snapshot could be obtained.
    Unavailable(Unavailable),
    /// The primary URL is unreachable and has never been archived. Carries
    /// the HTTP status, if the server answered at all.
    Broken(Option<u16>),
}

/// Resolve the footnote citing `primary` (with all of its `links`).
///
/// In order: an archive link already present wins; then an existing
/// snapshot; then, only if the page is reachable and its host is not
/// denylisted, a new capture. The optional per-footnote deadline from the
/// context's options wraps all of it.
#[instrument(skip(ctx, links))]
pub async fn resolve(ctx: &Context, primary: &str, links: &[String]) -> Resolution {
    if links.iter().any(|link| is_archive_link(link, &ctx.options.archive_hosts)) {
        tracing::debug!(url = %primary, "Footnote already cites an archive");
        return Resolution::AlreadyArchived;
    }
    match ctx.options.footnote_timeout {
        Some(deadline) => match tokio::time::timeout(deadline, resolve_unarchived(ctx, primary)).await {
            Ok(resolution) => resolution,
            Err(_) => {
                tracing::warn!(url = %primary, deadline_secs = deadline.as_secs(), "Footnote resolution timed out");
                Resolution::Unavailable(Unavailable::TimedOut(deadline))
            },
        },
        None => resolve_unarchived(ctx, primary).await,
    }
}

async fn resolve_unarchived(ctx: &Context, url: &str) -> Resolution {
    if let Some(snapshot) = ctx.client.find_snapshot(url).await {
        tracing::info!(url = %url, snapshot = %snapshot, "Found existing snapshot");
        return Resolution::Resolved(snapshot);
    }

    let check = ctx.reachability.check(url).await;
    if !check.ok {
        match check.status {
            Some(status) => tracing::warn!(url = %url, status, "Broken link with no archived copy"),
            None => tracing::warn!(url = %url, "Unreachable link with no archived copy"),
        }
        return Resolution::Broken(check.status);
    }

    if let Ok(host) = host_of(url)
        && ctx.denylist().contains(&host).await
    {
        tracing::info!(url = %url, host = %host, "No snapshot exists and the host is denylisted");
        return Resolution::Unavailable(Unavailable::Denylisted(host));
    }

    match ctx.client.create_snapshot(url).await {
        Ok(snapshot) => Resolution::Resolved(snapshot),
        Err(err) => match &*err {
            // Another document's capture hit the host quota in the meantime.
            ArchiveErrorKind::Denylisted(host) => {
                tracing::info!(url = %url, host = %host, "No snapshot exists and the host is denylisted");
                Resolution::Unavailable(Unavailable::Denylisted(host.clone()))
            },
            _ => {
                tracing::warn!(url = %url, error = %err, "No snapshot exists and none could be created");
                Resolution::Unavailable(Unavailable::CaptureFailed(err.to_string()))
            },
        },
    }
}
