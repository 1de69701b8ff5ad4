use crate::capture::{CaptureStrategy, JobCapture, RedirectCapture};
use crate::denylist::HostDenylist;
use crate::error::{ErrorKind, Result};
use crate::settings::{CaptureApi, Settings};
use crate::snapshot::Snapshot;
use crate::transport::TransportHandle;
use exn::{OptionExt, ResultExt};
use std::sync::Arc;
use tracing::instrument;
use url::Url;

/// Lowercased host of an absolute URL.
pub fn host_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
    let host = parsed.host_str().ok_or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
    Ok(host.trim_end_matches('.').to_ascii_lowercase())
}

/// Client for the Wayback Machine's availability and save-page-now APIs.
///
/// Cheap to share: clone the `Arc` it is usually wrapped in, not the client.
pub struct WaybackClient {
    pub(crate) transport: TransportHandle,
    pub(crate) settings: Arc<Settings>,
    denylist: Arc<HostDenylist>,
    strategy: Box<dyn CaptureStrategy>,
}

impl WaybackClient {
    pub fn new(transport: TransportHandle, settings: Settings, denylist: Arc<HostDenylist>) -> Self {
        let settings = Arc::new(settings);
        let strategy: Box<dyn CaptureStrategy> = match settings.capture_api {
            CaptureApi::Jobs => {
                if !settings.credentials.is_complete() {
                    tracing::warn!("Archive credentials are missing; the job API will reject capture requests");
                }
                Box::new(JobCapture::new(transport.clone(), settings.clone(), denylist.clone()))
            },
            CaptureApi::Redirect => Box::new(RedirectCapture::new(transport.clone(), settings.clone())),
        };
        Self {
            transport,
            settings,
            denylist,
            strategy,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn denylist(&self) -> &Arc<HostDenylist> {
        &self.denylist
    }

    /// Ask the Wayback Machine to capture `url` now.
    ///
    /// Denylisted hosts are refused without contacting the service. A host
    /// quota error adds the host to the shared denylist before failing.
    #[instrument(skip(self), fields(strategy = self.strategy.name()))]
    pub async fn create_snapshot(&self, url: &str) -> Result<Snapshot> {
        let host = host_of(url)?;
        if self.denylist.contains(&host).await {
            exn::bail!(ErrorKind::Denylisted(host));
        }
        let snapshot = self.strategy.capture(url, &host).await?;
        tracing::info!(url = %url, snapshot = %snapshot, "Snapshot created");
        Ok(snapshot)
    }
}
