use std::collections::HashSet;
use tokio::sync::RwLock;

/// Hosts excluded from new captures for the rest of a run.
///
/// Shared between every document worker behind an `Arc`. Hosts are only ever
/// added, either from configuration when the run starts or by the archive
/// client when the Wayback Machine reports a per-host daily quota.
#[derive(Debug, Default)]
pub struct HostDenylist {
    hosts: RwLock<HashSet<String>>,
}

fn normalize(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl HostDenylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|host| normalize(host.as_ref()))
            .filter(|host| !host.is_empty())
            .collect();
        Self { hosts: RwLock::new(hosts) }
    }

    pub async fn contains(&self, host: &str) -> bool {
        self.hosts.read().await.contains(&normalize(host))
    }

    /// Returns `true` if the host was not already denylisted.
    pub async fn add(&self, host: &str) -> bool {
        let host = normalize(host);
        if host.is_empty() {
            return false;
        }
        let added = self.hosts.write().await.insert(host.clone());
        if added {
            tracing::info!(host = %host, "Host added to denylist");
        }
        added
    }

    /// Sorted snapshot of the current hosts.
    pub async fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.hosts.read().await.iter().cloned().collect();
        hosts.sort();
        hosts
    }
}
