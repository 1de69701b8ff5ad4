//! The citation workflow.
//!
//! For every footnote of every document: keep it if it already cites an
//! archive, otherwise look up an existing snapshot, otherwise check that the
//! cited page is alive and ask for a new capture. Resolved footnotes get an
//! ` [Archived](<url>) ` annotation; everything else becomes a
//! [`Diagnostic`].
//!
//! - [`resolve`] applies that decision policy to a single footnote.
//! - [`process_document`] runs it over one document and writes the result
//!   back at most once.
//! - [`run`] streams [`RunEvent`]s for a whole store, processing documents
//!   concurrently, and [`summarize`] folds them into a [`RunSummary`].

mod document;
pub mod error;
#[cfg(test)]
mod fixtures;
mod report;
mod resolver;
mod run;

pub use crate::document::process_document;
pub use crate::report::{Diagnostic, DocumentReport, FootnoteReport, Level, Outcome};
pub use crate::resolver::{Resolution, Unavailable, resolve};
pub use crate::run::{RunEvent, RunSummary, run, summarize};
use citekeeper_archive::{HostDenylist, Reachability, WaybackClient};
use citekeeper_footnotes::DEFAULT_ARCHIVE_HOST;
use citekeeper_storage::StoreHandle;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Hosts whose links count as an existing archive.
    pub archive_hosts: Vec<String>,
    /// Documents processed at the same time.
    pub concurrency: usize,
    /// Deadline for resolving a single footnote, lookup and capture included.
    pub footnote_timeout: Option<Duration>,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            archive_hosts: vec![DEFAULT_ARCHIVE_HOST.to_string()],
            concurrency: std::thread::available_parallelism().map(usize::from).unwrap_or(4),
            footnote_timeout: None,
        }
    }
}

/// Everything a run shares between its document workers.
pub struct Context {
    pub client: Arc<WaybackClient>,
    pub reachability: Reachability,
    pub store: StoreHandle,
    pub options: Options,
}
impl Context {
    pub fn new(client: Arc<WaybackClient>, reachability: Reachability, store: StoreHandle) -> Self {
        Self {
            client,
            reachability,
            store,
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// The run-scoped denylist, shared with the archive client.
    pub fn denylist(&self) -> &Arc<HostDenylist> {
        self.client.denylist()
    }
}
