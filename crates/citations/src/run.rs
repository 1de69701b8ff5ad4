use crate::Context;
use crate::document::process_document;
use crate::error::{Error, ErrorKind, Result};
use crate::report::{Diagnostic, DocumentReport};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};

/// Progress events emitted by [`run`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of documents found.
/// 3. [`Processed`](Self::Processed), once per document that was processed
///    successfully, in completion order.
/// 4. [`Complete`](Self::Complete), exactly once.
///
/// Failing documents are yielded as `Err` items in place of `Processed`. A
/// discovery failure ends the stream early, without `Complete`.
#[derive(Debug)]
pub enum RunEvent {
    Started,
    DiscoveryComplete(u64),
    Processed(DocumentReport),
    Complete,
}

/// Streams [`RunEvent`]s for every document in the context's store beneath
/// `prefix`, processing up to `ctx.options.concurrency` documents at a time.
pub fn run<'a>(ctx: &'a Context, prefix: Option<&'a Path>) -> impl Stream<Item = Result<RunEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(RunEvent::Started);

        let mut paths: Vec<PathBuf> = match ctx.store.list(prefix).await.or_raise(|| ErrorKind::Discovery) {
            Ok(documents) => documents.into_iter().map(|document| document.path).collect(),
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        paths.sort();
        tracing::info!(store = ctx.store.name(), documents = paths.len(), "Discovery complete");
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(RunEvent::DiscoveryComplete(u64::try_from(paths.len()).unwrap_or(0)));

        let concurrency = ctx.options.concurrency.max(1);
        let mut pending = paths.iter();
        let mut processing = FuturesUnordered::new();
        processing.extend(pending.by_ref().take(concurrency).map(|path| process_document(ctx, path)));
        while let Some(result) = processing.next().await {
            yield result.map(RunEvent::Processed);
            if let Some(path) = pending.next() {
                processing.push(process_document(ctx, path));
            }
        }

        yield Ok(RunEvent::Complete);
    })
}

/// Totals for a finished run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub discovered: u64,
    pub processed: usize,
    /// Documents that were rewritten, sorted.
    pub changed: Vec<PathBuf>,
    pub archived: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Documents that could not be processed.
    pub failures: Vec<Error>,
    pub complete: bool,
}

impl RunSummary {
    /// Fold one item of a [`run`] stream into the summary.
    ///
    /// Returns the error back if it ends the run; document failures are kept.
    pub fn record(&mut self, item: Result<RunEvent>) -> Result<()> {
        match item {
            Ok(RunEvent::Started) => {},
            Ok(RunEvent::DiscoveryComplete(count)) => self.discovered = count,
            Ok(RunEvent::Processed(report)) => {
                self.processed += 1;
                self.archived += report.archived();
                self.diagnostics.extend(report.diagnostics());
                if report.changed {
                    self.changed.push(report.path);
                }
            },
            Ok(RunEvent::Complete) => {
                self.changed.sort();
                self.diagnostics
                    .sort_by(|a, b| a.document.cmp(&b.document).then_with(|| a.label.cmp(&b.label)));
                self.complete = true;
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(error = ?e, "Document failed");
                self.failures.push(e);
            },
        }
        Ok(())
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Drive a [`run`] stream to completion and collect the results.
pub async fn summarize(events: impl Stream<Item = Result<RunEvent>>) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut events = std::pin::pin!(events);
    while let Some(item) = events.next().await {
        summary.record(item)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{AVAILABLE, context_with_store, found};
    use citekeeper_archive::transport::{Method, MockTransport};
    use citekeeper_storage::backend::MockStore;
    use futures::TryStreamExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_event_order() {
        let store = Arc::new(MockStore::with_documents([
            ("a.md", "A.[^1]\n\n[^1]: [x](http://example.com/a)\n"),
            ("b.md", "No footnotes.\n"),
            ("c.md", "C.[^1]\n\n[^1]: [x](http://example.com/c)\n"),
        ]));
        let transport = Arc::new(MockTransport::new().on(Method::Get, AVAILABLE, found("http://example.com/x")));
        let mut ctx = context_with_store(transport, &[], store);
        ctx.options.concurrency = 2;
        let events: Vec<RunEvent> = run(&ctx, None).try_collect().await.unwrap();
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], RunEvent::Started));
        assert!(matches!(events[1], RunEvent::DiscoveryComplete(3)));
        assert!(events[2..5].iter().all(|e| matches!(e, RunEvent::Processed(_))));
        assert!(matches!(events[5], RunEvent::Complete));
    }

    #[tokio::test]
    async fn test_summarize() {
        let store = Arc::new(MockStore::with_documents([
            ("wiki/b.md", "B.[^1]\n\n[^1]: [x](http://example.com/b)\n"),
            ("wiki/a.md", "A.[^1]\n\n[^1]: [x](http://example.com/a)\n"),
            ("other/c.md", "C.[^1]\n\n[^1]: [x](http://example.com/c)\n"),
        ]));
        let transport = Arc::new(MockTransport::new().on(Method::Get, AVAILABLE, found("http://example.com/x")));
        let ctx = context_with_store(transport, &[], store);
        let summary = summarize(run(&ctx, Some(Path::new("wiki")))).await.unwrap();
        assert!(summary.complete);
        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.archived, 2);
        assert_eq!(summary.changed, vec![PathBuf::from("wiki/a.md"), PathBuf::from("wiki/b.md")]);
        assert!(!summary.has_failures());
    }

    #[tokio::test]
    async fn test_invalid_prefix_is_fatal() {
        let ctx = context_with_store(Arc::new(MockTransport::new()), &[], Arc::new(MockStore::default()));
        let err = summarize(run(&ctx, Some(Path::new("../outside")))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Discovery));
    }
}
