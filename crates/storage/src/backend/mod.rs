//! Document store trait and implementations.
//!
//! [`DocumentStore`] is a deliberately small interface: enumerate documents,
//! read one as text, write one back. Everything the citation workflow needs,
//! and nothing it doesn't.

mod local;
mod markdown;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalStore;
pub use self::markdown::MarkdownOnlyStore;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockStore;
pub use self::ro::ReadOnlyStore;
use crate::error::Result;
use crate::models::DocumentInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type DocumentInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<DocumentInfo>> + Send + 'a>>;

/// Unified interface for document stores.
///
/// All paths are relative to the store root and are validated with
/// [`validate_path`](crate::validate_path) by every implementation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use citekeeper_storage::{DocumentStore, error::Result};
///
/// async fn footnote_count(store: &dyn DocumentStore) -> Result<usize> {
///     let text = store.read(Path::new("wiki/Home.md")).await?;
///     Ok(text.lines().filter(|line| line.starts_with("[^")).count())
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the store, used for logging only.
    fn name(&self) -> &str;

    /// List all documents matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<DocumentInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream document metadata, optionally restricted to a path prefix.
    ///
    /// Prefixes are matched per path component, so `wiki/Sub` matches
    /// `wiki/Sub/page.md` but not `wiki/Subway.md`. Errors for individual
    /// entries are yielded without ending the stream.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> DocumentInfoStream<'a>;

    /// Read a document as UTF-8 text.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the document
    /// does not exist and [`InvalidEncoding`](crate::error::ErrorKind::InvalidEncoding)
    /// if it is not valid UTF-8.
    async fn read(&self, path: &Path) -> Result<String>;

    /// Replace the contents of a document.
    async fn write(&self, path: &Path, text: &str) -> Result<()>;
}
