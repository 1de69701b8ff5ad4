//! Extension-filtered document store decorator.
//!
//! Wraps another store and restricts every operation to Markdown documents.

use crate::backend::DocumentInfoStream;
use crate::error::{ErrorKind, Result};
use crate::{DocumentStore, StoreHandle};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;

/// Extensions recognised when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md"];

/// Markdown-filtered document store.
///
/// Listing silently drops documents with other extensions; reading or
/// writing them returns [`ErrorKind::FilteredPath`].
#[derive(Clone)]
pub struct MarkdownOnlyStore {
    inner: StoreHandle,
    extensions: Vec<String>,
}
impl MarkdownOnlyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self::with_extensions(inner, DEFAULT_EXTENSIONS.iter().copied())
    }

    pub fn with_extensions(inner: StoreHandle, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { inner, extensions }
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }
}

#[async_trait]
impl DocumentStore for MarkdownOnlyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> DocumentInfoStream<'a> {
        Box::pin(self.inner.list_stream(prefix).filter(|item| {
            std::future::ready(match item {
                Ok(info) => self.is_document(&info.path),
                Err(_) => true,
            })
        }))
    }

    async fn read(&self, path: &Path) -> Result<String> {
        if !self.is_document(path) {
            exn::bail!(ErrorKind::FilteredPath(path.to_path_buf()));
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, text: &str) -> Result<()> {
        if !self.is_document(path) {
            exn::bail!(ErrorKind::FilteredPath(path.to_path_buf()));
        }
        self.inner.write(path, text).await
    }
}
