//! Read-only document store decorator, used for dry runs.

use async_trait::async_trait;
use std::path::Path;

use crate::backend::DocumentInfoStream;
use crate::{DocumentStore, StoreHandle, error::Result};

/// Read-only document store.
///
/// Wraps another store and silently drops writes, logging an
/// [`info event`](tracing::Event) for each one so that a dry run still shows
/// which documents would have changed.
#[derive(Clone)]
pub struct ReadOnlyStore {
    inner: StoreHandle,
}
impl ReadOnlyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> DocumentInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn read(&self, path: &Path) -> Result<String> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, text: &str) -> Result<()> {
        tracing::info!(path = %path.display(), bytes = text.len(), "Skipping write during dry run");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_writes_are_dropped() {
        let mock = Arc::new(MockStore::with_documents([("page.md", "original")]));
        let store = ReadOnlyStore::new(mock.clone());
        store.write(Path::new("page.md"), "changed").await.unwrap();
        assert_eq!(store.read(Path::new("page.md")).await.unwrap(), "original");
        assert_eq!(mock.read(Path::new("page.md")).await.unwrap(), "original");
    }
}
