//! In-memory document store for testing.

use super::DocumentInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::DocumentInfo;
use crate::path::validate as validate_path;
use crate::DocumentStore;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory document store for testing.
///
/// Documents are kept in a [`BTreeMap`] behind a [`RwLock`], so listing is
/// ordered by path and every method works on `&self`. Write counts are
/// tracked per path so tests can assert that a document was persisted
/// exactly once.
pub struct MockStore {
    name: String,
    documents: RwLock<BTreeMap<PathBuf, String>>,
    writes: RwLock<BTreeMap<PathBuf, usize>>,
}

impl MockStore {
    /// Create a mock store pre-populated with documents.
    ///
    /// Panics if any path fails validation: broken test setup should never
    /// produce a passing test.
    pub fn with_documents(documents: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<String>)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, text) in documents {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockStore::with_documents: invalid path {}", path.display());
            };
            map.insert(validated, text.into());
        }
        Self {
            name: "mock".to_string(),
            documents: RwLock::new(map),
            writes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of times `path` has been written since construction.
    pub async fn writes(&self, path: &Path) -> usize {
        self.writes.read().await.get(path).copied().unwrap_or(0)
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let documents: [(&str, &str); 0] = [];
        Self::with_documents(documents)
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> DocumentInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let entries: Vec<DocumentInfo> = {
                let guard = self.documents.read().await;
                guard
                    .keys()
                    .filter(|path| validated_prefix.as_ref().is_none_or(|pfx| path.starts_with(pfx)))
                    .map(|path| DocumentInfo::new(path.clone()))
                    .collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<String> {
        let path = validate_path(path)?;
        let guard = self.documents.read().await;
        let text = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(text.clone())
    }

    async fn write(&self, path: &Path, text: &str) -> Result<()> {
        let path = validate_path(path)?;
        *self.writes.write().await.entry(path.clone()).or_default() += 1;
        self.documents.write().await.insert(path, text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let store = MockStore::default();
        store.write(Path::new("page.md"), "hello").await.unwrap();
        assert_eq!(store.read(Path::new("page.md")).await.unwrap(), "hello");
        assert_eq!(store.writes(Path::new("page.md")).await, 1);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let store = MockStore::default();
        let err = store.read(Path::new("missing.md")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let store = MockStore::with_documents([("wiki/a.md", "a"), ("wiki/b.md", "b"), ("blog/c.md", "c")]);
        let files = store.list(Some(Path::new("wiki"))).await.unwrap();
        assert_eq!(files, vec![DocumentInfo::new("wiki/a.md"), DocumentInfo::new("wiki/b.md")]);
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_documents_panics_on_bad_path() {
        MockStore::with_documents([("../escape.md", "bad")]);
    }
}
