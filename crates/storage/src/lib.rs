//! Document storage for citekeeper.
//!
//! Documents are UTF-8 text files addressed by a path relative to the store
//! root. The [`DocumentStore`] trait is the only thing the citation workflow
//! knows about; decorators such as [`MarkdownOnlyStore`](backend::MarkdownOnlyStore)
//! and [`ReadOnlyStore`](backend::ReadOnlyStore) wrap any other store.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::DocumentStore;
pub use crate::models::DocumentInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn DocumentStore + Send + Sync>;
