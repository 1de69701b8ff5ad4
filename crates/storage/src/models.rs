//! Storage models.

use std::path::PathBuf;

/// Document metadata returned by stores when listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Relative path from storage root
    pub path: PathBuf,
}
impl DocumentInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}
