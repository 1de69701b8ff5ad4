//! Document path validation.
//!
//! Every path handed to a store is relative to the store root; nothing may
//! resolve outside of it.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a document path and rejects anything that escapes the root.
///
/// `.` components and repeated separators are dropped, `..` is resolved
/// against the components seen so far. Null bytes, Windows prefixes and
/// paths that normalize to nothing are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use citekeeper_storage::validate_path;
/// assert!(validate_path("guides/setup.md").is_ok());
/// assert!(validate_path("guides/../index.md").is_ok());
/// assert!(validate_path("../secrets.md").is_err());
/// assert!(validate_path("a\0b.md").is_err());
/// assert_eq!(
///     validate_path("./guides//old/../setup.md").unwrap(),
///     Path::new("guides/setup.md")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive Path::components() on Unix but truncate
                // in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}
