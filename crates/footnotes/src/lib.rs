//! Markdown footnote handling for citekeeper.
//!
//! Extraction parses the document with `comrak` (footnotes extension on) and
//! reports every footnote definition with its `http`/`https` links. Rewriting
//! is deliberately *not* done through the AST: rendering Markdown back out
//! would reformat the whole document, so [`rewrite`] patches a single line of
//! the raw text and leaves every other byte alone.

mod consts;
mod extract;
mod front_matter;
mod rewrite;

pub use crate::extract::{Footnote, extract_footnotes, is_archive_link};
pub use crate::front_matter::strip_front_matter;
pub use crate::rewrite::{annotation, rewrite};

pub const DEFAULT_ARCHIVE_HOST: &str = "web.archive.org";
