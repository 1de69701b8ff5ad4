use crate::resolver::Unavailable;
use citekeeper_archive::Snapshot;
use derive_more::Display;
use std::path::{Path, PathBuf};

/// What happened to one footnote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already cited an archive; left alone.
    AlreadyArchived,
    /// An archive link was appended to the footnote.
    Archived(Snapshot),
    /// The footnote has no web links to check.
    NoLinks,
    Unavailable(Unavailable),
    /// Unreachable and never archived.
    Broken(Option<u16>),
    /// A snapshot was found but the footnote's line could not be located in
    /// the raw text, so nothing was written.
    RewriteFailed(Snapshot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteReport {
    pub label: String,
    /// The primary URL, if the footnote has one.
    pub url: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Level {
    #[display("notice")]
    Notice,
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

/// A footnote that needs a human's attention.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{level}: {}: [^{label}] {message}", document.display())]
pub struct Diagnostic {
    pub document: PathBuf,
    pub label: String,
    pub url: Option<String>,
    pub status: Option<u16>,
    pub level: Level,
    pub message: String,
}

/// Result of processing a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub path: PathBuf,
    /// Whether the document was (or, in a dry run, would have been) rewritten.
    pub changed: bool,
    pub footnotes: Vec<FootnoteReport>,
}

impl DocumentReport {
    pub(crate) fn unchanged(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            changed: false,
            footnotes: Vec::new(),
        }
    }

    /// Number of footnotes that gained an archive link.
    pub fn archived(&self) -> usize {
        self.footnotes.iter().filter(|f| matches!(f.outcome, Outcome::Archived(_))).count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.footnotes.iter().filter_map(|footnote| self.diagnostic(footnote)).collect()
    }

    fn diagnostic(&self, footnote: &FootnoteReport) -> Option<Diagnostic> {
        let url = footnote.url.as_deref().unwrap_or_default();
        let (level, status, message) = match &footnote.outcome {
            Outcome::AlreadyArchived | Outcome::Archived(_) => return None,
            Outcome::NoLinks => (Level::Warning, None, "Footnote has no links; skipped".to_string()),
            Outcome::Unavailable(Unavailable::Denylisted(host)) => (
                Level::Notice,
                None,
                format!("No archive is available for {url} and {host} is denylisted for this run"),
            ),
            Outcome::Unavailable(reason) => (
                Level::Warning,
                None,
                format!("No archive is available for {url} and none could be created: {reason}"),
            ),
            Outcome::Broken(status) => {
                let detail = status.map(|s| format!(" (HTTP status {s})")).unwrap_or_default();
                (
                    Level::Warning,
                    *status,
                    format!("Broken link to {url}{detail}; no archived copy could be located"),
                )
            },
            Outcome::RewriteFailed(snapshot) => (
                Level::Error,
                None,
                format!("Failed to write {snapshot} for primary link {url}: footnote line not found"),
            ),
        };
        Some(Diagnostic {
            document: self.path.clone(),
            label: footnote.label.clone(),
            url: footnote.url.clone(),
            status,
            level,
            message,
        })
    }
}
