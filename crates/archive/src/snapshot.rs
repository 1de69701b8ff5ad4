use std::fmt;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Wayback Machine timestamps: `YYYYMMDDhhmmss`.
const TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day][hour][minute][second]");
const TIMESTAMP_LEN: usize = 14;

/// A permanent, retrievable capture of a web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub url: String,
    /// When the page was captured, if the snapshot URL says so.
    pub captured_at: Option<PrimitiveDateTime>,
}
impl Snapshot {
    /// Wraps a snapshot URL, reading the capture time from its
    /// `/web/<timestamp>/` segment when present.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let captured_at = url
            .split_once("/web/")
            .and_then(|(_, rest)| rest.get(..TIMESTAMP_LEN))
            .and_then(|stamp| PrimitiveDateTime::parse(stamp, TIMESTAMP).ok());
        Self { url, captured_at }
    }

    /// Builds the canonical snapshot URL for a capture of `original`.
    pub fn from_capture(web_base: &str, timestamp: &str, original: &str) -> Self {
        Self::new(format!("{}/web/{}/{}", web_base.trim_end_matches('/'), timestamp, original))
    }
}
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
