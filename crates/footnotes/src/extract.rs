use crate::consts::FOOTNOTE_DEFINITION_REGEX;
use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, parse_document};
use std::borrow::Cow;
use tracing::instrument;
use url::Url;

/// One footnote definition and the web links in its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    pub label: String,
    /// `http`/`https` link targets in document order.
    pub links: Vec<String>,
}

impl Footnote {
    /// The cited page: the first link in the footnote.
    pub fn primary_url(&self) -> Option<&str> {
        self.links.first().map(String::as_str)
    }

    /// Whether any link already points at one of `archive_hosts`.
    pub fn is_archived<S: AsRef<str>>(&self, archive_hosts: &[S]) -> bool {
        self.links.iter().any(|link| is_archive_link(link, archive_hosts))
    }
}

/// Whether `link` points at one of `archive_hosts`.
pub fn is_archive_link<S: AsRef<str>>(link: &str, archive_hosts: &[S]) -> bool {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| archive_hosts.iter().any(|archive| archive.as_ref().eq_ignore_ascii_case(&host)))
}

fn is_web_link(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn links_within<'a>(node: &'a AstNode<'a>) -> Vec<String> {
    node.descendants()
        .filter_map(|child| match &child.data.borrow().value {
            NodeValue::Link(link) if is_web_link(&link.url) => Some(link.url.clone()),
            _ => None,
        })
        .collect()
}

/// Appends a paragraph referencing every footnote definition.
///
/// comrak drops definitions that nothing references; every definition in
/// the document still cites something and has to be checked.
fn with_references(text: &str) -> Cow<'_, str> {
    let references: Vec<String> = FOOTNOTE_DEFINITION_REGEX
        .captures_iter(text)
        .map(|captures| format!("[^{}]", &captures[1]))
        .collect();
    if references.is_empty() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(format!("{text}\n\n{}\n", references.join(" ")))
}

/// Parse `text` as Markdown and return its footnote definitions, in order of
/// first reference. Definitions that nothing references follow the rest.
///
/// Front matter should be stripped first (see
/// [`strip_front_matter`](crate::strip_front_matter)).
#[instrument(level = "trace", skip(text), fields(text_size = text.len()))]
pub fn extract_footnotes(text: &str) -> Vec<Footnote> {
    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.footnotes = true;
    let root = parse_document(&arena, &with_references(text), &options);

    root.descendants()
        .filter_map(|node| {
            let label = match &node.data.borrow().value {
                NodeValue::FootnoteDefinition(definition) => definition.name.clone(),
                _ => return None,
            };
            Some(Footnote {
                label,
                links: links_within(node),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ARCHIVE_HOSTS: &[&str] = &["web.archive.org"];

    #[test]
    fn test_extracts_labels_and_links() {
        let text = "\
Claim one.[^1] Claim two.[^note]

[^1]: [Example](https://example.com/a) and <http://example.org/b>.
[^note]: See [the docs](https://docs.example.com) or [mail](mailto:someone@example.com).
";
        let footnotes = extract_footnotes(text);
        assert_eq!(
            footnotes,
            vec![
                Footnote {
                    label: "1".to_string(),
                    links: vec!["https://example.com/a".to_string(), "http://example.org/b".to_string()],
                },
                Footnote {
                    label: "note".to_string(),
                    links: vec!["https://docs.example.com".to_string()],
                },
            ]
        );
        assert_eq!(footnotes[0].primary_url(), Some("https://example.com/a"));
    }

    #[test]
    fn test_footnote_without_links() {
        let footnotes = extract_footnotes("Text.[^1]\n\n[^1]: Personal communication.\n");
        assert_eq!(footnotes.len(), 1);
        assert!(footnotes[0].links.is_empty());
        assert_eq!(footnotes[0].primary_url(), None);
    }

    #[test]
    fn test_no_footnotes() {
        assert!(extract_footnotes("# Title\n\nJust [a link](https://example.com).\n").is_empty());
    }

    #[test]
    fn test_unreferenced_definitions_are_reported() {
        let footnotes = extract_footnotes("Body text.\n\n[^1]: [x](http://example.com)\n");
        assert_eq!(footnotes.len(), 1);
        assert_eq!(footnotes[0].label, "1");
        assert_eq!(footnotes[0].primary_url(), Some("http://example.com"));
    }

    #[test]
    fn test_referenced_definitions_keep_their_order() {
        let text = "B.[^b] A.[^a]\n\n[^a]: <https://a.example>\n[^orphan]: <https://orphan.example>\n[^b]: <https://b.example>\n";
        let labels: Vec<_> = extract_footnotes(text).into_iter().map(|footnote| footnote.label).collect();
        assert_eq!(labels, ["b", "a", "orphan"]);
    }

    #[test]
    fn test_links_outside_footnotes_are_ignored() {
        let text = "[Body link](https://body.example).[^1]\n\n[^1]: <https://cited.example>\n";
        let footnotes = extract_footnotes(text);
        assert_eq!(footnotes[0].links, vec!["https://cited.example".to_string()]);
    }

    #[rstest]
    #[case("[^1]: [A](https://example.com) [Archived](https://web.archive.org/web/2024/https://example.com) ", true)]
    #[case("[^1]: [A](https://example.com) [Archived](http://WEB.archive.org/web/2024/https://example.com)", true)]
    #[case("[^1]: [A](https://example.com/web.archive.org)", false)]
    #[case("[^1]: [A](https://example.com)", false)]
    fn test_is_archived(#[case] definition: &str, #[case] archived: bool) {
        let text = format!("Claim.[^1]\n\n{definition}\n");
        let footnotes = extract_footnotes(&text);
        assert_eq!(footnotes[0].is_archived(ARCHIVE_HOSTS), archived);
    }
}
