use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::report::{DocumentReport, FootnoteReport, Outcome};
use crate::resolver::{Resolution, resolve};
use citekeeper_footnotes::{extract_footnotes, rewrite, strip_front_matter};
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// Resolve every footnote of the document at `path` and write the annotated
/// text back, once, if anything changed.
///
/// Footnotes are handled one after another against the same evolving text,
/// so each rewrite sees the previous ones. Problems with individual
/// footnotes end up in the report; only reading or writing the document
/// itself can fail.
#[instrument(skip(ctx, path), fields(path = %path.display()))]
pub async fn process_document(ctx: &Context, path: &Path) -> Result<DocumentReport> {
    let original = ctx.store.read(path).await.or_raise(|| ErrorKind::Read(path.to_path_buf()))?;
    let footnotes = extract_footnotes(strip_front_matter(&original));
    if footnotes.is_empty() {
        tracing::debug!("No footnotes found");
        return Ok(DocumentReport::unchanged(path));
    }

    let mut text = original.clone();
    let mut reports = Vec::with_capacity(footnotes.len());
    for footnote in footnotes {
        let Some(primary) = footnote.primary_url() else {
            tracing::warn!(label = %footnote.label, "Footnote has no links; skipping");
            reports.push(FootnoteReport {
                label: footnote.label,
                url: None,
                outcome: Outcome::NoLinks,
            });
            continue;
        };
        let outcome = match resolve(ctx, primary, &footnote.links).await {
            Resolution::AlreadyArchived => Outcome::AlreadyArchived,
            Resolution::Resolved(snapshot) => match rewrite(&text, &footnote.label, primary, &snapshot.url) {
                Some(rewritten) => {
                    tracing::debug!(label = %footnote.label, snapshot = %snapshot, "Footnote annotated");
                    text = rewritten;
                    Outcome::Archived(snapshot)
                },
                None => {
                    tracing::error!(label = %footnote.label, url = %primary, snapshot = %snapshot, "Footnote line not found in document");
                    Outcome::RewriteFailed(snapshot)
                },
            },
            Resolution::Unavailable(reason) => Outcome::Unavailable(reason),
            Resolution::Broken(status) => Outcome::Broken(status),
        };
        let url = Some(primary.to_string());
        reports.push(FootnoteReport {
            label: footnote.label,
            url,
            outcome,
        });
    }

    let changed = text != original;
    if changed {
        ctx.store.write(path, &text).await.or_raise(|| ErrorKind::Write(path.to_path_buf()))?;
        tracing::info!("Document updated");
    }
    Ok(DocumentReport {
        path: path.to_path_buf(),
        changed,
        footnotes: reports,
    })
}
