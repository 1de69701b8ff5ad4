//! Rendering a run summary for humans and for GitHub Actions.

use citekeeper_citations::{Diagnostic, Level, RunSummary};
use clap::ValueEnum;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One line per diagnostic.
    Text,
    /// GitHub Actions workflow commands, shown as annotations on the run.
    Github,
}

/// Escaping rules for workflow command data.
fn escape_data(value: &str) -> String {
    value.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Escaping rules for workflow command properties.
fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

fn github_command(diagnostic: &Diagnostic) -> String {
    let command = match diagnostic.level {
        Level::Notice => "notice",
        Level::Warning => "warning",
        Level::Error => "error",
    };
    format!(
        "::{command} file={},title={}::{}",
        escape_property(&diagnostic.document.to_string_lossy()),
        escape_property(&format!("Citation [^{}]", diagnostic.label)),
        escape_data(&diagnostic.message)
    )
}

pub fn print_summary(out: &mut impl Write, summary: &RunSummary, format: Format, dry_run: bool) -> io::Result<()> {
    for diagnostic in &summary.diagnostics {
        match format {
            Format::Text => writeln!(out, "{diagnostic}")?,
            Format::Github => writeln!(out, "{}", github_command(diagnostic))?,
        }
    }
    for failure in &summary.failures {
        match format {
            Format::Text => writeln!(out, "error: {failure}")?,
            Format::Github => writeln!(out, "::error::{}", escape_data(&failure.to_string()))?,
        }
    }
    let verb = if dry_run { "would change" } else { "changed" };
    writeln!(
        out,
        "{} documents processed, {} footnotes archived, {verb} {} documents, {} diagnostics, {} failures",
        summary.processed,
        summary.archived,
        summary.changed.len(),
        summary.diagnostics.len(),
        summary.failures.len()
    )?;
    for path in &summary.changed {
        writeln!(out, "  {verb}: {}", path.display())?;
    }
    Ok(())
}

/// Append `changed=<bool>` to the step output file GitHub Actions provides.
pub fn write_github_output(path: &Path, changed: bool) -> io::Result<()> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "changed={changed}")
}
