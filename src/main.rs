//! citekeeper: keeps citation footnotes backed by Wayback Machine snapshots.

mod output;

use crate::output::{Format, print_summary, write_github_output};
use citekeeper_archive::transport::{HttpTransport, TransportHandle};
use citekeeper_archive::{CaptureApi, HostDenylist, Reachability, WaybackClient};
use citekeeper_citations::{Context, Options, RunEvent, RunSummary, run};
use citekeeper_config::Config;
use citekeeper_storage::StoreHandle;
use citekeeper_storage::backend::{LocalStore, MarkdownOnlyStore, ReadOnlyStore};
use clap::Parser;
use derive_more::{Display, Error};
use exn::ResultExt;
use futures::StreamExt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("document root {} is not a directory", _0.display())]
    Root(#[error(not(source))] PathBuf),
    #[display("could not set up the HTTP client")]
    Transport,
    #[display("run aborted")]
    Run,
    #[display("could not write output")]
    Output,
}

/// Audit Markdown citation footnotes and back each one with a Wayback
/// Machine snapshot.
#[derive(Debug, Parser)]
#[command(name = "citekeeper", version, about)]
struct Cli {
    /// Directory containing the documents. Defaults to `GITHUB_WORKSPACE`
    /// when set, otherwise the current directory.
    root: Option<PathBuf>,
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "CITEKEEPER_CONFIG")]
    config: Option<PathBuf>,
    /// Only process documents beneath this path, relative to the root.
    #[arg(long)]
    prefix: Option<PathBuf>,
    /// Resolve everything but leave the documents untouched.
    #[arg(long)]
    dry_run: bool,
    /// Which save-page-now API to capture new snapshots with.
    #[arg(long)]
    capture_api: Option<CaptureApi>,
    /// Documents processed at the same time.
    #[arg(long)]
    concurrency: Option<NonZeroUsize>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// More logging; repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn default_log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }

    /// Command-line flags win over every configuration source.
    fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(capture_api) = self.capture_api {
            config.wayback.capture_api = capture_api;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = Some(concurrency.get());
        }
    }
}

fn document_root(config: &Config) -> Result<PathBuf> {
    let root = config
        .root
        .clone()
        .or_else(|| std::env::var_os("GITHUB_WORKSPACE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::canonicalize(&root).or_raise(|| ErrorKind::Root(root.clone()))
}

fn context(config: &Config, root: PathBuf) -> Result<Context> {
    let transport: TransportHandle = Arc::new(HttpTransport::new().or_raise(|| ErrorKind::Transport)?);
    let denylist = Arc::new(HostDenylist::with_hosts(&config.denylist));
    let client = Arc::new(WaybackClient::new(transport.clone(), config.wayback.settings(), denylist));
    let reachability = Reachability::new(transport, config.reachability_timeout());

    let local = LocalStore::new("workspace", &root).or_raise(|| ErrorKind::Root(root.clone()))?;
    tracing::info!(root = %local.root().display(), dry_run = config.dry_run, capture_api = %config.wayback.capture_api, "Starting");
    let mut store: StoreHandle = Arc::new(MarkdownOnlyStore::with_extensions(Arc::new(local), config.extensions.clone()));
    if config.dry_run {
        store = Arc::new(ReadOnlyStore::new(store));
    }

    let defaults = Options::default();
    let options = Options {
        archive_hosts: config.archive_hosts.clone(),
        concurrency: config.concurrency.unwrap_or(defaults.concurrency),
        footnote_timeout: config.footnote_timeout(),
    };
    Ok(Context::new(client, reachability, store).with_options(options))
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    let root = document_root(&config)?;
    let ctx = context(&config, root)?;

    let mut summary = RunSummary::default();
    let mut events = std::pin::pin!(run(&ctx, cli.prefix.as_deref()));
    while let Some(item) = events.next().await {
        match &item {
            Ok(RunEvent::DiscoveryComplete(count)) => tracing::info!(documents = count, "Processing documents"),
            Ok(RunEvent::Processed(report)) => {
                tracing::debug!(path = %report.path.display(), changed = report.changed, footnotes = report.footnotes.len(), "Document processed")
            },
            _ => {},
        }
        summary.record(item).or_raise(|| ErrorKind::Run)?;
    }

    print_summary(&mut std::io::stdout().lock(), &summary, cli.format, config.dry_run).or_raise(|| ErrorKind::Output)?;
    if let Some(path) = std::env::var_os("GITHUB_OUTPUT") {
        write_github_output(PathBuf::from(path).as_path(), !summary.changed.is_empty()).or_raise(|| ErrorKind::Output)?;
    }
    Ok(if summary.has_failures() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_log_level())))
        .with_writer(std::io::stderr)
        .init();

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(2)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["citekeeper"], "info")]
    #[case(&["citekeeper", "-v"], "debug")]
    #[case(&["citekeeper", "-vvv"], "trace")]
    #[case(&["citekeeper", "--quiet"], "warn")]
    fn test_log_level(#[case] args: &[&str], #[case] level: &str) {
        assert_eq!(Cli::parse_from(args).default_log_level(), level);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "citekeeper",
            "/srv/wiki",
            "--dry-run",
            "--capture-api",
            "redirect",
            "--concurrency",
            "3",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.root, Some(PathBuf::from("/srv/wiki")));
        assert!(config.dry_run);
        assert_eq!(config.wayback.capture_api, CaptureApi::Redirect);
        assert_eq!(config.concurrency, Some(3));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["citekeeper", "--concurrency", "0"]).is_err());
    }
}
