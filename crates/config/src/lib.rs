//! Configuration for citekeeper.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. `citekeeper.toml` in the platform configuration directory, if present.
//! 3. An explicitly requested file (TOML, YAML or JSON, by extension).
//! 4. `CITEKEEPER_*` environment variables, with `__` separating nested
//!    keys (`CITEKEEPER_WAYBACK__CAPTURE_API=redirect`).
//! 5. `ARCHIVE_ACCESS_KEY` and `ARCHIVE_SECRET_KEY`, the conventional names
//!    for Internet Archive S3-style keys.

pub mod error;

use crate::error::{ErrorKind, Result};
use citekeeper_archive::{CaptureApi, Credentials, Settings};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FILE_NAME: &str = "citekeeper.toml";
pub const ENV_PREFIX: &str = "CITEKEEPER_";

/// Hosts known to refuse captures, denylisted from the start of every run.
pub const DEFAULT_DENYLIST: &[&str] = &["www.fastcompany.com", "www.techpowerup.com", "discord.com"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing the documents. Falls back to `GITHUB_WORKSPACE`,
    /// then the current directory, when unset.
    pub root: Option<PathBuf>,
    /// File extensions treated as Markdown documents.
    pub extensions: Vec<String>,
    /// Documents processed concurrently; defaults to available parallelism.
    pub concurrency: Option<usize>,
    pub dry_run: bool,
    /// Deadline for resolving a single footnote.
    pub footnote_timeout_secs: Option<u64>,
    pub reachability_timeout_secs: u64,
    /// Hosts never captured during a run.
    pub denylist: Vec<String>,
    /// Hosts whose links count as an existing archive.
    pub archive_hosts: Vec<String>,
    pub wayback: WaybackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            extensions: vec!["md".to_string()],
            concurrency: None,
            dry_run: false,
            footnote_timeout_secs: None,
            reachability_timeout_secs: 10,
            denylist: DEFAULT_DENYLIST.iter().map(|host| host.to_string()).collect(),
            archive_hosts: vec!["web.archive.org".to_string()],
            wayback: WaybackConfig::default(),
        }
    }
}

/// The `[wayback]` table: how to talk to the Wayback Machine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaybackConfig {
    pub capture_api: CaptureApi,
    pub availability_endpoint: String,
    pub save_endpoint: String,
    pub web_base: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub request_timeout_secs: u64,
    pub capture_timeout_secs: u64,
    pub rate_limit_wait_secs: u64,
    pub connection_retry_secs: u64,
    pub session_retry_secs: u64,
    pub poll_interval_secs: u64,
    pub max_attempts: Option<u32>,
}

impl Default for WaybackConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            capture_api: settings.capture_api,
            availability_endpoint: settings.availability_endpoint,
            save_endpoint: settings.save_endpoint,
            web_base: settings.web_base,
            access_key: None,
            secret_key: None,
            request_timeout_secs: settings.request_timeout.as_secs(),
            capture_timeout_secs: settings.capture_timeout.as_secs(),
            rate_limit_wait_secs: settings.rate_limit_wait.as_secs(),
            connection_retry_secs: settings.connection_retry.as_secs(),
            session_retry_secs: settings.session_retry.as_secs(),
            poll_interval_secs: settings.poll_interval.as_secs(),
            max_attempts: settings.max_attempts,
        }
    }
}

impl std::fmt::Debug for WaybackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys are printed through `Credentials`, which redacts them.
        f.debug_struct("WaybackConfig")
            .field("capture_api", &self.capture_api)
            .field("availability_endpoint", &self.availability_endpoint)
            .field("save_endpoint", &self.save_endpoint)
            .field("web_base", &self.web_base)
            .field("credentials", &self.credentials())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("capture_timeout_secs", &self.capture_timeout_secs)
            .field("rate_limit_wait_secs", &self.rate_limit_wait_secs)
            .field("connection_retry_secs", &self.connection_retry_secs)
            .field("session_retry_secs", &self.session_retry_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl WaybackConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.access_key.clone(), self.secret_key.clone())
    }

    pub fn settings(&self) -> Settings {
        Settings {
            capture_api: self.capture_api,
            availability_endpoint: self.availability_endpoint.clone(),
            save_endpoint: self.save_endpoint.clone(),
            web_base: self.web_base.clone(),
            credentials: self.credentials(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            capture_timeout: Duration::from_secs(self.capture_timeout_secs),
            rate_limit_wait: Duration::from_secs(self.rate_limit_wait_secs),
            connection_retry: Duration::from_secs(self.connection_retry_secs),
            session_retry: Duration::from_secs(self.session_retry_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
        }
    }
}

/// `citekeeper.toml` in the platform configuration directory.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "citekeeper").map(|dirs| dirs.config_dir().join(FILE_NAME))
}

impl Config {
    /// Load and validate configuration from every source.
    ///
    /// `file` must exist if given; the platform configuration file is
    /// optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(user_config_path(), file)
    }

    pub(crate) fn load_from(user_file: Option<PathBuf>, file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(user_file, file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn figment(user_file: Option<PathBuf>, file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(user_file) = user_file {
            tracing::debug!(path = %user_file.display(), "Merging user configuration if present");
            figment = figment.merge(Toml::file(user_file));
        }
        if let Some(file) = file {
            if !file.is_file() {
                exn::bail!(ErrorKind::MissingFile(file.to_path_buf()));
            }
            tracing::debug!(path = %file.display(), "Merging configuration file");
            figment = match file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["ARCHIVE_ACCESS_KEY"]).map(|_| "wayback.access_key".into()))
            .merge(Env::raw().only(&["ARCHIVE_SECRET_KEY"]).map(|_| "wayback.secret_key".into())))
    }

    fn validate(&self) -> Result<()> {
        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("at least one document extension is required".to_string()));
        }
        if self.concurrency == Some(0) {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.wayback.max_attempts == Some(0) {
            exn::bail!(ErrorKind::Invalid("wayback.max_attempts must be at least 1".to_string()));
        }
        if self.wayback.poll_interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid("wayback.poll_interval_secs must be at least 1".to_string()));
        }
        for (name, endpoint) in [
            ("wayback.availability_endpoint", &self.wayback.availability_endpoint),
            ("wayback.save_endpoint", &self.wayback.save_endpoint),
            ("wayback.web_base", &self.wayback.web_base),
        ] {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                exn::bail!(ErrorKind::Invalid(format!("{name} must be an http(s) URL, got `{endpoint}`")));
            }
        }
        Ok(())
    }

    pub fn footnote_timeout(&self) -> Option<Duration> {
        self.footnote_timeout_secs.map(Duration::from_secs)
    }

    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_secs(self.reachability_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load_from(None, None).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.denylist.len(), 3);
            assert_eq!(config.wayback.settings().capture_timeout, Duration::from_secs(600));
            Ok(())
        });
    }

    #[rstest]
    #[case("citekeeper.toml", "concurrency = 3\n[wayback]\ncapture_api = \"redirect\"\n")]
    #[case("citekeeper.yaml", "concurrency: 3\nwayback:\n  capture_api: redirect\n")]
    #[case("citekeeper.json", r#"{"concurrency": 3, "wayback": {"capture_api": "redirect"}}"#)]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load_from(None, Some(Path::new(name))).unwrap();
            assert_eq!(config.concurrency, Some(3));
            assert_eq!(config.wayback.capture_api, CaptureApi::Redirect);
            assert_eq!(config.wayback.poll_interval_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn test_precedence() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("user.toml", "dry_run = true\nconcurrency = 2\n")?;
            jail.create_file("explicit.toml", "concurrency = 8\n[wayback]\naccess_key = \"from-file\"\n")?;
            jail.set_env("CITEKEEPER_WAYBACK__MAX_ATTEMPTS", "4");
            jail.set_env("ARCHIVE_ACCESS_KEY", "from-env");
            jail.set_env("ARCHIVE_SECRET_KEY", "secret");
            let config = Config::load_from(Some(PathBuf::from("user.toml")), Some(Path::new("explicit.toml"))).unwrap();
            assert!(config.dry_run);
            assert_eq!(config.concurrency, Some(8));
            assert_eq!(config.wayback.max_attempts, Some(4));
            let credentials = config.wayback.credentials();
            assert_eq!(credentials.access_key.as_deref(), Some("from-env"));
            assert!(credentials.is_complete());
            Ok(())
        });
    }

    #[test]
    fn test_missing_user_file_is_fine_but_explicit_file_is_not() {
        Jail::expect_with(|_jail| {
            assert!(Config::load_from(Some(PathBuf::from("absent.toml")), None).is_ok());
            let err = Config::load_from(None, Some(Path::new("absent.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::MissingFile(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case("concurrency = 0\n")]
    #[case("extensions = []\n")]
    #[case("[wayback]\nmax_attempts = 0\n")]
    #[case("[wayback]\nsave_endpoint = \"ftp://example.com\"\n")]
    fn test_validation(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", contents)?;
            let err = Config::load_from(None, Some(Path::new("bad.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_capture_api_fails_to_load() {
        Jail::expect_with(|jail| {
            jail.set_env("CITEKEEPER_WAYBACK__CAPTURE_API", "carrier-pigeon");
            let err = Config::load_from(None, None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = WaybackConfig {
            secret_key: Some("hunter2".to_string()),
            ..WaybackConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
