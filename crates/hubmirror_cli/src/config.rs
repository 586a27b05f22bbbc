//! Configuration file support for hubmirror.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables prefixed with `HUBMIRROR_`, sections separated by a
//!    double underscore (e.g. `HUBMIRROR_SYNC__BULK_PACING_MS`)
//! 3. Config file (~/.config/hubmirror/config.toml or ./hubmirror.toml)
//! 4. Legacy variables `DATABASE_URL`, `GITHUB_TOKEN`, `COMMIT_START_DATE` and
//!    `COMMIT_END_DATE`, which only fill values left unset above
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/hubmirror/hubmirror.db?mode=rwc"
//!
//! [github]
//! token = "ghp_..."
//! requests_per_second = 10
//!
//! [sync]
//! commit_since = "2024-01-01"
//! bulk_pacing_ms = 180000
//! rescan_pacing_ms = 90000
//! rescan_cooldown_secs = 259200
//! shutdown_timeout_secs = 5
//!
//! [server]
//! bind = "0.0.0.0:8080"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use hubmirror::discovery::DiscoveryOptions;
use hubmirror::tasks::TaskOptions;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid date for {key}: '{value}' (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidDate { key: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub api_url: String,
    /// Proactive pacing in front of the quota gate. Unset means none.
    pub requests_per_second: Option<u32>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: hubmirror::github::DEFAULT_API_URL.to_string(),
            requests_per_second: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lower bound of the commit window.
    pub commit_since: Option<String>,
    /// Upper bound of the commit window.
    pub commit_until: Option<String>,
    pub bulk_pacing_ms: u64,
    pub rescan_pacing_ms: u64,
    pub rescan_cooldown_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let discovery = DiscoveryOptions::default();
        let tasks = TaskOptions::default();
        Self {
            commit_since: None,
            commit_until: None,
            bulk_pacing_ms: discovery.bulk_pacing.as_millis() as u64,
            rescan_pacing_ms: discovery.rescan_pacing.as_millis() as u64,
            rescan_cooldown_secs: tasks.rescan_cooldown.as_secs(),
            shutdown_timeout_secs: tasks.shutdown_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Accept a full RFC 3339 timestamp or a bare date (midnight UTC).
fn parse_commit_date(key: &'static str, value: &str) -> Result<DateTime<Utc>, ConfigError> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ConfigError::InvalidDate {
            key,
            value: value.to_string(),
        })
}

fn parse_window_bound(
    key: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ConfigError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_commit_date(key, v).map(Some),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "hubmirror") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("hubmirror.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./hubmirror.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // HUBMIRROR_SYNC__BULK_PACING_MS -> sync.bulk_pacing_ms
        builder = builder.add_source(
            Environment::with_prefix("HUBMIRROR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        };
        config.apply_legacy_env(|key| std::env::var(key).ok());
        config
    }

    /// Fill unset values from the unprefixed variables older deployments use.
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.database.url.is_none() {
            self.database.url = lookup("DATABASE_URL");
        }
        if self.github.token.is_none() {
            self.github.token = lookup("GITHUB_TOKEN");
        }
        if self.sync.commit_since.is_none() {
            self.sync.commit_since = lookup("COMMIT_START_DATE");
        }
        if self.sync.commit_until.is_none() {
            self.sync.commit_until = lookup("COMMIT_END_DATE");
        }
    }

    /// Configured database URL, or a SQLite file in the state directory.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("hubmirror.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().filter(|t| !t.is_empty())
    }

    /// Commit window and pacing for discovery.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDate`] for an unparseable window bound.
    pub fn discovery_options(&self) -> Result<DiscoveryOptions, ConfigError> {
        Ok(DiscoveryOptions {
            commit_since: parse_window_bound(
                "sync.commit_since",
                self.sync.commit_since.as_deref(),
            )?,
            commit_until: parse_window_bound(
                "sync.commit_until",
                self.sync.commit_until.as_deref(),
            )?,
            bulk_pacing: Duration::from_millis(self.sync.bulk_pacing_ms),
            rescan_pacing: Duration::from_millis(self.sync.rescan_pacing_ms),
        })
    }

    pub fn task_options(&self) -> TaskOptions {
        TaskOptions {
            rescan_cooldown: Duration::from_secs(self.sync.rescan_cooldown_secs),
            shutdown_timeout: Duration::from_secs(self.sync.shutdown_timeout_secs),
        }
    }

    /// On Linux, `$XDG_STATE_HOME/hubmirror` or `~/.local/state/hubmirror`.
    /// Elsewhere the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hubmirror").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
