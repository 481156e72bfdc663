//! Startup configuration.
//!
//! [`RawSettings`] carries the unvalidated strings exactly as they came from
//! the environment or command line; [`MirrorConfig::from_settings`] turns them
//! into an immutable config that is passed by reference to the scheduler and
//! the server. Nothing here reads the environment directly.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::Repository;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 1;
/// Longest accepted sync interval: one year.
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;
pub const DEFAULT_STORE_ROOT: &str = "./files";
pub const DEFAULT_REGISTRY_HOST: &str = "quay.io";
pub const DEFAULT_PULL_TOOL: &str = "oras";
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Unvalidated settings, one field per environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    pub repositories: Option<String>,
    pub interval_minutes: Option<String>,
    pub port: Option<String>,
    pub store_root: Option<PathBuf>,
    pub registry_host: Option<String>,
    pub pull_tool: Option<String>,
    pub pull_timeout_seconds: Option<u64>,
}

/// Validated, immutable runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub repositories: Vec<Repository>,
    pub interval_minutes: u64,
    pub port: Option<u16>,
    pub store_root: PathBuf,
    pub registry_host: String,
    pub pull_tool: String,
    pub pull_timeout: Option<Duration>,
    pub catalog_timeout: Duration,
    /// Non-fatal problems found while validating, for the caller to log once
    /// logging is up.
    pub warnings: Vec<String>,
}

impl MirrorConfig {
    pub fn from_settings(raw: RawSettings) -> Result<Self, ConfigError> {
        let list = raw
            .repositories
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingRepositories)?;
        let repositories = Repository::parse_list(list)?;

        let mut warnings = Vec::new();
        let interval_minutes = match raw.interval_minutes.as_deref().map(str::trim) {
            None | Some("") => {
                warnings.push(format!(
                    "SYNC_INTERVAL_MINUTES is empty, using default of {DEFAULT_INTERVAL_MINUTES} minute"
                ));
                DEFAULT_INTERVAL_MINUTES
            }
            Some(value) => match value.parse::<u64>() {
                Ok(minutes) if (1..=MAX_INTERVAL_MINUTES).contains(&minutes) => minutes,
                _ => {
                    warnings.push(format!(
                        "SYNC_INTERVAL_MINUTES value '{value}' is invalid, using default of {DEFAULT_INTERVAL_MINUTES} minute"
                    ));
                    DEFAULT_INTERVAL_MINUTES
                }
            },
        };

        let port = match raw.port.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(
                value
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(value.to_string()))?,
            ),
        };

        Ok(Self {
            repositories,
            interval_minutes,
            port,
            store_root: raw
                .store_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_ROOT)),
            registry_host: non_empty_or(raw.registry_host, DEFAULT_REGISTRY_HOST),
            pull_tool: non_empty_or(raw.pull_tool, DEFAULT_PULL_TOOL),
            pull_timeout: raw
                .pull_timeout_seconds
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            catalog_timeout: DEFAULT_CATALOG_TIMEOUT,
            warnings,
        })
    }

    /// Period between reconciliation passes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// The listen port, required when serving.
    pub fn require_port(&self) -> Result<u16, ConfigError> {
        self.port.ok_or(ConfigError::MissingPort)
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
