//! Settings shared by every subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tagmirror_core::{MirrorConfig, RawSettings};
use tagmirror_daemon::LogFormat;

/// One flag per setting; each falls back to its environment variable.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Comma-separated `org/repo` list to mirror.
    #[arg(long = "repos", env = "QUAY_ORG_REPOS", global = true)]
    pub repositories: Option<String>,

    /// Minutes between sync passes.
    #[arg(long = "interval", env = "SYNC_INTERVAL_MINUTES", global = true)]
    pub interval_minutes: Option<String>,

    /// HTTP listen port (serve only).
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<String>,

    /// Directory the mirrored tags are stored under.
    #[arg(long, env = "STORE_ROOT", global = true)]
    pub store_root: Option<PathBuf>,

    /// Registry host for the tag catalog and pulls.
    #[arg(long, env = "REGISTRY_HOST", global = true)]
    pub registry_host: Option<String>,

    /// oras-compatible pull tool.
    #[arg(long, env = "PULL_TOOL", global = true)]
    pub pull_tool: Option<String>,

    /// Kill a pull that runs longer than this many seconds.
    #[arg(long = "pull-timeout", env = "PULL_TIMEOUT_SECONDS", global = true)]
    pub pull_timeout_seconds: Option<u64>,

    /// Log output format: text or json.
    #[arg(long, env = "LOG_FORMAT", global = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl SettingsArgs {
    pub fn raw(&self) -> RawSettings {
        RawSettings {
            repositories: self.repositories.clone(),
            interval_minutes: self.interval_minutes.clone(),
            port: self.port.clone(),
            store_root: self.store_root.clone(),
            registry_host: self.registry_host.clone(),
            pull_tool: self.pull_tool.clone(),
            pull_timeout_seconds: self.pull_timeout_seconds,
        }
    }

    pub fn config(&self) -> Result<MirrorConfig> {
        MirrorConfig::from_settings(self.raw()).context("invalid configuration")
    }
}
