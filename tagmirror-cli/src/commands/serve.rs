//! `tagmirror serve`: periodic sync plus the HTTP file server.

use anyhow::{Context, Result};
use clap::Args;

use tagmirror_daemon::start_blocking;

use crate::settings::SettingsArgs;

/// Arguments for `tagmirror serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {}

impl ServeArgs {
    pub fn run(self, settings: SettingsArgs) -> Result<()> {
        let config = settings.config()?;
        start_blocking(config, settings.log_format).context("tagmirror server exited with an error")
    }
}
