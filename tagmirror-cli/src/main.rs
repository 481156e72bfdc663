//! tagmirror: mirror registry tags to disk and serve them over HTTP.
//!
//! # Usage
//!
//! ```text
//! tagmirror serve
//! tagmirror sync [--dry-run]
//! tagmirror status [--json]
//! tagmirror tags <org/repo>
//! ```
//!
//! Every setting can come from a flag or its environment variable, e.g.
//! `--repos` / `QUAY_ORG_REPOS`.

mod commands;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{serve::ServeArgs, status::StatusArgs, sync::SyncArgs, tags::TagsArgs};
use settings::SettingsArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tagmirror",
    version,
    about = "Mirror container registry tags into a local tree and serve it over HTTP",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the periodic sync and the HTTP file server until interrupted.
    Serve(ServeArgs),

    /// Run a single sync pass over every configured repository.
    Sync(SyncArgs),

    /// Show the tags currently mirrored on disk.
    Status(StatusArgs),

    /// List a repository's remote tags and how they compare to the local copy.
    Tags(TagsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(cli.settings),
        Commands::Sync(args) => args.run(cli.settings),
        Commands::Status(args) => args.run(cli.settings),
        Commands::Tags(args) => args.run(cli.settings),
    }
}
