//! `tagmirror sync`: run one reconciliation pass and report per repository.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use tagmirror_daemon::init_tracing;
use tagmirror_sync::{run_pass, Reconciler, RepositoryReport, TagResult};

use crate::settings::SettingsArgs;

/// Arguments for `tagmirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show what would be pulled or replaced without touching the store.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self, settings: SettingsArgs) -> Result<()> {
        init_tracing(settings.log_format);
        let config = settings.config()?;
        for warning in &config.warnings {
            eprintln!("{} {warning}", "warning:".yellow().bold());
        }

        let reconciler = Reconciler::from_config(&config);
        let report = run_pass(&reconciler, &config.repositories, self.dry_run);

        for pass in &report.repositories {
            match &pass.result {
                Ok(repo_report) => print_results(repo_report, self.dry_run),
                Err(err) => println!("{} {}: {err}", "✗".red().bold(), pass.repository),
            }
        }

        let failed = report.failures().count();
        if failed > 0 {
            bail!(
                "{failed} of {} repositories failed to sync",
                report.repositories.len()
            );
        }
        Ok(())
    }
}

fn print_results(report: &RepositoryReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let counts = report.counts();

    if counts.written() == 0 && counts.planned == 0 && counts.failed == 0 {
        println!(
            "{prefix}{} '{}': up to date ({} tags)",
            "✓".green(),
            report.repository,
            counts.unchanged
        );
        return;
    }

    println!(
        "{prefix}{} '{}' synced ({} created, {} replaced, {} unchanged, {} failed)",
        "✓".green(),
        report.repository,
        counts.created,
        counts.replaced,
        counts.unchanged,
        counts.failed,
    );

    for result in &report.results {
        match result {
            TagResult::Created { path, .. } => println!("  +  {}", path.display()),
            TagResult::Replaced { path, .. } => println!("  ✎  {}", path.display()),
            TagResult::WouldCreate { path, .. } => println!("  ~+ {}", path.display()),
            TagResult::WouldReplace { path, .. } => println!("  ~✎ {}", path.display()),
            TagResult::Failed { path, reason, .. } => {
                println!("  {}  {}: {reason}", "!".red(), path.display())
            }
            TagResult::Rejected { tag } => println!("  {}  skipped unsafe tag {:?}", "!".yellow(), tag.0),
            TagResult::Unchanged { tag } => println!("  ·  {tag}"),
        }
    }
}
