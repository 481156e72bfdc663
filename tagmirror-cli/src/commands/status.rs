//! `tagmirror status`: what is mirrored on disk right now.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tagmirror_core::MirrorConfig;
use tagmirror_sync::{format_age, list_records, LocalRecord, MtimeFreshness};

use crate::settings::SettingsArgs;

/// Arguments for `tagmirror status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, settings: SettingsArgs) -> Result<()> {
        let config = settings.config()?;
        let records = list_records(&config.store_root, &config.repositories, &MtimeFreshness)
            .with_context(|| format!("failed to read store at {}", config.store_root.display()))?;

        if self.json {
            return print_json(&records);
        }
        print_table(&config, records);
        Ok(())
    }
}

#[derive(Serialize)]
struct RecordJson {
    repository: String,
    tag: String,
    path: String,
    last_modified: Option<String>,
    pending: bool,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "tag")]
    tag: String,
    #[tabled(rename = "last modified")]
    last_modified: String,
    #[tabled(rename = "age")]
    age: String,
}

fn print_json(records: &[LocalRecord]) -> Result<()> {
    let payload: Vec<RecordJson> = records
        .iter()
        .map(|record| RecordJson {
            repository: record.repository.0.clone(),
            tag: record.tag.0.clone(),
            path: record.path.display().to_string(),
            last_modified: (!record.is_pending()).then(|| record.freshness.to_rfc2822()),
            pending: record.is_pending(),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(config: &MirrorConfig, records: Vec<LocalRecord>) {
    println!(
        "tagmirror v{} | {} repositories | {} tags | store {}",
        env!("CARGO_PKG_VERSION"),
        config.repositories.len(),
        records.len(),
        config.store_root.display(),
    );

    if records.is_empty() {
        println!("Nothing mirrored yet. Run 'tagmirror sync' to pull.");
        return;
    }

    let pending = records.iter().filter(|r| r.is_pending()).count();
    let rows: Vec<StatusTableRow> = records
        .into_iter()
        .map(|record| {
            let (last_modified, age) = if record.is_pending() {
                ("PENDING".yellow().bold().to_string(), "-".to_string())
            } else {
                (
                    record.freshness.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                    format_age(record.freshness),
                )
            };
            StatusTableRow {
                repository: record.repository.0,
                tag: record.tag.0,
                last_modified,
                age,
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!(
            "{pending} tag(s) have an interrupted pull; the next sync pulls them again."
        );
    }
}
