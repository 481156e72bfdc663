//! `tagmirror tags`: remote catalog of one repository next to the local store.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tagmirror_core::Tag;
use tagmirror_sync::{decide, FreshnessStore, HttpTagCatalog, MtimeFreshness, Outcome, TagCatalog};

use crate::settings::SettingsArgs;

/// Arguments for `tagmirror tags`.
#[derive(Args, Debug)]
pub struct TagsArgs {
    /// Repository as `org/repo`; need not be in the configured list.
    pub repository: String,
}

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "tag")]
    tag: String,
    #[tabled(rename = "last modified")]
    last_modified: String,
    #[tabled(rename = "local")]
    local: String,
}

impl TagsArgs {
    pub fn run(self, mut settings: SettingsArgs) -> Result<()> {
        settings.repositories = Some(self.repository.clone());
        let config = settings.config()?;
        let repository = config
            .repositories
            .first()
            .context("no repository given")?;

        let catalog = HttpTagCatalog::new(&config.registry_host, config.catalog_timeout);
        let tags = catalog
            .list_tags(repository)
            .with_context(|| format!("failed to list tags of {repository}"))?;

        let repo_dir = config.store_root.join(&repository.local_dir);
        let rows: Vec<TagRow> = tags
            .iter()
            .map(|tag| TagRow {
                tag: tag.name.0.clone(),
                last_modified: tag.last_modified.to_string(),
                local: local_state(&repo_dir, tag),
            })
            .collect();

        println!("{} tags in {}", rows.len(), repository);
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn local_state(repo_dir: &Path, tag: &Tag) -> String {
    if !tag.name.is_safe_path_component() {
        return "unsafe name".red().to_string();
    }
    match MtimeFreshness.recorded(&repo_dir.join(&tag.name.0)) {
        Ok(recorded) => match decide(recorded, &tag.last_modified) {
            Outcome::Skip => "current".green().to_string(),
            Outcome::Replace => "outdated".yellow().to_string(),
            Outcome::Create => "missing".bright_black().to_string(),
        },
        Err(err) => format!("{}: {err}", "unreadable".red()),
    }
}
