//! Shared pass entrypoint used by the CLI and the daemon scheduler.

use std::time::{Duration, Instant};

use tagmirror_core::Repository;

use crate::{Reconciler, RepositoryReport, SyncError, TagCounts};

/// One repository's share of a pass.
#[derive(Debug)]
pub struct RepositoryPass {
    pub repository: Repository,
    pub result: Result<RepositoryReport, SyncError>,
}

/// Outcome of reconciling every configured repository once.
#[derive(Debug)]
pub struct PassReport {
    pub repositories: Vec<RepositoryPass>,
    pub duration: Duration,
}

impl PassReport {
    /// Repositories whose reconciliation returned an error.
    pub fn failures(&self) -> impl Iterator<Item = (&Repository, &SyncError)> {
        self.repositories
            .iter()
            .filter_map(|pass| pass.result.as_ref().err().map(|e| (&pass.repository, e)))
    }

    /// Sum of tag counts over the repositories that completed.
    pub fn totals(&self) -> TagCounts {
        let mut totals = TagCounts::default();
        for report in self.repositories.iter().filter_map(|p| p.result.as_ref().ok()) {
            let counts = report.counts();
            totals.unchanged += counts.unchanged;
            totals.created += counts.created;
            totals.replaced += counts.replaced;
            totals.planned += counts.planned;
            totals.failed += counts.failed;
            totals.rejected += counts.rejected;
        }
        totals
    }
}

/// Reconcile `repositories` strictly in order.
///
/// A failing repository is logged and recorded in the report; it never stops
/// the repositories after it.
pub fn run_pass(reconciler: &Reconciler, repositories: &[Repository], dry_run: bool) -> PassReport {
    let started = Instant::now();
    let mut passes = Vec::with_capacity(repositories.len());

    for repository in repositories {
        let result = reconciler.reconcile(repository, dry_run);
        match &result {
            Ok(report) => {
                let counts = report.counts();
                tracing::info!(
                    "synced {repository}: {} created, {} replaced, {} unchanged, {} failed",
                    counts.created,
                    counts.replaced,
                    counts.unchanged,
                    counts.failed,
                );
            }
            Err(err) => tracing::error!("sync failed for {repository}: {err}"),
        }
        passes.push(RepositoryPass {
            repository: repository.clone(),
            result,
        });
    }

    PassReport {
        repositories: passes,
        duration: started.elapsed(),
    }
}
