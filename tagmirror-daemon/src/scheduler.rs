//! Periodic sync passes.
//!
//! One pass runs immediately, then one per `interval` until the shutdown
//! channel fires. Passes run on the blocking pool and never overlap: a pass
//! that outlasts the interval delays the next tick rather than stacking up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use tagmirror_core::Repository;
use tagmirror_sync::{run_pass, Reconciler};

use crate::error::DaemonError;

/// Drive `pass` on a fixed interval until shutdown.
///
/// A panicking pass is logged and the schedule continues.
pub async fn run<F>(
    interval: Duration,
    pass: F,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError>
where
    F: Fn() + Send + Sync + 'static,
{
    let pass = Arc::new(pass);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let pass = pass.clone();
                if let Err(err) = tokio::task::spawn_blocking(move || pass()).await {
                    tracing::error!(error = %err, "sync pass aborted");
                }
            }
        }
    }

    tracing::info!("sync scheduler stopped");
    Ok(())
}

/// One full pass over `repositories`, logged as a single summary line.
pub fn sync_pass(reconciler: &Reconciler, repositories: &[Repository]) {
    let report = run_pass(reconciler, repositories, false);
    let totals = report.totals();
    let failed_repos = report.failures().count();
    tracing::info!(
        repositories = repositories.len(),
        failed_repositories = failed_repos,
        created = totals.created,
        replaced = totals.replaced,
        unchanged = totals.unchanged,
        failed_tags = totals.failed,
        duration_ms = report.duration.as_millis() as u64,
        "sync pass finished"
    );
}
