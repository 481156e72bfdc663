//! Per-repository reconciliation.
//!
//! ## `reconcile`: per-tag protocol
//!
//! 1. Probe `<store>/<repo>/<tag>` through the freshness store.
//! 2. Decide: absent → create; pending or recorded < remote → replace;
//!    else skip.
//! 3. Replace only: remove the old tree. A failed removal skips the tag.
//! 4. Create the directory (owner-only) and mark it pending.
//! 5. Pull. A failed pull aborts the rest of the repository.
//! 6. Record the tag's `last_modified` as the directory's freshness.
//!
//! The pending mark in step 4 survives a half-finished pull, and `decide`
//! always replaces a pending record, so the next pass pulls it again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use tagmirror_core::{ArtifactReference, MirrorConfig, RemoteName, Repository, TagName, TagTimestamp};

use crate::catalog::{HttpTagCatalog, TagCatalog};
use crate::error::{io_err, SyncError};
use crate::fetcher::{ArtifactFetcher, OrasFetcher};
use crate::freshness::{is_pending, FreshnessStore, MtimeFreshness};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What a tag needs, given the local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Local record is as new as the remote tag, or newer.
    Skip,
    /// No local record.
    Create,
    /// Local record is strictly older than the remote tag, or a pull into
    /// it never finished.
    Replace,
}

/// Pure freshness comparison. Never downgrades: an equal or older remote
/// timestamp, or one that failed to parse, leaves a completed record alone.
/// A pending record is replaced whatever the remote says.
pub fn decide(recorded: Option<DateTime<Utc>>, remote: &TagTimestamp) -> Outcome {
    match recorded {
        None => Outcome::Create,
        Some(recorded) if is_pending(recorded) => Outcome::Replace,
        Some(recorded) if remote.is_newer_than(recorded) => Outcome::Replace,
        Some(_) => Outcome::Skip,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened to one tag during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagResult {
    /// Local copy was current; nothing touched.
    Unchanged { tag: TagName },
    /// Tag was pulled for the first time.
    Created { tag: TagName, path: PathBuf },
    /// Stale copy was removed and pulled again.
    Replaced { tag: TagName, path: PathBuf },
    /// Dry run: the tag *would* have been created.
    WouldCreate { tag: TagName, path: PathBuf },
    /// Dry run: the tag *would* have been replaced.
    WouldReplace { tag: TagName, path: PathBuf },
    /// Probing or removing the local copy failed; retried next pass.
    Failed {
        tag: TagName,
        path: PathBuf,
        reason: String,
    },
    /// Tag name cannot be used as a directory name.
    Rejected { tag: TagName },
}

/// Tally of [`TagResult`]s for logging and display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagCounts {
    pub unchanged: usize,
    pub created: usize,
    pub replaced: usize,
    pub planned: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl TagCounts {
    /// Number of tags whose content was written this pass.
    pub fn written(&self) -> usize {
        self.created + self.replaced
    }
}

/// Outcome of reconciling one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReport {
    pub repository: RemoteName,
    pub results: Vec<TagResult>,
}

impl RepositoryReport {
    pub fn counts(&self) -> TagCounts {
        let mut counts = TagCounts::default();
        for result in &self.results {
            match result {
                TagResult::Unchanged { .. } => counts.unchanged += 1,
                TagResult::Created { .. } => counts.created += 1,
                TagResult::Replaced { .. } => counts.replaced += 1,
                TagResult::WouldCreate { .. } | TagResult::WouldReplace { .. } => {
                    counts.planned += 1
                }
                TagResult::Failed { .. } => counts.failed += 1,
                TagResult::Rejected { .. } => counts.rejected += 1,
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Mirrors registry tags into `<store_root>/<repo.local_dir>/<tag>`.
#[derive(Clone)]
pub struct Reconciler {
    store_root: PathBuf,
    registry_host: String,
    catalog: Arc<dyn TagCatalog>,
    fetcher: Arc<dyn ArtifactFetcher>,
    freshness: Arc<dyn FreshnessStore>,
}

impl Reconciler {
    pub fn new(
        store_root: impl Into<PathBuf>,
        registry_host: impl Into<String>,
        catalog: Arc<dyn TagCatalog>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            store_root: store_root.into(),
            registry_host: registry_host.into(),
            catalog,
            fetcher,
            freshness: Arc::new(MtimeFreshness),
        }
    }

    /// Reconciler backed by the registry HTTP API and the configured pull tool.
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(
            config.store_root.clone(),
            config.registry_host.clone(),
            Arc::new(HttpTagCatalog::new(
                &config.registry_host,
                config.catalog_timeout,
            )),
            Arc::new(OrasFetcher::new(config.pull_tool.clone(), config.pull_timeout)),
        )
    }

    pub fn with_freshness(mut self, freshness: Arc<dyn FreshnessStore>) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// `<store_root>/<local_dir>`: pure, no I/O.
    pub fn repository_dir(&self, repository: &Repository) -> PathBuf {
        self.store_root.join(&repository.local_dir)
    }

    /// Bring every tag of `repository` up to date.
    ///
    /// Catalog, directory-creation and pull failures abort this repository
    /// and are returned; per-tag probe and removal failures are recorded as
    /// [`TagResult::Failed`] and the pass moves on. With `dry_run` nothing on
    /// disk changes and no pull runs.
    pub fn reconcile(
        &self,
        repository: &Repository,
        dry_run: bool,
    ) -> Result<RepositoryReport, SyncError> {
        let base = self.repository_dir(repository);
        let tags = self.catalog.list_tags(repository)?;
        let mut results = Vec::with_capacity(tags.len());

        for tag in tags {
            if !tag.name.is_safe_path_component() {
                tracing::warn!(
                    "skipping tag {:?} of {repository}: not usable as a directory name",
                    tag.name.0
                );
                results.push(TagResult::Rejected { tag: tag.name });
                continue;
            }

            let path = base.join(&tag.name.0);
            let reference = ArtifactReference::new(&self.registry_host, repository, &tag.name);

            let recorded = match self.freshness.recorded(&path) {
                Ok(recorded) => recorded,
                Err(err) => {
                    tracing::warn!("cannot read freshness of {}: {err}", path.display());
                    results.push(TagResult::Failed {
                        tag: tag.name,
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let outcome = decide(recorded, &tag.last_modified);
            match (outcome, dry_run) {
                (Outcome::Skip, _) => {
                    tracing::debug!("up to date: {reference}");
                    results.push(TagResult::Unchanged { tag: tag.name });
                    continue;
                }
                (Outcome::Create, true) => {
                    tracing::info!("[dry-run] would pull {reference}");
                    results.push(TagResult::WouldCreate { tag: tag.name, path });
                    continue;
                }
                (Outcome::Replace, true) => {
                    tracing::info!("[dry-run] would replace {reference}");
                    results.push(TagResult::WouldReplace { tag: tag.name, path });
                    continue;
                }
                (Outcome::Replace, false) => {
                    match recorded {
                        Some(at) if is_pending(at) => {
                            tracing::info!("retrying interrupted pull of {reference}")
                        }
                        _ => tracing::info!(
                            "got newer content for {reference} (tag last modified: {}, dir last modified: {})",
                            tag.last_modified,
                            recorded.map(|r| r.to_rfc2822()).unwrap_or_default(),
                        ),
                    }
                    if let Err(err) = self.freshness.remove(&path) {
                        tracing::warn!("failed to remove the directory {}: {err}", path.display());
                        results.push(TagResult::Failed {
                            tag: tag.name,
                            path,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                }
                (Outcome::Create, false) => {}
            }

            create_owner_only_dir(&path)?;
            if let Err(err) = self.freshness.mark_pending(&path) {
                tracing::warn!("failed to mark {} as pending: {err}", path.display());
            }

            if let Err(source) = self.fetcher.pull(&reference, &path) {
                // The tool may have written into the directory, bumping its
                // mtime; push it back so the next pass retries.
                if let Err(err) = self.freshness.mark_pending(&path) {
                    tracing::warn!(
                        "failed to mark {} as pending after a failed pull: {err}",
                        path.display()
                    );
                }
                return Err(SyncError::Pull {
                    reference: reference.to_string(),
                    source,
                });
            }

            let freshness = match &tag.last_modified {
                TagTimestamp::Known(ts) => *ts,
                TagTimestamp::Unparsable(raw) => {
                    tracing::warn!(
                        "pulled {reference} with unparsable last modified {raw:?}; recording pull time"
                    );
                    Utc::now()
                }
            };
            if let Err(err) = self.freshness.record(&path, freshness) {
                tracing::warn!(
                    "failed to change the mod time for the directory {}: {err}",
                    path.display()
                );
            }

            tracing::info!("pulled {reference} into {}", path.display());
            results.push(match outcome {
                Outcome::Replace => TagResult::Replaced { tag: tag.name, path },
                _ => TagResult::Created { tag: tag.name, path },
            });
        }

        Ok(RepositoryReport {
            repository: repository.remote_name.clone(),
            results,
        })
    }
}

#[cfg(unix)]
fn create_owner_only_dir(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn create_owner_only_dir(path: &Path) -> Result<(), SyncError> {
    std::fs::create_dir_all(path).map_err(|e| io_err(path, e))
}
