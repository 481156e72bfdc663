//! # tagmirror-sync
//!
//! Reconciliation engine that mirrors registry tags into a local store.
//!
//! Call [`Reconciler::reconcile`] to bring one repository's local tag
//! directories up to date, or [`pipeline::run_pass`] to sweep every
//! configured repository once.

pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod freshness;
pub mod pipeline;
pub mod reconciler;
pub mod store;

pub use catalog::{HttpTagCatalog, TagCatalog};
pub use error::{FetchError, SyncError};
pub use fetcher::{ArtifactFetcher, OrasFetcher};
pub use freshness::{FreshnessStore, MtimeFreshness};
pub use pipeline::{run_pass, PassReport, RepositoryPass};
pub use reconciler::{decide, Outcome, Reconciler, RepositoryReport, TagCounts, TagResult};
pub use store::{format_age, list_records, LocalRecord};
