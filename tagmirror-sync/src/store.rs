//! Read-only view of the local artifact store.
//!
//! # Storage layout
//!
//! ```text
//! <store_root>/
//!   <repo.local_dir>/
//!     <tag>/            (mode 0700, mtime = tag last_modified)
//!       ...pulled files
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use tagmirror_core::{RemoteName, Repository, TagName};

use crate::error::{io_err, SyncError};
use crate::freshness::{self, FreshnessStore};

/// A tag directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub repository: RemoteName,
    pub tag: TagName,
    pub path: PathBuf,
    pub freshness: DateTime<Utc>,
}

impl LocalRecord {
    /// A pull into this directory started but never completed.
    pub fn is_pending(&self) -> bool {
        freshness::is_pending(self.freshness)
    }
}

/// Every tag directory of `repositories` under `store_root`, sorted by
/// repository (configured order) then tag name. Missing repository
/// directories yield no records.
pub fn list_records(
    store_root: &Path,
    repositories: &[Repository],
    freshness: &dyn FreshnessStore,
) -> Result<Vec<LocalRecord>, SyncError> {
    let mut records = Vec::new();
    for repository in repositories {
        let dir = store_root.join(&repository.local_dir);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&dir, err)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if !ty.is_dir() {
                continue;
            }
            let path = entry.path();
            let Some(freshness) = freshness.recorded(&path)? else {
                continue;
            };
            found.push(LocalRecord {
                repository: repository.remote_name.clone(),
                tag: TagName::from(entry.file_name().to_string_lossy().into_owned()),
                path,
                freshness,
            });
        }
        found.sort_by(|a, b| a.tag.cmp(&b.tag));
        records.extend(found);
    }
    Ok(records)
}

/// Compact age of a timestamp relative to now, e.g. `5m` or `3d`.
pub fn format_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
