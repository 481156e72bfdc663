//! Freshness markers for local sync records.
//!
//! A tag directory's recorded freshness is the registry `last_modified` of
//! the content it holds. [`MtimeFreshness`] keeps it in the directory's own
//! modification time; the reconciler only sees the [`FreshnessStore`] trait,
//! so a manifest-file store can replace it later.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use filetime::FileTime;

use crate::error::{io_err, SyncError};

/// Freshness written before a pull and after a failed one.
pub fn pending_marker() -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH)
}

/// Whether `recorded` is the [`pending_marker`].
pub fn is_pending(recorded: DateTime<Utc>) -> bool {
    recorded == pending_marker()
}

pub trait FreshnessStore: Send + Sync {
    /// Freshness recorded for `path`, or `None` when no record exists.
    fn recorded(&self, path: &Path) -> Result<Option<DateTime<Utc>>, SyncError>;

    /// Record `at` as the freshness of `path`.
    fn record(&self, path: &Path, at: DateTime<Utc>) -> Result<(), SyncError>;

    /// Mark `path` as holding unverified content, so that it orders below
    /// every real registry timestamp.
    fn mark_pending(&self, path: &Path) -> Result<(), SyncError> {
        self.record(path, pending_marker())
    }

    /// Drop the local record at `path`, whether it is a directory tree or a
    /// stray file. Absent paths are not an error.
    fn remove(&self, path: &Path) -> Result<(), SyncError> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(io_err(path, err)),
        };
        let removed = if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        removed.map_err(|e| io_err(path, e))
    }
}

/// Stores freshness as the directory's access and modification time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeFreshness;

impl FreshnessStore for MtimeFreshness {
    fn recorded(&self, path: &Path) -> Result<Option<DateTime<Utc>>, SyncError> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(path, err)),
        };
        let modified: SystemTime = meta.modified().map_err(|e| io_err(path, e))?;
        Ok(Some(DateTime::<Utc>::from(modified)))
    }

    fn record(&self, path: &Path, at: DateTime<Utc>) -> Result<(), SyncError> {
        let time = FileTime::from_unix_time(at.timestamp(), at.timestamp_subsec_nanos());
        filetime::set_file_times(path, time, time).map_err(|e| io_err(path, e))
    }
}
