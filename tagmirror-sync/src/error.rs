//! Error types for tagmirror-sync.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors that can abort a repository's reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The catalog request never produced a response.
    #[error("catalog request to {url} failed: {message}")]
    CatalogTransport { url: String, message: String },

    /// The registry answered with something other than 200 OK.
    #[error("got unexpected status from {url}: {status}")]
    CatalogStatus { url: String, status: u16 },

    /// The response body could not be read or decoded.
    #[error("malformed catalog response from {url}: {message}")]
    CatalogMalformed { url: String, message: String },

    /// The registry reported zero tags.
    #[error("catalog at {url} lists no tags")]
    EmptyCatalog { url: String },

    /// The external pull tool failed for one tag.
    #[error("pull of {reference} failed: {source}")]
    Pull {
        reference: String,
        #[source]
        source: FetchError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a single artifact pull.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The pull tool could not be started at all.
    #[error("could not start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The pull tool exited unsuccessfully.
    #[error("'{tool}' exited with {status}: {stderr}")]
    Exit {
        tool: String,
        status: String,
        stderr: String,
    },

    /// The pull tool ran past its deadline and was killed.
    #[error("'{tool}' timed out after {}s", after.as_secs())]
    TimedOut { tool: String, after: Duration },

    /// Waiting on or reading from the child process failed.
    #[error("I/O error while running '{tool}': {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
