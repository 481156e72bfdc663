//! Error types for tagmirror-core.

use thiserror::Error;

/// Errors raised while building the startup configuration.
///
/// Every variant is fatal: the process refuses to start rather than mirror
/// a partially understood set of repositories.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `QUAY_ORG_REPOS` was not set, or contained no repository entries.
    #[error("no repositories configured; set QUAY_ORG_REPOS to a comma-separated list")]
    MissingRepositories,

    /// A repository entry does not end in a usable directory name.
    #[error("invalid repository entry '{entry}': {reason}")]
    InvalidRepository { entry: String, reason: String },

    /// Serving was requested but no listen port was configured.
    #[error("no listen port configured; set PORT")]
    MissingPort,

    /// The listen port could not be parsed as a TCP port number.
    #[error("invalid listen port '{0}'")]
    InvalidPort(String),
}
