//! tagmirror core library: domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and domain structs (repositories, tags, references)
//! - [`config`]: [`MirrorConfig`] built once at startup
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{MirrorConfig, RawSettings};
pub use error::ConfigError;
pub use types::{
    parse_last_modified, ArtifactReference, RemoteName, Repository, Tag, TagName, TagTimestamp,
    LAST_MODIFIED_FORMAT,
};
