//! Domain types for the tag mirror.
//!
//! Repositories are configured once and never change; tags are ephemeral and
//! live only for the duration of one reconciliation pass.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Textual layout of the registry's `last_modified` field,
/// e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const LAST_MODIFIED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Registry-qualified repository identifier, e.g. `org/image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteName(pub String);

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of one tag inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagName(pub String);

impl TagName {
    /// Whether the name can be used verbatim as a single directory name
    /// under the repository's local directory.
    pub fn is_safe_path_component(&self) -> bool {
        let name = self.0.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TagName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TagName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// A configured sync target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub remote_name: RemoteName,
    /// Directory name under the store root; last path segment of `remote_name`.
    pub local_dir: String,
}

impl Repository {
    /// Build a repository from one entry of the comma-separated list.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let remote = entry.trim().trim_matches('/');
        let invalid = |reason: &str| ConfigError::InvalidRepository {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        if remote.is_empty() {
            return Err(invalid("empty repository name"));
        }
        let local_dir = remote.rsplit('/').next().unwrap_or(remote).trim();
        if local_dir.is_empty() || local_dir == "." || local_dir == ".." {
            return Err(invalid("last path segment is not a usable directory name"));
        }

        Ok(Self {
            remote_name: RemoteName::from(remote),
            local_dir: local_dir.to_string(),
        })
    }

    /// Parse a comma-separated repository list, ignoring blank entries.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ConfigError> {
        let repositories = list
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if repositories.is_empty() {
            return Err(ConfigError::MissingRepositories);
        }
        Ok(repositories)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.remote_name.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// The registry's `last_modified` value for a tag.
///
/// An unparsable value is kept as-is and orders below every known
/// timestamp, so it never looks newer than content already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTimestamp {
    Known(DateTime<Utc>),
    Unparsable(String),
}

impl TagTimestamp {
    pub fn known(&self) -> Option<DateTime<Utc>> {
        match self {
            TagTimestamp::Known(ts) => Some(*ts),
            TagTimestamp::Unparsable(_) => None,
        }
    }

    /// True when this timestamp is strictly newer than `recorded`.
    pub fn is_newer_than(&self, recorded: DateTime<Utc>) -> bool {
        match self {
            TagTimestamp::Known(ts) => *ts > recorded,
            TagTimestamp::Unparsable(_) => false,
        }
    }
}

impl fmt::Display for TagTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagTimestamp::Known(ts) => write!(f, "{}", ts.format(LAST_MODIFIED_FORMAT)),
            TagTimestamp::Unparsable(raw) => write!(f, "unparsable({raw:?})"),
        }
    }
}

/// Parse a registry `last_modified` string.
pub fn parse_last_modified(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(raw.trim(), LAST_MODIFIED_FORMAT).map(|ts| ts.with_timezone(&Utc))
}

/// One version of a repository's artifact as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: TagName,
    pub last_modified: TagTimestamp,
}

impl Tag {
    pub fn new(name: impl Into<TagName>, last_modified: TagTimestamp) -> Self {
        Self {
            name: name.into(),
            last_modified,
        }
    }
}

/// Fully-qualified pull reference: `<host>/<remote>:<tag>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactReference {
    pub host: String,
    pub remote_name: RemoteName,
    pub tag: TagName,
}

impl ArtifactReference {
    pub fn new(host: &str, repository: &Repository, tag: &TagName) -> Self {
        Self {
            host: host.to_string(),
            remote_name: repository.remote_name.clone(),
            tag: tag.clone(),
        }
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host, self.remote_name, self.tag)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
