//! Listing context: serializable payload for the directory listing page.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use tagmirror_core::Repository;

use crate::error::RenderError;

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    /// Absolute URL path of the entry.
    pub href: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl ListingEntry {
    pub fn new(
        request_path: &str,
        name: impl Into<String>,
        is_dir: bool,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        ListingEntry {
            href: entry_href(request_path, &name),
            name,
            is_dir,
            size,
            modified,
        }
    }
}

/// A configured repository as shown in the page header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub dir: String,
}

impl From<&Repository> for RepositorySummary {
    fn from(repo: &Repository) -> Self {
        RepositorySummary {
            name: repo.remote_name.0.clone(),
            dir: repo.local_dir.clone(),
        }
    }
}

/// Everything the listing template needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingContext {
    /// Request path of the listed directory, always starting with `/`.
    pub path: String,
    pub entries: Vec<ListingEntry>,
    /// `None` at the root.
    pub parent: Option<String>,
    pub sync_interval_minutes: u64,
    pub repositories: Vec<RepositorySummary>,
}

impl ListingContext {
    /// Build a context, sorting `entries` into display order.
    pub fn new(
        request_path: &str,
        mut entries: Vec<ListingEntry>,
        sync_interval_minutes: u64,
        repositories: &[Repository],
    ) -> Self {
        sort_entries(&mut entries);
        ListingContext {
            path: normalize_request_path(request_path),
            entries,
            parent: parent_path(request_path),
            sync_interval_minutes,
            repositories: repositories.iter().map(RepositorySummary::from).collect(),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        let value = serde_json::to_value(self)?;
        Ok(tera::Context::from_value(value)?)
    }
}

/// Directories first, newest first; then files by name.
///
/// The sort is stable, so directories with equal mtimes keep their input order.
pub fn sort_entries(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, true) => b.modified.cmp(&a.modified),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.name.cmp(&b.name),
    });
}

/// Parent of a request path, or `None` for the root. The result is
/// URL-escaped like [`entry_href`].
pub fn parent_path(request_path: &str) -> Option<String> {
    let trimmed = request_path.trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let segments: Vec<_> = trimmed.split('/').collect();
    let parent = segments[..segments.len() - 1]
        .iter()
        .map(|s| encode_segment(s))
        .collect::<Vec<_>>()
        .join("/");
    Some(format!("/{parent}"))
}

/// URL path of `name` inside the directory at `request_path`.
pub fn entry_href(request_path: &str, name: &str) -> String {
    let base = request_path.trim_matches('/');
    let name = encode_segment(name);
    if base.is_empty() {
        return format!("/{name}");
    }
    let base = base.split('/').map(encode_segment).collect::<Vec<_>>().join("/");
    format!("/{base}/{name}")
}

fn normalize_request_path(request_path: &str) -> String {
    format!("/{}", request_path.trim_matches('/'))
}

// Embedded unescaped in an href attribute, so everything that could end the
// attribute or reshape the URL is encoded along with `%` itself.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}
