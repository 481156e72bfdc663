//! Tag catalog client.
//!
//! `GET <base>/api/v1/repository/<org>/<repo>/tag/` answers with
//! `{"tags": [{"name": "...", "last_modified": "..."}, ...]}`. Only the name
//! and timestamp are kept; everything else in the payload is ignored.

use std::time::Duration;

use serde::Deserialize;

use tagmirror_core::{parse_last_modified, Repository, Tag, TagName, TagTimestamp};

use crate::error::SyncError;

/// Source of the tag list for a repository.
pub trait TagCatalog: Send + Sync {
    /// Tags currently known to the registry, in the order it reports them.
    fn list_tags(&self, repository: &Repository) -> Result<Vec<Tag>, SyncError>;
}

#[derive(Debug, Deserialize)]
struct TagListResponse {
    tags: Vec<WireTag>,
}

#[derive(Debug, Deserialize)]
struct WireTag {
    name: String,
    #[serde(default)]
    last_modified: Option<String>,
}

/// Registry HTTP API client.
#[derive(Clone)]
pub struct HttpTagCatalog {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTagCatalog {
    /// Client for `https://<host>`.
    pub fn new(host: &str, timeout: Duration) -> Self {
        Self::with_base_url(format!("https://{host}"), timeout)
    }

    /// Client for an explicit scheme and authority, e.g. `http://127.0.0.1:8080`.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn tags_url(&self, repository: &Repository) -> String {
        format!(
            "{}/api/v1/repository/{}/tag/",
            self.base_url, repository.remote_name
        )
    }
}

impl TagCatalog for HttpTagCatalog {
    fn list_tags(&self, repository: &Repository) -> Result<Vec<Tag>, SyncError> {
        let url = self.tags_url(repository);
        tracing::info!("going to pull latest artifacts from: {url}");

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(SyncError::CatalogStatus { url, status });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(SyncError::CatalogTransport {
                    url,
                    message: transport.to_string(),
                });
            }
        };

        if response.status() != 200 {
            return Err(SyncError::CatalogStatus {
                url,
                status: response.status(),
            });
        }

        let body = response
            .into_string()
            .map_err(|e| SyncError::CatalogMalformed {
                url: url.clone(),
                message: format!("cannot read body: {e}"),
            })?;
        decode_catalog(&url, &body)
    }
}

/// Decode a catalog response body.
///
/// A tag whose timestamp does not parse is kept with
/// [`TagTimestamp::Unparsable`] and logged; it never fails the whole list.
pub fn decode_catalog(url: &str, body: &str) -> Result<Vec<Tag>, SyncError> {
    let decoded: TagListResponse =
        serde_json::from_str(body).map_err(|e| SyncError::CatalogMalformed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    if decoded.tags.is_empty() {
        return Err(SyncError::EmptyCatalog {
            url: url.to_string(),
        });
    }

    let tags = decoded
        .tags
        .into_iter()
        .map(|wire| {
            let raw = wire.last_modified.unwrap_or_default();
            let last_modified = match parse_last_modified(&raw) {
                Ok(ts) => TagTimestamp::Known(ts),
                Err(err) => {
                    tracing::warn!(
                        "error parsing last modified {raw:?} for tag {} at {url}: {err}",
                        wire.name
                    );
                    TagTimestamp::Unparsable(raw)
                }
            };
            Tag {
                name: TagName::from(wire.name),
                last_modified,
            }
        })
        .collect();
    Ok(tags)
}
