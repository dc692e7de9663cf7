//! Repository index resolution
//!
//! A chart repository publishes `index.yaml`, a catalog mapping each chart
//! name to the list of its published versions and their download URLs.

use crate::error::{Error, Result};
use crate::transport::Transport;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Path of the index document relative to the repository base URL
pub const INDEX_PATH: &str = "index.yaml";

/// Parsed repository index
///
/// Only the fields needed to locate artifacts are kept; everything else in
/// the document (`apiVersion`, `generated`, digests, ...) is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryIndex {
    /// Chart name to versions
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<Entry>>,
}

/// One published version of a chart
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Chart name, when the index repeats it
    #[serde(default)]
    pub name: Option<String>,
    /// Chart version
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub version: Option<String>,
    /// Candidate download URLs, absolute or relative to the repository
    #[serde(default)]
    pub urls: Vec<String>,
}

// Unquoted versions such as `1.0` arrive as YAML numbers
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Remote error body, e.g. `{"error": "not found"}`
#[derive(Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    error: String,
}

impl RepositoryIndex {
    /// Parse an index document fetched from `url`
    ///
    /// # Errors
    /// [`Error::IndexParse`] for malformed YAML, [`Error::InvalidIndex`] when
    /// an entry lists no URLs.
    pub fn parse(bytes: &[u8], url: &str) -> Result<Self> {
        // An empty document is a repository with no charts yet
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let index: RepositoryIndex =
            serde_yaml::from_slice(bytes).map_err(|source| Error::IndexParse {
                url: url.to_string(),
                source,
            })?;

        for (chart, versions) in &index.entries {
            for entry in versions {
                if entry.urls.is_empty() {
                    return Err(Error::InvalidIndex {
                        url: url.to_string(),
                        reason: format!(
                            "entry {} {} has no urls",
                            chart,
                            entry.version.as_deref().unwrap_or("<unversioned>")
                        ),
                    });
                }
            }
        }

        Ok(index)
    }

    /// Every artifact URL, chart by chart in index order
    pub fn artifact_urls(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .flatten()
            .flat_map(|entry| entry.urls.iter().map(String::as_str))
    }

    /// Number of charts in the index
    pub fn chart_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of chart versions across all charts
    pub fn version_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Fetch and parse the repository index
///
/// # Errors
/// - [`Error::IndexFetch`] when the request cannot be made or the body cannot be read
/// - [`Error::RemoteStatus`] for a non-2xx response
/// - [`Error::IndexParse`] / [`Error::InvalidIndex`] for a bad document
pub async fn resolve(transport: &dyn Transport) -> Result<RepositoryIndex> {
    let repo_url = transport.base_url().as_str().trim_end_matches('/').to_string();
    let fetch_error = |source: Error| Error::IndexFetch {
        url: repo_url.clone(),
        source: Box::new(source),
    };

    let response = transport.fetch(INDEX_PATH).await.map_err(fetch_error)?;
    let status = response.status;
    let success = response.is_success();
    let body = response.bytes().await.map_err(fetch_error)?;

    if !success {
        return Err(remote_error(status, &body));
    }

    let index = RepositoryIndex::parse(&body, &repo_url)?;
    tracing::info!(
        url = %repo_url,
        charts = index.chart_count(),
        versions = index.version_count(),
        "Resolved repository index"
    );
    Ok(index)
}

/// Build an error for a non-2xx response
///
/// Prefers the `error` field of a JSON body; falls back to the raw body when
/// the server answers in some other format.
pub fn remote_error(status: u16, body: &[u8]) -> Error {
    let message = match serde_json::from_slice::<RemoteErrorBody>(body) {
        Ok(parsed) if !parsed.error.is_empty() => parsed.error,
        _ => format!(
            "could not properly parse response JSON: {}",
            String::from_utf8_lossy(body)
        ),
    };
    Error::RemoteStatus { status, message }
}
