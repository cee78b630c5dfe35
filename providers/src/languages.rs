//! Startup fetch of the extension and pattern language tables.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Raw language-map document as published alongside the icon assets.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LanguageMapsDocument {
    /// Extension (with leading dot) to language tag.
    #[serde(rename = "ExtMap", default)]
    pub ext_map: HashMap<String, String>,
    /// Regex pattern to language tag. Ordered by pattern so classification is
    /// reproducible.
    #[serde(rename = "RegexMap", default)]
    pub regex_map: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum LanguageMapError {
    #[error("invalid language map location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },
    #[error("failed to fetch language maps from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("language maps request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read language maps from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode language maps from {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the language maps from an `http(s)://` URL, a `file://` URL, or a
/// plain filesystem path.
pub async fn load_language_maps(
    location: &str,
    client: &reqwest::Client,
) -> Result<LanguageMapsDocument, LanguageMapError> {
    let bytes = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetch(url, client).await?,
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| LanguageMapError::InvalidLocation {
                    location: location.to_string(),
                    reason: "file URL has no local path".to_string(),
                })?;
            read_file(path).await?
        }
        // Single-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => {
            return Err(LanguageMapError::InvalidLocation {
                location: location.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        _ => read_file(PathBuf::from(location)).await?,
    };

    let document: LanguageMapsDocument =
        serde_json::from_slice(&bytes).map_err(|source| LanguageMapError::Decode {
            location: location.to_string(),
            source,
        })?;
    tracing::info!(
        location,
        extensions = document.ext_map.len(),
        patterns = document.regex_map.len(),
        "Loaded language maps"
    );
    Ok(document)
}

async fn fetch(url: Url, client: &reqwest::Client) -> Result<Vec<u8>, LanguageMapError> {
    let url_text = url.to_string();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| LanguageMapError::Request {
            url: url_text.clone(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(LanguageMapError::Status {
            url: url_text,
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|source| LanguageMapError::Request {
            url: url_text,
            source,
        })?;
    Ok(body.to_vec())
}

async fn read_file(path: PathBuf) -> Result<Vec<u8>, LanguageMapError> {
    tokio::fs::read(&path)
        .await
        .map_err(|source| LanguageMapError::Read { path, source })
}
