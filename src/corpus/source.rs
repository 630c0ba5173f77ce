//! Document sources for the local corpus store

use crate::error::{Error, Result};
use crate::parse::{extract_text, ContentType};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;
use walkdir::WalkDir;

/// Where a document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Web(Url),
}

impl SourceLocation {
    /// Parse a local path, `file://` URL, or `http(s)://` URL
    pub fn parse(uri: &str) -> Option<Self> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Url::parse(uri).ok().map(Self::Web);
        }
        if uri.starts_with("file://") {
            return Url::parse(uri)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .map(Self::File);
        }
        if uri.contains("://") {
            return None;
        }

        let path = PathBuf::from(uri);
        path.exists().then_some(Self::File(path))
    }

    /// URI stored with the document's chunks
    pub fn uri(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Web(url) => url.to_string(),
        }
    }

    fn display_name(&self) -> String {
        match self {
            Self::File(path) => file_name(path),
            Self::Web(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back().filter(|s| !s.is_empty()).map(String::from))
                .unwrap_or_else(|| url.host_str().unwrap_or("document").to_string()),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand directories into the supported files below them
pub fn expand(location: SourceLocation) -> Vec<SourceLocation> {
    match location {
        SourceLocation::File(path) if path.is_dir() => WalkDir::new(&path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| ContentType::detect(Some(e.path()), None).is_supported())
            .map(|e| SourceLocation::File(e.into_path()))
            .collect(),
        other => vec![other],
    }
}

/// A document ready for chunking
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub uri: String,
    pub display_name: String,
    pub text: String,
}

/// Read and extract a document; `Ok(None)` for content that has no text
pub async fn fetch(client: &Client, location: &SourceLocation) -> Result<Option<FetchedDocument>> {
    let (bytes, content_type) = match location {
        SourceLocation::File(path) => {
            let bytes = tokio::fs::read(path).await?;
            (bytes, ContentType::detect(Some(path), None))
        }
        SourceLocation::Web(url) => {
            debug!("Fetching {}", url);
            let response = client.get(url.clone()).send().await?;
            let response = response
                .error_for_status()
                .map_err(|e| Error::Service(format!("Failed to fetch {}: {}", url, e)))?;
            let mime = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes().await?.to_vec();
            let path = Path::new(url.path());
            (bytes, ContentType::detect(Some(path), mime.as_deref()))
        }
    };

    let Some(text) = extract_text(&bytes, content_type) else {
        return Ok(None);
    };
    if text.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(FetchedDocument {
        uri: location.uri(),
        display_name: location.display_name(),
        text,
    }))
}
