//! Document corpora in an external vector-search service
//!
//! This module provides:
//! - The `CorpusService` trait the tools talk to
//! - A Vertex AI RAG Engine client
//! - A local Qdrant-backed store
//! - Name and URI helpers shared by both backends

mod qdrant;
mod source;
mod vertex;

pub use qdrant::QdrantCorpusStore;
pub use source::{FetchedDocument, SourceLocation};
pub use vertex::VertexRagService;

use crate::config::{BackendKind, Config};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};

/// A corpus known to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corpus {
    /// Fully qualified name, used in every follow-up call
    pub resource_name: String,
    pub display_name: String,
    pub create_time: String,
    pub update_time: String,
}

/// A document stored in a corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusFile {
    pub file_id: String,
    pub display_name: String,
    pub source_uri: String,
    pub create_time: String,
    pub update_time: String,
}

/// One retrieved passage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedContext {
    pub source_uri: String,
    pub source_name: String,
    pub text: String,
    pub score: f64,
}

/// Parameters for a document import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub uris: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_embedding_requests_per_min: u32,
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Parameters for a retrieval query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    pub text: String,
    pub top_k: usize,
    /// Maximum vector distance; smaller is stricter
    pub distance_threshold: f64,
}

/// Operations the corpus tools need from a vector-search service
#[async_trait]
pub trait CorpusService: Send + Sync {
    /// Short backend name for logs and status output
    fn backend_name(&self) -> &'static str;

    /// Resource name a display name would have if it existed
    fn fallback_resource_name(&self, display_name: &str) -> String;

    /// Whether `uri` can be imported by this backend
    fn supports_uri(&self, uri: &str) -> bool;

    async fn create_corpus(&self, display_name: &str) -> Result<Corpus>;

    async fn list_corpora(&self) -> Result<Vec<Corpus>>;

    async fn delete_corpus(&self, resource_name: &str) -> Result<()>;

    async fn list_files(&self, resource_name: &str) -> Result<Vec<CorpusFile>>;

    async fn import_files(
        &self,
        resource_name: &str,
        request: &ImportRequest,
    ) -> Result<ImportSummary>;

    async fn delete_file(&self, resource_name: &str, file_id: &str) -> Result<()>;

    async fn retrieve(
        &self,
        resource_name: &str,
        query: &RetrievalQuery,
    ) -> Result<Vec<RetrievedContext>>;
}

/// Build the service selected by `rag.backend`
pub fn create_service(config: &Config) -> Result<Arc<dyn CorpusService>> {
    match config.rag.backend_kind()? {
        BackendKind::Vertex => Ok(Arc::new(VertexRagService::new(&config.vertex)?)),
        BackendKind::Qdrant => Ok(Arc::new(QdrantCorpusStore::new(
            &config.qdrant,
            &config.embedding,
        )?)),
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Last path segment of a resource name
pub fn resource_id(resource_name: &str) -> &str {
    resource_name.rsplit('/').next().unwrap_or(resource_name)
}

fn google_docs_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://docs\.google\.com/(?:document|spreadsheets|presentation)/d/([A-Za-z0-9_-]+)")
            .unwrap()
    })
}

fn google_drive_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://drive\.google\.com/(?:file/d/|open\?id=)([A-Za-z0-9_-]+)").unwrap()
    })
}

/// Rewrite Google Docs/Sheets/Slides links to the Drive file form
///
/// Other URIs are returned trimmed but otherwise unchanged.
pub fn normalize_source_uri(uri: &str) -> String {
    let uri = uri.trim();
    match google_docs_regex().captures(uri) {
        Some(caps) => format!("https://drive.google.com/file/d/{}/view", &caps[1]),
        None => uri.to_string(),
    }
}

/// Drive file id of a `drive.google.com` link
pub fn drive_file_id(uri: &str) -> Option<&str> {
    google_drive_file_regex()
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(sanitize_display_name("HSN tariffs 2024!"), "HSN_tariffs_2024_");
        assert_eq!(sanitize_display_name("ok-name_1"), "ok-name_1");
        assert_eq!(sanitize_display_name("café"), "caf_");
    }

    #[test]
    fn test_resource_id() {
        assert_eq!(
            resource_id("projects/p/locations/us-central1/ragCorpora/123"),
            "123"
        );
        assert_eq!(resource_id("plain"), "plain");
    }

    #[test]
    fn test_google_docs_links_become_drive_links() {
        assert_eq!(
            normalize_source_uri("https://docs.google.com/document/d/abc_123-X/edit?usp=sharing"),
            "https://drive.google.com/file/d/abc_123-X/view"
        );
        assert_eq!(
            normalize_source_uri(" https://docs.google.com/spreadsheets/d/sheet1/edit#gid=0 "),
            "https://drive.google.com/file/d/sheet1/view"
        );
        assert_eq!(
            normalize_source_uri("gs://bucket/hsn.pdf"),
            "gs://bucket/hsn.pdf"
        );
    }

    #[test]
    fn test_drive_file_id() {
        assert_eq!(
            drive_file_id("https://drive.google.com/file/d/abc123/view"),
            Some("abc123")
        );
        assert_eq!(
            drive_file_id("https://drive.google.com/open?id=xyz"),
            Some("xyz")
        );
        assert_eq!(drive_file_id("https://example.com/file/d/abc"), None);
    }
}
