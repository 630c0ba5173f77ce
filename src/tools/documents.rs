//! Document tools: retrieval (with HSN pattern search), import, delete

use super::corpus::{lookup_corpus, require_corpus, requested_name};
use super::{ToolContext, ToolResponse, ToolStatus};
use crate::corpus::{normalize_source_uri, ImportRequest, RetrievalQuery};
use crate::error::{Error, Result};
use crate::hsn::{match_pattern, CodeTable, PatternOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Answer a free-text question
///
/// Pattern requests ("codes ending with 99") are answered from the HSN table;
/// everything else is sent to the corpus for retrieval.
pub async fn rag_query(ctx: &ToolContext, corpus_name: &str, query: &str) -> ToolResponse {
    let table = ctx.session.ensure_code_table_async().await.unwrap_or_else(|e| {
        warn!("HSN master unavailable, skipping pattern search: {}", e);
        Arc::new(CodeTable::new())
    });

    if let Some(outcome) = match_pattern(&table, query, ctx.config.hsn.max_pattern_matches) {
        return pattern_response(query, outcome);
    }

    let name = match requested_name(ctx, corpus_name) {
        Ok(name) => name,
        Err(e) => {
            return ToolResponse::error(e.to_string())
                .with("query", query)
                .with("corpus_name", corpus_name)
        }
    };

    match retrieve(ctx, &name, query).await {
        Ok(results) if results.is_empty() => ToolResponse::warning(format!(
            "No results found in corpus '{}' for query: '{}'",
            name, query
        ))
        .with("query", query)
        .with("corpus_name", &name)
        .with("results", results)
        .with("results_count", 0),
        Ok(results) => {
            ToolResponse::success(format!("Successfully queried corpus '{}'", name))
                .with("query", query)
                .with("corpus_name", &name)
                .with("results_count", results.len())
                .with("results", results)
        }
        Err(Error::CorpusNotFound(_)) => ToolResponse::error(format!(
            "Corpus '{}' does not exist. Please create it first using the create_corpus tool.",
            name
        ))
        .with("query", query)
        .with("corpus_name", &name),
        Err(e) => {
            let message = format!("Error querying corpus: {}", e);
            error!("{}", message);
            ToolResponse::error(message)
                .with("query", query)
                .with("corpus_name", &name)
        }
    }
}

fn pattern_response(query: &str, outcome: PatternOutcome) -> ToolResponse {
    match outcome {
        PatternOutcome::Suggestions {
            pattern,
            suggestions,
            message,
        } => {
            debug!(
                "Pattern '{} {}' matched {} codes",
                pattern.mode,
                pattern.digits,
                suggestions.len()
            );
            ToolResponse::new(ToolStatus::PatternSuggestions, message)
                .with("query", query)
                .with("pattern", &pattern.digits)
                .with("mode", pattern.mode.to_string())
                .with("suggestions", suggestions)
        }
        PatternOutcome::NoMatches { message, .. } => {
            ToolResponse::warning(message).with("query", query)
        }
    }
}

async fn retrieve(
    ctx: &ToolContext,
    name: &str,
    query: &str,
) -> Result<Vec<crate::corpus::RetrievedContext>> {
    let resource_name = require_corpus(ctx, name).await?;
    let request = RetrievalQuery {
        text: query.to_string(),
        top_k: ctx.config.rag.top_k,
        distance_threshold: ctx.config.rag.distance_threshold,
    };
    ctx.service()?.retrieve(&resource_name, &request).await
}

/// A path the backend cannot ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidPath {
    pub path: String,
    pub reason: String,
}

/// A Google Docs link rewritten to its Drive form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UriConversion {
    pub original: String,
    pub converted: String,
}

/// Import documents into a corpus
///
/// An empty `corpus_name` targets the current corpus. Paths the backend
/// cannot ingest are reported back instead of failing the whole call.
pub async fn add_data(ctx: &ToolContext, corpus_name: &str, paths: &[String]) -> ToolResponse {
    let name = match requested_name(ctx, corpus_name) {
        Ok(name) => name,
        Err(e) => {
            return ToolResponse::error(format!(
                "{}. Please specify which corpus to add the documents to.",
                e
            ))
        }
    };

    let service = match ctx.service() {
        Ok(service) => service,
        Err(e) => {
            return ToolResponse::error(format!("Error adding data to corpus: {}", e))
                .with("corpus_name", &name)
        }
    };

    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    let mut conversions = Vec::new();
    for raw in paths {
        let uri = normalize_source_uri(raw);
        if uri.is_empty() {
            continue;
        }
        if uri != raw.trim() {
            conversions.push(UriConversion {
                original: raw.trim().to_string(),
                converted: uri.clone(),
            });
        }
        if service.supports_uri(&uri) {
            valid.push(uri);
        } else {
            invalid.push(InvalidPath {
                reason: format!("not supported by the {} backend", service.backend_name()),
                path: raw.trim().to_string(),
            });
        }
    }

    if valid.is_empty() {
        return ToolResponse::error("No valid paths provided. Nothing was added to the corpus.")
            .with("corpus_name", &name)
            .with("invalid_paths", invalid);
    }

    let resource_name = match lookup_corpus(ctx, &name).await {
        Ok(Some(resource_name)) => resource_name,
        Ok(None) => {
            return ToolResponse::error(format!(
                "Corpus '{}' does not exist. Please create it first using the create_corpus tool.",
                name
            ))
            .with("corpus_name", &name)
        }
        Err(e) => {
            return ToolResponse::error(format!("Error adding data to corpus: {}", e))
                .with("corpus_name", &name)
        }
    };

    let request = ImportRequest {
        uris: valid.clone(),
        chunk_size: ctx.config.rag.chunk_size,
        chunk_overlap: ctx.config.rag.chunk_overlap,
        max_embedding_requests_per_min: ctx.config.rag.max_embedding_requests_per_min,
    };

    match service.import_files(&resource_name, &request).await {
        Ok(summary) => {
            info!(
                "Added {} file(s) to {} ({} skipped, {} failed)",
                summary.imported, resource_name, summary.skipped, summary.failed
            );
            ctx.session.set_current_corpus(name.as_str());
            ToolResponse::success(format!(
                "Successfully added {} file(s) to corpus '{}'",
                summary.imported, name
            ))
            .with("corpus_name", &name)
            .with("files_added", summary.imported)
            .with("files_skipped", summary.skipped)
            .with("files_failed", summary.failed)
            .with("paths", valid)
            .with("invalid_paths", invalid)
            .with("conversions", conversions)
        }
        Err(e) => ToolResponse::error(format!("Error adding data to corpus: {}", e))
            .with("corpus_name", &name)
            .with("paths", valid),
    }
}

/// Remove one document from a corpus
pub async fn delete_document(
    ctx: &ToolContext,
    corpus_name: &str,
    document_id: &str,
) -> ToolResponse {
    let name = match requested_name(ctx, corpus_name) {
        Ok(name) => name,
        Err(e) => return ToolResponse::error(e.to_string()).with("document_id", document_id),
    };

    let result = async {
        let resource_name = require_corpus(ctx, &name).await?;
        ctx.service()?.delete_file(&resource_name, document_id).await
    }
    .await;

    let response = match result {
        Ok(()) => ToolResponse::success(format!(
            "Successfully deleted document '{}' from corpus '{}'",
            document_id, name
        )),
        Err(e @ Error::CorpusNotFound(_)) => ToolResponse::error(e.to_string()),
        Err(e) => ToolResponse::error(format!("Error deleting document: {}", e)),
    };
    response
        .with("corpus_name", &name)
        .with("document_id", document_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusFile, RetrievedContext};
    use crate::tools::testing::{context, FakeCorpusService};

    fn table() -> CodeTable {
        [
            ("01", "LIVE ANIMALS"),
            ("0102", "LIVE BOVINE ANIMALS"),
            ("010299", "OTHER"),
            ("0199", "LIVE ANIMALS NES"),
            ("0300", "FISH"),
        ]
        .into_iter()
        .collect()
    }

    fn hit(text: &str) -> RetrievedContext {
        RetrievedContext {
            source_uri: "gs://bucket/chapter01.pdf".to_string(),
            source_name: "chapter01.pdf".to_string(),
            text: text.to_string(),
            score: 0.12,
        }
    }

    #[tokio::test]
    async fn test_pattern_query_answers_from_table() {
        let service = Arc::new(FakeCorpusService::default());
        let ctx = context(service.clone(), table());

        let response = rag_query(&ctx, "", "Which codes end with 99?").await;
        assert_eq!(response.status, ToolStatus::PatternSuggestions);
        assert_eq!(response.fields["pattern"], "99");
        assert_eq!(response.fields["mode"], "ends with");
        let suggestions = response.fields["suggestions"].as_array().unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0]["code"], "010299");
        assert!(suggestions[0]["explanation"]
            .as_str()
            .unwrap()
            .contains("LIVE BOVINE ANIMALS"));
        assert!(service.state.lock().unwrap().queries.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_query_loads_master_on_first_use() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("master_hsn.csv");
        std::fs::write(&path, "HSNCode,Description\n0102,LIVE BOVINE ANIMALS\n010299,OTHER\n").unwrap();

        let mut ctx = context(Arc::new(FakeCorpusService::default()), CodeTable::new());
        ctx.session = crate::session::Session::new(&path);
        assert!(ctx.session.code_table().is_none());

        let response = rag_query(&ctx, "", "codes that end with 99").await;
        assert_eq!(response.status, ToolStatus::PatternSuggestions);
        assert_eq!(response.fields["suggestions"][0]["code"], "010299");
        assert_eq!(ctx.session.code_table().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pattern_without_matches_warns() {
        let ctx = context(Arc::new(FakeCorpusService::default()), table());

        let response = rag_query(&ctx, "tariffs", "which code starts with 77").await;
        assert_eq!(response.status, ToolStatus::Warning);
        assert_eq!(
            response.message,
            "No HSN codes begins with '77' were found in the master list."
        );
    }

    #[tokio::test]
    async fn test_free_text_goes_to_retrieval() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        service
            .state
            .lock()
            .unwrap()
            .contexts
            .push(hit("Chapter 1 covers live animals"));
        let ctx = context(service.clone(), table());

        let response = rag_query(&ctx, "tariffs", "what is chapter 1 about").await;
        assert_eq!(response.status, ToolStatus::Success);
        assert_eq!(response.message, "Successfully queried corpus 'tariffs'");
        assert_eq!(response.fields["results_count"], 1);

        let state = service.state.lock().unwrap();
        let (resource, query) = &state.queries[0];
        assert_eq!(resource, "fake/ragCorpora/tariffs");
        assert_eq!(query.top_k, 3);
        assert_eq!(query.distance_threshold, 0.5);
    }

    #[tokio::test]
    async fn test_retrieval_with_no_results_warns() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        let ctx = context(service, table());

        let response = rag_query(&ctx, "tariffs", "unrelated question").await;
        assert_eq!(response.status, ToolStatus::Warning);
        assert_eq!(
            response.message,
            "No results found in corpus 'tariffs' for query: 'unrelated question'"
        );
        assert_eq!(response.fields["results_count"], 0);
        assert_eq!(response.fields["results"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_missing_corpus() {
        let ctx = context(Arc::new(FakeCorpusService::default()), table());

        let response = rag_query(&ctx, "nope", "what is chapter 1 about").await;
        assert!(response.is_error());
        assert!(response.message.contains("Please create it first"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_reported() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        let ctx = context(service.clone(), table());
        ctx.session
            .remember_corpus("fake/ragCorpora/tariffs", ["tariffs"]);
        service.state.lock().unwrap().fail_with = Some("deadline exceeded".to_string());

        let response = rag_query(&ctx, "tariffs", "anything").await;
        assert!(response.is_error());
        assert!(response.message.starts_with("Error querying corpus:"));
    }

    #[tokio::test]
    async fn test_add_data_sorts_paths_and_sets_current() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        let ctx = context(service.clone(), table());

        let paths = vec![
            "https://docs.google.com/document/d/doc123/edit".to_string(),
            "gs://bucket/chapter01.pdf".to_string(),
            "/tmp/local.pdf".to_string(),
        ];
        let response = add_data(&ctx, "tariffs", &paths).await;

        assert_eq!(response.status, ToolStatus::Success);
        assert_eq!(response.fields["files_added"], 2);
        assert_eq!(response.fields["invalid_paths"][0]["path"], "/tmp/local.pdf");
        assert_eq!(
            response.fields["conversions"][0]["converted"],
            "https://drive.google.com/file/d/doc123/view"
        );
        assert_eq!(ctx.session.current_corpus().as_deref(), Some("tariffs"));

        let state = service.state.lock().unwrap();
        let (_, request) = &state.imports[0];
        assert_eq!(request.uris.len(), 2);
        assert_eq!(request.chunk_size, ctx.config.rag.chunk_size);
    }

    #[tokio::test]
    async fn test_add_data_needs_a_corpus() {
        let ctx = context(Arc::new(FakeCorpusService::default()), table());

        let response = add_data(&ctx, "", &["gs://bucket/a.pdf".to_string()]).await;
        assert!(response.is_error());
        assert!(response.message.contains("no current corpus"));
    }

    #[tokio::test]
    async fn test_add_data_rejects_when_nothing_valid() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        let ctx = context(service.clone(), table());

        let response = add_data(&ctx, "tariffs", &["ftp://host/file".to_string()]).await;
        assert!(response.is_error());
        assert!(service.state.lock().unwrap().imports.is_empty());
    }

    #[tokio::test]
    async fn test_delete_document() {
        let service = Arc::new(FakeCorpusService::with_corpus("tariffs"));
        service.state.lock().unwrap().files.insert(
            "fake/ragCorpora/tariffs".to_string(),
            vec![CorpusFile {
                file_id: "f1".to_string(),
                display_name: "a.pdf".to_string(),
                source_uri: "gs://bucket/a.pdf".to_string(),
                create_time: String::new(),
                update_time: String::new(),
            }],
        );
        let ctx = context(service, table());

        let response = delete_document(&ctx, "tariffs", "f1").await;
        assert_eq!(
            response.message,
            "Successfully deleted document 'f1' from corpus 'tariffs'"
        );

        let again = delete_document(&ctx, "tariffs", "f1").await;
        assert!(again.is_error());
        assert!(again.message.starts_with("Error deleting document:"));
    }
}
