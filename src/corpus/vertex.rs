//! Vertex AI RAG Engine backend (REST, v1)

use super::{
    drive_file_id, sanitize_display_name, Corpus, CorpusFile, CorpusService, ImportRequest,
    ImportSummary, RetrievalQuery, RetrievedContext,
};
use crate::config::VertexConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const DRIVE_RESOURCE_TYPE_FILE: &str = "RESOURCE_TYPE_FILE";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagCorpusResource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    create_time: String,
    #[serde(default)]
    update_time: String,
}

impl From<RagCorpusResource> for Corpus {
    fn from(resource: RagCorpusResource) -> Self {
        Corpus {
            resource_name: resource.name,
            display_name: resource.display_name,
            create_time: resource.create_time,
            update_time: resource.update_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCorporaResponse {
    #[serde(default)]
    rag_corpora: Vec<RagCorpusResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GcsSource {
    #[serde(default)]
    uris: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveResourceId {
    #[serde(default)]
    resource_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleDriveSource {
    #[serde(default)]
    resource_ids: Vec<DriveResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagFileResource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    create_time: String,
    #[serde(default)]
    update_time: String,
    #[serde(default)]
    gcs_source: Option<GcsSource>,
    #[serde(default)]
    google_drive_source: Option<GoogleDriveSource>,
}

impl RagFileResource {
    fn source_uri(&self) -> String {
        if let Some(uri) = self.gcs_source.as_ref().and_then(|s| s.uris.first()) {
            return uri.clone();
        }
        self.google_drive_source
            .as_ref()
            .and_then(|s| s.resource_ids.first())
            .map(|id| format!("https://drive.google.com/file/d/{}/view", id.resource_id))
            .unwrap_or_default()
    }
}

impl From<RagFileResource> for CorpusFile {
    fn from(file: RagFileResource) -> Self {
        CorpusFile {
            file_id: super::resource_id(&file.name).to_string(),
            source_uri: file.source_uri(),
            display_name: file.display_name,
            create_time: file.create_time,
            update_time: file.update_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesResponse {
    #[serde(default)]
    rag_files: Vec<RagFileResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// A long-running operation
#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextResource {
    #[serde(default)]
    source_uri: String,
    #[serde(default)]
    source_display_name: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    distance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextList {
    #[serde(default)]
    contexts: Vec<ContextResource>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrieveContextsResponse {
    #[serde(default)]
    contexts: Option<ContextList>,
}

/// Read an int64 counter, which the API encodes as a JSON string
fn count_field(value: &Value, key: &str) -> usize {
    match value.get(key) {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
        _ => 0,
    }
}

/// Client for the RAG Engine REST API
pub struct VertexRagService {
    client: Client,
    api_root: Url,
    parent: String,
    embedding_endpoint: String,
    access_token_env: String,
    access_token: Option<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl VertexRagService {
    pub fn new(config: &VertexConfig) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(Error::Config(
                "vertex.project_id is not set (set it in the config or GOOGLE_CLOUD_PROJECT)"
                    .to_string(),
            ));
        }

        let api_root = Url::parse(&config.api_root())?;
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        let parent = config.parent();
        let embedding_endpoint = if config.embedding_model.starts_with("projects/") {
            config.embedding_model.clone()
        } else {
            format!("{}/{}", parent, config.embedding_model)
        };

        Ok(Self {
            client,
            api_root,
            parent,
            embedding_endpoint,
            access_token_env: config.access_token_env.clone(),
            access_token: None,
            poll_interval: Duration::from_millis(config.operation_poll_interval_ms),
            max_polls: config.operation_max_polls.max(1),
        })
    }

    /// Use a fixed bearer token instead of reading the environment
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn bearer_token(&self) -> Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }
        if self.access_token_env.is_empty() {
            return Err(Error::Config(
                "vertex.access_token_env is empty; no way to authenticate".to_string(),
            ));
        }
        std::env::var(&self.access_token_env).map_err(|_| {
            Error::Config(format!(
                "Vertex access token not found in ${} (try `gcloud auth print-access-token`)",
                self.access_token_env
            ))
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.api_root
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid Vertex API path '{}': {}", path, e)))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.url(path)?;
        debug!("Vertex {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(self.bearer_token()?)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Service(format!(
                "{} {} returned {}: {}",
                method,
                path,
                status,
                detail.trim()
            )));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(json!({}))?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Poll an operation until it is done, returning its response payload
    async fn wait_for(&self, mut operation: Operation) -> Result<Option<Value>> {
        for _ in 0..self.max_polls {
            if let Some(error) = operation.error.take() {
                return Err(Error::Service(format!(
                    "Operation {} failed (code {}): {}",
                    operation.name, error.code, error.message
                )));
            }
            if operation.done {
                return Ok(operation.response);
            }
            if operation.name.is_empty() {
                return Err(Error::Service(
                    "Unfinished operation has no name to poll".to_string(),
                ));
            }

            tokio::time::sleep(self.poll_interval).await;
            operation = self
                .call(Method::GET, &operation.name.clone(), &[], None)
                .await?;
        }

        if operation.done && operation.error.is_none() {
            return Ok(operation.response);
        }
        Err(Error::Service(format!(
            "Operation {} did not finish after {} polls",
            operation.name, self.max_polls
        )))
    }

    async fn import_batch(
        &self,
        resource_name: &str,
        source: Value,
        request: &ImportRequest,
    ) -> Result<ImportSummary> {
        let mut config = json!({
            "ragFileTransformationConfig": {
                "ragFileChunkingConfig": {
                    "fixedLengthChunking": {
                        "chunkSize": request.chunk_size,
                        "chunkOverlap": request.chunk_overlap,
                    }
                }
            },
            "maxEmbeddingRequestsPerMin": request.max_embedding_requests_per_min,
        });
        if let (Some(config), Value::Object(source)) = (config.as_object_mut(), source) {
            config.extend(source);
        }

        let operation: Operation = self
            .call(
                Method::POST,
                &format!("{}/ragFiles:import", resource_name),
                &[],
                Some(json!({ "importRagFilesConfig": config })),
            )
            .await?;
        let response = self.wait_for(operation).await?.unwrap_or_default();

        Ok(ImportSummary {
            imported: count_field(&response, "importedRagFilesCount"),
            skipped: count_field(&response, "skippedRagFilesCount"),
            failed: count_field(&response, "failedRagFilesCount"),
        })
    }
}

#[async_trait]
impl CorpusService for VertexRagService {
    fn backend_name(&self) -> &'static str {
        "vertex"
    }

    fn fallback_resource_name(&self, display_name: &str) -> String {
        format!(
            "{}/ragCorpora/{}",
            self.parent,
            sanitize_display_name(display_name)
        )
    }

    fn supports_uri(&self, uri: &str) -> bool {
        uri.starts_with("gs://") || drive_file_id(uri).is_some()
    }

    async fn create_corpus(&self, display_name: &str) -> Result<Corpus> {
        let body = json!({
            "displayName": display_name,
            "vectorDbConfig": {
                "ragEmbeddingModelConfig": {
                    "vertexPredictionEndpoint": {
                        "endpoint": self.embedding_endpoint,
                    }
                }
            }
        });

        let operation: Operation = self
            .call(
                Method::POST,
                &format!("{}/ragCorpora", self.parent),
                &[],
                Some(body),
            )
            .await?;
        let response = self.wait_for(operation).await?.ok_or_else(|| {
            Error::Service(format!(
                "Creating corpus '{}' finished without returning it",
                display_name
            ))
        })?;

        let corpus: Corpus = serde_json::from_value::<RagCorpusResource>(response)?.into();
        info!("Created Vertex corpus {}", corpus.resource_name);
        Ok(corpus)
    }

    async fn list_corpora(&self) -> Result<Vec<Corpus>> {
        let path = format!("{}/ragCorpora", self.parent);
        let mut corpora = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, String)> = page_token
                .take()
                .map(|token| vec![("pageToken", token)])
                .unwrap_or_default();
            let page: ListCorporaResponse = self.call(Method::GET, &path, &query, None).await?;
            corpora.extend(page.rag_corpora.into_iter().map(Corpus::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(corpora)
    }

    async fn delete_corpus(&self, resource_name: &str) -> Result<()> {
        let operation: Operation = self
            .call(
                Method::DELETE,
                resource_name,
                &[("force", "true".to_string())],
                None,
            )
            .await?;
        self.wait_for(operation).await?;
        info!("Deleted Vertex corpus {}", resource_name);
        Ok(())
    }

    async fn list_files(&self, resource_name: &str) -> Result<Vec<CorpusFile>> {
        let path = format!("{}/ragFiles", resource_name);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, String)> = page_token
                .take()
                .map(|token| vec![("pageToken", token)])
                .unwrap_or_default();
            let page: ListFilesResponse = self.call(Method::GET, &path, &query, None).await?;
            files.extend(page.rag_files.into_iter().map(CorpusFile::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    async fn import_files(
        &self,
        resource_name: &str,
        request: &ImportRequest,
    ) -> Result<ImportSummary> {
        let mut gcs_uris = Vec::new();
        let mut drive_ids = Vec::new();
        let mut summary = ImportSummary::default();

        for uri in &request.uris {
            if uri.starts_with("gs://") {
                gcs_uris.push(uri.clone());
            } else if let Some(id) = drive_file_id(uri) {
                drive_ids.push(json!({
                    "resourceId": id,
                    "resourceType": DRIVE_RESOURCE_TYPE_FILE,
                }));
            } else {
                warn!("Skipping {}: not a Cloud Storage or Google Drive URI", uri);
                summary.skipped += 1;
            }
        }

        // The import source is a oneof, so each kind goes in its own request
        if !gcs_uris.is_empty() {
            let source = json!({ "gcsSource": { "uris": gcs_uris } });
            let batch = self.import_batch(resource_name, source, request).await?;
            summary.imported += batch.imported;
            summary.skipped += batch.skipped;
            summary.failed += batch.failed;
        }
        if !drive_ids.is_empty() {
            let source = json!({ "googleDriveSource": { "resourceIds": drive_ids } });
            let batch = self.import_batch(resource_name, source, request).await?;
            summary.imported += batch.imported;
            summary.skipped += batch.skipped;
            summary.failed += batch.failed;
        }

        info!(
            "Imported {} files into {} ({} skipped, {} failed)",
            summary.imported, resource_name, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn delete_file(&self, resource_name: &str, file_id: &str) -> Result<()> {
        let operation: Operation = self
            .call(
                Method::DELETE,
                &format!("{}/ragFiles/{}", resource_name, file_id),
                &[],
                None,
            )
            .await?;
        self.wait_for(operation).await?;
        Ok(())
    }

    async fn retrieve(
        &self,
        resource_name: &str,
        query: &RetrievalQuery,
    ) -> Result<Vec<RetrievedContext>> {
        let body = json!({
            "vertexRagStore": {
                "ragResources": [{ "ragCorpus": resource_name }],
            },
            "query": {
                "text": query.text,
                "ragRetrievalConfig": {
                    "topK": query.top_k,
                    "filter": { "vectorDistanceThreshold": query.distance_threshold },
                },
            },
        });

        let response: RetrieveContextsResponse = self
            .call(
                Method::POST,
                &format!("{}:retrieveContexts", self.parent),
                &[],
                Some(body),
            )
            .await?;

        Ok(response
            .contexts
            .unwrap_or_default()
            .contexts
            .into_iter()
            .map(|c| RetrievedContext {
                score: c.score.or(c.distance).unwrap_or(0.0),
                source_uri: c.source_uri,
                source_name: c.source_display_name,
                text: c.text,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PARENT: &str = "/v1/projects/p/locations/l";

    async fn service(server: &MockServer) -> VertexRagService {
        let config = VertexConfig {
            project_id: "p".to_string(),
            location: "l".to_string(),
            endpoint: Some(server.uri()),
            operation_poll_interval_ms: 1,
            operation_max_polls: 3,
            ..VertexConfig::default()
        };
        VertexRagService::new(&config)
            .unwrap()
            .with_access_token("test-token")
    }

    #[tokio::test]
    async fn test_list_corpora_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PARENT}/ragCorpora")))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ragCorpora": [{"name": "projects/p/locations/l/ragCorpora/2", "displayName": "second"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{PARENT}/ragCorpora")))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ragCorpora": [{
                    "name": "projects/p/locations/l/ragCorpora/1",
                    "displayName": "first",
                    "createTime": "2024-05-01T00:00:00Z"
                }],
                "nextPageToken": "next"
            })))
            .mount(&server)
            .await;

        let corpora = service(&server).await.list_corpora().await.unwrap();
        let names: Vec<&str> = corpora.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(corpora[0].create_time, "2024-05-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_create_corpus_polls_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{PARENT}/ragCorpora")))
            .and(body_partial_json(json!({
                "displayName": "tariffs",
                "vectorDbConfig": {"ragEmbeddingModelConfig": {"vertexPredictionEndpoint": {
                    "endpoint": "projects/p/locations/l/publishers/google/models/text-embedding-005"
                }}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/l/operations/op1",
                "done": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{PARENT}/operations/op1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/l/operations/op1",
                "done": true,
                "response": {
                    "@type": "type.googleapis.com/google.cloud.aiplatform.v1.RagCorpus",
                    "name": "projects/p/locations/l/ragCorpora/42",
                    "displayName": "tariffs"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let corpus = service(&server).await.create_corpus("tariffs").await.unwrap();
        assert_eq!(corpus.resource_name, "projects/p/locations/l/ragCorpora/42");
        assert_eq!(corpus.display_name, "tariffs");
    }

    #[tokio::test]
    async fn test_failed_operation_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{PARENT}/ragCorpora/9")))
            .and(query_param("force", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/l/operations/op2",
                "done": true,
                "error": {"code": 9, "message": "corpus is busy"}
            })))
            .mount(&server)
            .await;

        let err = service(&server)
            .await
            .delete_corpus("projects/p/locations/l/ragCorpora/9")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("corpus is busy"));
    }

    #[tokio::test]
    async fn test_http_errors_carry_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PARENT}/ragCorpora")))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let err = service(&server).await.list_corpora().await.unwrap_err();
        match err {
            Error::Service(message) => {
                assert!(message.contains("403"));
                assert!(message.contains("permission denied"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieve_sends_top_k_and_threshold() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{PARENT}:retrieveContexts")))
            .and(body_partial_json(json!({
                "vertexRagStore": {"ragResources": [{"ragCorpus": "projects/p/locations/l/ragCorpora/1"}]},
                "query": {"text": "live bulls", "ragRetrievalConfig": {
                    "topK": 3,
                    "filter": {"vectorDistanceThreshold": 0.5}
                }}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contexts": {"contexts": [{
                    "sourceUri": "gs://bucket/chapter01.pdf",
                    "sourceDisplayName": "chapter01.pdf",
                    "text": "0102 Live bovine animals",
                    "score": 0.21
                }]}
            })))
            .mount(&server)
            .await;

        let query = RetrievalQuery {
            text: "live bulls".to_string(),
            top_k: 3,
            distance_threshold: 0.5,
        };
        let contexts = service(&server)
            .await
            .retrieve("projects/p/locations/l/ragCorpora/1", &query)
            .await
            .unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].source_name, "chapter01.pdf");
        assert_eq!(contexts[0].score, 0.21);
    }

    #[tokio::test]
    async fn test_empty_retrieval() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{PARENT}:retrieveContexts")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let query = RetrievalQuery {
            text: "nothing".to_string(),
            top_k: 3,
            distance_threshold: 0.5,
        };
        let contexts = service(&server)
            .await
            .retrieve("projects/p/locations/l/ragCorpora/1", &query)
            .await
            .unwrap();
        assert!(contexts.is_empty());
    }

    #[tokio::test]
    async fn test_import_splits_sources_and_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{PARENT}/ragCorpora/1/ragFiles:import")))
            .and(body_partial_json(json!({"importRagFilesConfig": {
                "gcsSource": {"uris": ["gs://bucket/a.pdf"]},
                "ragFileTransformationConfig": {"ragFileChunkingConfig": {"fixedLengthChunking": {
                    "chunkSize": 512, "chunkOverlap": 100
                }}}
            }})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/l/operations/gcs",
                "done": true,
                "response": {"importedRagFilesCount": "1"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{PARENT}/ragCorpora/1/ragFiles:import")))
            .and(body_partial_json(json!({"importRagFilesConfig": {
                "googleDriveSource": {"resourceIds": [{"resourceId": "doc1", "resourceType": "RESOURCE_TYPE_FILE"}]}
            }})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/l/operations/drive",
                "done": true,
                "response": {"importedRagFilesCount": 1, "failedRagFilesCount": "0"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ImportRequest {
            uris: vec![
                "gs://bucket/a.pdf".to_string(),
                "https://drive.google.com/file/d/doc1/view".to_string(),
                "ftp://elsewhere/x".to_string(),
            ],
            chunk_size: 512,
            chunk_overlap: 100,
            max_embedding_requests_per_min: 1000,
        };
        let summary = service(&server)
            .await
            .import_files("projects/p/locations/l/ragCorpora/1", &request)
            .await
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                imported: 2,
                skipped: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_list_files_maps_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{PARENT}/ragCorpora/1/ragFiles")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ragFiles": [
                    {
                        "name": "projects/p/locations/l/ragCorpora/1/ragFiles/f1",
                        "displayName": "a.pdf",
                        "gcsSource": {"uris": ["gs://bucket/a.pdf"]}
                    },
                    {
                        "name": "projects/p/locations/l/ragCorpora/1/ragFiles/f2",
                        "displayName": "Notes",
                        "googleDriveSource": {"resourceIds": [{"resourceId": "doc1"}]}
                    }
                ]
            })))
            .mount(&server)
            .await;

        let files = service(&server)
            .await
            .list_files("projects/p/locations/l/ragCorpora/1")
            .await
            .unwrap();
        assert_eq!(files[0].file_id, "f1");
        assert_eq!(files[0].source_uri, "gs://bucket/a.pdf");
        assert_eq!(
            files[1].source_uri,
            "https://drive.google.com/file/d/doc1/view"
        );
    }

    #[tokio::test]
    async fn test_delete_file_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{PARENT}/ragCorpora/1/ragFiles/f1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
            .expect(1)
            .mount(&server)
            .await;

        service(&server)
            .await
            .delete_file("projects/p/locations/l/ragCorpora/1", "f1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_is_config_error() {
        let server = MockServer::start().await;
        let config = VertexConfig {
            project_id: "p".to_string(),
            location: "l".to_string(),
            endpoint: Some(server.uri()),
            access_token_env: "HSN_AGENT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..VertexConfig::default()
        };
        let service = VertexRagService::new(&config).unwrap();
        assert!(matches!(
            service.list_corpora().await,
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_uri_support_and_fallback_name() {
        let config = VertexConfig {
            project_id: "p".to_string(),
            location: "l".to_string(),
            ..VertexConfig::default()
        };
        let service = VertexRagService::new(&config).unwrap();
        assert!(service.supports_uri("gs://bucket/file.pdf"));
        assert!(service.supports_uri("https://drive.google.com/file/d/abc/view"));
        assert!(!service.supports_uri("/tmp/local.txt"));
        assert_eq!(
            service.fallback_resource_name("HSN docs"),
            "projects/p/locations/l/ragCorpora/HSN_docs"
        );
    }
}
