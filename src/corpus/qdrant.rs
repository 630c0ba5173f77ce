//! Local corpus backend: one Qdrant collection per corpus

use super::source::{expand, fetch, SourceLocation};
use super::{
    sanitize_display_name, Corpus, CorpusFile, CorpusService, ImportRequest, ImportSummary,
    RetrievalQuery, RetrievedContext,
};
use crate::chunk::{chunk_text, ChunkConfig};
use crate::config::{EmbeddingConfig, QdrantConfig};
use crate::embed::{create_embedder, embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::progress::add_progress_bar;
use crate::store::{ChunkPayload, ChunkPoint, QdrantStore};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Stable document id for a source URI
pub(crate) fn doc_id_for(uri: &str) -> String {
    blake3::hash(uri.as_bytes()).to_hex()[..32].to_string()
}

/// Stable point id for one chunk of a document
pub(crate) fn point_id_for(doc_id: &str, chunk_index: usize) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{}#{}", doc_id, chunk_index).as_bytes(),
    )
}

/// Group chunk payloads into per-document file entries, ordered by id
pub(crate) fn files_from_payloads(payloads: Vec<ChunkPayload>) -> Vec<CorpusFile> {
    let mut files: BTreeMap<String, CorpusFile> = BTreeMap::new();

    for payload in payloads {
        let file = files
            .entry(payload.doc_id.clone())
            .or_insert_with(|| CorpusFile {
                file_id: payload.doc_id.clone(),
                display_name: payload.display_name.clone(),
                source_uri: payload.doc_uri.clone(),
                create_time: payload.imported_at.clone(),
                update_time: payload.imported_at.clone(),
            });
        if payload.imported_at < file.create_time {
            file.create_time = payload.imported_at.clone();
        }
        if payload.imported_at > file.update_time {
            file.update_time = payload.imported_at;
        }
    }

    files.into_values().collect()
}

/// Corpus service backed by a Qdrant instance and an HTTP embedder
pub struct QdrantCorpusStore {
    store: QdrantStore,
    embedder: Box<dyn Embedder>,
    batch_size: usize,
    collection_prefix: String,
    http: Client,
}

impl QdrantCorpusStore {
    pub fn new(qdrant: &QdrantConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        let store = QdrantStore::new(&qdrant.url, qdrant.api_key(), embedding.dimension)?;
        let embedder = create_embedder(embedding)?;
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            store,
            embedder,
            batch_size: embedding.batch_size,
            collection_prefix: qdrant.collection_prefix.clone(),
            http,
        })
    }

    fn display_name_of<'a>(&self, collection: &'a str) -> Option<&'a str> {
        collection.strip_prefix(self.collection_prefix.as_str())
    }

    async fn require_collection(&self, collection: &str) -> Result<()> {
        if self.store.collection_exists(collection).await? {
            Ok(())
        } else {
            Err(Error::CorpusNotFound(collection.to_string()))
        }
    }

    /// Fetch, chunk, embed, and store one document, replacing earlier chunks
    async fn import_one(
        &self,
        collection: &str,
        location: &SourceLocation,
        chunking: ChunkConfig,
    ) -> Result<bool> {
        let Some(doc) = fetch(&self.http, location).await? else {
            return Ok(false);
        };

        let doc_id = doc_id_for(&doc.uri);
        let chunks = chunk_text(&doc.text, &doc_id, chunking);
        if chunks.is_empty() {
            return Ok(false);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors =
            embed_in_batches(self.embedder.as_ref(), texts, self.batch_size, |_| {}).await?;

        let imported_at = Utc::now().to_rfc3339();
        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkPoint {
                id: point_id_for(&doc_id, chunk.index),
                vector,
                payload: ChunkPayload {
                    doc_id: doc_id.clone(),
                    doc_uri: doc.uri.clone(),
                    display_name: doc.display_name.clone(),
                    chunk_index: chunk.index as i64,
                    chunk_hash: chunk.hash,
                    text: chunk.text,
                    imported_at: imported_at.clone(),
                },
            })
            .collect();

        self.store.delete_document(collection, &doc_id).await?;
        self.store.upsert_points(collection, points).await?;
        Ok(true)
    }
}

#[async_trait]
impl CorpusService for QdrantCorpusStore {
    fn backend_name(&self) -> &'static str {
        "qdrant"
    }

    fn fallback_resource_name(&self, display_name: &str) -> String {
        format!(
            "{}{}",
            self.collection_prefix,
            sanitize_display_name(display_name)
        )
    }

    fn supports_uri(&self, uri: &str) -> bool {
        SourceLocation::parse(uri).is_some()
    }

    async fn create_corpus(&self, display_name: &str) -> Result<Corpus> {
        let collection = self.fallback_resource_name(display_name);
        self.store.ensure_collection(&collection).await?;

        let now = Utc::now().to_rfc3339();
        Ok(Corpus {
            display_name: display_name.to_string(),
            resource_name: collection,
            create_time: now.clone(),
            update_time: now,
        })
    }

    async fn list_corpora(&self) -> Result<Vec<Corpus>> {
        let mut corpora: Vec<Corpus> = self
            .store
            .list_collections()
            .await?
            .into_iter()
            .filter_map(|name| {
                let display_name = self.display_name_of(&name)?.to_string();
                Some(Corpus {
                    resource_name: name,
                    display_name,
                    create_time: String::new(),
                    update_time: String::new(),
                })
            })
            .collect();
        corpora.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(corpora)
    }

    async fn delete_corpus(&self, resource_name: &str) -> Result<()> {
        if self.store.delete_collection(resource_name).await? {
            Ok(())
        } else {
            Err(Error::CorpusNotFound(resource_name.to_string()))
        }
    }

    async fn list_files(&self, resource_name: &str) -> Result<Vec<CorpusFile>> {
        self.require_collection(resource_name).await?;
        let payloads = self.store.scroll_payloads(resource_name, None).await?;
        Ok(files_from_payloads(payloads))
    }

    async fn import_files(
        &self,
        resource_name: &str,
        request: &ImportRequest,
    ) -> Result<ImportSummary> {
        self.require_collection(resource_name).await?;

        let chunking = ChunkConfig {
            chunk_size: request.chunk_size,
            chunk_overlap: request.chunk_overlap,
        };
        let mut summary = ImportSummary::default();
        let mut locations = Vec::new();
        for uri in &request.uris {
            match SourceLocation::parse(uri) {
                Some(location) => locations.extend(expand(location)),
                None => {
                    warn!("Skipping {}: not a readable path or http(s) URL", uri);
                    summary.skipped += 1;
                }
            }
        }

        let progress = add_progress_bar(locations.len() as u64);
        for location in &locations {
            progress.set_message(location.uri());
            match self.import_one(resource_name, location, chunking).await {
                Ok(true) => summary.imported += 1,
                Ok(false) => {
                    warn!("Skipping {}: no extractable text", location.uri());
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to import {}: {}", location.uri(), e);
                    summary.failed += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Imported {} documents into {} ({} skipped, {} failed)",
            summary.imported, resource_name, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn delete_file(&self, resource_name: &str, file_id: &str) -> Result<()> {
        self.require_collection(resource_name).await?;
        let existing = self
            .store
            .scroll_payloads(resource_name, Some(file_id))
            .await?;
        if existing.is_empty() {
            return Err(Error::Service(format!(
                "Document '{}' not found in {}",
                file_id, resource_name
            )));
        }
        self.store.delete_document(resource_name, file_id).await
    }

    async fn retrieve(
        &self,
        resource_name: &str,
        query: &RetrievalQuery,
    ) -> Result<Vec<RetrievedContext>> {
        self.require_collection(resource_name).await?;

        let vector = self
            .embedder
            .embed(vec![query.text.clone()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("No embedding returned for query".to_string()))?;

        // Cosine distance is 1 - similarity
        let threshold = (1.0 - query.distance_threshold) as f32;
        let hits = self
            .store
            .search(resource_name, vector, query.top_k, Some(threshold))
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedContext {
                source_uri: hit.payload.doc_uri,
                source_name: hit.payload.display_name,
                text: hit.payload.text,
                score: f64::from(hit.score),
            })
            .collect())
    }
}
