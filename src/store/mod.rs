//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client and provides:
//! - Collection management (one collection per corpus)
//! - Point upsert/delete operations
//! - Vector search and payload scrolling

mod payload;

pub use payload::*;

use crate::error::{Error, Result};
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetCollectionInfoResponse, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

const SCROLL_BATCH: u32 = 256;

/// A scored search hit
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    dimension: usize,
}

impl QdrantStore {
    /// Create a client for `url`; no request is made until first use
    pub fn new(url: &str, api_key: Option<String>, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let mut builder = Qdrant::from_url(url).skip_compatibility_check();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self { client, dimension })
    }

    /// Get the expected vector dimension for this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.client.collection_exists(collection).await?)
    }

    /// Names of all collections
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.client.list_collections().await?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    /// Create `collection` if needed, checking the vector size of an existing one
    ///
    /// Returns true when the collection was created.
    pub async fn ensure_collection(&self, collection: &str) -> Result<bool> {
        if self.client.collection_exists(collection).await? {
            let info = self.client.collection_info(collection).await?;
            if let Some(size) = extract_vector_size(&info) {
                if size as usize != self.dimension {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' has vector size {}, but the embedding model produces {}",
                        collection, size, self.dimension
                    )));
                }
            }
            return Ok(false);
        }

        info!(
            "Creating collection {} with dimension {}",
            collection, self.dimension
        );
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection).vectors_config(VectorParamsBuilder::new(
                    self.dimension as u64,
                    Distance::Cosine,
                )),
            )
            .await?;
        Ok(true)
    }

    /// Delete the collection if it exists
    pub async fn delete_collection(&self, collection: &str) -> Result<bool> {
        if !self.client.collection_exists(collection).await? {
            return Ok(false);
        }

        info!("Deleting collection {}", collection);
        self.client.delete_collection(collection).await?;
        Ok(true)
    }

    pub async fn upsert_points(&self, collection: &str, points: Vec<ChunkPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        if let Some(mismatch) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(Error::Qdrant(format!(
                "Vector dimension mismatch for collection '{}': expected {} (got {})",
                collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }

        debug!("Upserting {} points to collection {}", points.len(), collection);

        let point_structs = points.into_iter().map(ChunkPoint::to_point_struct).collect::<Vec<_>>();
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, point_structs).wait(true))
            .await?;
        Ok(())
    }

    /// Delete every chunk of one document
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<()> {
        debug!("Deleting document {} from collection {}", doc_id, collection);

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(doc_filter(doc_id))
                    .wait(true),
            )
            .await?;
        Ok(())
    }

    /// Every payload in the collection, optionally restricted to one document
    pub async fn scroll_payloads(
        &self,
        collection: &str,
        doc_id: Option<&str>,
    ) -> Result<Vec<ChunkPayload>> {
        let mut payloads = Vec::new();
        let mut offset = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(collection)
                .limit(SCROLL_BATCH)
                .with_payload(true)
                .with_vectors(false);
            if let Some(doc_id) = doc_id {
                builder = builder.filter(doc_filter(doc_id));
            }
            if let Some(o) = offset.take() {
                builder = builder.offset(o);
            }

            let response = self.client.scroll(builder).await?;
            payloads.extend(
                response
                    .result
                    .into_iter()
                    .map(|p| ChunkPayload::from_qdrant_payload(p.payload)),
            );

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(payloads)
    }

    /// Search for similar vectors
    pub async fn search(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        debug!("Searching collection {} with limit {}", collection, limit);

        let mut builder =
            SearchPointsBuilder::new(collection, query_vector, limit as u64).with_payload(true);
        if let Some(threshold) = score_threshold {
            builder = builder.score_threshold(threshold);
        }

        let response = self.client.search_points(builder).await?;
        Ok(response
            .result
            .into_iter()
            .map(|p| SearchResult {
                score: p.score,
                payload: ChunkPayload::from_qdrant_payload(p.payload),
            })
            .collect())
    }
}

fn doc_filter(doc_id: &str) -> Filter {
    Filter::must([Condition::matches("doc_id", doc_id.to_string())])
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let params = info.result.as_ref()?.config.as_ref()?.params.as_ref()?;
    match params.vectors_config.as_ref()?.config.as_ref()? {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => Some(params.size),
        // Named vectors are never created by this store
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_upsert_points_rejects_dimension_mismatch() {
        let store = QdrantStore::new("http://127.0.0.1:6334", None, 3).unwrap();

        let point = ChunkPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2],
            payload: ChunkPayload::default(),
        };

        let err = store
            .upsert_points("hsn_corpus_test", vec![point])
            .await
            .expect_err("should reject mismatched vector length");

        match err {
            Error::Qdrant(message) => assert!(message.contains("Vector dimension mismatch")),
            other => panic!("expected qdrant error, got {other:?}"),
        }
    }

    #[test]
    fn test_doc_filter_matches_doc_id() {
        let filter = doc_filter("abc");
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
    }
}
