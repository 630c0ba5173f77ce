//! Embedding generation for the local corpus store
//!
//! This module provides:
//! - A trait for embedding backends
//! - An HTTP embedding backend
//! - Batched embedding helper

mod http_backend;

pub use http_backend::*;

use crate::config::EmbeddingConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let embedder = HttpEmbedder::new(config)?;
    Ok(Box::new(embedder))
}

/// Embed `texts` in batches of `batch_size`, calling `on_batch` with the
/// number of texts finished so far
pub async fn embed_in_batches<F>(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
    mut on_batch: F,
) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(usize) + Send,
{
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let embeddings = embedder.embed(chunk.to_vec()).await?;
        all_embeddings.extend(embeddings);
        on_batch(all_embeddings.len());
    }

    Ok(all_embeddings)
}
