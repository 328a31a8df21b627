//! Embedding provider trait, batched attachment, and vector utilities.
//!
//! The [`EmbeddingProvider`] trait is the single capability boundary to the
//! embedding model. Applications construct one provider at startup and pass
//! it by reference into [`attach_embeddings`], [`embed_query`], and the
//! query pipeline; nothing in this crate holds a provider globally.
//!
//! Concrete providers (OpenAI, Ollama, fastembed, hashing) live in the
//! `quote-search` app crate.
//!
//! # Roles
//!
//! Some encoders embed questions and answers into different spaces. Every
//! call carries an [`EmbedRole`] so a provider can route queries and
//! documents through different heads or prefixes. Vectors from the two
//! roles are only comparable when the provider is built that way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::models::Window;

/// Number of windows sent to the provider per call when unconfigured.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Which side of the comparison a text is embedded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedRole {
    /// Free-text search query.
    Query,
    /// Stored target (a window of dialogue).
    Document,
}

/// Trait for embedding providers.
///
/// Implementations must return exactly one vector per input text, in
/// input order, each of length [`dims`](EmbeddingProvider::dims).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts for the given role.
    async fn embed(&self, texts: &[String], role: EmbedRole) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Embed document texts in sequential batches of at most `batch_size`.
///
/// Batches are awaited one after another; the result holds one vector per
/// input text in input order regardless of the batch size.
///
/// # Errors
///
/// Fails on the first provider error, count mismatch, or dimensionality
/// mismatch. No partial result is returned.
pub async fn embed_documents(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    if batch_size == 0 {
        return Err(SearchError::InvalidBatchSize);
    }

    let total = texts.len();
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);

    for (n, batch) in texts.chunks(batch_size).enumerate() {
        let offset = n * batch_size;
        tracing::debug!(
            from = offset + 1,
            to = offset + batch.len(),
            total,
            "embedding batch"
        );
        let embedded = checked_embed(provider, batch, EmbedRole::Document).await?;
        vectors.extend(embedded);
    }

    if vectors.len() != total {
        return Err(SearchError::CountMismatch {
            expected: total,
            found: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Embed a single search query.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let mut vectors = checked_embed(provider, &[text.to_string()], EmbedRole::Query).await?;
    vectors.pop().ok_or(SearchError::CountMismatch {
        expected: 1,
        found: 0,
    })
}

/// Attach an embedding to every window, all or nothing.
///
/// The windows are only modified once every batch has succeeded, so a
/// failed attachment leaves them exactly as they were.
pub async fn attach_embeddings(
    provider: &dyn EmbeddingProvider,
    windows: &mut [Window],
    batch_size: usize,
) -> Result<()> {
    let texts: Vec<String> = windows.iter().map(|w| w.text.clone()).collect();
    tracing::info!(
        windows = texts.len(),
        batch_size,
        model = provider.model_name(),
        "generating embeddings"
    );

    let vectors = embed_documents(provider, &texts, batch_size).await?;
    for (window, vector) in windows.iter_mut().zip(vectors) {
        window.embedding = Some(vector);
    }
    Ok(())
}

async fn checked_embed(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    role: EmbedRole,
) -> Result<Vec<Vec<f32>>> {
    let vectors = provider
        .embed(texts, role)
        .await
        .map_err(|e| SearchError::Provider(format!("{:#}", e)))?;

    if vectors.len() != texts.len() {
        return Err(SearchError::CountMismatch {
            expected: texts.len(),
            found: vectors.len(),
        });
    }
    let dims = provider.dims();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(SearchError::DimensionMismatch {
            expected: dims,
            found: bad.len(),
        });
    }
    Ok(vectors)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use quote_search_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
