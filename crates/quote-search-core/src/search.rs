//! Query pipeline: score, rank, dedupe.
//!
//! The algorithm operates on an already-built [`Dataset`] and a provider
//! handle. The only suspension point is the single query-embedding call;
//! the dataset is only ever read.
//!
//! # Algorithm
//!
//! 1. Check that the dataset was embedded by the same model with the same
//!    dimensionality as the provider.
//! 2. Embed the query (query role).
//! 3. Score every target by raw dot product (no normalization).
//! 4. Stable sort by score, descending.
//! 5. Optionally drop results whose lines overlap a higher-ranked result.
//! 6. Truncate to `top_k`.

use std::borrow::Borrow;
use std::collections::HashSet;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::{Result, SearchError};
use crate::models::{Dataset, RankedResult, Window};
use crate::store::DatasetStore;

/// Default number of results returned to the caller.
pub const DEFAULT_TOP_K: usize = 100;

/// Bundles the inputs for a single query.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Maximum results to return.
    pub top_k: usize,
    /// Drop results that share lines with a higher-ranked result.
    pub dedupe: bool,
}

/// Inner product of two vectors.
///
/// # Errors
///
/// [`SearchError::DimensionMismatch`] when the lengths differ.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(SearchError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

/// Score a query vector against each target, in target order.
pub fn score<'a, I>(query: &[f32], targets: I) -> Result<Vec<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    targets.into_iter().map(|t| dot(query, t)).collect()
}

/// Score a query against every window of a dataset.
///
/// # Errors
///
/// [`SearchError::MissingEmbedding`] for a window that was never embedded,
/// [`SearchError::DimensionMismatch`] for a vector of the wrong length.
pub fn score_windows(query: &[f32], windows: &[Window]) -> Result<Vec<f32>> {
    let vectors = windows
        .iter()
        .enumerate()
        .map(|(index, w)| {
            w.embedding
                .as_deref()
                .ok_or(SearchError::MissingEmbedding { index })
        })
        .collect::<Result<Vec<&[f32]>>>()?;
    score(query, vectors)
}

/// Pair scores with their targets and sort by score, descending.
///
/// The sort is stable: targets with equal scores keep their input order.
/// Nothing is truncated.
pub fn rank<T, I>(scores: &[f32], targets: I) -> Result<Vec<RankedResult<T>>>
where
    I: IntoIterator<Item = T>,
{
    let targets: Vec<T> = targets.into_iter().collect();
    if targets.len() != scores.len() {
        return Err(SearchError::CountMismatch {
            expected: scores.len(),
            found: targets.len(),
        });
    }

    let mut ranked: Vec<RankedResult<T>> = scores
        .iter()
        .zip(targets)
        .map(|(&score, window)| RankedResult { score, window })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(ranked)
}

/// Greedy overlap suppression over a ranked list.
///
/// Walks from the highest score down, keeping a result only if none of its
/// line indices were claimed by an earlier kept result. Kept results stay
/// in order and their line sets are pairwise disjoint.
pub fn dedupe<W: Borrow<Window>>(ranked: Vec<RankedResult<W>>) -> Vec<RankedResult<W>> {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut unique = Vec::with_capacity(ranked.len());

    for result in ranked {
        let indices = &result.window.borrow().line_indices;
        if indices.iter().any(|i| seen.contains(i)) {
            continue;
        }
        seen.extend(indices.iter().copied());
        unique.push(result);
    }
    unique
}

/// Reject a provider that cannot produce vectors comparable to the dataset.
pub fn check_compatible(dataset: &Dataset, provider: &dyn EmbeddingProvider) -> Result<()> {
    if dataset.model != provider.model_name() || dataset.dims != provider.dims() {
        return Err(SearchError::ProviderMismatch {
            dataset: dataset.name.clone(),
            dataset_model: dataset.model.clone(),
            dataset_dims: dataset.dims,
            provider_model: provider.model_name().to_string(),
            provider_dims: provider.dims(),
        });
    }
    Ok(())
}

/// Run a query against an in-memory dataset.
///
/// A blank query returns an empty list. `top_k` larger than the number of
/// surviving results returns all of them.
pub async fn search(
    provider: &dyn EmbeddingProvider,
    dataset: &Dataset,
    req: &SearchRequest<'_>,
) -> Result<Vec<RankedResult>> {
    check_compatible(dataset, provider)?;

    if req.query.trim().is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        dataset = %dataset.name,
        targets = dataset.targets.len(),
        "ranking targets for query"
    );

    let query_vec = embed_query(provider, req.query).await?;
    let scores = score_windows(&query_vec, &dataset.targets)?;
    let mut ranked = rank(&scores, dataset.targets.iter())?;
    if req.dedupe {
        ranked = dedupe(ranked);
    }
    ranked.truncate(req.top_k);

    Ok(ranked
        .into_iter()
        .map(|r| RankedResult {
            score: r.score,
            window: r.window.clone(),
        })
        .collect())
}

/// Load a dataset by name from a store and query it.
///
/// # Errors
///
/// [`SearchError::DatasetNotFound`] when no dataset with that name exists,
/// which is distinct from a successful query with no results.
pub async fn search_dataset<S: DatasetStore + ?Sized>(
    store: &S,
    provider: &dyn EmbeddingProvider,
    dataset_name: &str,
    req: &SearchRequest<'_>,
) -> Result<Vec<RankedResult>> {
    let dataset = store
        .load_dataset(dataset_name)
        .await?
        .ok_or_else(|| SearchError::DatasetNotFound(dataset_name.to_string()))?;
    search(provider, &dataset, req).await
}
