//! Typed errors for the build and query pipelines.
//!
//! Each variant maps to one failure class that callers need to tell apart:
//! bad input, a misbehaving provider, a stale dataset, or a missing dataset.
//! An empty result list is never an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("window size must be >= 1")]
    InvalidWindowSize,

    #[error("embedding batch size must be >= 1")]
    InvalidBatchSize,

    #[error("malformed corpus at line {ordinal}: {reason}")]
    MalformedCorpus { ordinal: i64, reason: String },

    #[error("embedding provider failed: {0}")]
    Provider(String),

    #[error("embedding provider returned {found} vectors for {expected} texts")]
    CountMismatch { expected: usize, found: usize },

    #[error("vector dimensionality mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("window {index} has no embedding")]
    MissingEmbedding { index: usize },

    #[error(
        "dataset '{dataset}' was embedded with {dataset_model} ({dataset_dims} dims) \
         but the provider is {provider_model} ({provider_dims} dims); rebuild the dataset"
    )]
    ProviderMismatch {
        dataset: String,
        dataset_model: String,
        dataset_dims: usize,
        provider_model: String,
        provider_dims: usize,
    },

    #[error("dataset not found: '{0}'")]
    DatasetNotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
