//! Storage abstraction for built datasets.
//!
//! The [`DatasetStore`] trait defines the persistence operations needed by
//! the build and query pipelines, so the core algorithms can run against
//! SQLite in the app and an in-memory map in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Dataset, DatasetSummary};

/// Abstract storage backend for datasets.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save_dataset`](DatasetStore::save_dataset) | Atomically insert or replace a dataset |
/// | [`load_dataset`](DatasetStore::load_dataset) | Load a dataset with all windows and vectors |
/// | [`list_datasets`](DatasetStore::list_datasets) | Summaries of every stored dataset |
/// | [`delete_dataset`](DatasetStore::delete_dataset) | Remove a dataset and its windows |
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Insert or replace a dataset.
    ///
    /// Readers see either the previous dataset or the new one in full,
    /// never a mix.
    async fn save_dataset(&self, dataset: &Dataset) -> Result<()>;

    /// Load a dataset by name, with windows in their original order.
    async fn load_dataset(&self, name: &str) -> Result<Option<Dataset>>;

    /// List stored datasets, ordered by name.
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>>;

    /// Delete a dataset. Returns `false` if it did not exist.
    async fn delete_dataset(&self, name: &str) -> Result<bool>;
}
