//! In-memory [`DatasetStore`] implementation for testing.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Datasets are cloned in and
//! out, so callers never share mutable state with the store.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Dataset, DatasetSummary};

use super::DatasetStore;

/// In-memory dataset store.
pub struct InMemoryStore {
    datasets: RwLock<HashMap<String, Dataset>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            datasets: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl DatasetStore for InMemoryStore {
    async fn save_dataset(&self, dataset: &Dataset) -> Result<()> {
        let mut datasets = self.datasets.write().map_err(poisoned)?;
        datasets.insert(dataset.name.clone(), dataset.clone());
        Ok(())
    }

    async fn load_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        let datasets = self.datasets.read().map_err(poisoned)?;
        Ok(datasets.get(name).cloned())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let datasets = self.datasets.read().map_err(poisoned)?;
        let mut summaries: Vec<DatasetSummary> = datasets.values().map(Dataset::summary).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    async fn delete_dataset(&self, name: &str) -> Result<bool> {
        let mut datasets = self.datasets.write().map_err(poisoned)?;
        Ok(datasets.remove(name).is_some())
    }
}
