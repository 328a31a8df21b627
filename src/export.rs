//! Export a stored dataset as JSON.
//!
//! The output is the full [`Dataset`]: metadata plus every window with its
//! embedding, suitable for serving search from a static site. `f32` values
//! survive a round trip through `serde_json` unchanged.

use anyhow::{Context, Result};
use std::path::Path;

use quote_search_core::models::Dataset;
use quote_search_core::store::DatasetStore;
use quote_search_core::SearchError;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Export a dataset as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, dataset: &str, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let loaded = store.load_dataset(dataset).await;
    store.pool().close().await;

    let data = loaded?.ok_or_else(|| SearchError::DatasetNotFound(dataset.to_string()))?;
    write_dataset(&data, output)
}

fn write_dataset(data: &Dataset, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!(
                "Exported dataset '{}' ({} windows) to {}",
                data.name,
                data.targets.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
