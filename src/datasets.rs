use anyhow::Result;

use quote_search_core::models::DatasetSummary;
use quote_search_core::store::DatasetStore;
use quote_search_core::SearchError;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Print every stored dataset, one per row.
pub async fn list_datasets(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let datasets = store.list_datasets().await;
    store.pool().close().await;
    print_table(&datasets?);
    Ok(())
}

/// Delete a dataset by name. A missing dataset is an error.
pub async fn delete_dataset(config: &Config, name: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let deleted = store.delete_dataset(name).await;
    store.pool().close().await;

    if !deleted? {
        return Err(SearchError::DatasetNotFound(name.to_string()).into());
    }
    println!("Deleted dataset '{}'.", name);
    Ok(())
}

fn print_table(datasets: &[DatasetSummary]) {
    if datasets.is_empty() {
        println!("No datasets. Run `qs build <corpus>` first.");
        return;
    }

    println!(
        "{:<24} {:>8} {:<28} {:>6} {:>4}  CREATED",
        "DATASET", "WINDOWS", "MODEL", "DIMS", "W"
    );
    for d in datasets {
        let created = chrono::DateTime::from_timestamp(d.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<24} {:>8} {:<28} {:>6} {:>4}  {}",
            d.name, d.windows, d.model, d.dims, d.window_size, created
        );
    }
}
