//! Dataset build: corpus → windows → embeddings → stored dataset.
//!
//! A build either stores a complete dataset or nothing. The previous
//! dataset under the same name stays readable until the new one is
//! committed in a single transaction.

use anyhow::{bail, Result};

use quote_search_core::embedding::{attach_embeddings, EmbeddingProvider};
use quote_search_core::models::{Dataset, Line};
use quote_search_core::store::DatasetStore;
use quote_search_core::window::{build_windows, dialogue_lines};

use crate::config::Config;
use crate::corpus;
use crate::db;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Name a dataset is stored under: `<corpus>` or `<corpus>_dialogue`.
pub fn dataset_name(corpus: &str, dialogue_only: bool) -> String {
    if dialogue_only {
        format!("{}_dialogue", corpus)
    } else {
        corpus.to_string()
    }
}

/// Window and embed a parsed corpus into an in-memory [`Dataset`].
pub async fn build_dataset(
    provider: &dyn EmbeddingProvider,
    corpus_name: &str,
    lines: &[Line],
    metadata: serde_json::Value,
    window_size: usize,
    batch_size: usize,
    dialogue_only: bool,
) -> Result<Dataset> {
    let filtered;
    let lines = if dialogue_only {
        filtered = dialogue_lines(lines);
        &filtered[..]
    } else {
        lines
    };

    let mut targets = build_windows(lines, window_size)?;
    attach_embeddings(provider, &mut targets, batch_size).await?;

    Ok(Dataset {
        name: dataset_name(corpus_name, dialogue_only),
        corpus: corpus_name.to_string(),
        metadata,
        model: provider.model_name().to_string(),
        dims: provider.dims(),
        window_size,
        dialogue_only,
        created_at: chrono::Utc::now().timestamp(),
        targets,
    })
}

/// Take the per-dataset build lock.
///
/// With `force`, a lock left behind by a crashed build is cleared first.
async fn acquire_build_lock(store: &SqliteStore, name: &str, force: bool) -> Result<()> {
    if force {
        tracing::info!(dataset = name, "clearing build lock");
        store.unlock_build(name).await?;
    }
    if !store.try_lock_build(name).await? {
        bail!(
            "A build of dataset '{}' is already in progress. \
             If a previous build crashed, rerun with --force.",
            name
        );
    }
    Ok(())
}

/// Release the build lock and close the pool, then hand back the build outcome.
///
/// A failed unlock is logged rather than returned so it never masks the
/// build's own error.
async fn finish_build<T>(store: &SqliteStore, name: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = store.unlock_build(name).await {
        tracing::warn!(dataset = name, error = %e, "failed to release build lock");
    }
    store.pool().close().await;
    result
}

/// Build and store a dataset for a configured corpus.
///
/// CLI overrides take precedence over `[build]` config values.
pub async fn run_build(
    config: &Config,
    corpus_name: &str,
    window_size_override: Option<usize>,
    batch_size_override: Option<usize>,
    dialogue_only: bool,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    let corpus_cfg = config.corpus(corpus_name)?;
    let window_size = window_size_override.unwrap_or(config.build.window_size);
    let batch_size = batch_size_override.unwrap_or(config.build.batch_size);
    let dialogue_only = dialogue_only || config.build.dialogue_only;
    let name = dataset_name(corpus_name, dialogue_only);

    let lines = corpus::load_corpus(corpus_cfg)?;

    if dry_run {
        let participating = if dialogue_only {
            dialogue_lines(&lines)
        } else {
            lines.clone()
        };
        let windows = build_windows(&participating, window_size)?;
        println!("build {} (dry-run)", corpus_name);
        println!("  lines: {}", lines.len());
        println!("  participating lines: {}", participating.len());
        println!("  windows: {}", windows.len());
        println!("  dataset: {}", name);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let metadata = corpus::load_info(corpus_cfg)?;
    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    if let Err(e) = acquire_build_lock(&store, &name, force).await {
        store.pool().close().await;
        return Err(e);
    }

    let result = async {
        let dataset = build_dataset(
            provider.as_ref(),
            corpus_name,
            &lines,
            metadata,
            window_size,
            batch_size,
            dialogue_only,
        )
        .await?;
        store.save_dataset(&dataset).await?;
        Ok::<_, anyhow::Error>(dataset)
    }
    .await;

    let dataset = finish_build(&store, &name, result).await?;

    println!("build {}", corpus_name);
    println!("  lines: {}", lines.len());
    println!("  windows: {}", dataset.targets.len());
    println!("  model: {} ({} dims)", dataset.model, dataset.dims);
    println!("  dataset: {}", dataset.name);
    Ok(())
}
