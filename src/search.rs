//! Query a stored dataset from the command line.
//!
//! Thin wrapper over [`quote_search_core::search::search_dataset`]: resolves
//! config defaults, builds the provider, and prints results either as a
//! human-readable list or as JSON.

use anyhow::{bail, Result};

use quote_search_core::models::RankedResult;
use quote_search_core::search::{search_dataset, SearchRequest};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Run a query against a named dataset and print the results.
///
/// `top_k` falls back to `[retrieval].top_k`. Overlap suppression is on
/// unless disabled in config or by `no_dedupe`.
pub async fn run_search(
    config: &Config,
    query: &str,
    dataset: &str,
    top_k: Option<usize>,
    no_dedupe: bool,
    json: bool,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        bail!("--top-k must be >= 1");
    }
    if !config.embedding.is_enabled() {
        bail!("Search requires an embedding provider. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let req = SearchRequest {
        query,
        top_k,
        dedupe: config.retrieval.dedupe && !no_dedupe,
    };
    let results = search_dataset(&store, provider.as_ref(), dataset, &req).await;
    store.pool().close().await;
    let results = results?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }
    Ok(())
}

fn print_results(results: &[RankedResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in results.iter().enumerate() {
        let w = &result.window;
        println!(
            "#{} [{:.4}] {} / {}",
            i + 1,
            result.score,
            w.season,
            w.episode
        );
        for (speaker, text) in w.lines() {
            if speaker.is_empty() {
                println!("    {}", text);
            } else {
                println!("    {}: {}", speaker, text);
            }
        }
        println!();
    }
}
