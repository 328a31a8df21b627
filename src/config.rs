use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quote_search_core::embedding::DEFAULT_BATCH_SIZE;
use quote_search_core::search::DEFAULT_TOP_K;
use quote_search_core::window::DEFAULT_WINDOW_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub corpora: BTreeMap<String, CorpusConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub dialogue_only: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            dialogue_only: false,
        }
    }
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_dedupe")]
    pub dedupe: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            dedupe: true,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_dedupe() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Prepended to query texts (e.g. `"search_query: "`).
    #[serde(default)]
    pub query_prefix: String,
    /// Prepended to document texts (e.g. `"search_document: "`).
    #[serde(default)]
    pub document_prefix: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            query_prefix: String::new(),
            document_prefix: String::new(),
            url: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// A named script corpus: a CSV file plus an optional `info.json` sidecar.
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub info: Option<PathBuf>,
    #[serde(default)]
    pub columns: ColumnMap,
}

/// CSV header names for each [`Line`](quote_search_core::models::Line) field.
#[derive(Debug, Deserialize, Clone)]
pub struct ColumnMap {
    #[serde(default = "default_speaker_col")]
    pub speaker: String,
    #[serde(default = "default_text_col")]
    pub text: String,
    #[serde(default = "default_season_col")]
    pub season: String,
    #[serde(default = "default_episode_col")]
    pub episode: String,
    #[serde(default = "default_episode_id_col")]
    pub episode_id: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            speaker: default_speaker_col(),
            text: default_text_col(),
            season: default_season_col(),
            episode: default_episode_col(),
            episode_id: default_episode_id_col(),
        }
    }
}

fn default_speaker_col() -> String {
    "Character".to_string()
}
fn default_text_col() -> String {
    "script".to_string()
}
fn default_season_col() -> String {
    "Book".to_string()
}
fn default_episode_col() -> String {
    "ep_number".to_string()
}
fn default_episode_id_col() -> String {
    "total_number".to_string()
}

impl Config {
    /// Look up a corpus by name, with a readable error listing the known ones.
    pub fn corpus(&self, name: &str) -> Result<&CorpusConfig> {
        self.corpora.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.corpora.keys().map(String::as_str).collect();
            anyhow::anyhow!(
                "Unknown corpus '{}'. Configured corpora: {}",
                name,
                if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.build.window_size == 0 {
        bail!("build.window_size must be >= 1");
    }
    if config.build.batch_size == 0 {
        bail!("build.batch_size must be >= 1");
    }
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "hash" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, openai, ollama, or local.",
            other
        ),
    }

    if config.embedding.provider == "hash" && config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0 for the hash provider");
    }

    Ok(())
}
