//! CSV script ingestion.
//!
//! Reads a corpus CSV (one row per script line, with headers) into
//! [`Line`]s using the configured [`ColumnMap`], and loads the optional
//! `info.json` sidecar that becomes the dataset's metadata.
//!
//! Rows with an empty speaker column are narration and are stored as
//! `Narrator: [text]`.

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

use quote_search_core::models::Line;
use quote_search_core::window::script_line;

use crate::config::{ColumnMap, CorpusConfig};

/// Load every line of a corpus, in file order.
pub fn load_corpus(corpus: &CorpusConfig) -> Result<Vec<Line>> {
    tracing::info!(path = %corpus.path.display(), "reading corpus CSV");
    let file = std::fs::File::open(&corpus.path)
        .with_context(|| format!("Failed to open corpus file: {}", corpus.path.display()))?;
    parse_lines(file, &corpus.columns)
        .with_context(|| format!("Failed to parse corpus file: {}", corpus.path.display()))
}

/// Load the `info.json` sidecar, or an empty object when none is configured.
pub fn load_info(corpus: &CorpusConfig) -> Result<serde_json::Value> {
    let path = match &corpus.info {
        Some(p) => p,
        None => return Ok(serde_json::json!({})),
    };
    read_info(path)
}

fn read_info(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus info: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse corpus info: {}", path.display()))?;
    if !value.is_object() {
        bail!("Corpus info must be a JSON object: {}", path.display());
    }
    Ok(value)
}

struct ColumnIndex {
    speaker: usize,
    text: usize,
    season: usize,
    episode: usize,
    episode_id: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnMap) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("missing required column '{}'", name))
        };
        Ok(Self {
            speaker: find(&columns.speaker)?,
            text: find(&columns.text)?,
            season: find(&columns.season)?,
            episode: find(&columns.episode)?,
            episode_id: find(&columns.episode_id)?,
        })
    }
}

/// Parse CSV content into lines. Fails on the first bad row.
pub fn parse_lines<R: Read>(reader: R, columns: &ColumnMap) -> Result<Vec<Line>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let idx = ColumnIndex::resolve(rdr.headers()?, columns)?;
    let mut lines = Vec::new();

    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("row {}", row + 1))?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let episode_id_raw = field(idx.episode_id);
        let episode_id = parse_episode_id(episode_id_raw).ok_or_else(|| {
            anyhow!(
                "row {}: column '{}' is not an episode number: '{}'",
                row + 1,
                columns.episode_id,
                episode_id_raw
            )
        })?;

        let (speaker, text) = script_line(Some(field(idx.speaker)), field(idx.text));
        lines.push(Line {
            speaker,
            text,
            season: field(idx.season).to_string(),
            episode: field(idx.episode).to_string(),
            episode_id,
            ordinal: row as i64,
        });
    }

    tracing::debug!(lines = lines.len(), "parsed corpus");
    Ok(lines)
}

/// Accepts `"12"` and spreadsheet-style `"12.0"`.
fn parse_episode_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}
