//! Core data models shared by the build and query pipelines.
//!
//! [`Line`]s are parsed once from a corpus, folded into overlapping
//! [`Window`]s, embedded, and persisted together as a [`Dataset`].
//! [`RankedResult`]s only exist for the duration of a single query.

use serde::{Deserialize, Serialize};

/// One utterance or narration unit, in original script order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub speaker: String,
    pub text: String,
    /// Season label (e.g. `"Water"`, `"1"`).
    pub season: String,
    /// Episode number within the season, as a display label.
    pub episode: String,
    /// Global episode number; windows never span two different values.
    pub episode_id: i64,
    /// 0-based position of the line in the source corpus.
    pub ordinal: i64,
}

/// A fixed-size run of consecutive lines from a single episode.
///
/// The unit of semantic comparison: its `text` is what gets embedded
/// and its `line_indices` are what the deduplicator compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Contiguous ascending positions of the constituent lines.
    pub line_indices: Vec<usize>,
    /// Newline-joined `"speaker: text"` for every constituent line.
    pub text: String,
    /// Speaker of the final line in the window.
    pub speaker: String,
    pub season: String,
    pub episode: String,
    pub episode_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Window {
    /// Split the window text back into `(speaker, text)` pairs for display.
    pub fn lines(&self) -> Vec<(&str, &str)> {
        self.text
            .lines()
            .map(|l| l.split_once(": ").unwrap_or(("", l)))
            .collect()
    }
}

/// A scored target, produced at query time and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult<T = Window> {
    pub score: f32,
    pub window: T,
}

/// The persisted, query-ready collection of embedded windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name (`"atla"`, `"atla_dialogue"`).
    pub name: String,
    /// Name of the corpus the dataset was built from.
    pub corpus: String,
    /// Free-form descriptive info (title, season labels, ...).
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Embedding model that produced every vector in `targets`.
    pub model: String,
    pub dims: usize,
    pub window_size: usize,
    pub dialogue_only: bool,
    /// Build time, Unix seconds.
    pub created_at: i64,
    pub targets: Vec<Window>,
}

/// Listing entry for a stored dataset, without its windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub corpus: String,
    pub model: String,
    pub dims: usize,
    pub window_size: usize,
    pub dialogue_only: bool,
    pub created_at: i64,
    pub windows: usize,
}

impl Dataset {
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            name: self.name.clone(),
            corpus: self.corpus.clone(),
            model: self.model.clone(),
            dims: self.dims,
            window_size: self.window_size,
            dialogue_only: self.dialogue_only,
            created_at: self.created_at,
            windows: self.targets.len(),
        }
    }
}
