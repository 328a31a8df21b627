//! Episode-bounded sliding context windows.
//!
//! Folds a sequence of script [`Line`]s into overlapping [`Window`]s of a
//! fixed size. Each window is anchored on its last line and carries the
//! preceding `size - 1` lines as context, so a single quote is searched
//! together with the exchange that led up to it.
//!
//! # Algorithm
//!
//! 1. Validate the corpus: ordinals strictly increasing, every episode one
//!    contiguous run.
//! 2. Walk the lines, tracking where the current episode's run started.
//! 3. At position `i`, emit a window over `[i - size + 1, i]` only when the
//!    current run already holds `size` lines. After an episode boundary the
//!    first window is therefore the one ending `size - 1` lines later.
//! 4. Drop windows in which every line is blank or bracketed narration.
//!
//! # Example
//!
//! ```rust
//! use quote_search_core::models::Line;
//! use quote_search_core::window::build_windows;
//!
//! let lines: Vec<Line> = (0..10)
//!     .map(|i| Line {
//!         speaker: "Aang".into(),
//!         text: format!("line {}", i),
//!         season: "Water".into(),
//!         episode: "1".into(),
//!         episode_id: 1,
//!         ordinal: i,
//!     })
//!     .collect();
//! let windows = build_windows(&lines, 5).unwrap();
//! assert_eq!(windows.len(), 6);
//! assert_eq!(windows[0].line_indices, vec![0, 1, 2, 3, 4]);
//! ```

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SearchError};
use crate::models::{Line, Window};

/// Speaker assigned to rows that have no character.
pub const NARRATOR: &str = "Narrator";

/// Default number of lines per window.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

static STAGE_DIRECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

/// Build the `(speaker, text)` pair for a raw script row.
///
/// Rows without a character are narration: they are attributed to
/// [`NARRATOR`] and their text is wrapped in brackets.
pub fn script_line(character: Option<&str>, script: &str) -> (String, String) {
    match character.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => (c.to_string(), script.to_string()),
        None => (NARRATOR.to_string(), format!("[{}]", script)),
    }
}

/// Keep only spoken dialogue.
///
/// Strips every bracketed stage direction from each line, then drops lines
/// that end up empty, that have no speaker, or that belong to the narrator.
pub fn dialogue_lines(lines: &[Line]) -> Vec<Line> {
    lines
        .iter()
        .filter_map(|line| {
            let text = strip_stage_directions(&line.text);
            let speaker = line.speaker.trim();
            if text.is_empty() || speaker.is_empty() || speaker == NARRATOR {
                return None;
            }
            Some(Line {
                text,
                ..line.clone()
            })
        })
        .collect()
}

/// Split lines into episode-bounded windows of `size` consecutive lines.
///
/// # Errors
///
/// - [`SearchError::InvalidWindowSize`] if `size == 0`.
/// - [`SearchError::MalformedCorpus`] if ordinals are not strictly
///   increasing or an episode reappears after another one started.
pub fn build_windows(lines: &[Line], size: usize) -> Result<Vec<Window>> {
    if size == 0 {
        return Err(SearchError::InvalidWindowSize);
    }
    validate_corpus(lines)?;

    let mut windows = Vec::new();
    let mut run_start = 0usize;

    for i in 0..lines.len() {
        if i > 0 && lines[i].episode_id != lines[i - 1].episode_id {
            run_start = i;
        }
        if i + 1 - run_start < size {
            continue;
        }

        let start = i + 1 - size;
        let context = &lines[start..=i];
        if context.iter().all(is_silent) {
            continue;
        }

        let anchor = &lines[i];
        windows.push(Window {
            line_indices: (start..=i).collect(),
            text: context
                .iter()
                .map(|l| format!("{}: {}", l.speaker, l.text))
                .collect::<Vec<_>>()
                .join("\n"),
            speaker: anchor.speaker.clone(),
            season: anchor.season.clone(),
            episode: anchor.episode.clone(),
            episode_id: anchor.episode_id,
            embedding: None,
        });
    }

    tracing::debug!(
        lines = lines.len(),
        size,
        windows = windows.len(),
        "built context windows"
    );
    Ok(windows)
}

/// Remove `[...]` spans and collapse the whitespace they leave behind.
fn strip_stage_directions(text: &str) -> String {
    STAGE_DIRECTION
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Nothing but whitespace and bracketed spans.
fn is_silent(line: &Line) -> bool {
    strip_stage_directions(&line.text).is_empty()
}

fn validate_corpus(lines: &[Line]) -> Result<()> {
    let mut finished: HashSet<i64> = HashSet::new();

    for pair in lines.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.ordinal <= prev.ordinal {
            return Err(SearchError::MalformedCorpus {
                ordinal: cur.ordinal,
                reason: format!("ordinal does not follow {}", prev.ordinal),
            });
        }
        if cur.episode_id != prev.episode_id {
            finished.insert(prev.episode_id);
            if finished.contains(&cur.episode_id) {
                return Err(SearchError::MalformedCorpus {
                    ordinal: cur.ordinal,
                    reason: format!("episode {} is not contiguous", cur.episode_id),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ordinal: i64, episode_id: i64, speaker: &str, text: &str) -> Line {
        Line {
            speaker: speaker.to_string(),
            text: text.to_string(),
            season: "Water".to_string(),
            episode: episode_id.to_string(),
            episode_id,
            ordinal,
        }
    }

    fn corpus(episodes: &[(i64, usize)]) -> Vec<Line> {
        let mut lines = Vec::new();
        for &(ep, n) in episodes {
            for _ in 0..n {
                let i = lines.len() as i64;
                lines.push(line(i, ep, "Katara", &format!("line {}", i)));
            }
        }
        lines
    }

    #[test]
    fn test_single_episode_ten_lines() {
        let windows = build_windows(&corpus(&[(1, 10)]), 5).unwrap();
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[0].line_indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(windows[5].line_indices, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_split_at_line_seven() {
        let windows = build_windows(&corpus(&[(1, 7), (2, 3)]), 5).unwrap();
        let spans: Vec<_> = windows.iter().map(|w| w.line_indices.clone()).collect();
        assert_eq!(
            spans,
            vec![
                vec![0, 1, 2, 3, 4],
                vec![1, 2, 3, 4, 5],
                vec![2, 3, 4, 5, 6]
            ]
        );
        assert!(windows
            .iter()
            .all(|w| !(w.line_indices.contains(&6) && w.line_indices.contains(&7))));
    }

    #[test]
    fn test_second_episode_starts_after_full_run() {
        let windows = build_windows(&corpus(&[(1, 3), (2, 6)]), 3).unwrap();
        let spans: Vec<_> = windows.iter().map(|w| w.line_indices.clone()).collect();
        assert_eq!(
            spans,
            vec![
                vec![0, 1, 2],
                vec![3, 4, 5],
                vec![4, 5, 6],
                vec![5, 6, 7],
                vec![6, 7, 8]
            ]
        );
        assert_eq!(windows[1].episode_id, 2);
    }

    #[test]
    fn test_windows_never_cross_episodes() {
        let lines = corpus(&[(1, 4), (2, 1), (3, 9), (4, 2), (5, 7)]);
        for size in 1..=8 {
            for w in build_windows(&lines, size).unwrap() {
                assert_eq!(w.line_indices.len(), size);
                for pair in w.line_indices.windows(2) {
                    assert_eq!(pair[1], pair[0] + 1, "not contiguous: {:?}", w.line_indices);
                }
                let ep = lines[w.line_indices[0]].episode_id;
                assert!(w.line_indices.iter().all(|&i| lines[i].episode_id == ep));
                assert_eq!(w.episode_id, ep);
            }
        }
    }

    #[test]
    fn test_window_size_one_emits_every_line() {
        let windows = build_windows(&corpus(&[(1, 2), (2, 2)]), 1).unwrap();
        assert_eq!(windows.len(), 4);
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let err = build_windows(&corpus(&[(1, 3)]), 0).unwrap_err();
        assert!(matches!(err, SearchError::InvalidWindowSize));
    }

    #[test]
    fn test_short_corpus_yields_nothing() {
        assert!(build_windows(&corpus(&[(1, 4)]), 5).unwrap().is_empty());
        assert!(build_windows(&[], 5).unwrap().is_empty());
    }

    #[test]
    fn test_text_and_anchor_fields() {
        let lines = vec![
            line(0, 1, "Sokka", "I'm just a guy with a boomerang."),
            line(1, 1, "Aang", "Let's go penguin sledding!"),
        ];
        let windows = build_windows(&lines, 2).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(
            windows[0].text,
            "Sokka: I'm just a guy with a boomerang.\nAang: Let's go penguin sledding!"
        );
        assert_eq!(windows[0].speaker, "Aang");
        assert!(windows[0].embedding.is_none());
    }

    #[test]
    fn test_all_narration_window_dropped() {
        let lines = vec![
            line(0, 1, NARRATOR, "[The ice cracks.]"),
            line(1, 1, NARRATOR, "[Appa groans.]"),
            line(2, 1, "Katara", "Aang!"),
        ];
        let windows = build_windows(&lines, 2).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].line_indices, vec![1, 2]);
    }

    #[test]
    fn test_dialogue_between_stage_directions_is_kept() {
        let lines = vec![line(0, 1, "Zuko", "[Bows.] Thank you, Uncle. [Leaves.]")];
        let windows = build_windows(&lines, 1).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "Zuko: [Bows.] Thank you, Uncle. [Leaves.]");

        let lines = vec![line(0, 1, "Zuko", " [Bows.]  [Leaves.] ")];
        assert!(build_windows(&lines, 1).unwrap().is_empty());
    }

    #[test]
    fn test_reappearing_episode_is_malformed() {
        let lines = corpus(&[(1, 2), (2, 2), (1, 2)]);
        let err = build_windows(&lines, 2).unwrap_err();
        assert!(matches!(err, SearchError::MalformedCorpus { ordinal: 4, .. }));
    }

    #[test]
    fn test_unordered_ordinals_are_malformed() {
        let lines = vec![line(3, 1, "Zuko", "Honor!"), line(2, 1, "Iroh", "Tea?")];
        let err = build_windows(&lines, 1).unwrap_err();
        assert!(matches!(err, SearchError::MalformedCorpus { ordinal: 2, .. }));
    }

    #[test]
    fn test_script_line_narration() {
        assert_eq!(
            script_line(Some("Zuko"), "I must capture the Avatar."),
            ("Zuko".to_string(), "I must capture the Avatar.".to_string())
        );
        assert_eq!(
            script_line(None, "Water swirls."),
            (NARRATOR.to_string(), "[Water swirls.]".to_string())
        );
        assert_eq!(script_line(Some("  "), "x").0, NARRATOR);
    }

    #[test]
    fn test_dialogue_lines_strips_and_filters() {
        let lines = vec![
            line(0, 1, NARRATOR, "[Fade in.]"),
            line(1, 1, "Sokka", "[Angrily] Aang! [Points] Get back here."),
            line(2, 1, "Aang", "[Laughs.]"),
            line(3, 1, "", "No speaker"),
            line(4, 1, "Katara", "  Hello  "),
        ];
        let kept = dialogue_lines(&lines);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].text, "Aang! Get back here.");
        assert_eq!(kept[0].ordinal, 1);
        assert_eq!(kept[1].text, "Hello");
    }

    #[test]
    fn test_dialogue_only_windows_use_filtered_positions() {
        let lines = vec![
            line(0, 1, "Sokka", "One"),
            line(1, 1, NARRATOR, "[Pause]"),
            line(2, 1, "Katara", "Two"),
            line(3, 1, "Aang", "Three"),
        ];
        let windows = build_windows(&dialogue_lines(&lines), 3).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].line_indices, vec![0, 1, 2]);
        assert_eq!(windows[0].text, "Sokka: One\nKatara: Two\nAang: Three");
    }
}
