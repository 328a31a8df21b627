use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const SPEAKERS: [&str; 5] = ["Aang", "Katara", "Sokka", "Zuko", "Iroh"];

const QUOTES: [&str; 30] = [
    "Water. Earth. Fire. Air.",
    "It's not getting away from me this time.",
    "Sokka, look!",
    "Why are you always so sarcastic?",
    "I'm just a kid.",
    "Boomerang! You do always come back.",
    "My first glider ride was the best day of my life.",
    "We have to go to the North Pole.",
    "I've never been so happy to see a penguin.",
    "The moon spirit gave her life for us.",
    "Sharing tea with a fascinating stranger is one of life's true delights.",
    "Pride is not the opposite of shame but its source.",
    "You must never give in to despair.",
    "Leaves from the vine falling so slow.",
    "I must capture the Avatar to regain my honor.",
    "That's rough buddy.",
    "Life happens wherever you are whether you make it or not.",
    "Sometimes the best way to solve your own problems is to help someone else.",
    "Destiny is a funny thing.",
    "Hope is something you give yourself.",
    "Cabbages! My cabbages!",
    "Flameo hotman.",
    "I am the greatest earthbender in the world.",
    "It's time for you to look inward and begin asking yourself the big questions.",
    "Who are you and what do you want?",
    "Being a fire nation prince is harder than it looks.",
    "The swamp is alive and it's watching us.",
    "I'm not going to run anymore.",
    "Everything changed when the Fire Nation attacked.",
    "Secret tunnel! Through the mountains!",
];

fn qs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_qs"))
}

/// Three episodes, each opening with one narration row followed by ten
/// dialogue lines.
fn corpus_csv() -> String {
    let mut csv = String::from("id,Book,ep_number,total_number,Character,script\n");
    let mut id = 1;
    for ep in 0..3 {
        csv.push_str(&format!(
            "{},Water,{},{},,\"Scene opens on episode {}.\"\n",
            id,
            ep + 1,
            ep + 1,
            ep + 1
        ));
        id += 1;
        for n in 0..10 {
            let q = ep * 10 + n;
            csv.push_str(&format!(
                "{},Water,{},{},{},\"{}\"\n",
                id,
                ep + 1,
                ep + 1,
                SPEAKERS[q % SPEAKERS.len()],
                QUOTES[q]
            ));
            id += 1;
        }
    }
    csv
}

fn write_config(root: &Path, dims: usize) -> PathBuf {
    let config_content = format!(
        r#"[db]
path = '{root}/data/qs.sqlite'

[build]
window_size = 3
batch_size = 4

[embedding]
provider = "hash"
dims = {dims}

[corpora.atla]
path = '{root}/corpus/dataset.csv'
info = '{root}/corpus/info.json'
"#,
        root = root.display(),
        dims = dims
    );

    let config_path = root.join("config").join("qs.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    let corpus_dir = root.join("corpus");
    fs::create_dir_all(&corpus_dir).unwrap();
    fs::write(corpus_dir.join("dataset.csv"), corpus_csv()).unwrap();
    fs::write(
        corpus_dir.join("info.json"),
        r#"{"title": "Avatar: The Last Airbender", "seasons": ["Water", "Earth", "Fire"]}"#,
    )
    .unwrap();

    let config_path = write_config(&root, 64);
    (tmp, config_path)
}

fn run_qs(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = qs_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qs binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn init_and_build(config_path: &Path, extra: &[&str]) {
    let (_, stderr, success) = run_qs(config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    let mut args = vec!["build", "atla"];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_qs(config_path, &args);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
}

fn search_json(config_path: &Path, args: &[&str]) -> Vec<serde_json::Value> {
    let mut full = vec!["search"];
    full.extend_from_slice(args);
    full.push("--json");
    let (stdout, stderr, success) = run_qs(config_path, &full);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    value.as_array().unwrap().clone()
}

fn line_indices(result: &serde_json::Value) -> Vec<u64> {
    result["window"]["line_indices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect()
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success1) = run_qs(&config_path, &["init"]);
    assert!(success1, "First init failed");
    assert!(stdout.contains("initialized"));

    let (_, _, success2) = run_qs(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_build_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    run_qs(&config_path, &["init"]);
    let (stdout, stderr, success) = run_qs(&config_path, &["build", "atla"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("lines: 33"), "{}", stdout);
    // 11 lines per episode, window 3: 9 windows each.
    assert!(stdout.contains("windows: 27"), "{}", stdout);
    assert!(stdout.contains("model: hash (64 dims)"), "{}", stdout);
}

#[test]
fn test_build_dry_run_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();

    run_qs(&config_path, &["init"]);
    let (stdout, _, success) = run_qs(&config_path, &["build", "atla", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("windows: 27"), "{}", stdout);

    let (stdout, _, success) = run_qs(&config_path, &["datasets"]);
    assert!(success);
    assert!(stdout.contains("No datasets"), "{}", stdout);
}

#[test]
fn test_build_unknown_corpus_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_qs(&config_path, &["init"]);
    let (_, stderr, success) = run_qs(&config_path, &["build", "lok"]);
    assert!(!success);
    assert!(stderr.contains("Unknown corpus"), "{}", stderr);
}

#[test]
fn test_search_finds_matching_window() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let (stdout, stderr, success) = run_qs(
        &config_path,
        &[
            "search",
            "sharing tea with a fascinating stranger",
            "--dataset",
            "atla",
            "--top-k",
            "3",
        ],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let first = stdout.split("#2").next().unwrap();
    assert!(first.starts_with("#1 ["), "{}", stdout);
    assert!(first.contains("fascinating stranger"), "{}", stdout);
}

#[test]
fn test_search_results_are_sorted_and_disjoint() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let results = search_json(&config_path, &["honor and destiny", "--dataset", "atla"]);
    assert!(!results.is_empty());

    let scores: Vec<f64> = results
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{:?}", scores);

    let mut seen = std::collections::HashSet::new();
    for r in &results {
        for i in line_indices(r) {
            assert!(seen.insert(i), "line {} appears in two results", i);
        }
    }
}

#[test]
fn test_top_k_larger_than_dataset_returns_all() {
    let (_tmp, config_path) = setup_test_env();
    // Window size 1: the three narration-only windows are dropped.
    init_and_build(&config_path, &["--window-size", "1"]);

    let results = search_json(
        &config_path,
        &["fire", "--dataset", "atla", "--top-k", "100", "--no-dedupe"],
    );
    assert_eq!(results.len(), 30);
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let args = ["search", "the avatar", "--dataset", "atla"];
    let (stdout1, _, _) = run_qs(&config_path, &args);
    let (stdout2, _, _) = run_qs(&config_path, &args);
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_blank_query_returns_no_results() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let (stdout, _, success) = run_qs(&config_path, &["search", "   ", "--dataset", "atla"]);
    assert!(success);
    assert!(stdout.contains("No results."), "{}", stdout);
}

#[test]
fn test_missing_dataset_is_an_error() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let (_, stderr, success) = run_qs(&config_path, &["search", "tea", "--dataset", "lok"]);
    assert!(!success);
    assert!(stderr.contains("dataset not found"), "{}", stderr);
}

#[test]
fn test_provider_change_requires_rebuild() {
    let (tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    write_config(tmp.path(), 32);
    let (_, stderr, success) = run_qs(&config_path, &["search", "tea", "--dataset", "atla"]);
    assert!(!success);
    assert!(stderr.contains("rebuild"), "{}", stderr);
}

#[test]
fn test_dialogue_only_dataset() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &["--dialogue-only"]);

    let (stdout, _, success) = run_qs(&config_path, &["datasets"]);
    assert!(success);
    assert!(stdout.contains("atla_dialogue"), "{}", stdout);

    let results = search_json(
        &config_path,
        &["scene opens", "--dataset", "atla_dialogue", "--top-k", "100"],
    );
    for r in &results {
        let text = r["window"]["text"].as_str().unwrap();
        assert!(!text.contains("Narrator"), "{}", text);
    }
}

#[test]
fn test_rebuild_replaces_dataset() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let (stdout, _, success) = run_qs(&config_path, &["build", "atla", "--window-size", "5"]);
    assert!(success);
    assert!(stdout.contains("windows: 21"), "{}", stdout);

    let (stdout, _, _) = run_qs(&config_path, &["datasets"]);
    assert_eq!(stdout.lines().filter(|l| l.starts_with("atla ")).count(), 1);
    assert!(stdout.contains("21"), "{}", stdout);
}

#[test]
fn test_export_roundtrip() {
    let (tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let out = tmp.path().join("site").join("atla.json");
    let (_, stderr, success) = run_qs(
        &config_path,
        &["export", "atla", "--output", out.to_str().unwrap()],
    );
    assert!(success, "export failed: {}", stderr);
    assert!(stderr.contains("27 windows"), "{}", stderr);

    let data: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(data["name"], "atla");
    assert_eq!(data["metadata"]["title"], "Avatar: The Last Airbender");
    assert_eq!(data["model"], "hash");
    let targets = data["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 27);
    assert!(targets
        .iter()
        .all(|t| t["embedding"].as_array().unwrap().len() == 64));
}

#[test]
fn test_export_missing_dataset_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_qs(&config_path, &["init"]);

    let (_, stderr, success) = run_qs(&config_path, &["export", "atla"]);
    assert!(!success);
    assert!(stderr.contains("dataset not found"), "{}", stderr);
}

#[test]
fn test_delete_dataset() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &[]);

    let (stdout, stderr, success) = run_qs(&config_path, &["delete", "atla"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(stdout.contains("Deleted dataset 'atla'"), "{}", stdout);

    let (stdout, _, _) = run_qs(&config_path, &["datasets"]);
    assert!(stdout.contains("No datasets"), "{}", stdout);

    let (_, stderr, success) = run_qs(&config_path, &["delete", "atla"]);
    assert!(!success);
    assert!(stderr.contains("dataset not found"), "{}", stderr);
}

#[test]
fn test_build_with_force_succeeds() {
    let (_tmp, config_path) = setup_test_env();
    init_and_build(&config_path, &["--force"]);

    let (stdout, _, success) = run_qs(&config_path, &["datasets"]);
    assert!(success);
    assert!(stdout.contains("atla"), "{}", stdout);
}
