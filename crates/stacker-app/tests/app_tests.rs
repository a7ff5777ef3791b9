// Integration tests for the stacker application shell.
//
// These run the config -> CSV -> optimizer -> JSON path end to end against
// the fixtures in tests/fixtures, using temp directories for config files.

use std::fs;
use std::path::{Path, PathBuf};

use stacker_app::batch::{self, Outcome};
use stacker_app::config::load_config_from;
use stacker_core::Termination;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn fixture(name: &str) -> PathBuf {
    std::env::current_dir().unwrap().join(FIXTURES).join(name)
}

const OPTIMIZER_TOML: &str = r#"
[search]
iteration_budget = 100000
exact_max_open_slots = 4

[report]
max_stack_partners = 3
max_realized_edges = 5
"#;

fn classic_contest(name: &str, extra: &str) -> String {
    format!(
        r#"
[[contest]]
name = "{name}"
players = '{players}'
synergies = '{synergies}'
budget = 50000
{extra}

[[contest.slot]]
label = "QB"
positions = ["QB"]
count = 1

[[contest.slot]]
label = "RB"
positions = ["RB"]
count = 2

[[contest.slot]]
label = "WR"
positions = ["WR"]
count = 3

[[contest.slot]]
label = "TE"
positions = ["TE"]
count = 1

[[contest.slot]]
label = "FLEX"
positions = ["RB", "WR", "TE"]
count = 1
"#,
        players = fixture("players.csv").display(),
        synergies = fixture("synergies.csv").display(),
    )
}

fn write_config(dir_name: &str, contests: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(dir_name);
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(tmp.join("config")).unwrap();
    fs::write(tmp.join("config/optimizer.toml"), OPTIMIZER_TOML).unwrap();
    fs::write(tmp.join("config/contests.toml"), contests).unwrap();
    tmp
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

// ===========================================================================
// Batch runs
// ===========================================================================

#[tokio::test]
async fn classic_contest_is_optimized_under_the_cap() {
    let tmp = write_config("stacker_app_classic", &classic_contest("classic", ""));
    let config = load_config_from(&tmp).unwrap();

    let outcomes = batch::run_all(&config, &tmp).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].contest, "classic");

    let Outcome::Optimized(result) = &outcomes[0].outcome else {
        panic!("expected optimized outcome, got {:?}", outcomes[0].outcome);
    };
    assert_eq!(result.lineup.slots.len(), 8);
    assert!(result.lineup.total_cost.unwrap() <= 50_000);
    assert_eq!(result.termination, Termination::Converged);
    assert!(result.report.stack_partners.len() <= 3);
    assert!(result.lineup.total_value >= result.seed_value - 1e-9);

    cleanup(&tmp);
}

#[tokio::test]
async fn failing_contest_does_not_abort_the_batch() {
    let contests = format!(
        "{}{}",
        classic_contest("good", ""),
        classic_contest("bad", r#"locked = ["nobody"]"#)
    );
    let tmp = write_config("stacker_app_partial_failure", &contests);
    let config = load_config_from(&tmp).unwrap();

    let outcomes = batch::run_all(&config, &tmp).await;
    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].is_failure());
    match &outcomes[1].outcome {
        Outcome::Failed { error, internal } => {
            assert!(error.contains("nobody"), "unexpected error: {error}");
            assert!(!internal);
        }
        other => panic!("expected failure, got {other:?}"),
    }

    cleanup(&tmp);
}

#[tokio::test]
async fn missing_player_file_is_reported_per_contest() {
    let contests = r#"
[[contest]]
name = "missing"
players = "no/such/players.csv"

[[contest.slot]]
label = "QB"
positions = ["QB"]
count = 1
"#;
    let tmp = write_config("stacker_app_missing_file", contests);
    let config = load_config_from(&tmp).unwrap();

    let outcomes = batch::run_all(&config, &tmp).await;
    assert!(outcomes[0].is_failure());

    cleanup(&tmp);
}

#[tokio::test]
async fn outcomes_render_as_tagged_json() {
    let tmp = write_config("stacker_app_json", &classic_contest("classic", ""));
    let config = load_config_from(&tmp).unwrap();

    let outcomes = batch::run_all(&config, &tmp).await;
    let json: serde_json::Value = serde_json::to_value(&outcomes[0]).unwrap();
    assert_eq!(json["contest"], "classic");
    assert_eq!(json["status"], "optimized");
    assert_eq!(json["termination"], "converged");
    assert!(json["lineup"]["slots"].as_array().unwrap().len() == 8);
    assert!(json["report"]["realized_edges"].is_array());

    cleanup(&tmp);
}

#[tokio::test]
async fn repeated_batches_are_identical_without_time_limit() {
    let tmp = write_config("stacker_app_determinism", &classic_contest("classic", ""));
    let config = load_config_from(&tmp).unwrap();

    let first = serde_json::to_string(&batch::run_all(&config, &tmp).await).unwrap();
    let second = serde_json::to_string(&batch::run_all(&config, &tmp).await).unwrap();
    assert_eq!(first, second);

    cleanup(&tmp);
}

// ===========================================================================
// Fixture loading
// ===========================================================================

#[test]
fn fixture_players_load() {
    let players = stacker_app::source::load_players(&fixture("players.csv")).unwrap();
    assert_eq!(players.len(), 23);
    let samuel = players.iter().find(|p| p.id == "samuel").unwrap();
    assert_eq!(samuel.positions, vec!["WR", "RB"]);
}

#[test]
fn malformed_fixture_rows_are_skipped() {
    let players = stacker_app::source::load_players(&fixture("players_malformed.csv")).unwrap();
    let ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["qb1", "wr1", "flex1"]);
    assert_eq!(players[1].cost, None);
}
