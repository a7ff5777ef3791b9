// Player and synergy data loading from CSV.
//
// Players: `id, positions, cost, projection, game` with positions separated
// by `/`. Synergies: `player_a, player_b, bonus, reason`. Malformed rows are
// skipped with a warning; structural problems (duplicate ids, unknown synergy
// endpoints) are left for the optimizer to report.

use serde::Deserialize;
use stacker_core::{Player, SynergyEdge};
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Players CSV row. Columns beyond these are ignored.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: String,
    positions: String,
    #[serde(default)]
    cost: Option<u64>,
    projection: f64,
    #[serde(default)]
    game: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSynergy {
    player_a: String,
    player_b: String,
    bonus: f64,
    #[serde(default)]
    reason: String,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => {
                let id = raw.id.trim().to_string();
                if !raw.projection.is_finite() {
                    warn!("skipping player '{}': non-finite projection", id);
                    continue;
                }
                players.push(Player {
                    id,
                    positions: raw
                        .positions
                        .split('/')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect(),
                    cost: raw.cost,
                    projection: raw.projection,
                    game: raw
                        .game
                        .map(|g| g.trim().to_string())
                        .filter(|g| !g.is_empty()),
                });
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_synergies_from_reader<R: Read>(rdr: R) -> Result<Vec<SynergyEdge>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut edges = Vec::new();
    for result in reader.deserialize::<RawSynergy>() {
        match result {
            Ok(raw) => {
                let (a, b) = (raw.player_a.trim(), raw.player_b.trim());
                if !raw.bonus.is_finite() {
                    warn!("skipping synergy '{}'/'{}': non-finite bonus", a, b);
                    continue;
                }
                edges.push(SynergyEdge::new(a, b, raw.bonus, raw.reason.trim()));
            }
            Err(e) => {
                warn!("skipping malformed synergy row: {}", e);
            }
        }
    }
    Ok(edges)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load the player pool from a CSV file. At least one valid row is required.
pub fn load_players(path: &Path) -> Result<Vec<Player>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let players = load_players_from_reader(file).map_err(|e| SourceError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if players.is_empty() {
        return Err(SourceError::Validation(format!(
            "player CSV {} produced zero valid rows",
            path.display()
        )));
    }
    Ok(players)
}

/// Load synergy edges from a CSV file. An empty file is a valid graph.
pub fn load_synergies(path: &Path) -> Result<Vec<SynergyEdge>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_synergies_from_reader(file).map_err(|e| SourceError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
