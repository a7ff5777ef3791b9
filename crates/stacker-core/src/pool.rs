// Player pool: normalized, index-addressable view of the eligible players.
//
// The pool is the arena every other structure points into. Players are
// stored sorted by identifier, so iterating indices in ascending order is the
// same as iterating identifiers in ascending order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Index of a player inside a [`PlayerPool`].
pub type PlayerIndex = usize;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A roster-eligible position such as "QB", "WR" or "SP".
///
/// Positions are sport-agnostic labels. They are compared case-insensitively
/// by normalizing to trimmed upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(String);

impl Position {
    /// Parse a position label. Returns `None` for blank input.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Position(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Player input
// ---------------------------------------------------------------------------

/// A player as supplied by the projection source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub positions: Vec<String>,
    /// Salary for cap-constrained contests; absent for season-long formats.
    #[serde(default)]
    pub cost: Option<u64>,
    pub projection: f64,
    /// Opponent / game context reference.
    #[serde(default)]
    pub game: Option<String>,
}

impl Player {
    pub fn new(id: &str, positions: &[&str], projection: f64) -> Self {
        Player {
            id: id.to_string(),
            positions: positions.iter().map(|p| p.to_string()).collect(),
            cost: None,
            projection,
            game: None,
        }
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_game(mut self, game: &str) -> Self {
        self.game = Some(game.to_string());
        self
    }
}

/// A validated player held by the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub id: String,
    pub positions: BTreeSet<Position>,
    pub cost: Option<u64>,
    pub projection: f64,
    pub game: Option<String>,
}

impl PlayerRecord {
    pub fn is_eligible_for(&self, positions: &BTreeSet<Position>) -> bool {
        !self.positions.is_disjoint(positions)
    }

    /// Cost counted against a budget. Missing costs are rejected before the
    /// search runs whenever a budget is present.
    pub fn cost_or_zero(&self) -> u64 {
        self.cost.unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// PlayerPool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlayerPool {
    players: Vec<PlayerRecord>,
    by_id: HashMap<String, PlayerIndex>,
    by_position: HashMap<Position, Vec<PlayerIndex>>,
}

impl PlayerPool {
    /// Validate and index the given players.
    ///
    /// Rejects duplicate identifiers, players without any non-blank position,
    /// and non-finite projections.
    pub fn build(players: Vec<Player>) -> Result<Self, InputError> {
        let mut records = Vec::with_capacity(players.len());
        for player in players {
            let positions: BTreeSet<Position> = player
                .positions
                .iter()
                .map(|p| Position::parse(p))
                .collect::<Option<_>>()
                .unwrap_or_default();
            if positions.is_empty() {
                return Err(InputError::InvalidPosition { player: player.id });
            }
            if !player.projection.is_finite() {
                return Err(InputError::InvalidProjection {
                    value: player.projection,
                    player: player.id,
                });
            }
            records.push(PlayerRecord {
                id: player.id,
                positions,
                cost: player.cost,
                projection: player.projection,
                game: player.game,
            });
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = records.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(InputError::DuplicateIdentifier {
                player: pair[0].id.clone(),
            });
        }

        let by_id = records
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id.clone(), idx))
            .collect();

        let mut by_position: HashMap<Position, Vec<PlayerIndex>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            for pos in &record.positions {
                by_position.entry(pos.clone()).or_default().push(idx);
            }
        }

        Ok(PlayerPool {
            players: records,
            by_id,
            by_position,
        })
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, idx: PlayerIndex) -> &PlayerRecord {
        &self.players[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<PlayerIndex> {
        self.by_id.get(id).copied()
    }

    pub fn players(&self) -> impl Iterator<Item = (PlayerIndex, &PlayerRecord)> {
        self.players.iter().enumerate()
    }

    /// All players eligible for any of the given positions, in ascending
    /// identifier order.
    pub fn eligible_for(&self, positions: &BTreeSet<Position>) -> Vec<PlayerIndex> {
        let mut out: Vec<PlayerIndex> = positions
            .iter()
            .filter_map(|pos| self.by_position.get(pos))
            .flatten()
            .copied()
            .collect();
        if positions.len() > 1 {
            out.sort_unstable();
            out.dedup();
        }
        out
    }
}
