// Synergy graph: sparse, undirected, weighted pair bonuses.
//
// Stored as adjacency lists indexed by pool index. Adding or removing one
// player from a selection touches only that player's neighbors, so the
// realized bonus of a lineup is maintained incrementally during search.

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::pool::{PlayerIndex, PlayerPool};

/// A bonus awarded when both players are selected together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyEdge {
    pub a: String,
    pub b: String,
    /// May be zero or negative (anti-synergy).
    pub bonus: f64,
    #[serde(default)]
    pub reason: String,
}

impl SynergyEdge {
    pub fn new(a: &str, b: &str, bonus: f64, reason: &str) -> Self {
        SynergyEdge {
            a: a.to_string(),
            b: b.to_string(),
            bonus,
            reason: reason.to_string(),
        }
    }
}

/// An edge resolved against the pool. `a < b` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEdge {
    pub a: PlayerIndex,
    pub b: PlayerIndex,
    pub bonus: f64,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// SynergyGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SynergyGraph {
    /// Per player: (neighbor, bonus), sorted by neighbor index.
    adjacency: Vec<Vec<(PlayerIndex, f64)>>,
    edges: Vec<ResolvedEdge>,
    /// Per player: sum of the positive bonuses on its edges.
    positive_degree: Vec<f64>,
}

impl SynergyGraph {
    /// Resolve `edges` against `pool`.
    ///
    /// Both endpoints must exist, self-loops and repeated pairs are rejected,
    /// and bonuses must be finite.
    pub fn build(edges: Vec<SynergyEdge>, pool: &PlayerPool) -> Result<Self, InputError> {
        let mut resolved = Vec::with_capacity(edges.len());
        for edge in edges {
            let a = pool
                .index_of(&edge.a)
                .ok_or_else(|| InputError::UnknownPlayer {
                    player: edge.a.clone(),
                })?;
            let b = pool
                .index_of(&edge.b)
                .ok_or_else(|| InputError::UnknownPlayer {
                    player: edge.b.clone(),
                })?;
            if a == b {
                return Err(InputError::SelfSynergy { player: edge.a });
            }
            if !edge.bonus.is_finite() {
                return Err(InputError::InvalidBonus {
                    a: edge.a,
                    b: edge.b,
                });
            }
            resolved.push(ResolvedEdge {
                a: a.min(b),
                b: a.max(b),
                bonus: edge.bonus,
                reason: edge.reason,
            });
        }

        resolved.sort_by_key(|e| (e.a, e.b));
        if let Some(pair) = resolved
            .windows(2)
            .find(|w| (w[0].a, w[0].b) == (w[1].a, w[1].b))
        {
            return Err(InputError::DuplicateSynergy {
                a: pool.get(pair[0].a).id.clone(),
                b: pool.get(pair[0].b).id.clone(),
            });
        }

        let mut adjacency: Vec<Vec<(PlayerIndex, f64)>> = vec![Vec::new(); pool.len()];
        let mut positive_degree = vec![0.0; pool.len()];
        for edge in &resolved {
            adjacency[edge.a].push((edge.b, edge.bonus));
            adjacency[edge.b].push((edge.a, edge.bonus));
            if edge.bonus > 0.0 {
                positive_degree[edge.a] += edge.bonus;
                positive_degree[edge.b] += edge.bonus;
            }
        }
        for list in &mut adjacency {
            list.sort_by_key(|&(n, _)| n);
        }

        Ok(SynergyGraph {
            adjacency,
            edges: resolved,
            positive_degree,
        })
    }

    /// A graph with no edges over a pool of `len` players.
    pub fn empty(len: usize) -> Self {
        SynergyGraph {
            adjacency: vec![Vec::new(); len],
            edges: Vec::new(),
            positive_degree: vec![0.0; len],
        }
    }

    pub fn edges(&self) -> &[ResolvedEdge] {
        &self.edges
    }

    pub fn neighbors(&self, player: PlayerIndex) -> &[(PlayerIndex, f64)] {
        &self.adjacency[player]
    }

    pub fn positive_degree(&self, player: PlayerIndex) -> f64 {
        self.positive_degree[player]
    }

    /// Bonus on the edge between `a` and `b`, or 0.0 if there is none.
    pub fn pair_bonus(&self, a: PlayerIndex, b: PlayerIndex) -> f64 {
        let list = &self.adjacency[a];
        match list.binary_search_by_key(&b, |&(n, _)| n) {
            Ok(pos) => list[pos].1,
            Err(_) => 0.0,
        }
    }

    /// Sum of the bonuses between `player` and the members of `selected`.
    /// O(degree of `player`).
    pub fn link(&self, player: PlayerIndex, selected: &Selection) -> f64 {
        self.adjacency[player]
            .iter()
            .filter(|&&(n, _)| selected.contains(n))
            .map(|&(_, bonus)| bonus)
            .sum()
    }

    /// Full recomputation of the realized bonus for a set of players.
    pub fn bonus_for(&self, players: &[PlayerIndex]) -> f64 {
        let mut selected = Selection::new(self.adjacency.len());
        for &p in players {
            selected.mark(p);
        }
        self.edges
            .iter()
            .filter(|e| selected.contains(e.a) && selected.contains(e.b))
            .map(|e| e.bonus)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A set of selected players with its realized synergy bonus kept current.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    mask: Vec<bool>,
    len: usize,
    bonus: f64,
}

impl Selection {
    pub fn new(pool_len: usize) -> Self {
        Selection {
            mask: vec![false; pool_len],
            len: 0,
            bonus: 0.0,
        }
    }

    pub fn contains(&self, player: PlayerIndex) -> bool {
        self.mask[player]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Realized bonus over all selected pairs.
    pub fn bonus(&self) -> f64 {
        self.bonus
    }

    /// Selected players in ascending index order.
    pub fn members(&self) -> Vec<PlayerIndex> {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn insert(&mut self, player: PlayerIndex, graph: &SynergyGraph) {
        if self.mask[player] {
            return;
        }
        self.bonus += graph.link(player, self);
        self.mark(player);
    }

    pub fn remove(&mut self, player: PlayerIndex, graph: &SynergyGraph) {
        if !self.mask[player] {
            return;
        }
        self.mask[player] = false;
        self.len -= 1;
        self.bonus -= graph.link(player, self);
    }

    /// Change in realized bonus if `outgoing` is replaced by `incoming`.
    /// `outgoing` must be selected and `incoming` must not be.
    pub fn swap_delta(
        &self,
        outgoing: PlayerIndex,
        incoming: PlayerIndex,
        graph: &SynergyGraph,
    ) -> f64 {
        graph.link(incoming, self)
            - graph.pair_bonus(outgoing, incoming)
            - graph.link(outgoing, self)
    }

    fn mark(&mut self, player: PlayerIndex) {
        if !self.mask[player] {
            self.mask[player] = true;
            self.len += 1;
        }
    }
}
