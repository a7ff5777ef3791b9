// Working lineup shared by both search strategies.

use std::cmp::Ordering;

use crate::pool::{PlayerIndex, PlayerPool};
use crate::seed::Assignment;
use crate::synergy::{Selection, SynergyGraph};

/// Values closer than this are treated as equal.
pub const VALUE_EPSILON: f64 = 1e-9;

/// The single mutable lineup the engine improves.
#[derive(Debug, Clone)]
pub struct LineupState {
    slots: Assignment,
    selection: Selection,
    projection: f64,
    cost: u64,
}

impl LineupState {
    pub fn new(slots: Assignment, pool: &PlayerPool, graph: &SynergyGraph) -> Self {
        let mut state = LineupState {
            slots: vec![None; slots.len()],
            selection: Selection::new(pool.len()),
            projection: 0.0,
            cost: 0,
        };
        for (inst, player) in slots.into_iter().enumerate() {
            if let Some(p) = player {
                state.assign(inst, p, pool, graph);
            }
        }
        state
    }

    pub fn slots(&self) -> &Assignment {
        &self.slots
    }

    pub fn occupant(&self, inst: usize) -> Option<PlayerIndex> {
        self.slots[inst]
    }

    pub fn is_selected(&self, player: PlayerIndex) -> bool {
        self.selection.contains(player)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn projection(&self) -> f64 {
        self.projection
    }

    pub fn synergy(&self) -> f64 {
        self.selection.bonus()
    }

    /// Projection plus realized synergy.
    pub fn value(&self) -> f64 {
        self.projection + self.selection.bonus()
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn members(&self) -> Vec<PlayerIndex> {
        self.selection.members()
    }

    /// Put `player` into the empty seat `inst`.
    pub fn assign(
        &mut self,
        inst: usize,
        player: PlayerIndex,
        pool: &PlayerPool,
        graph: &SynergyGraph,
    ) {
        debug_assert!(self.slots[inst].is_none());
        let record = pool.get(player);
        self.slots[inst] = Some(player);
        self.selection.insert(player, graph);
        self.projection += record.projection;
        self.cost += record.cost_or_zero();
    }

    /// Empty seat `inst`, returning its former occupant.
    pub fn clear(
        &mut self,
        inst: usize,
        pool: &PlayerPool,
        graph: &SynergyGraph,
    ) -> Option<PlayerIndex> {
        let player = self.slots[inst].take()?;
        let record = pool.get(player);
        self.selection.remove(player, graph);
        self.projection -= record.projection;
        self.cost -= record.cost_or_zero();
        Some(player)
    }

    /// Move the occupant of `from` into the empty seat `to`. The selected set
    /// does not change.
    pub fn relocate(&mut self, from: usize, to: usize) {
        debug_assert!(self.slots[to].is_none());
        self.slots[to] = self.slots[from].take();
    }
}

/// Ordering used everywhere a lineup is compared: higher value first (with
/// epsilon tolerance), then lower cost, then the lexicographically smaller
/// sorted member list. `Ordering::Greater` means `a` is better.
pub fn compare(
    a: (f64, u64, &[PlayerIndex]),
    b: (f64, u64, &[PlayerIndex]),
) -> Ordering {
    let (a_value, a_cost, a_members) = a;
    let (b_value, b_cost, b_members) = b;
    if a_value > b_value + VALUE_EPSILON {
        return Ordering::Greater;
    }
    if a_value < b_value - VALUE_EPSILON {
        return Ordering::Less;
    }
    b_cost
        .cmp(&a_cost)
        .then_with(|| b_members.cmp(a_members))
}
