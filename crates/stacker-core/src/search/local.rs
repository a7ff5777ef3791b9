// Best-improvement local search over single-player moves.
//
// Every move changes the selected set by exactly one player out and one in,
// so its value delta is the projection difference plus an O(degree) synergy
// delta. A pass evaluates every move in a fixed order and applies the best
// strictly improving one; the search converges when a pass finds none.

use std::cmp::Ordering;

use tracing::trace;

use super::state::{compare, LineupState, VALUE_EPSILON};
use super::{Monitor, SearchStats};
use crate::constraints::Constraints;
use crate::pool::{PlayerIndex, PlayerPool};
use crate::synergy::SynergyGraph;

/// A single neighborhood move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Replace the occupant of `seat` with `incoming`.
    Swap { seat: usize, incoming: PlayerIndex },
    /// Drop the occupant of optional seat `from`; `incoming` fills the empty
    /// optional seat `to` of another slot.
    Relocate {
        from: usize,
        to: usize,
        incoming: PlayerIndex,
    },
    /// The occupant of `from` moves into `to`, the occupant of `to` leaves,
    /// and `incoming` takes `from`.
    Exchange {
        from: usize,
        to: usize,
        incoming: PlayerIndex,
    },
}

impl Move {
    pub fn outgoing(&self, state: &LineupState) -> Option<PlayerIndex> {
        match *self {
            Move::Swap { seat, .. } => state.occupant(seat),
            Move::Relocate { from, .. } => state.occupant(from),
            Move::Exchange { to, .. } => state.occupant(to),
        }
    }

    pub fn incoming(&self) -> PlayerIndex {
        match *self {
            Move::Swap { incoming, .. }
            | Move::Relocate { incoming, .. }
            | Move::Exchange { incoming, .. } => incoming,
        }
    }

    pub fn apply(&self, state: &mut LineupState, pool: &PlayerPool, graph: &SynergyGraph) {
        match *self {
            Move::Swap { seat, incoming } => {
                state.clear(seat, pool, graph);
                state.assign(seat, incoming, pool, graph);
            }
            Move::Relocate { from, to, incoming } => {
                state.clear(from, pool, graph);
                state.assign(to, incoming, pool, graph);
            }
            Move::Exchange { from, to, incoming } => {
                state.clear(to, pool, graph);
                state.relocate(from, to);
                state.assign(from, incoming, pool, graph);
            }
        }
    }
}

/// Enumerate all moves from `state` in deterministic order: by moving
/// player, then move kind, then target seat, then incoming player.
///
/// A move never drops a locked player, but a locked player may still
/// shift seats as the moving side of an exchange.
pub fn neighborhood(state: &LineupState, constraints: &Constraints) -> Vec<Move> {
    let instances = constraints.instances();
    let mut selected: Vec<(PlayerIndex, usize)> = state
        .slots()
        .iter()
        .enumerate()
        .filter_map(|(seat, p)| p.map(|p| (p, seat)))
        .collect();
    selected.sort_unstable();
    let droppable: Vec<(PlayerIndex, usize)> = selected
        .iter()
        .copied()
        .filter(|&(p, _)| !constraints.is_locked(p))
        .collect();

    // One empty optional seat per rule.
    let mut open_optional: Vec<usize> = Vec::new();
    for (seat, inst) in instances.iter().enumerate() {
        if inst.optional
            && state.occupant(seat).is_none()
            && !open_optional.iter().any(|&s| instances[s].rule == inst.rule)
        {
            open_optional.push(seat);
        }
    }

    let unselected = move |seat: usize| {
        constraints
            .rule(instances[seat].rule)
            .eligible
            .iter()
            .copied()
            .filter(move |&p| !state.is_selected(p))
    };

    let mut moves = Vec::new();
    for &(player, seat) in &selected {
        let rule = instances[seat].rule;

        if !constraints.is_locked(player) {
            moves.extend(unselected(seat).map(|incoming| Move::Swap { seat, incoming }));

            if instances[seat].optional {
                for &to in open_optional.iter().filter(|&&to| instances[to].rule != rule) {
                    moves.extend(unselected(to).map(|incoming| Move::Relocate {
                        from: seat,
                        to,
                        incoming,
                    }));
                }
            }
        }

        for &(_, to) in &droppable {
            let to_rule = instances[to].rule;
            let fits = constraints.rule(to_rule).eligible.binary_search(&player).is_ok();
            if to_rule == rule || !fits {
                continue;
            }
            moves.extend(unselected(seat).map(|incoming| Move::Exchange {
                from: seat,
                to,
                incoming,
            }));
        }
    }
    moves
}

struct Candidate {
    mv: Move,
    value: f64,
    cost: u64,
}

/// Run local search from `state` until convergence or until `monitor`
/// stops it. The best improving move seen so far in an interrupted pass is
/// still applied.
pub fn improve(
    mut state: LineupState,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    constraints: &Constraints,
    monitor: &mut Monitor,
    stats: &mut SearchStats,
) -> LineupState {
    loop {
        stats.passes += 1;
        let current = state.value();
        let mut best: Option<Candidate> = None;

        for mv in neighborhood(&state, constraints) {
            if !monitor.allow(stats) {
                break;
            }
            stats.moves_evaluated += 1;

            let Some(out) = mv.outgoing(&state) else {
                continue;
            };
            let inc = mv.incoming();
            let (out_rec, in_rec) = (pool.get(out), pool.get(inc));

            let cost = state.cost() - out_rec.cost_or_zero() + in_rec.cost_or_zero();
            if constraints.budget().is_some_and(|b| cost > b) {
                continue;
            }
            let value = current + in_rec.projection - out_rec.projection
                + state.selection().swap_delta(out, inc, graph);
            if value <= current + VALUE_EPSILON {
                continue;
            }

            let replace = match &best {
                None => true,
                Some(b) => is_better(&state, (&mv, value, cost), (&b.mv, b.value, b.cost)),
            };
            if replace {
                best = Some(Candidate { mv, value, cost });
            }
        }

        match best {
            Some(b) => {
                trace!(
                    "Accepting {:?}: value {:.3} -> {:.3}, cost {}",
                    b.mv,
                    current,
                    b.value,
                    b.cost
                );
                b.mv.apply(&mut state, pool, graph);
                stats.moves_accepted += 1;
            }
            None => return state,
        }

        if monitor.stopped().is_some() {
            return state;
        }
    }
}

fn is_better(state: &LineupState, a: (&Move, f64, u64), b: (&Move, f64, u64)) -> bool {
    let (a_mv, a_value, a_cost) = a;
    let (b_mv, b_value, b_cost) = b;
    let needs_members = (a_value - b_value).abs() <= VALUE_EPSILON && a_cost == b_cost;
    let (a_members, b_members) = if needs_members {
        (members_after(state, a_mv), members_after(state, b_mv))
    } else {
        (Vec::new(), Vec::new())
    };
    compare((a_value, a_cost, &a_members), (b_value, b_cost, &b_members)) == Ordering::Greater
}

fn members_after(state: &LineupState, mv: &Move) -> Vec<PlayerIndex> {
    let out = mv.outgoing(state);
    let mut members: Vec<PlayerIndex> = state
        .members()
        .into_iter()
        .filter(|&p| Some(p) != out)
        .collect();
    members.push(mv.incoming());
    members.sort_unstable();
    members
}
