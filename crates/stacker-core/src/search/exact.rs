// Bounded exhaustive search for lineups with few open seats.
//
// Locked players only have to appear somewhere, so every way of seating
// them is tried in turn. Within one arrangement the search is depth-first
// over the open seats in instance order, candidates in ascending identifier
// order. Interchangeable seats of the same slot only take players in
// ascending order (filled seats before empty ones), and a branch is cut
// when even the optimistic completion cannot beat the incumbent. The
// incumbent starts as the seed and is shared by all arrangements.

use std::cmp::Ordering;

use super::state::{compare, LineupState, VALUE_EPSILON};
use super::{Monitor, SearchStats};
use crate::constraints::Constraints;
use crate::pool::{PlayerIndex, PlayerPool};
use crate::synergy::SynergyGraph;

/// (locked player, seat) pairs, ascending by seat.
pub type LockArrangement = Vec<(PlayerIndex, usize)>;

/// Every distinct seating of the locked players, stopping once more than
/// `limit` have been found.
///
/// Locks sharing a slot take its first instances (mandatory before
/// optional), so arrangements differ only in which slot each lock occupies.
/// Arrangements that use more optional seats than the roster allows are
/// skipped. With no locks there is exactly one, empty, arrangement.
pub fn lock_arrangements(constraints: &Constraints, limit: usize) -> Vec<LockArrangement> {
    let options: Vec<Vec<usize>> = constraints
        .locked()
        .iter()
        .map(|&p| {
            constraints
                .rules()
                .iter()
                .enumerate()
                .filter(|(_, rule)| rule.max > 0 && rule.eligible.binary_search(&p).is_ok())
                .map(|(r, _)| r)
                .collect()
        })
        .collect();

    let mut arranger = Arranger {
        constraints,
        options,
        counts: vec![0; constraints.rules().len()],
        chosen: Vec::with_capacity(constraints.locked().len()),
        found: Vec::new(),
        limit,
    };
    arranger.extend();
    arranger.found
}

struct Arranger<'a> {
    constraints: &'a Constraints,
    /// Eligible rules per lock, in `Constraints::locked` order.
    options: Vec<Vec<usize>>,
    counts: Vec<usize>,
    chosen: Vec<usize>,
    found: Vec<LockArrangement>,
    limit: usize,
}

impl Arranger<'_> {
    fn extend(&mut self) {
        if self.found.len() > self.limit {
            return;
        }
        let depth = self.chosen.len();
        if depth == self.options.len() {
            self.record();
            return;
        }
        for i in 0..self.options[depth].len() {
            let r = self.options[depth][i];
            if self.counts[r] == self.constraints.rule(r).max {
                continue;
            }
            self.counts[r] += 1;
            self.chosen.push(r);
            self.extend();
            self.chosen.pop();
            self.counts[r] -= 1;
        }
    }

    fn record(&mut self) {
        let rules = self.constraints.rules();
        let optional_used: usize = rules
            .iter()
            .zip(&self.counts)
            .map(|(rule, &k)| k.saturating_sub(rule.min))
            .sum();
        if optional_used > self.constraints.optional_fill() {
            return;
        }

        let instances = self.constraints.instances();
        let mut next_seat: Vec<usize> = (0..rules.len())
            .map(|r| {
                instances
                    .iter()
                    .position(|inst| inst.rule == r)
                    .unwrap_or(instances.len())
            })
            .collect();
        let mut arrangement: LockArrangement = self
            .constraints
            .locked()
            .iter()
            .zip(&self.chosen)
            .map(|(&p, &r)| {
                let seat = next_seat[r];
                next_seat[r] += 1;
                (p, seat)
            })
            .collect();
        arrangement.sort_by_key(|&(_, seat)| seat);
        self.found.push(arrangement);
    }
}

pub fn search(
    seed: LineupState,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    constraints: &Constraints,
    monitor: &mut Monitor,
    stats: &mut SearchStats,
) -> LineupState {
    let best_members = seed.members();
    let mut dfs = Dfs {
        pool,
        graph,
        constraints,
        open: Vec::new(),
        bound_suffix: Vec::new(),
        optional_suffix: Vec::new(),
        optional_needed: 0,
        best: seed,
        best_members,
        monitor,
        stats,
        stopped: false,
    };

    let mut work = LineupState::new(vec![None; constraints.instances().len()], pool, graph);
    for arrangement in lock_arrangements(constraints, usize::MAX) {
        for &(player, seat) in &arrangement {
            work.assign(seat, player, pool, graph);
        }
        dfs.prepare(&arrangement);
        dfs.visit(&mut work, 0, 0);
        for &(_, seat) in &arrangement {
            work.clear(seat, pool, graph);
        }
        if dfs.stopped {
            break;
        }
    }
    dfs.best
}

struct Dfs<'a> {
    pool: &'a PlayerPool,
    graph: &'a SynergyGraph,
    constraints: &'a Constraints,
    open: Vec<usize>,
    bound_suffix: Vec<f64>,
    /// Optional seats among `open[depth..]`.
    optional_suffix: Vec<usize>,
    optional_needed: usize,
    best: LineupState,
    best_members: Vec<usize>,
    monitor: &'a mut Monitor,
    stats: &'a mut SearchStats,
    stopped: bool,
}

impl Dfs<'_> {
    /// Reset the per-arrangement tables for the seats the locks leave open.
    fn prepare(&mut self, arrangement: &[(PlayerIndex, usize)]) {
        let instances = self.constraints.instances();
        let is_locked = |seat: usize| arrangement.iter().any(|&(_, s)| s == seat);
        self.open = (0..instances.len()).filter(|&seat| !is_locked(seat)).collect();
        let locked_optional = arrangement
            .iter()
            .filter(|&&(_, seat)| instances[seat].optional)
            .count();
        self.optional_needed = self
            .constraints
            .optional_fill()
            .saturating_sub(locked_optional);

        // Optimistic gain per open seat: best projection plus every positive
        // bonus the player could possibly realize.
        let gains: Vec<f64> = self
            .open
            .iter()
            .map(|&seat| {
                let inst = instances[seat];
                let best = self
                    .constraints
                    .rule(inst.rule)
                    .eligible
                    .iter()
                    .map(|&p| self.pool.get(p).projection + self.graph.positive_degree(p))
                    .fold(f64::NEG_INFINITY, f64::max);
                if inst.optional {
                    best.max(0.0)
                } else {
                    best
                }
            })
            .collect();

        let depth_count = self.open.len();
        self.bound_suffix = vec![0.0; depth_count + 1];
        self.optional_suffix = vec![0; depth_count + 1];
        for depth in (0..depth_count).rev() {
            self.bound_suffix[depth] = self.bound_suffix[depth + 1] + gains[depth];
            self.optional_suffix[depth] = self.optional_suffix[depth + 1]
                + usize::from(instances[self.open[depth]].optional);
        }
    }

    fn visit(&mut self, work: &mut LineupState, depth: usize, filled_optional: usize) {
        if self.stopped {
            return;
        }

        if depth == self.open.len() {
            self.leaf(work, filled_optional);
            return;
        }

        if work.value() + self.bound_suffix[depth] < self.best.value() - VALUE_EPSILON {
            return;
        }

        let seat = self.open[depth];
        let inst = self.constraints.instances()[seat];
        let previous = (depth > 0)
            .then(|| self.open[depth - 1])
            .filter(|&prev| self.constraints.instances()[prev].rule == inst.rule)
            .map(|prev| work.occupant(prev));

        // An empty interchangeable seat forces the following ones empty too.
        if previous != Some(None) {
            let rule = self.constraints.rule(inst.rule);
            for &p in &rule.eligible {
                if work.is_selected(p) {
                    continue;
                }
                if let Some(Some(q)) = previous {
                    if p <= q {
                        continue;
                    }
                }
                if inst.optional && filled_optional >= self.optional_needed {
                    break;
                }
                if let Some(budget) = self.constraints.budget() {
                    if work.cost() + self.pool.get(p).cost_or_zero() > budget {
                        continue;
                    }
                }
                work.assign(seat, p, self.pool, self.graph);
                self.visit(work, depth + 1, filled_optional + usize::from(inst.optional));
                work.clear(seat, self.pool, self.graph);
                if self.stopped {
                    return;
                }
            }
        }

        let reachable = filled_optional + self.optional_suffix[depth + 1] >= self.optional_needed;
        if inst.optional && reachable {
            self.visit(work, depth + 1, filled_optional);
        }
    }

    fn leaf(&mut self, work: &LineupState, filled_optional: usize) {
        if filled_optional != self.optional_needed {
            return;
        }
        if !self.monitor.allow(self.stats) {
            self.stopped = true;
            return;
        }
        self.stats.moves_evaluated += 1;
        self.stats.exact_leaves += 1;

        let members = work.members();
        let order = compare(
            (work.value(), work.cost(), &members),
            (self.best.value(), self.best.cost(), &self.best_members),
        );
        if order == Ordering::Greater {
            self.best = work.clone();
            self.best_members = members;
            self.stats.moves_accepted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::RosterSlotSpec;
    use crate::pool::Player;
    use crate::search::{SearchLimits, Termination};
    use crate::seed;
    use crate::synergy::SynergyEdge;

    fn run_exact(
        pool: &PlayerPool,
        graph: &SynergyGraph,
        c: &Constraints,
        budget: u64,
    ) -> (LineupState, SearchStats, Option<Termination>) {
        let seed = LineupState::new(seed::generate(c, pool).unwrap(), pool, graph);
        let mut monitor = Monitor::new(&SearchLimits::with_iteration_budget(budget));
        let mut stats = SearchStats::default();
        let state = search(seed, pool, graph, c, &mut monitor, &mut stats);
        (state, stats, monitor.stopped())
    }

    fn ids(state: &LineupState, pool: &PlayerPool) -> Vec<String> {
        state
            .members()
            .into_iter()
            .map(|p| pool.get(p).id.clone())
            .collect()
    }

    #[test]
    fn finds_three_way_stack_local_moves_miss() {
        // Any single swap away from the projection-greedy seed loses value;
        // only replacing both WRs at once reaches the stack.
        let pool = PlayerPool::build(vec![
            Player::new("qb1", &["QB"], 20.0),
            Player::new("wr1", &["WR"], 15.0),
            Player::new("wr2", &["WR"], 15.0),
            Player::new("wr3", &["WR"], 10.0),
            Player::new("wr4", &["WR"], 10.0),
        ])
        .unwrap();
        let graph = SynergyGraph::build(vec![SynergyEdge::new("wr3", "wr4", 12.0, "")], &pool)
            .unwrap();
        let slots = vec![
            RosterSlotSpec::new("QB", 1, &["QB"]),
            RosterSlotSpec::new("WR", 2, &["WR"]),
        ];
        let c = Constraints::build(&slots, None, None, &[], &[], &pool).unwrap();
        let (state, stats, stopped) = run_exact(&pool, &graph, &c, 10_000);
        assert_eq!(ids(&state, &pool), vec!["qb1", "wr3", "wr4"]);
        assert!((state.value() - 52.0).abs() < 1e-9);
        assert!(stats.exact_leaves > 0);
        assert!(stopped.is_none());
    }

    #[test]
    fn symmetric_seats_are_enumerated_once() {
        let pool = PlayerPool::build(
            (0..5)
                .map(|i| Player::new(&format!("p{i}"), &["UTIL"], 0.0))
                .collect(),
        )
        .unwrap();
        let graph = SynergyGraph::empty(pool.len());
        let slots = vec![RosterSlotSpec::new("UTIL", 2, &["UTIL"])];
        let c = Constraints::build(&slots, None, None, &[], &[], &pool).unwrap();
        let (_, stats, _) = run_exact(&pool, &graph, &c, 10_000);
        // C(5, 2) unordered pairs.
        assert_eq!(stats.exact_leaves, 10);
    }

    #[test]
    fn respects_budget_and_optional_count() {
        let pool = PlayerPool::build(vec![
            Player::new("rb1", &["RB"], 20.0).with_cost(60),
            Player::new("rb2", &["RB"], 12.0).with_cost(20),
            Player::new("wr1", &["WR"], 18.0).with_cost(50),
            Player::new("wr2", &["WR"], 11.0).with_cost(15),
        ])
        .unwrap();
        let graph = SynergyGraph::empty(pool.len());
        let slots = vec![
            RosterSlotSpec::range("RB", 1, 2, &["RB"]),
            RosterSlotSpec::range("WR", 1, 2, &["WR"]),
        ];
        let c = Constraints::build(&slots, Some(3), Some(100), &[], &[], &pool).unwrap();
        let (state, _, _) = run_exact(&pool, &graph, &c, 10_000);
        assert!(state.cost() <= 100);
        assert_eq!(state.members().len(), 3);
        // rb1+wr2+rb2 = 43 for 95; wr1+rb2+wr2 = 41 for 85; rb1+wr1 alone
        // leaves no room for a third player.
        assert_eq!(ids(&state, &pool), vec!["rb1", "rb2", "wr2"]);
    }

    #[test]
    fn stops_on_leaf_budget_and_keeps_incumbent() {
        let pool = PlayerPool::build(
            (0..6)
                .map(|i| Player::new(&format!("p{i}"), &["UTIL"], 1.0))
                .collect(),
        )
        .unwrap();
        let graph = SynergyGraph::empty(pool.len());
        let slots = vec![RosterSlotSpec::new("UTIL", 2, &["UTIL"])];
        let c = Constraints::build(&slots, None, None, &[], &[], &pool).unwrap();
        let (state, stats, stopped) = run_exact(&pool, &graph, &c, 2);
        assert_eq!(stats.exact_leaves, 2);
        assert_eq!(stopped, Some(Termination::IterationBudgetExhausted));
        // Every pair ties; the seed (p0, p1) wins the member tie-break.
        assert_eq!(ids(&state, &pool), vec!["p0", "p1"]);
    }

    #[test]
    fn locked_player_may_take_any_eligible_seat() {
        // `flex` packs into A, where it blocks qb1. The best lineup seats it
        // in B instead.
        let pool = PlayerPool::build(vec![
            Player::new("flex", &["RB", "WR"], 5.0),
            Player::new("q1", &["QB"], 20.0),
            Player::new("w1", &["WR"], 1.0),
        ])
        .unwrap();
        let graph = SynergyGraph::empty(pool.len());
        let slots = vec![
            RosterSlotSpec::new("A", 1, &["QB", "RB"]),
            RosterSlotSpec::new("B", 1, &["WR", "TE"]),
        ];
        let locked = vec!["flex".to_string()];
        let c = Constraints::build(&slots, None, None, &locked, &[], &pool).unwrap();
        let (state, _, stopped) = run_exact(&pool, &graph, &c, 10_000);
        assert!(stopped.is_none());
        assert!((state.value() - 25.0).abs() < 1e-9);
        let flex = pool.index_of("flex").unwrap();
        let q1 = pool.index_of("q1").unwrap();
        assert_eq!(state.slots(), &vec![Some(q1), Some(flex)]);
    }

    #[test]
    fn arrangements_cover_every_slot_a_lock_fits() {
        let pool = PlayerPool::build(vec![
            Player::new("flex", &["RB", "WR"], 5.0),
            Player::new("rb1", &["RB"], 4.0),
        ])
        .unwrap();
        let slots = vec![
            RosterSlotSpec::new("RB", 1, &["RB"]),
            RosterSlotSpec::range("WR", 0, 1, &["WR"]),
            RosterSlotSpec::new("FLEX", 1, &["RB", "WR"]),
        ];
        let locked = vec!["flex".to_string()];

        // Roster of two: the optional WR seat may not be used.
        let c = Constraints::build(&slots, Some(2), None, &locked, &[], &pool).unwrap();
        let seats: Vec<usize> = lock_arrangements(&c, usize::MAX)
            .iter()
            .map(|arrangement| arrangement[0].1)
            .collect();
        assert_eq!(seats, vec![0, 2]);

        let c = Constraints::build(&slots, Some(3), None, &locked, &[], &pool).unwrap();
        assert_eq!(lock_arrangements(&c, usize::MAX).len(), 3);
        assert_eq!(lock_arrangements(&c, 1).len(), 2);
    }
}
