// Cheapest legal completion of a partially filled lineup.
//
// Min-cost flow over source -> player (1, cost) -> rule (1) -> sink. Each
// rule drains into the sink through a mandatory arc sized to its empty
// mandatory seats and an optional arc for its remaining empty seats.
// Pending locks and mandatory arcs carry a reward larger than any possible
// spend, so the cheapest flow of `roster_size - filled` units places every
// lock and fills every mandatory seat whenever some completion can.

use std::collections::VecDeque;

use crate::constraints::Constraints;
use crate::pool::{PlayerIndex, PlayerPool};

#[derive(Debug, Clone, Copy)]
struct Arc {
    to: usize,
    cap: usize,
    cost: i128,
    rev: usize,
}

#[derive(Debug)]
struct Network {
    arcs: Vec<Vec<Arc>>,
}

impl Network {
    fn new(nodes: usize) -> Self {
        Network {
            arcs: vec![Vec::new(); nodes],
        }
    }

    /// Add `from -> to` and its residual twin. Returns the forward arc's
    /// position in `arcs[from]`.
    fn add(&mut self, from: usize, to: usize, cap: usize, cost: i128) -> usize {
        let forward = self.arcs[from].len();
        let backward = self.arcs[to].len();
        self.arcs[from].push(Arc {
            to,
            cap,
            cost,
            rev: backward,
        });
        self.arcs[to].push(Arc {
            to: from,
            cap: 0,
            cost: -cost,
            rev: forward,
        });
        forward
    }

    /// Cheapest residual path (queue-based Bellman-Ford, costs may be
    /// negative). Returned as (node, arc) hops from the sink backwards.
    fn shortest_path(&self, source: usize, sink: usize) -> Option<Vec<(usize, usize)>> {
        let n = self.arcs.len();
        let mut dist: Vec<Option<i128>> = vec![None; n];
        let mut via: Vec<Option<(usize, usize)>> = vec![None; n];
        let mut queued = vec![false; n];
        let mut queue = VecDeque::from([source]);
        dist[source] = Some(0);
        queued[source] = true;

        while let Some(u) = queue.pop_front() {
            queued[u] = false;
            let Some(du) = dist[u] else {
                continue;
            };
            for (i, arc) in self.arcs[u].iter().enumerate() {
                if arc.cap == 0 {
                    continue;
                }
                let candidate = du + arc.cost;
                if dist[arc.to].map_or(true, |d| candidate < d) {
                    dist[arc.to] = Some(candidate);
                    via[arc.to] = Some((u, i));
                    if !queued[arc.to] {
                        queued[arc.to] = true;
                        queue.push_back(arc.to);
                    }
                }
            }
        }

        dist[sink]?;
        let mut path = Vec::new();
        let mut v = sink;
        while let Some((u, i)) = via[v] {
            path.push((u, i));
            v = u;
        }
        Some(path)
    }

    fn push(&mut self, path: &[(usize, usize)]) {
        for &(u, i) in path {
            let arc = &mut self.arcs[u][i];
            arc.cap -= 1;
            let (to, rev) = (arc.to, arc.rev);
            self.arcs[to][rev].cap += 1;
        }
    }
}

/// Minimum total cost of the players still to be added so that `slots`
/// becomes a legal lineup: every mandatory seat filled, every lock present,
/// `roster_size` players in total. Costs count as zero when absent. `None`
/// when no completion exists regardless of budget.
pub fn cheapest_completion(
    constraints: &Constraints,
    pool: &PlayerPool,
    slots: &[Option<PlayerIndex>],
) -> Option<u64> {
    let rules = constraints.rules();
    let mut taken = vec![false; pool.len()];
    let mut filled = 0usize;
    let mut empty_mandatory = vec![0usize; rules.len()];
    let mut empty_total = vec![0usize; rules.len()];
    for (inst, occupant) in constraints.instances().iter().zip(slots) {
        match occupant {
            Some(p) => {
                taken[*p] = true;
                filled += 1;
            }
            None => {
                empty_total[inst.rule] += 1;
                if !inst.optional {
                    empty_mandatory[inst.rule] += 1;
                }
            }
        }
    }

    let needed = constraints.roster_size().checked_sub(filled)?;
    let pending: Vec<PlayerIndex> = constraints
        .locked()
        .iter()
        .copied()
        .filter(|&p| !taken[p])
        .collect();
    let mandatory: usize = empty_mandatory.iter().sum();
    if mandatory > needed || pending.len() > needed {
        return None;
    }
    if needed == 0 {
        return Some(0);
    }

    let mut candidates: Vec<PlayerIndex> = rules
        .iter()
        .zip(&empty_total)
        .filter(|&(_, &empty)| empty > 0)
        .flat_map(|(rule, _)| rule.eligible.iter().copied())
        .filter(|&p| !taken[p])
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    if pending.iter().any(|p| candidates.binary_search(p).is_err()) {
        return None;
    }

    let cost_of = |p: PlayerIndex| i128::from(pool.get(p).cost_or_zero());
    let reward: i128 = 1 + candidates.iter().map(|&p| cost_of(p)).sum::<i128>();

    let source = 0;
    let player_node = |i: usize| 1 + i;
    let rule_node = |r: usize| 1 + candidates.len() + r;
    let sink = 1 + candidates.len() + rules.len();
    let mut net = Network::new(sink + 1);

    let mut entry_arcs = Vec::with_capacity(candidates.len());
    for (i, &p) in candidates.iter().enumerate() {
        let bonus = if pending.binary_search(&p).is_ok() {
            reward
        } else {
            0
        };
        entry_arcs.push(net.add(source, player_node(i), 1, cost_of(p) - bonus));
    }

    let mut mandatory_arcs = Vec::new();
    for (r, rule) in rules.iter().enumerate() {
        if empty_total[r] == 0 {
            continue;
        }
        for p in &rule.eligible {
            if let Ok(i) = candidates.binary_search(p) {
                net.add(player_node(i), rule_node(r), 1, 0);
            }
        }
        if empty_mandatory[r] > 0 {
            let arc = net.add(rule_node(r), sink, empty_mandatory[r], -reward);
            mandatory_arcs.push((rule_node(r), arc));
        }
        let optional = empty_total[r] - empty_mandatory[r];
        if optional > 0 {
            net.add(rule_node(r), sink, optional, 0);
        }
    }

    for _ in 0..needed {
        let path = net.shortest_path(source, sink)?;
        net.push(&path);
    }

    if mandatory_arcs
        .iter()
        .any(|&(node, arc)| net.arcs[node][arc].cap > 0)
    {
        return None;
    }
    let mut spend = 0u64;
    for (i, &p) in candidates.iter().enumerate() {
        let used = net.arcs[source][entry_arcs[i]].cap == 0;
        if used {
            spend += pool.get(p).cost_or_zero();
        } else if pending.binary_search(&p).is_ok() {
            return None;
        }
    }
    Some(spend)
}
