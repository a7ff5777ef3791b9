// Constraint set: roster shape, budget, locks and bans, bound to a pool.
//
// Each slot spec expands into `min` mandatory instances followed by
// `max - min` optional instances. Exactly `roster_size - sum(min)` optional
// instances end up filled. Locked players are packed into instances up
// front with a small max-flow so that a lock is only reported infeasible
// when no arrangement of all locks exists.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InputError;
use crate::pool::{PlayerIndex, PlayerPool, Position};

// ---------------------------------------------------------------------------
// Slot specs
// ---------------------------------------------------------------------------

/// A roster slot bucket as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlotSpec {
    pub label: String,
    pub min: usize,
    pub max: usize,
    /// Positions allowed to fill this slot.
    pub positions: Vec<String>,
}

impl RosterSlotSpec {
    /// A slot that must hold exactly `count` players.
    pub fn new(label: &str, count: usize, positions: &[&str]) -> Self {
        Self::range(label, count, count, positions)
    }

    pub fn range(label: &str, min: usize, max: usize, positions: &[&str]) -> Self {
        RosterSlotSpec {
            label: label.to_string(),
            min,
            max,
            positions: positions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A validated slot spec with its eligible candidates resolved.
#[derive(Debug, Clone)]
pub struct SlotRule {
    pub label: String,
    pub min: usize,
    pub max: usize,
    pub positions: BTreeSet<Position>,
    /// Non-banned players eligible for this slot, ascending.
    pub eligible: Vec<PlayerIndex>,
}

/// One fillable seat of a slot rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInstance {
    /// Index into [`Constraints::rules`].
    pub rule: usize,
    /// Optional instances beyond the rule's minimum.
    pub optional: bool,
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Constraints {
    rules: Vec<SlotRule>,
    instances: Vec<SlotInstance>,
    roster_size: usize,
    optional_fill: usize,
    budget: Option<u64>,
    locked: Vec<PlayerIndex>,
    banned: Vec<bool>,
    /// (locked player, instance) pairs, ascending by instance.
    lock_placements: Vec<(PlayerIndex, usize)>,
}

impl Constraints {
    /// Validate the constraint inputs against `pool`.
    ///
    /// `roster_size` defaults to the sum of the slot maxima.
    pub fn build(
        slots: &[RosterSlotSpec],
        roster_size: Option<usize>,
        budget: Option<u64>,
        locked: &[String],
        banned: &[String],
        pool: &PlayerPool,
    ) -> Result<Self, InputError> {
        if slots.is_empty() {
            return Err(InputError::infeasible("no roster slots defined"));
        }

        let banned_idx = resolve_ids(banned, pool)?;
        let locked_idx = resolve_ids(locked, pool)?;
        let mut banned_mask = vec![false; pool.len()];
        for &b in &banned_idx {
            banned_mask[b] = true;
        }
        if let Some(&both) = locked_idx.iter().find(|&&l| banned_mask[l]) {
            return Err(InputError::infeasible(format!(
                "player `{}` is both locked and banned",
                pool.get(both).id
            )));
        }

        let mut labels = HashSet::new();
        let mut rules = Vec::with_capacity(slots.len());
        for spec in slots {
            let label = spec.label.trim();
            if label.is_empty() {
                return Err(InputError::infeasible("slot with a blank label"));
            }
            if !labels.insert(label.to_string()) {
                return Err(InputError::infeasible(format!(
                    "slot label `{label}` is defined more than once"
                )));
            }
            if spec.min > spec.max {
                return Err(InputError::infeasible(format!(
                    "slot `{label}` has min {} above max {}",
                    spec.min, spec.max
                )));
            }
            let positions: BTreeSet<Position> = spec
                .positions
                .iter()
                .filter_map(|p| Position::parse(p))
                .collect();
            if positions.is_empty() {
                return Err(InputError::infeasible(format!(
                    "slot `{label}` accepts no positions"
                )));
            }
            let eligible = pool
                .eligible_for(&positions)
                .into_iter()
                .filter(|&p| !banned_mask[p])
                .collect();
            rules.push(SlotRule {
                label: label.to_string(),
                min: spec.min,
                max: spec.max,
                positions,
                eligible,
            });
        }

        let min_total: usize = rules.iter().map(|r| r.min).sum();
        let max_total: usize = rules.iter().map(|r| r.max).sum();
        let roster_size = roster_size.unwrap_or(max_total);
        if roster_size < min_total || roster_size > max_total {
            return Err(InputError::infeasible(format!(
                "roster size {roster_size} is outside the slot range {min_total}..={max_total}"
            )));
        }
        if locked_idx.len() > roster_size {
            return Err(InputError::infeasible(format!(
                "{} locked players exceed the roster size of {roster_size}",
                locked_idx.len()
            )));
        }

        if let Some(budget) = budget {
            for rule in &rules {
                if let Some(&p) = rule.eligible.iter().find(|&&p| pool.get(p).cost.is_none()) {
                    return Err(InputError::MissingCost {
                        player: pool.get(p).id.clone(),
                    });
                }
            }
            let locked_cost: u64 = locked_idx.iter().map(|&p| pool.get(p).cost_or_zero()).sum();
            if locked_cost > budget {
                return Err(InputError::infeasible(format!(
                    "locked players cost {locked_cost}, above the budget of {budget}"
                )));
            }
        }

        let mut instances = Vec::with_capacity(max_total);
        for (idx, rule) in rules.iter().enumerate() {
            for seat in 0..rule.max {
                instances.push(SlotInstance {
                    rule: idx,
                    optional: seat >= rule.min,
                });
            }
        }

        let optional_fill = roster_size - min_total;
        let lock_placements = pack_locks(&locked_idx, &rules, &instances, optional_fill, pool)?;
        debug!(
            "Constraints bound: {} rules, {} instances, roster size {}, {} locks",
            rules.len(),
            instances.len(),
            roster_size,
            lock_placements.len()
        );

        Ok(Constraints {
            rules,
            instances,
            roster_size,
            optional_fill,
            budget,
            locked: locked_idx,
            banned: banned_mask,
            lock_placements,
        })
    }

    pub fn rules(&self) -> &[SlotRule] {
        &self.rules
    }

    pub fn rule(&self, idx: usize) -> &SlotRule {
        &self.rules[idx]
    }

    pub fn rule_by_label(&self, label: &str) -> Option<&SlotRule> {
        self.rules.iter().find(|r| r.label == label)
    }

    pub fn instances(&self) -> &[SlotInstance] {
        &self.instances
    }

    pub fn roster_size(&self) -> usize {
        self.roster_size
    }

    /// Number of optional instances that must be filled.
    pub fn optional_fill(&self) -> usize {
        self.optional_fill
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Locked players, ascending.
    pub fn locked(&self) -> &[PlayerIndex] {
        &self.locked
    }

    pub fn is_locked(&self, player: PlayerIndex) -> bool {
        self.locked.binary_search(&player).is_ok()
    }

    pub fn is_banned(&self, player: PlayerIndex) -> bool {
        self.banned[player]
    }

    pub fn banned(&self) -> impl Iterator<Item = PlayerIndex> + '_ {
        self.banned
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(idx, _)| idx)
    }

    pub fn lock_placements(&self) -> &[(PlayerIndex, usize)] {
        &self.lock_placements
    }
}

/// Resolve identifiers to sorted, de-duplicated pool indices.
fn resolve_ids(ids: &[String], pool: &PlayerPool) -> Result<Vec<PlayerIndex>, InputError> {
    let mut out = ids
        .iter()
        .map(|id| {
            pool.index_of(id)
                .ok_or_else(|| InputError::UnknownPlayer { player: id.clone() })
        })
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

// ---------------------------------------------------------------------------
// Lock packing
// ---------------------------------------------------------------------------

/// Assign every locked player to a slot instance.
///
/// Flow network: source -> lock (1) -> rule (1 if eligible) -> mandatory
/// hub (rule.min) or optional hub (rule.max - rule.min) -> sink. The hubs
/// are capped at sum(min) and `optional_fill`. Locks are augmented
/// most-constrained first, and rules are explored in order of fewest
/// eligible candidates, so direct placements prefer the scarcest slot.
fn pack_locks(
    locked: &[PlayerIndex],
    rules: &[SlotRule],
    instances: &[SlotInstance],
    optional_fill: usize,
    pool: &PlayerPool,
) -> Result<Vec<(PlayerIndex, usize)>, InputError> {
    if locked.is_empty() {
        return Ok(Vec::new());
    }

    let eligible_rules: Vec<Vec<usize>> = locked
        .iter()
        .map(|&p| {
            rules
                .iter()
                .enumerate()
                .filter(|(_, r)| r.max > 0 && pool.get(p).is_eligible_for(&r.positions))
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect();

    let n_locks = locked.len();
    let n_rules = rules.len();
    let source = 0;
    let lock_node = |i: usize| 1 + i;
    let rule_node = |r: usize| 1 + n_locks + r;
    let mandatory_hub = 1 + n_locks + n_rules;
    let optional_hub = mandatory_hub + 1;
    let sink = optional_hub + 1;
    let nodes = sink + 1;

    let mut cap = vec![vec![0usize; nodes]; nodes];
    for (i, rs) in eligible_rules.iter().enumerate() {
        cap[source][lock_node(i)] = 1;
        for &r in rs {
            cap[lock_node(i)][rule_node(r)] = 1;
        }
    }
    for (r, rule) in rules.iter().enumerate() {
        cap[rule_node(r)][mandatory_hub] = rule.min;
        cap[rule_node(r)][optional_hub] = rule.max - rule.min;
    }
    cap[mandatory_hub][sink] = rules.iter().map(|r| r.min).sum();
    cap[optional_hub][sink] = optional_fill;

    // BFS visiting order: rules sorted by scarcity, mandatory hub before
    // optional hub.
    let mut rule_order: Vec<usize> = (0..n_rules).collect();
    rule_order.sort_by_key(|&r| (rules[r].eligible.len(), r));
    let mut visit_order = vec![source];
    visit_order.extend((0..n_locks).map(lock_node));
    visit_order.extend(rule_order.iter().map(|&r| rule_node(r)));
    visit_order.extend([mandatory_hub, optional_hub, sink]);

    let mut lock_order: Vec<usize> = (0..n_locks).collect();
    lock_order.sort_by_key(|&i| (eligible_rules[i].len(), locked[i]));

    for &i in &lock_order {
        cap[source][lock_node(i)] = 0;
        if !augment(&mut cap, &visit_order, lock_node(i), sink) {
            return Err(InputError::infeasible(format!(
                "locked player `{}` cannot be placed in any open slot",
                pool.get(locked[i]).id
            )));
        }
    }

    // Read the flow back out: lock -> rule edges with spent capacity.
    let mut per_rule: Vec<Vec<PlayerIndex>> = vec![Vec::new(); n_rules];
    for (i, rs) in eligible_rules.iter().enumerate() {
        if let Some(&r) = rs.iter().find(|&&r| cap[lock_node(i)][rule_node(r)] == 0) {
            per_rule[r].push(locked[i]);
        }
    }

    // Within a rule, mandatory instances are filled before optional ones.
    let mut placements = Vec::with_capacity(n_locks);
    for (r, players) in per_rule.iter_mut().enumerate() {
        players.sort_unstable();
        let seats = instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| inst.rule == r)
            .map(|(idx, _)| idx);
        placements.extend(players.iter().copied().zip(seats));
    }
    placements.sort_by_key(|&(_, inst)| inst);
    Ok(placements)
}

/// Push one unit of flow from `start` to `sink` along a shortest residual
/// path. Returns false if no path exists.
fn augment(cap: &mut [Vec<usize>], visit_order: &[usize], start: usize, sink: usize) -> bool {
    let mut parent: Vec<Option<usize>> = vec![None; cap.len()];
    let mut seen = vec![false; cap.len()];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;

    while let Some(u) = queue.pop_front() {
        if u == sink {
            break;
        }
        for &v in visit_order {
            if !seen[v] && cap[u][v] > 0 {
                seen[v] = true;
                parent[v] = Some(u);
                queue.push_back(v);
            }
        }
    }
    if !seen[sink] {
        return false;
    }

    let mut v = sink;
    while let Some(u) = parent[v] {
        cap[u][v] -= 1;
        cap[v][u] += 1;
        v = u;
    }
    true
}
