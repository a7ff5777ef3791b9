// Result assembler: reporting fields derived from a validated lineup.
//
// Everything is recomputed from the lineup's identifiers; the search
// engine's incremental sums are never trusted here.

use serde::{Deserialize, Serialize};

use crate::constraints::Constraints;
use crate::optimize::Lineup;
use crate::pool::{PlayerIndex, PlayerPool};
use crate::synergy::{Selection, SynergyGraph};

/// Limits on the ranked lists in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    #[serde(default = "default_max_stack_partners")]
    pub max_stack_partners: usize,
    #[serde(default = "default_max_realized_edges")]
    pub max_realized_edges: usize,
}

fn default_max_stack_partners() -> usize {
    5
}

fn default_max_realized_edges() -> usize {
    10
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            max_stack_partners: default_max_stack_partners(),
            max_realized_edges: default_max_realized_edges(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerContribution {
    pub player: String,
    pub slot: String,
    pub projection: f64,
    /// Lineup value minus the value with `replacement` in this seat, or the
    /// player's own projection when nobody could replace them.
    pub marginal: f64,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedEdge {
    pub a: String,
    pub b: String,
    pub bonus: f64,
    pub reason: String,
}

/// An unselected player who would add positive synergy to the lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackPartner {
    pub player: String,
    pub bonus: f64,
    /// Lineup members the bonus comes from, ascending.
    pub partners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupReport {
    pub total_value: f64,
    pub projection_total: f64,
    pub synergy_total: f64,
    /// In seat order.
    pub contributions: Vec<PlayerContribution>,
    /// Highest bonus first.
    pub realized_edges: Vec<RealizedEdge>,
    pub stack_partners: Vec<StackPartner>,
}

/// Build the report for `lineup`. Pure; inputs are not modified.
pub fn assemble(
    lineup: &Lineup,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    constraints: &Constraints,
    options: &ReportOptions,
) -> LineupReport {
    let seats: Vec<(PlayerIndex, &str)> = lineup
        .slots
        .iter()
        .filter_map(|s| pool.index_of(&s.player).map(|p| (p, s.label.as_str())))
        .collect();
    let mut members: Vec<PlayerIndex> = seats.iter().map(|&(p, _)| p).collect();
    members.sort_unstable();

    let mut selection = Selection::new(pool.len());
    for &p in &members {
        selection.insert(p, graph);
    }

    let projection_total: f64 = members.iter().map(|&p| pool.get(p).projection).sum();
    let synergy_total = graph.bonus_for(&members);
    let total_value = projection_total + synergy_total;

    let contributions = seats
        .iter()
        .map(|&(p, label)| {
            contribution(p, label, total_value, &members, &selection, pool, graph, constraints)
        })
        .collect();

    LineupReport {
        total_value,
        projection_total,
        synergy_total,
        contributions,
        realized_edges: realized_edges(&selection, pool, graph, options.max_realized_edges),
        stack_partners: stack_partners(
            &selection,
            pool,
            graph,
            constraints,
            options.max_stack_partners,
        ),
    }
}

/// Marginal value of `player` against the cheapest eligible unselected
/// replacement for its seat (ties: higher projection, then identifier).
#[allow(clippy::too_many_arguments)]
fn contribution(
    player: PlayerIndex,
    label: &str,
    total_value: f64,
    members: &[PlayerIndex],
    selection: &Selection,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    constraints: &Constraints,
) -> PlayerContribution {
    let record = pool.get(player);
    let replacement = constraints.rule_by_label(label).and_then(|rule| {
        rule.eligible
            .iter()
            .copied()
            .filter(|&q| !selection.contains(q))
            .min_by(|&x, &y| {
                let (rx, ry) = (pool.get(x), pool.get(y));
                rx.cost_or_zero()
                    .cmp(&ry.cost_or_zero())
                    .then_with(|| ry.projection.total_cmp(&rx.projection))
                    .then_with(|| x.cmp(&y))
            })
    });

    let marginal = match replacement {
        Some(q) => {
            let mut swapped: Vec<PlayerIndex> = members
                .iter()
                .map(|&m| if m == player { q } else { m })
                .collect();
            swapped.sort_unstable();
            let swapped_value: f64 = swapped.iter().map(|&m| pool.get(m).projection).sum::<f64>()
                + graph.bonus_for(&swapped);
            total_value - swapped_value
        }
        None => record.projection,
    };

    PlayerContribution {
        player: record.id.clone(),
        slot: label.to_string(),
        projection: record.projection,
        marginal,
        replacement: replacement.map(|q| pool.get(q).id.clone()),
    }
}

fn realized_edges(
    selection: &Selection,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    limit: usize,
) -> Vec<RealizedEdge> {
    let mut edges: Vec<_> = graph
        .edges()
        .iter()
        .filter(|e| selection.contains(e.a) && selection.contains(e.b))
        .collect();
    // Index order is identifier order, so (a, b) breaks ties by identifier.
    edges.sort_by(|x, y| {
        y.bonus
            .total_cmp(&x.bonus)
            .then_with(|| (x.a, x.b).cmp(&(y.a, y.b)))
    });
    edges
        .into_iter()
        .take(limit)
        .map(|e| RealizedEdge {
            a: pool.get(e.a).id.clone(),
            b: pool.get(e.b).id.clone(),
            bonus: e.bonus,
            reason: e.reason.clone(),
        })
        .collect()
}

fn stack_partners(
    selection: &Selection,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    constraints: &Constraints,
    limit: usize,
) -> Vec<StackPartner> {
    let mut ranked: Vec<(PlayerIndex, f64)> = pool
        .players()
        .map(|(idx, _)| idx)
        .filter(|&idx| !selection.contains(idx) && !constraints.is_banned(idx))
        .map(|idx| (idx, graph.link(idx, selection)))
        .filter(|&(_, bonus)| bonus > 0.0)
        .collect();
    ranked.sort_by(|x, y| y.1.total_cmp(&x.1).then_with(|| x.0.cmp(&y.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(idx, bonus)| StackPartner {
            player: pool.get(idx).id.clone(),
            bonus,
            partners: graph
                .neighbors(idx)
                .iter()
                .filter(|&&(n, b)| selection.contains(n) && b > 0.0)
                .map(|&(n, _)| pool.get(n).id.clone())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::RosterSlotSpec;
    use crate::optimize::LineupSlot;
    use crate::pool::Player;
    use crate::synergy::SynergyEdge;

    fn fixture() -> (PlayerPool, SynergyGraph, Constraints) {
        let pool = PlayerPool::build(vec![
            Player::new("qb1", &["QB"], 20.0).with_cost(40),
            Player::new("qb2", &["QB"], 16.0).with_cost(30),
            Player::new("wr1", &["WR"], 15.0).with_cost(30),
            Player::new("wr2", &["WR"], 14.0).with_cost(25),
            Player::new("wr3", &["WR"], 10.0).with_cost(10),
            Player::new("wr4", &["WR"], 9.0).with_cost(10),
        ])
        .unwrap();
        let graph = SynergyGraph::build(
            vec![
                SynergyEdge::new("qb1", "wr1", 5.0, "same team"),
                SynergyEdge::new("qb1", "wr2", 2.0, "same game"),
                SynergyEdge::new("qb1", "wr3", 3.0, "same team"),
                SynergyEdge::new("qb1", "wr4", 3.0, "same team"),
            ],
            &pool,
        )
        .unwrap();
        let slots = vec![
            RosterSlotSpec::new("QB", 1, &["QB"]),
            RosterSlotSpec::new("WR", 2, &["WR"]),
        ];
        let c = Constraints::build(&slots, None, Some(200), &[], &[], &pool).unwrap();
        (pool, graph, c)
    }

    fn lineup() -> Lineup {
        Lineup {
            slots: [("QB", "qb1"), ("WR", "wr1"), ("WR", "wr2")]
                .iter()
                .map(|&(label, player)| LineupSlot {
                    label: label.into(),
                    player: player.into(),
                })
                .collect(),
            total_cost: Some(95),
            projection_total: 49.0,
            synergy_total: 7.0,
            total_value: 56.0,
        }
    }

    #[test]
    fn totals_are_recomputed() {
        let (pool, graph, c) = fixture();
        let report = assemble(&lineup(), &pool, &graph, &c, &ReportOptions::default());
        assert!((report.total_value - 56.0).abs() < 1e-9);
        assert!((report.synergy_total - 7.0).abs() < 1e-9);
        assert_eq!(report.contributions.len(), 3);
    }

    #[test]
    fn marginal_uses_cheapest_replacement() {
        let (pool, graph, c) = fixture();
        let report = assemble(&lineup(), &pool, &graph, &c, &ReportOptions::default());

        // wr1 -> wr3 (cost 10, beats wr4 on projection): 56 - (20+10+14+3+2) = 7
        let wr1 = &report.contributions[1];
        assert_eq!(wr1.replacement.as_deref(), Some("wr3"));
        assert!((wr1.marginal - 7.0).abs() < 1e-9);

        // qb1 -> qb2 loses 4 projection and all 7 synergy.
        let qb1 = &report.contributions[0];
        assert_eq!(qb1.replacement.as_deref(), Some("qb2"));
        assert!((qb1.marginal - 11.0).abs() < 1e-9);
    }

    #[test]
    fn marginal_falls_back_to_projection_without_replacement() {
        let pool = PlayerPool::build(vec![Player::new("k1", &["K"], 8.0)]).unwrap();
        let graph = SynergyGraph::empty(pool.len());
        let slots = vec![RosterSlotSpec::new("K", 1, &["K"])];
        let c = Constraints::build(&slots, None, None, &[], &[], &pool).unwrap();
        let lineup = Lineup {
            slots: vec![LineupSlot {
                label: "K".into(),
                player: "k1".into(),
            }],
            total_cost: None,
            projection_total: 8.0,
            synergy_total: 0.0,
            total_value: 8.0,
        };
        let report = assemble(&lineup, &pool, &graph, &c, &ReportOptions::default());
        assert_eq!(report.contributions[0].replacement, None);
        assert!((report.contributions[0].marginal - 8.0).abs() < 1e-9);
    }

    #[test]
    fn realized_edges_ranked_by_bonus() {
        let (pool, graph, c) = fixture();
        let report = assemble(&lineup(), &pool, &graph, &c, &ReportOptions::default());
        let pairs: Vec<(&str, &str)> = report
            .realized_edges
            .iter()
            .map(|e| (e.a.as_str(), e.b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("qb1", "wr1"), ("qb1", "wr2")]);
    }

    #[test]
    fn stack_partners_ranked_and_limited() {
        let (pool, graph, c) = fixture();
        let options = ReportOptions {
            max_stack_partners: 1,
            ..Default::default()
        };
        let report = assemble(&lineup(), &pool, &graph, &c, &options);
        // wr3 and wr4 tie on bonus; identifier order decides.
        assert_eq!(report.stack_partners.len(), 1);
        assert_eq!(report.stack_partners[0].player, "wr3");
        assert_eq!(report.stack_partners[0].partners, vec!["qb1"]);
        assert!((report.stack_partners[0].bonus - 3.0).abs() < 1e-9);
    }
}
