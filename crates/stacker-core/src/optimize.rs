// Public entry point: one call builds fresh pool, graph and constraints from
// plain data, seeds, searches, validates and reports. Nothing survives the
// call.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::constraints::{Constraints, RosterSlotSpec};
use crate::error::OptimizeError;
use crate::pool::{Player, PlayerPool};
use crate::report::{self, LineupReport, ReportOptions};
use crate::search::{self, LineupState, SearchLimits, SearchStats, Strategy, Termination};
use crate::seed;
use crate::synergy::{SynergyEdge, SynergyGraph};
use crate::validate::validate;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything one optimization needs, as plain data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub players: Vec<Player>,
    #[serde(default)]
    pub synergies: Vec<SynergyEdge>,
    pub slots: Vec<RosterSlotSpec>,
    /// Salary cap. `None` for uncapped (season-long) formats.
    #[serde(default)]
    pub budget: Option<u64>,
    /// Defaults to the sum of the slot maxima.
    #[serde(default)]
    pub roster_size: Option<usize>,
    #[serde(default)]
    pub locked: Vec<String>,
    #[serde(default)]
    pub banned: Vec<String>,
    #[serde(default)]
    pub limits: SearchLimits,
    #[serde(default)]
    pub report: ReportOptions,
}

// ---------------------------------------------------------------------------
// Lineup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupSlot {
    pub label: String,
    pub player: String,
}

/// The selected roster. Holds identifiers only, never pool references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    /// Occupied seats in slot order.
    pub slots: Vec<LineupSlot>,
    /// `None` when the contest has no budget.
    pub total_cost: Option<u64>,
    pub projection_total: f64,
    pub synergy_total: f64,
    pub total_value: f64,
}

impl Lineup {
    /// Player identifiers in seat order.
    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.player.as_str())
    }

    pub fn contains(&self, player: &str) -> bool {
        self.slots.iter().any(|s| s.player == player)
    }

    /// Freeze a working state into a lineup. Totals are recomputed from the
    /// members in ascending order rather than taken from the incremental
    /// sums, so identical selections always yield identical numbers.
    pub(crate) fn from_state(
        state: &LineupState,
        pool: &PlayerPool,
        graph: &SynergyGraph,
        constraints: &Constraints,
    ) -> Self {
        let slots = state
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(inst, occupant)| {
                occupant.map(|p| LineupSlot {
                    label: constraints.rule(constraints.instances()[inst].rule).label.clone(),
                    player: pool.get(p).id.clone(),
                })
            })
            .collect();

        let members = state.members();
        let projection_total: f64 = members.iter().map(|&p| pool.get(p).projection).sum();
        let synergy_total = graph.bonus_for(&members);
        let total_cost = constraints
            .budget()
            .map(|_| members.iter().map(|&p| pool.get(p).cost_or_zero()).sum());

        Lineup {
            slots,
            total_cost,
            projection_total,
            synergy_total,
            total_value: projection_total + synergy_total,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimized {
    pub lineup: Lineup,
    pub report: LineupReport,
    pub strategy: Strategy,
    pub termination: Termination,
    pub stats: SearchStats,
    /// Value of the greedy seed the search started from.
    pub seed_value: f64,
}

impl Optimized {
    /// False when the search stopped on its iteration or time limit. The
    /// lineup is still feasible in that case.
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Select the highest-value legal lineup for `request`.
///
/// Deterministic for identical requests unless `limits.time_limit` is set
/// and actually cuts the search short.
pub fn optimize(request: &OptimizeRequest) -> Result<Optimized, OptimizeError> {
    let pool = PlayerPool::build(request.players.clone())?;
    let graph = SynergyGraph::build(request.synergies.clone(), &pool)?;
    let constraints = Constraints::build(
        &request.slots,
        request.roster_size,
        request.budget,
        &request.locked,
        &request.banned,
        &pool,
    )?;

    let seed = LineupState::new(seed::generate(&constraints, &pool)?, &pool, &graph);
    let seed_value = seed.value();
    let outcome = search::run(seed, &pool, &graph, &constraints, &request.limits);

    let lineup = Lineup::from_state(&outcome.state, &pool, &graph, &constraints);
    if let Err(e) = validate(&lineup, &constraints, &pool) {
        error!("Validator rejected search result: {}", e);
        return Err(e.into());
    }

    let report = report::assemble(&lineup, &pool, &graph, &constraints, &request.report);
    info!(
        "Optimized {} players into {} seats: value {:.3} (seed {:.3}), {} moves, {}",
        pool.len(),
        lineup.slots.len(),
        lineup.total_value,
        seed_value,
        outcome.stats.moves_evaluated,
        outcome.termination
    );

    Ok(Optimized {
        lineup,
        report,
        strategy: outcome.strategy,
        termination: outcome.termination,
        stats: outcome.stats,
        seed_value,
    })
}
