// Search engine: improves the seed lineup until it converges or runs out of
// iteration / wall-clock budget.
//
// Strategy is picked per call from the number of seats left after the locks:
// small problems are enumerated exhaustively with bound pruning, everything
// else goes through best-improvement local search over swap, relocation and
// exchange moves. Both start from the seed and only ever replace the current
// lineup with a strictly better one, so the result is never worse than the
// seed.

pub mod exact;
pub mod local;
pub mod state;

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constraints::Constraints;
use crate::pool::PlayerPool;
use crate::synergy::SynergyGraph;

pub use state::{LineupState, VALUE_EPSILON};

// ---------------------------------------------------------------------------
// Limits and statistics
// ---------------------------------------------------------------------------

/// Caller-supplied bounds on a single optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    /// Maximum number of evaluated moves (or exhaustive leaves).
    pub iteration_budget: u64,
    /// Optional wall-clock limit. Runs that hit it are not reproducible.
    #[serde(default)]
    pub time_limit: Option<Duration>,
    /// Largest number of open seats for which exhaustive search is tried.
    #[serde(default = "default_exact_max_open_slots")]
    pub exact_max_open_slots: usize,
}

fn default_exact_max_open_slots() -> usize {
    4
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            iteration_budget: 100_000,
            time_limit: None,
            exact_max_open_slots: default_exact_max_open_slots(),
        }
    }
}

impl SearchLimits {
    pub fn with_iteration_budget(iteration_budget: u64) -> Self {
        SearchLimits {
            iteration_budget,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub moves_evaluated: u64,
    pub moves_accepted: u64,
    pub passes: u64,
    pub exact_leaves: u64,
}

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A full pass found no improving move, or exhaustive search finished.
    Converged,
    IterationBudgetExhausted,
    TimeLimitReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged => write!(f, "converged"),
            Termination::IterationBudgetExhausted => write!(f, "iteration budget exhausted"),
            Termination::TimeLimitReached => write!(f, "time limit reached"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Exact,
    LocalSearch,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Exact => write!(f, "exact"),
            Strategy::LocalSearch => write!(f, "local search"),
        }
    }
}

// ---------------------------------------------------------------------------
// Budget monitor
// ---------------------------------------------------------------------------

/// How often the wall clock is consulted, in evaluated moves.
const CLOCK_CHECK_INTERVAL: u64 = 64;

/// Counts evaluations and decides when the run must stop.
#[derive(Debug)]
pub(crate) struct Monitor {
    limit: u64,
    deadline: Option<Instant>,
    stopped: Option<Termination>,
}

impl Monitor {
    pub(crate) fn new(limits: &SearchLimits) -> Self {
        Monitor {
            limit: limits.iteration_budget,
            deadline: limits.time_limit.map(|d| Instant::now() + d),
            stopped: None,
        }
    }

    /// Called before each evaluation. Returns false once a limit is hit.
    pub(crate) fn allow(&mut self, stats: &SearchStats) -> bool {
        if self.stopped.is_some() {
            return false;
        }
        if stats.moves_evaluated >= self.limit {
            self.stopped = Some(Termination::IterationBudgetExhausted);
            return false;
        }
        if let Some(deadline) = self.deadline {
            if stats.moves_evaluated % CLOCK_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                self.stopped = Some(Termination::TimeLimitReached);
                return false;
            }
        }
        true
    }

    pub(crate) fn stopped(&self) -> Option<Termination> {
        self.stopped
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub state: LineupState,
    pub strategy: Strategy,
    pub termination: Termination,
    pub stats: SearchStats,
}

impl SearchOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Pick exhaustive search when the open seats are few and the number of
/// complete assignments, summed over every seating of the locks, fits in
/// the iteration budget.
pub fn choose_strategy(constraints: &Constraints, limits: &SearchLimits) -> Strategy {
    let instances = constraints.instances();
    let open = instances.len().saturating_sub(constraints.locked().len());
    if open > limits.exact_max_open_slots {
        return Strategy::LocalSearch;
    }

    let limit = usize::try_from(limits.iteration_budget).unwrap_or(usize::MAX);
    let leaves = exact::lock_arrangements(constraints, limit)
        .iter()
        .map(|arrangement| {
            (0..instances.len())
                .filter(|&seat| arrangement.iter().all(|&(_, s)| s != seat))
                .fold(1u64, |acc, seat| {
                    let inst = instances[seat];
                    let choices = constraints.rule(inst.rule).eligible.len() as u64
                        + u64::from(inst.optional);
                    acc.saturating_mul(choices.max(1))
                })
        })
        .fold(0u64, u64::saturating_add);
    if leaves <= limits.iteration_budget {
        Strategy::Exact
    } else {
        Strategy::LocalSearch
    }
}

/// Improve `seed` under `constraints`.
pub fn run(
    seed: LineupState,
    pool: &PlayerPool,
    graph: &SynergyGraph,
    constraints: &Constraints,
    limits: &SearchLimits,
) -> SearchOutcome {
    let strategy = choose_strategy(constraints, limits);
    debug!(
        "Search strategy: {} (seed value {:.3}, cost {})",
        strategy,
        seed.value(),
        seed.cost()
    );

    let mut monitor = Monitor::new(limits);
    let mut stats = SearchStats::default();
    let state = match strategy {
        Strategy::Exact => {
            exact::search(seed, pool, graph, constraints, &mut monitor, &mut stats)
        }
        Strategy::LocalSearch => {
            local::improve(seed, pool, graph, constraints, &mut monitor, &mut stats)
        }
    };

    let termination = monitor.stopped().unwrap_or(Termination::Converged);
    if termination != Termination::Converged {
        warn!(
            "Search stopped before converging: {} after {} moves",
            termination, stats.moves_evaluated
        );
    }

    SearchOutcome {
        state,
        strategy,
        termination,
        stats,
    }
}
