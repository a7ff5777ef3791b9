// Concurrent batch execution of configured contests.
//
// Each contest loads its own CSVs and runs the optimizer on a blocking task;
// nothing mutable is shared between them. Outcomes come back in config
// order, and a failing contest becomes an error outcome instead of aborting
// the batch.

use std::path::{Path, PathBuf};

use serde::Serialize;
use stacker_core::{
    optimize, OptimizeError, OptimizeRequest, Optimized, ReportOptions, SearchLimits,
};
use tracing::{error, info, warn};

use crate::config::{Config, ContestConfig};
use crate::source::{self, SourceError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ContestError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error("optimizer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ContestError {
    /// True only for validator rejections, which point at an optimizer bug.
    pub fn is_internal(&self) -> bool {
        matches!(self, ContestError::Optimize(e) if e.is_internal())
    }
}

/// What gets rendered for one contest.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Optimized(Box<Optimized>),
    Failed { error: String, internal: bool },
}

#[derive(Debug, Serialize)]
pub struct ContestOutcome {
    pub contest: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ContestOutcome {
    fn new(contest: String, result: Result<Optimized, ContestError>) -> Self {
        let outcome = match result {
            Ok(optimized) => Outcome::Optimized(Box::new(optimized)),
            Err(e) => Outcome::Failed {
                internal: e.is_internal(),
                error: e.to_string(),
            },
        };
        ContestOutcome { contest, outcome }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Request assembly
// ---------------------------------------------------------------------------

/// Load a contest's data and build its optimizer request.
pub fn build_request(
    contest: &ContestConfig,
    base_dir: &Path,
    limits: SearchLimits,
    report: ReportOptions,
) -> Result<OptimizeRequest, SourceError> {
    let players = source::load_players(&contest.players_path(base_dir))?;
    let synergies = match contest.synergies_path(base_dir) {
        Some(path) => source::load_synergies(&path)?,
        None => Vec::new(),
    };

    Ok(OptimizeRequest {
        players,
        synergies,
        slots: contest.slot_specs(),
        budget: contest.budget,
        roster_size: contest.roster_size,
        locked: contest.locked.clone(),
        banned: contest.banned.clone(),
        limits,
        report,
    })
}

fn run_contest(
    contest: &ContestConfig,
    base_dir: &Path,
    limits: SearchLimits,
    report: ReportOptions,
) -> Result<Optimized, ContestError> {
    let request = build_request(contest, base_dir, limits, report)?;
    info!(
        "Contest {}: {} players, {} synergy edges",
        contest.name,
        request.players.len(),
        request.synergies.len()
    );
    Ok(optimize(&request)?)
}

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Optimize every configured contest concurrently.
pub async fn run_all(config: &Config, base_dir: &Path) -> Vec<ContestOutcome> {
    let limits = config.optimizer.limits;
    let report = config.optimizer.report;

    let handles: Vec<_> = config
        .contests
        .iter()
        .cloned()
        .map(|contest| {
            let base_dir: PathBuf = base_dir.to_path_buf();
            let name = contest.name.clone();
            let handle = tokio::task::spawn_blocking(move || {
                run_contest(&contest, &base_dir, limits, report)
            });
            (name, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ContestError::Task(e)),
        };
        match &result {
            Ok(optimized) if !optimized.converged() => warn!(
                "Contest {}: returning best lineup found ({})",
                name, optimized.termination
            ),
            Ok(optimized) => info!(
                "Contest {}: value {:.2} via {}",
                name, optimized.lineup.total_value, optimized.strategy
            ),
            Err(e) if e.is_internal() => {
                error!("Contest {}: internal optimizer error: {}", name, e)
            }
            Err(e) => error!("Contest {}: {}", name, e),
        }
        outcomes.push(ContestOutcome::new(name, result));
    }
    outcomes
}
