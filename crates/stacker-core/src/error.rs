// Error taxonomy for the optimizer core.
//
// Input errors mean the caller handed us something unusable. Lineup errors
// come from the final validator and mean the search produced an illegal
// lineup, which is a defect in this crate rather than in the caller's data.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// Malformed or unsatisfiable optimization input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("player `{player}` appears more than once in the pool")]
    DuplicateIdentifier { player: String },

    #[error("player `{player}` has no valid eligible position")]
    InvalidPosition { player: String },

    #[error("player `{player}` has a non-finite projection ({value})")]
    InvalidProjection { player: String, value: f64 },

    #[error("unknown player `{player}`")]
    UnknownPlayer { player: String },

    #[error("synergy edge connects player `{player}` to itself")]
    SelfSynergy { player: String },

    #[error("more than one synergy edge between `{a}` and `{b}`")]
    DuplicateSynergy { a: String, b: String },

    #[error("synergy edge between `{a}` and `{b}` has a non-finite bonus")]
    InvalidBonus { a: String, b: String },

    #[error("a budget is set but player `{player}` has no cost")]
    MissingCost { player: String },

    #[error("constraints cannot be satisfied: {reason}")]
    InfeasibleConstraints { reason: String },

    #[error("no feasible initial lineup: slot `{slot}` cannot be filled")]
    NoFeasibleSeed { slot: String },
}

impl InputError {
    pub(crate) fn infeasible(reason: impl Into<String>) -> Self {
        InputError::InfeasibleConstraints {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lineup (validator) errors
// ---------------------------------------------------------------------------

/// A lineup that violates a hard constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineupError {
    #[error("player `{player}` cannot occupy slot `{slot}`")]
    SlotMismatch { slot: String, player: String },

    #[error("lineup costs {total}, exceeding the budget of {budget}")]
    BudgetExceeded { total: u64, budget: u64 },

    #[error("locked player `{player}` is missing from the lineup")]
    MissingLocked { player: String },

    #[error("banned player `{player}` is present in the lineup")]
    BannedPresent { player: String },
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Error returned by [`crate::optimize`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("internal error, search produced an illegal lineup: {0}")]
    Internal(#[from] LineupError),
}

impl OptimizeError {
    /// Whether this error points at a defect in the optimizer rather than
    /// at the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(self, OptimizeError::Internal(_))
    }
}
