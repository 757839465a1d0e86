//! Error types for partitioning.

use thiserror::Error;

use crate::lp::LpStatus;
use crate::validation::ValidationError;

/// Errors returned by the partitioner and the LP boundary.
///
/// The heuristic algorithms never fail: size-bound problems they cannot fix
/// show up as [`crate::models::Violation`]s on the result instead.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The competitor batch failed validation.
    #[error("invalid input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),

    /// The LP algorithm was requested but no solver is attached.
    #[error("no LP solver attached")]
    SolverUnavailable,

    /// The LP solver did not produce a usable assignment.
    #[error("LP solver '{solver}' failed: {status}")]
    SolverFailed {
        /// Solver name
        solver: String,
        /// Status reported by the solver
        status: LpStatus,
    },

    /// The solver reported success but its values do not decode.
    #[error("invalid LP solution: {0}")]
    InvalidSolution(String),
}

impl PartitionError {
    /// Create a SolverFailed error.
    pub fn solver_failed(solver: impl Into<String>, status: LpStatus) -> Self {
        Self::SolverFailed {
            solver: solver.into(),
            status,
        }
    }

    /// Create an InvalidSolution error.
    pub fn invalid_solution(message: impl Into<String>) -> Self {
        Self::InvalidSolution(message.into())
    }

    /// Validation errors carried by [`PartitionError::InvalidInput`].
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::InvalidInput(errors) => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
