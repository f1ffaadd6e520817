//! Domain-level error taxonomy for PuzzleBench.
//!
//! Deliberately small: most failure modes of the evaluation protocol are not
//! errors but explicit verdict branches (illegal moves, wrong moves, agent
//! unavailability, store unavailability at game creation). What remains here
//! are conditions the protocol cannot absorb.

use crate::oracle::OracleError;

/// PuzzleBench domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The oracle could not answer for a position or move the solution path
    /// requires. This means the puzzle pack does not cover its own solution,
    /// which is a data bug, not a protocol outcome.
    #[error("oracle failure: {0}")]
    Oracle(#[from] OracleError),
}

/// Result type for PuzzleBench domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::Oracle(OracleError::UnknownPosition("8/8 w - -".to_string()));
        assert!(err.to_string().contains("oracle failure"));
        assert!(err.to_string().contains("unknown position"));
    }
}
