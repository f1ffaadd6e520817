//! Position oracle contract.
//!
//! The engine never inspects board state itself; everything it needs to know
//! about chess goes through [`PositionOracle`], an interface over opaque FEN
//! strings. The only position knowledge baked into the engine is reading the
//! side-to-move field out of a FEN ([`turn_color`]), which is pure string
//! parsing.

use thiserror::Error;

use crate::domain::Color;

/// Oracle failures.
///
/// These are not protocol outcomes: an oracle that cannot answer for a
/// position on a puzzle's solution path indicates broken puzzle data.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle has no knowledge of this position.
    #[error("unknown position: {0}")]
    UnknownPosition(String),

    /// The move cannot be applied in this position.
    #[error("invalid move {mv} in position {fen}")]
    InvalidMove { fen: String, mv: String },

    /// The FEN string is malformed.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}

/// Legal-move oracle over opaque positions.
///
/// Implementations must be deterministic: repeated calls with the same
/// position yield the same answers, and `apply` of a legal move always
/// yields the same successor position.
pub trait PositionOracle: Send + Sync {
    /// Legal moves in this position, in a stable order.
    fn legal_moves(&self, fen: &str) -> Result<Vec<String>, OracleError>;

    /// Whether `mv` is legal in this position.
    fn is_legal(&self, fen: &str, mv: &str) -> Result<bool, OracleError>;

    /// Apply `mv` and return the successor position. Fails with
    /// [`OracleError::InvalidMove`] if the move cannot be applied.
    fn apply(&self, fen: &str, mv: &str) -> Result<String, OracleError>;
}

/// Side to move for a FEN string (second whitespace-separated field).
pub fn turn_color(fen: &str) -> Result<Color, OracleError> {
    match fen.split_whitespace().nth(1) {
        Some("w") => Ok(Color::White),
        Some("b") => Ok(Color::Black),
        _ => Err(OracleError::InvalidFen(fen.to_string())),
    }
}
