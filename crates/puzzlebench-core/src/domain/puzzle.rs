//! Puzzle definition.

use serde::{Deserialize, Serialize};

/// A chess tactic puzzle: a fixed starting position plus a known correct
/// alternating move sequence.
///
/// `moves` holds space-separated half-moves at indices 0,1,2,…: even indices
/// are opponent moves (trusted, applied verbatim), odd indices are the moves
/// the agent under test must find. The sequence is even-length by
/// construction; an odd-length solution simply ends on the opponent's move.
///
/// Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Puzzle {
    /// Puzzle identifier (e.g. a Lichess puzzle id).
    pub id: String,

    /// Starting position as a FEN string.
    pub fen: String,

    /// Space-separated solution half-moves.
    pub moves: String,

    /// Puzzle difficulty rating; acts as the "opponent" strength for the
    /// agent's rating update.
    pub rating: i32,

    /// Rating deviation of the puzzle rating.
    pub rating_deviation: i32,

    /// Theme tags (comma/space separated, opaque to the engine).
    #[serde(default)]
    pub themes: String,

    /// Classification tag (e.g. "tactic", "endgame").
    #[serde(default)]
    pub puzzle_type: String,

    /// Popularity score from the source corpus.
    #[serde(default)]
    pub popularity: i32,

    /// Number of plays in the source corpus.
    #[serde(default)]
    pub nb_plays: i32,

    /// URL of the source game, if any.
    #[serde(default)]
    pub game_url: String,

    /// Opening tags from the source corpus.
    #[serde(default)]
    pub opening_tags: String,
}

impl Puzzle {
    /// The solution as individual half-moves.
    pub fn solution(&self) -> Vec<&str> {
        self.moves.split_whitespace().collect()
    }
}
