//! Persistent records produced by puzzle evaluation.
//!
//! These types mirror what a run leaves behind: one [`GameRecord`] per
//! (puzzle, agent) evaluation, its ordered [`MoveAttempt`]s, and one
//! [`RatingSnapshot`] per game that reached a terminal outcome through the
//! normal path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a game (one puzzle evaluation attempt)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    /// Generate a new random GameId
    pub fn new() -> Self {
        GameId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal outcome of a game, set exactly once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Succeeded,
    Failed,
}

/// A single move attempt within a game.
///
/// Opponent moves from the solution are recorded with `is_illegal = false`
/// and zero cost metadata; agent moves carry whatever token counts the agent
/// reported. Token fields are opaque to the engine and passed through
/// unexamined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveAttempt {
    /// Position (FEN) before the move was played.
    pub fen: String,

    /// The solution's expected move at this slot, if any.
    pub expected_move: Option<String>,

    /// The move actually produced.
    pub actual_move: String,

    /// Whether the move was rejected as illegal.
    pub is_illegal: bool,

    /// Prompt tokens spent producing this move.
    pub prompt_tokens: u32,

    /// Completion tokens spent producing this move.
    pub completion_tokens: u32,
}

impl MoveAttempt {
    /// A trusted opponent move taken verbatim from the solution.
    pub fn opponent(fen: impl Into<String>, san: impl Into<String>) -> Self {
        let san = san.into();
        Self {
            fen: fen.into(),
            expected_move: Some(san.clone()),
            actual_move: san,
            is_illegal: false,
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }
}

/// One puzzle evaluation attempt by one agent.
///
/// `outcome` stays `None` for games interrupted before a terminal state was
/// decided (batch cancellation); such games are re-runnable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Unique identifier for this game.
    pub id: GameId,

    /// Puzzle that was evaluated.
    pub puzzle_id: String,

    /// Agent under evaluation.
    pub agent_name: String,

    /// When the game record was created.
    pub created_at: DateTime<Utc>,

    /// Terminal outcome, absent while open or after cancellation.
    pub outcome: Option<GameOutcome>,

    /// Move attempts in chronological play order.
    pub moves: Vec<MoveAttempt>,
}

impl GameRecord {
    /// Create a new open game for (puzzle, agent).
    pub fn new(puzzle_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            id: GameId::new(),
            puzzle_id: puzzle_id.into(),
            agent_name: agent_name.into(),
            created_at: Utc::now(),
            outcome: None,
            moves: Vec::new(),
        }
    }

    /// Whether a terminal outcome has been recorded.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Rating triple recorded immediately after absorbing one game's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSnapshot {
    /// Game whose outcome was absorbed.
    pub game_id: GameId,

    /// Agent rating after the update.
    pub rating: f64,

    /// Rating deviation after the update.
    pub deviation: f64,

    /// Rating volatility after the update.
    pub volatility: f64,

    /// When the snapshot was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Aggregated leaderboard entry for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStanding {
    pub name: String,
    pub rating: f64,
    pub deviation: f64,
    pub win_rate: f64,
    pub games_played: u64,
}
