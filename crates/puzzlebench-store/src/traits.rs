//! Storage trait definition for PuzzleBench
//!
//! [`GameStore`] is the single contract the evaluation engine writes through:
//! game creation, move attempt persistence, finalization, and rating
//! snapshots, plus the query surface callers use to inspect results and
//! re-admit interrupted games.
//!
//! The trait is async and backend-agnostic. Implementations must tolerate
//! concurrent writes from multiple in-flight evaluations; distinct game ids
//! never collide.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::records::{AgentStanding, GameId, GameRecord, MoveAttempt, RatingSnapshot};

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Backend-agnostic game and rating persistence.
///
/// Guarantees:
/// - `record_move_attempt` appends; attempts within one game stay in
///   insertion order.
/// - `finalize_game` sets the terminal outcome exactly once and fails with
///   `StoreError::AlreadyFinalized` on a second call.
/// - `record_rating_snapshot` accepts at most one snapshot per game.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Create a new open game for (puzzle, agent) and return its id.
    async fn create_game(&self, puzzle_id: &str, agent_name: &str) -> StoreResult<GameId>;

    /// Append a move attempt to a game.
    async fn record_move_attempt(&self, game_id: &GameId, attempt: MoveAttempt)
        -> StoreResult<()>;

    /// Record the terminal outcome of a game.
    async fn finalize_game(&self, game_id: &GameId, failed: bool) -> StoreResult<()>;

    /// Persist the agent's rating triple after absorbing this game's outcome.
    async fn record_rating_snapshot(
        &self,
        game_id: &GameId,
        rating: f64,
        deviation: f64,
        volatility: f64,
    ) -> StoreResult<()>;

    /// Fetch a single game, `None` if absent.
    async fn game(&self, game_id: &GameId) -> StoreResult<Option<GameRecord>>;

    /// All games recorded for an agent, in creation order.
    async fn agent_games(&self, agent_name: &str) -> StoreResult<Vec<GameRecord>>;

    /// Games for an agent that never reached a terminal outcome.
    ///
    /// These are the audit trail of cancelled or crashed evaluations; callers
    /// re-admit their puzzles in a future batch.
    async fn incomplete_games(&self, agent_name: &str) -> StoreResult<Vec<GameRecord>>;

    /// The most recent rating snapshot for an agent, `None` if it has none.
    async fn last_snapshot(&self, agent_name: &str) -> StoreResult<Option<RatingSnapshot>>;

    /// Leaderboard over all agents with at least one snapshot, ordered by
    /// rating descending.
    async fn leaderboard(&self) -> StoreResult<Vec<AgentStanding>>;
}
