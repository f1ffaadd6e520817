//! Persistence layer for PuzzleBench
//!
//! Defines the records produced by puzzle evaluation (games, move attempts,
//! rating snapshots) and the backend-agnostic [`GameStore`] trait used by the
//! evaluation engine. Two implementations are provided:
//! - [`MemoryGameStore`]: in-memory, for tests and throwaway runs
//! - [`JsonGameStore`]: a single JSON document on disk

pub mod error;
pub mod json;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::StoreError;
pub use json::JsonGameStore;
pub use memory::MemoryGameStore;
pub use records::{
    AgentStanding, GameId, GameOutcome, GameRecord, MoveAttempt, RatingSnapshot,
};
pub use traits::{GameStore, StoreResult};
