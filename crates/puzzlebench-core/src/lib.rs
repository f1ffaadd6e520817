//! PuzzleBench Core Library
//!
//! Evaluation orchestration for chess puzzle benchmarks: the single-puzzle
//! protocol ([`evaluator`]), the concurrent batch runner ([`orchestrator`]),
//! the Glicko-2 rating tracker ([`rating`]), and the collaborator contracts
//! the engine is built on (the [`Agent`] and [`PositionOracle`] traits).

pub mod agent;
pub mod domain;
pub mod evaluator;
pub mod obs;
pub mod oracle;
pub mod orchestrator;
pub mod pack;
pub mod rating;
pub mod telemetry;

pub use agent::{Agent, ProposedMove};
pub use domain::{AgentProfile, Color, EvalError, Puzzle};
pub use evaluator::{
    AbortReason, EvaluationResult, PuzzleEvaluator, PuzzleVerdict, MAX_REJECTED_MOVES,
};
pub use oracle::{turn_color, OracleError, PositionOracle};
pub use orchestrator::{BatchConfig, BatchOrchestrator, BatchReport, DEFAULT_MAX_CONCURRENT};
pub use pack::{PackError, PositionEntry, PuzzlePack, TableOracle};
pub use rating::{GameScore, Glicko2Tracker, RatingTracker, RatingTriple};
pub use telemetry::init_tracing;

pub use puzzlebench_store::{
    GameId, GameOutcome, GameRecord, GameStore, MoveAttempt, RatingSnapshot, StoreError,
};
