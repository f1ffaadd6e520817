//! Structured observability hooks for batch evaluation lifecycle events.
//!
//! This module provides:
//! - Batch-scoped tracing spans via the `BatchSpan` RAII guard
//! - Emission functions for key lifecycle events: batch start/finish, game
//!   creation, puzzle verdicts, rating updates, deviation-target hits
//!
//! Events are emitted at `info!` level and filtered via `RUST_LOG`.

use tracing::info;

/// RAII guard that enters a batch-scoped tracing span for the duration of a
/// batch run. All tracing calls inside are tagged with the agent name.
pub struct BatchSpan {
    _span: tracing::span::EnteredSpan,
}

impl BatchSpan {
    /// Create and enter a span tagged with the agent under evaluation.
    pub fn enter(agent_name: &str) -> Self {
        let span = tracing::info_span!("puzzlebench.batch", agent = %agent_name);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: batch evaluation started.
pub fn emit_batch_started(agent_name: &str, puzzles: usize, max_concurrent: usize) {
    info!(
        event = "batch.started",
        agent = %agent_name,
        puzzles = puzzles,
        max_concurrent = max_concurrent,
    );
}

/// Emit event: a game record was created for a puzzle evaluation.
pub fn emit_game_created(game_id: &str, puzzle_id: &str) {
    info!(event = "game.created", game_id = %game_id, puzzle_id = %puzzle_id);
}

/// Emit event: a puzzle evaluation reached a terminal outcome.
pub fn emit_puzzle_evaluated(game_id: &str, puzzle_id: &str, success: bool) {
    info!(
        event = "puzzle.evaluated",
        game_id = %game_id,
        puzzle_id = %puzzle_id,
        success = success,
    );
}

/// Emit event: a puzzle evaluation was aborted with no rating effect.
pub fn emit_puzzle_aborted(puzzle_id: &str, reason: &str) {
    info!(event = "puzzle.aborted", puzzle_id = %puzzle_id, reason = %reason);
}

/// Emit event: the agent's rating absorbed one game outcome.
pub fn emit_rating_updated(agent_name: &str, rating: f64, deviation: f64) {
    info!(
        event = "rating.updated",
        agent = %agent_name,
        rating = rating,
        deviation = deviation,
    );
}

/// Emit event: the deviation target was reached and remaining work cancelled.
pub fn emit_target_reached(target: f64, deviation: f64) {
    info!(event = "batch.target_reached", target = target, deviation = deviation);
}

/// Emit event: batch evaluation finished.
pub fn emit_batch_finished(
    agent_name: &str,
    evaluated: u64,
    aborted: u64,
    cancelled: u64,
    rating: f64,
    deviation: f64,
) {
    info!(
        event = "batch.finished",
        agent = %agent_name,
        evaluated = evaluated,
        aborted = aborted,
        cancelled = cancelled,
        rating = rating,
        deviation = deviation,
    );
}
