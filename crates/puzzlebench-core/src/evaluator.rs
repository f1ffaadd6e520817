//! Single-puzzle evaluation protocol.
//!
//! Drives one puzzle to a terminal outcome: opponent half-moves from the
//! solution are applied verbatim (and still recorded for audit), agent
//! half-moves are requested from the [`Agent`], checked for legality with a
//! bounded retry loop, applied, and compared against the solution.
//!
//! The protocol is side-effect-free with respect to shared rating state: a
//! [`PuzzleVerdict::Completed`] only reports what happened; absorbing the
//! outcome into the agent's rating and persisting the snapshot is the batch
//! orchestrator's job.

use std::sync::Arc;

use tracing::{debug, error, warn};

use puzzlebench_store::{GameId, GameStore, MoveAttempt};

use crate::agent::Agent;
use crate::domain::{EvalError, Puzzle};
use crate::obs;
use crate::oracle::{turn_color, PositionOracle};

/// Retry budget: a puzzle is failed once this many proposals for a single
/// move slot have been rejected as illegal.
pub const MAX_REJECTED_MOVES: usize = 5;

/// Outcome of a completed (non-aborted) puzzle evaluation.
///
/// Carries the puzzle's rating and deviation so the orchestrator can rate the
/// agent against it without holding the puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub game_id: GameId,
    pub puzzle_rating: i32,
    pub puzzle_deviation: i32,
    pub success: bool,
}

/// Why a puzzle was discarded from rating consideration entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The agent returned nothing on an initial or retry request.
    AgentUnavailable,

    /// The result store failed before a terminal outcome was decided.
    StoreUnavailable,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::AgentUnavailable => write!(f, "agent_unavailable"),
            AbortReason::StoreUnavailable => write!(f, "store_unavailable"),
        }
    }
}

/// Terminal verdict of one puzzle evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PuzzleVerdict {
    /// The game reached a terminal outcome and should be rated.
    Completed(EvaluationResult),

    /// The evaluation was discarded; no outcome, no rating effect.
    Aborted(AbortReason),
}

/// Runs the single-puzzle protocol against one agent, oracle, and store.
pub struct PuzzleEvaluator {
    agent: Arc<dyn Agent>,
    oracle: Arc<dyn PositionOracle>,
    store: Arc<dyn GameStore>,
}

impl PuzzleEvaluator {
    pub fn new(
        agent: Arc<dyn Agent>,
        oracle: Arc<dyn PositionOracle>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        Self {
            agent,
            oracle,
            store,
        }
    }

    /// Evaluate one puzzle to a terminal verdict.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Oracle`] only when the oracle cannot answer for a
    /// position or solution move on the puzzle's own path — broken puzzle
    /// data, not a protocol outcome.
    pub async fn evaluate(&self, puzzle: &Puzzle) -> Result<PuzzleVerdict, EvalError> {
        let agent_name = self.agent.profile().name.clone();
        let solution = puzzle.solution();
        debug!(puzzle_id = %puzzle.id, half_moves = solution.len(), "starting evaluation");

        let game_id = match self.store.create_game(&puzzle.id, &agent_name).await {
            Ok(id) => id,
            Err(e) => {
                warn!(puzzle_id = %puzzle.id, error = %e, "game creation failed, aborting puzzle");
                return Ok(PuzzleVerdict::Aborted(AbortReason::StoreUnavailable));
            }
        };
        obs::emit_game_created(&game_id.0, &puzzle.id);

        let mut fen = puzzle.fen.clone();
        let mut failed = false;

        'pairs: for pair in solution.chunks(2) {
            // Opponent half-move: trusted verbatim, applied without asking
            // the agent, but still recorded for audit.
            let opponent_move = pair[0];
            let after_opponent = self.oracle.apply(&fen, opponent_move)?;
            if let Err(e) = self
                .store
                .record_move_attempt(&game_id, MoveAttempt::opponent(&fen, opponent_move))
                .await
            {
                warn!(game_id = %game_id, error = %e, "opponent move persistence failed, aborting puzzle");
                return Ok(PuzzleVerdict::Aborted(AbortReason::StoreUnavailable));
            }
            fen = after_opponent;

            // Odd-length solution: the puzzle ends on the opponent's move.
            let Some(expected) = pair.get(1).copied() else {
                break;
            };

            let legal_moves = self.oracle.legal_moves(&fen)?;
            let color = turn_color(&fen)?;

            let Some(mut proposed) = self.agent.propose_move(&fen, &legal_moves, color).await
            else {
                debug!(game_id = %game_id, "agent failed to produce a move, aborting puzzle");
                return Ok(PuzzleVerdict::Aborted(AbortReason::AgentUnavailable));
            };

            // Bounded retry loop over illegal proposals. Every rejected move
            // is persisted as it accumulates; the budget includes the final
            // still-illegal attempt.
            let mut rejected: Vec<String> = Vec::new();
            while !self.oracle.is_legal(&fen, &proposed.san)? {
                rejected.push(proposed.san.clone());
                self.persist_attempt(&game_id, &fen, Some(expected), &proposed, true)
                    .await;

                if rejected.len() >= MAX_REJECTED_MOVES {
                    debug!(game_id = %game_id, "retry budget exhausted, failing puzzle");
                    failed = true;
                    break 'pairs;
                }

                match self
                    .agent
                    .propose_retry(&rejected, &fen, &legal_moves, color)
                    .await
                {
                    Some(retry) => proposed = retry,
                    None => {
                        debug!(game_id = %game_id, "agent failed during retry, aborting puzzle");
                        return Ok(PuzzleVerdict::Aborted(AbortReason::AgentUnavailable));
                    }
                }
            }

            // Legal move: apply and record.
            let after_agent = self.oracle.apply(&fen, &proposed.san)?;
            self.persist_attempt(&game_id, &fen, Some(expected), &proposed, false)
                .await;

            // Correctness: a legal move only solves the puzzle if it reaches
            // the same position as the solution move (notation-independent).
            let after_expected = self.oracle.apply(&fen, expected)?;
            if after_agent != after_expected {
                debug!(
                    game_id = %game_id,
                    actual = %proposed.san,
                    expected = %expected,
                    "legal but wrong move, failing puzzle"
                );
                failed = true;
                break;
            }
            fen = after_agent;
        }

        // Terminal outcome decided; a finalize failure is reported but does
        // not change the verdict.
        if let Err(e) = self.store.finalize_game(&game_id, failed).await {
            error!(game_id = %game_id, error = %e, "failed to persist terminal outcome");
        }
        obs::emit_puzzle_evaluated(&game_id.0, &puzzle.id, !failed);

        Ok(PuzzleVerdict::Completed(EvaluationResult {
            game_id,
            puzzle_rating: puzzle.rating,
            puzzle_deviation: puzzle.rating_deviation,
            success: !failed,
        }))
    }

    /// Persist an agent move attempt. Failures after game creation are
    /// logged, not fatal: the terminal outcome still gets decided.
    async fn persist_attempt(
        &self,
        game_id: &GameId,
        fen: &str,
        expected: Option<&str>,
        proposed: &crate::agent::ProposedMove,
        is_illegal: bool,
    ) {
        let attempt = MoveAttempt {
            fen: fen.to_string(),
            expected_move: expected.map(str::to_string),
            actual_move: proposed.san.clone(),
            is_illegal,
            prompt_tokens: proposed.prompt_tokens,
            completion_tokens: proposed.completion_tokens,
        };
        if let Err(e) = self.store.record_move_attempt(game_id, attempt).await {
            warn!(game_id = %game_id, error = %e, "move attempt persistence failed");
        }
    }
}
