//! Concurrent batch evaluation for one agent.
//!
//! Launches one evaluation task per puzzle, admitted through a counting
//! semaphore that bounds how many are inside their protocol (and therefore
//! how many agent calls are outstanding) at once. Completions are consumed
//! one at a time off the [`JoinSet`], which makes the completion handler the
//! single writer over the rating tracker by construction — the
//! correctness-critical invariant of the engine.
//!
//! Cancellation is cooperative: once the deviation target is reached the
//! remaining tasks are aborted at their next await point. Their
//! partially-written move attempts stay in the store as the audit trail of
//! an incomplete run, discoverable via `GameStore::incomplete_games`.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use puzzlebench_store::GameStore;

use crate::agent::Agent;
use crate::domain::{EvalError, Puzzle};
use crate::evaluator::{PuzzleEvaluator, PuzzleVerdict};
use crate::obs::{self, BatchSpan};
use crate::oracle::PositionOracle;
use crate::rating::{GameScore, Glicko2Tracker, RatingTracker, RatingTriple};

/// Default bound on concurrently running evaluations.
pub const DEFAULT_MAX_CONCURRENT: usize = 6;

/// Batch run configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum evaluations inside their protocol at once.
    pub max_concurrent: usize,

    /// Stop early once the agent's rating deviation drops to this value.
    pub target_deviation: Option<f64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            target_deviation: None,
        }
    }
}

/// What a batch run did.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Puzzles that reached a terminal outcome and were rated.
    pub evaluated: u64,

    /// Of the evaluated, how many the agent solved.
    pub succeeded: u64,

    /// Of the evaluated, how many it failed.
    pub failed: u64,

    /// Puzzles discarded with no rating effect (agent/store failures).
    pub aborted: u64,

    /// Puzzles cancelled before reaching a terminal state.
    pub cancelled: u64,

    /// The agent's rating triple after the batch.
    pub final_rating: RatingTriple,
}

/// Runs the evaluation protocol over a puzzle set for one agent and owns the
/// agent's rating state for the duration of the batch.
pub struct BatchOrchestrator {
    agent: Arc<dyn Agent>,
    oracle: Arc<dyn PositionOracle>,
    store: Arc<dyn GameStore>,
    tracker: Box<dyn RatingTracker>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    /// Orchestrator with an explicit rating tracker.
    pub fn new(
        agent: Arc<dyn Agent>,
        oracle: Arc<dyn PositionOracle>,
        store: Arc<dyn GameStore>,
        tracker: Box<dyn RatingTracker>,
        config: BatchConfig,
    ) -> Self {
        Self {
            agent,
            oracle,
            store,
            tracker,
            config,
        }
    }

    /// Orchestrator with a Glicko-2 tracker seeded from the agent's profile.
    pub fn with_glicko2(
        agent: Arc<dyn Agent>,
        oracle: Arc<dyn PositionOracle>,
        store: Arc<dyn GameStore>,
        config: BatchConfig,
    ) -> Self {
        let tracker = Box::new(Glicko2Tracker::new(agent.profile().initial_rating));
        Self::new(agent, oracle, store, tracker, config)
    }

    /// Run the batch to completion (or early cancellation).
    ///
    /// Individual puzzle failures never fail the batch; they are counted and
    /// excluded from the rating history. Aborted and cancelled puzzles are
    /// not retried here — re-running them is the caller's decision.
    pub async fn run(mut self, puzzles: Vec<Puzzle>) -> BatchReport {
        let agent_name = self.agent.profile().name.clone();
        let _span = BatchSpan::enter(&agent_name);
        obs::emit_batch_started(&agent_name, puzzles.len(), self.config.max_concurrent);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks: JoinSet<(String, Result<PuzzleVerdict, EvalError>)> = JoinSet::new();

        for puzzle in puzzles {
            let semaphore = Arc::clone(&semaphore);
            let evaluator = PuzzleEvaluator::new(
                Arc::clone(&self.agent),
                Arc::clone(&self.oracle),
                Arc::clone(&self.store),
            );
            tasks.spawn(async move {
                // Queued tasks park here until a slot frees up; an abort
                // lands either on this acquire or on an agent call inside
                // the protocol.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let verdict = evaluator.evaluate(&puzzle).await;
                (puzzle.id, verdict)
            });
        }

        let mut report = BatchReport {
            evaluated: 0,
            succeeded: 0,
            failed: 0,
            aborted: 0,
            cancelled: 0,
            final_rating: self.tracker.current(),
        };
        let mut target_reached = false;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Err(e) if e.is_cancelled() => report.cancelled += 1,
                Err(e) => {
                    error!(error = %e, "evaluation task failed");
                    report.aborted += 1;
                }
                Ok((puzzle_id, Err(e))) => {
                    error!(puzzle_id = %puzzle_id, error = %e, "evaluation hit an oracle failure");
                    report.aborted += 1;
                }
                Ok((puzzle_id, Ok(PuzzleVerdict::Aborted(reason)))) => {
                    obs::emit_puzzle_aborted(&puzzle_id, &reason.to_string());
                    report.aborted += 1;
                }
                Ok((_, Ok(PuzzleVerdict::Completed(result)))) => {
                    report.evaluated += 1;
                    if result.success {
                        report.succeeded += 1;
                    } else {
                        report.failed += 1;
                    }

                    // Single-writer rating mutation: only this loop touches
                    // the tracker, one completion at a time, in completion
                    // order.
                    self.tracker.absorb(&[GameScore {
                        opponent_rating: f64::from(result.puzzle_rating),
                        opponent_deviation: f64::from(result.puzzle_deviation),
                        won: result.success,
                    }]);
                    let triple = self.tracker.current();
                    obs::emit_rating_updated(&agent_name, triple.rating, triple.deviation);

                    // Snapshot persistence failure does not unwind the
                    // in-memory rating mutation (eventual consistency).
                    if let Err(e) = self
                        .store
                        .record_rating_snapshot(
                            &result.game_id,
                            triple.rating,
                            triple.deviation,
                            triple.volatility,
                        )
                        .await
                    {
                        warn!(game_id = %result.game_id, error = %e, "rating snapshot persistence failed");
                    }

                    if let Some(target) = self.config.target_deviation {
                        if !target_reached && triple.deviation <= target {
                            obs::emit_target_reached(target, triple.deviation);
                            target_reached = true;
                            // Cooperative: tasks still mid-protocol are
                            // abandoned; tasks that already reached a
                            // terminal state still get absorbed as their
                            // completions drain.
                            tasks.abort_all();
                        }
                    }
                }
            }
        }

        report.final_rating = self.tracker.current();
        obs::emit_batch_finished(
            &agent_name,
            report.evaluated,
            report.aborted,
            report.cancelled,
            report.final_rating.rating,
            report.final_rating.deviation,
        );
        report
    }
}
