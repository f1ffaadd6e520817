//! Shared fixtures for core integration tests: table-oracle packs, a
//! configurable scripted agent, a failing store, and a stub rating tracker.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use puzzlebench_core::{
    Agent, AgentProfile, Color, GameId, GameScore, MoveAttempt, PositionEntry, ProposedMove,
    Puzzle, PuzzlePack, RatingTracker, RatingTriple,
};
use puzzlebench_store::{
    AgentStanding, GameRecord, GameStore, RatingSnapshot, StoreError, StoreResult,
};

pub const START: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
pub const AFTER_NXE5: &str =
    "r1bqkb1r/pppp1ppp/2n2n2/4N3/2B1P3/8/PPPP1PPP/RNBQK2R b KQkq - 0 4";
pub const AFTER_RECAPTURE: &str =
    "r1bqkb1r/pppp1ppp/8/4n3/2B1P3/8/PPPP1PPP/RNBQK2R w KQkq - 0 5";
pub const AFTER_QE7: &str =
    "r1b1kb1r/ppppqppp/2n2n2/4N3/2B1P3/8/PPPP1PPP/RNBQK2R w KQkq - 1 5";

fn puzzle(id: &str, fen: &str, moves: &str, rating: i32, deviation: i32) -> Puzzle {
    Puzzle {
        id: id.to_string(),
        fen: fen.to_string(),
        moves: moves.to_string(),
        rating,
        rating_deviation: deviation,
        themes: String::new(),
        puzzle_type: "tactic".to_string(),
        popularity: 0,
        nb_plays: 0,
        game_url: String::new(),
        opening_tags: String::new(),
    }
}

/// The knight-fork puzzle from the Italian game: one opponent move, one
/// agent move. Solution is stored in UCI, the table also accepts SAN.
pub fn fork_pack() -> PuzzlePack {
    let mut positions = BTreeMap::new();
    positions.insert(
        START.to_string(),
        PositionEntry {
            legal: vec!["Nxe5".to_string()],
            next: BTreeMap::from([
                ("f3e5".to_string(), AFTER_NXE5.to_string()),
                ("Nxe5".to_string(), AFTER_NXE5.to_string()),
            ]),
        },
    );
    positions.insert(
        AFTER_NXE5.to_string(),
        PositionEntry {
            legal: vec!["Nxe5".to_string(), "Qe7".to_string()],
            next: BTreeMap::from([
                ("c6e5".to_string(), AFTER_RECAPTURE.to_string()),
                ("Nxe5".to_string(), AFTER_RECAPTURE.to_string()),
                ("Qe7".to_string(), AFTER_QE7.to_string()),
            ]),
        },
    );
    PuzzlePack {
        puzzles: vec![puzzle("fork-1", START, "f3e5 c6e5", 1200, 100)],
        positions,
    }
}

/// `count` independent single-pair puzzles with synthetic positions.
/// Puzzle `i` is rated `1200 + i`.
pub fn synthetic_pack(count: usize) -> PuzzlePack {
    let mut puzzles = Vec::new();
    let mut positions = BTreeMap::new();
    for i in 0..count {
        let a = format!("start{i} w - - 0 1");
        let b = format!("mid{i} b - - 0 1");
        let c = format!("end{i} w - - 0 1");
        let d = format!("wrong{i} w - - 0 1");
        positions.insert(
            a.clone(),
            PositionEntry {
                legal: vec!["o".to_string()],
                next: BTreeMap::from([("o".to_string(), b.clone())]),
            },
        );
        positions.insert(
            b.clone(),
            PositionEntry {
                legal: vec!["a".to_string(), "x".to_string()],
                next: BTreeMap::from([("a".to_string(), c), ("x".to_string(), d)]),
            },
        );
        puzzles.push(puzzle(&format!("syn-{i}"), &a, "o a", 1200 + i as i32, 100));
    }
    PuzzlePack { puzzles, positions }
}

/// Scripted agent driven by per-position response tables.
///
/// A position missing from the table makes the agent return `None`
/// (unavailable), which lets tests trigger the abort path selectively.
pub struct TestAgent {
    profile: AgentProfile,
    moves: HashMap<String, String>,
    retries: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    fail_retries: bool,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl TestAgent {
    pub fn new(name: &str) -> Self {
        Self {
            profile: AgentProfile::new(name),
            moves: HashMap::new(),
            retries: HashMap::new(),
            delays: HashMap::new(),
            fail_retries: false,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// First proposal for a position.
    pub fn respond(mut self, fen: &str, san: &str) -> Self {
        self.moves.insert(fen.to_string(), san.to_string());
        self
    }

    /// Retry proposal for a position (defaults to the first proposal).
    pub fn respond_on_retry(mut self, fen: &str, san: &str) -> Self {
        self.retries.insert(fen.to_string(), san.to_string());
        self
    }

    /// Make every retry request come back empty.
    pub fn without_retries(mut self) -> Self {
        self.fail_retries = true;
        self
    }

    /// Delay before answering for a position.
    pub fn delay(mut self, fen: &str, delay: Duration) -> Self {
        self.delays.insert(fen.to_string(), delay);
        self
    }

    /// Script the correct solution move for every agent slot in the pack.
    pub fn solving(mut self, pack: &PuzzlePack) -> Self {
        for puzzle in &pack.puzzles {
            let mut fen = puzzle.fen.clone();
            for pair in puzzle.solution().chunks(2) {
                fen = pack.positions[&fen].next[pair[0]].clone();
                if let Some(&expected) = pair.get(1) {
                    self.moves.insert(fen.clone(), expected.to_string());
                    fen = pack.positions[&fen].next[expected].clone();
                }
            }
        }
        self
    }

    /// High-water mark of concurrent agent calls observed so far.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn answer(&self, table: &HashMap<String, String>, fen: &str) -> Option<ProposedMove> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(fen) {
            tokio::time::sleep(*delay).await;
        }
        let response = table.get(fen).map(|san| ProposedMove::free(san));
        self.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

#[async_trait]
impl Agent for TestAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn propose_move(
        &self,
        fen: &str,
        _legal_moves: &[String],
        _color: Color,
    ) -> Option<ProposedMove> {
        self.answer(&self.moves, fen).await
    }

    async fn propose_retry(
        &self,
        _rejected: &[String],
        fen: &str,
        _legal_moves: &[String],
        _color: Color,
    ) -> Option<ProposedMove> {
        if self.fail_retries {
            None
        } else if self.retries.is_empty() {
            self.answer(&self.moves, fen).await
        } else {
            self.answer(&self.retries, fen).await
        }
    }
}

/// Store whose every operation fails; exercises the StoreUnavailable path.
pub struct FailingStore;

#[async_trait]
impl GameStore for FailingStore {
    async fn create_game(&self, _puzzle_id: &str, _agent_name: &str) -> StoreResult<GameId> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn record_move_attempt(
        &self,
        _game_id: &GameId,
        _attempt: MoveAttempt,
    ) -> StoreResult<()> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn finalize_game(&self, _game_id: &GameId, _failed: bool) -> StoreResult<()> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn record_rating_snapshot(
        &self,
        _game_id: &GameId,
        _rating: f64,
        _deviation: f64,
        _volatility: f64,
    ) -> StoreResult<()> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn game(&self, _game_id: &GameId) -> StoreResult<Option<GameRecord>> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn agent_games(&self, _agent_name: &str) -> StoreResult<Vec<GameRecord>> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn incomplete_games(&self, _agent_name: &str) -> StoreResult<Vec<GameRecord>> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn last_snapshot(&self, _agent_name: &str) -> StoreResult<Option<RatingSnapshot>> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }

    async fn leaderboard(&self) -> StoreResult<Vec<AgentStanding>> {
        Err(StoreError::Unavailable("store is down".to_string()))
    }
}

/// Rating tracker with a scripted deviation schedule; records every
/// absorbed opponent rating so tests can assert absorption order.
pub struct StubTracker {
    deviations: Vec<f64>,
    absorbed: Arc<Mutex<Vec<f64>>>,
}

impl StubTracker {
    /// `deviations[i]` is the deviation reported after `i + 1` absorptions.
    pub fn new(deviations: Vec<f64>) -> Self {
        Self {
            deviations,
            absorbed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the absorption log, valid after the tracker is moved into
    /// an orchestrator.
    pub fn absorbed_log(&self) -> Arc<Mutex<Vec<f64>>> {
        Arc::clone(&self.absorbed)
    }
}

impl RatingTracker for StubTracker {
    fn current(&self) -> RatingTriple {
        let count = self.absorbed.lock().unwrap().len();
        let deviation = if count == 0 {
            350.0
        } else {
            self.deviations[(count - 1).min(self.deviations.len() - 1)]
        };
        RatingTriple {
            rating: 1500.0,
            deviation,
            volatility: 0.06,
        }
    }

    fn absorb(&mut self, scores: &[GameScore]) {
        let mut log = self.absorbed.lock().unwrap();
        for score in scores {
            log.push(score.opponent_rating);
        }
    }
}
