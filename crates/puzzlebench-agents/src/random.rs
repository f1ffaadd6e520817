//! Uniformly random legal play.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

use puzzlebench_core::{Agent, AgentProfile, Color, ProposedMove};

/// Agent that plays a uniformly random legal move.
///
/// Serves as the rating floor: any agent that can't beat random play on
/// tactics puzzles is not reading the position at all.
pub struct RandomAgent {
    profile: AgentProfile,
    rng: Mutex<StdRng>,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic variant for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            profile: AgentProfile::new("Random").with_random(),
            rng: Mutex::new(rng),
        }
    }

    fn pick(&self, candidates: &[&String]) -> Option<ProposedMove> {
        let mut rng = self.rng.lock().expect("rng lock poisoned");
        candidates
            .choose(&mut *rng)
            .map(|san| ProposedMove::free(san.as_str()))
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for RandomAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn propose_move(
        &self,
        _fen: &str,
        legal_moves: &[String],
        _color: Color,
    ) -> Option<ProposedMove> {
        self.pick(&legal_moves.iter().collect::<Vec<_>>())
    }

    async fn propose_retry(
        &self,
        rejected: &[String],
        _fen: &str,
        legal_moves: &[String],
        _color: Color,
    ) -> Option<ProposedMove> {
        // Never re-propose something already rejected.
        let candidates: Vec<&String> = legal_moves
            .iter()
            .filter(|m| !rejected.contains(m))
            .collect();
        self.pick(&candidates)
    }
}
