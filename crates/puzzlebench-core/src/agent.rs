//! Agent contract.
//!
//! Concrete strategies (model-backed, random, scripted) live in the
//! `puzzlebench-agents` crate; the engine depends only on this trait.

use async_trait::async_trait;

use crate::domain::{AgentProfile, Color};

/// A move proposal with its token cost.
///
/// Token counts are opaque to the engine; they are copied into the persisted
/// move attempt unexamined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedMove {
    pub san: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ProposedMove {
    /// A proposal with zero cost (random/scripted agents).
    pub fn free(san: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }
}

/// A decision-making agent under evaluation.
///
/// Both operations return `None` when the agent cannot produce anything at
/// all (network failure, unparseable model output, exhausted candidates).
/// That is distinct from producing a bad chess move: the evaluator aborts
/// the puzzle on `None`, while illegal or wrong moves flow through the
/// protocol's retry and failure branches.
///
/// Implementations must be safe to call repeatedly and are responsible for
/// their own rate limiting and timeouts; the engine imposes neither.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identity and capability flags.
    fn profile(&self) -> &AgentProfile;

    /// Propose a move for the given position.
    async fn propose_move(
        &self,
        fen: &str,
        legal_moves: &[String],
        color: Color,
    ) -> Option<ProposedMove>;

    /// Propose a corrected move after previous proposals were rejected as
    /// illegal. `rejected` is the full rejection history, oldest first.
    async fn propose_retry(
        &self,
        rejected: &[String],
        fen: &str,
        legal_moves: &[String],
        color: Color,
    ) -> Option<ProposedMove>;
}
