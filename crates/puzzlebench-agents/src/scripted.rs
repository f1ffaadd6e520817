//! Queue-driven scripted play.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use puzzlebench_core::{Agent, AgentProfile, Color, ProposedMove};

/// Agent that replays a fixed queue of responses, one per request.
///
/// Initial and retry requests draw from the same queue; a `None` entry (or an
/// exhausted queue) makes the agent unavailable for that request. Useful for
/// demos and for driving the protocol through exact scenarios.
pub struct ScriptedAgent {
    profile: AgentProfile,
    responses: Mutex<VecDeque<Option<ProposedMove>>>,
}

impl ScriptedAgent {
    pub fn new(name: impl Into<String>, responses: Vec<Option<ProposedMove>>) -> Self {
        Self {
            profile: AgentProfile::new(name),
            responses: Mutex::new(responses.into()),
        }
    }

    /// Convenience constructor from plain move strings.
    pub fn from_moves(name: impl Into<String>, moves: &[&str]) -> Self {
        Self::new(
            name,
            moves.iter().map(|m| Some(ProposedMove::free(*m))).collect(),
        )
    }

    fn next(&self) -> Option<ProposedMove> {
        self.responses
            .lock()
            .expect("response queue lock poisoned")
            .pop_front()
            .flatten()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn propose_move(
        &self,
        _fen: &str,
        _legal_moves: &[String],
        _color: Color,
    ) -> Option<ProposedMove> {
        self.next()
    }

    async fn propose_retry(
        &self,
        _rejected: &[String],
        _fen: &str,
        _legal_moves: &[String],
        _color: Color,
    ) -> Option<ProposedMove> {
        self.next()
    }
}
