//! Agent implementations for PuzzleBench.
//!
//! Three [`Agent`](puzzlebench_core::Agent) families:
//! - [`RandomAgent`] — uniform choice over the legal moves, the rating floor
//!   every other agent is measured against
//! - [`ScriptedAgent`] — replays a fixed response queue, for demos and tests
//! - [`LlmAgent`] — prompts a chat model through a [`ChatProvider`] and
//!   extracts the move from the reply
//!
//! The provider layer lives in [`provider`]; [`OpenRouterProvider`] is the
//! shipped implementation.

pub mod llm;
pub mod provider;
pub mod random;
pub mod scripted;

pub use llm::LlmAgent;
pub use provider::{ChatMessage, ChatProvider, Completion, OpenRouterProvider, ProviderError};
pub use random::RandomAgent;
pub use scripted::ScriptedAgent;
