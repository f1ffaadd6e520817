//! Chat-model-backed agent.
//!
//! Prompts the model with the FEN and legal move list, asks for the chosen
//! move inside `<FinalMove>` tags, and extracts it strictly from those tags.
//! Anything unparseable makes the agent unavailable for that request rather
//! than feeding garbage into the protocol.
//!
//! Retries replay the full rejection history as assistant/user turns, since
//! providers are stateless per request, and run at a higher temperature than
//! the first attempt.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::{error, warn};

use puzzlebench_core::{Agent, AgentProfile, Color, ProposedMove};

use crate::provider::{ChatMessage, ChatProvider};

/// Sampling temperature for the first proposal.
const INITIAL_TEMPERATURE: f64 = 0.2;

/// Sampling temperature for retries; higher so the model actually moves off
/// its rejected answer.
const RETRY_TEMPERATURE: f64 = 0.4;

/// Agent that asks a chat model for its moves.
pub struct LlmAgent {
    profile: AgentProfile,
    provider: Arc<dyn ChatProvider>,
    model: String,
    final_move: Regex,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self::with_profile(provider, model, |name| AgentProfile::new(name))
    }

    /// Variant for reasoning models, flagged as such in the profile.
    pub fn reasoning(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self::with_profile(provider, model, |name| {
            AgentProfile::new(name).with_reasoning()
        })
    }

    fn with_profile(
        provider: Arc<dyn ChatProvider>,
        model: impl Into<String>,
        profile: impl FnOnce(&str) -> AgentProfile,
    ) -> Self {
        let model = model.into();
        Self {
            profile: profile(&model),
            provider,
            model,
            final_move: Regex::new(r"(?is)<FinalMove>(.*?)</FinalMove>")
                .expect("final-move pattern is valid"),
        }
    }

    fn build_messages(&self, fen: &str, legal_moves: &[String], color: Color) -> Vec<ChatMessage> {
        let system = format!(
            "You are a chess engine playing as {color}. \
             You will be provided with a FEN string and a list of legal moves. \
             Analyze the position deeply, considering tactics, strategy, and endgames. \
             Think step-by-step. \
             Finally, output your chosen move inside <FinalMove> tags. \
             Example: <FinalMove>e4</FinalMove>"
        );
        let user = format!("FEN: {fen}\nLegal Moves: {}", legal_moves.join(", "));
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    /// Strict tag-based extraction; free-text replies without the tag are
    /// discarded rather than guessed at.
    fn parse_move(&self, content: &str) -> Option<String> {
        let captured = self.final_move.captures(content)?;
        let cleaned: String = captured[1]
            .trim()
            .chars()
            .filter(|c| *c != '.' && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    async fn request(&self, messages: Vec<ChatMessage>, temperature: f64) -> Option<ProposedMove> {
        let completion = match self
            .provider
            .complete(&messages, &self.model, temperature)
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                error!(model = %self.model, error = %e, "chat completion failed");
                return None;
            }
        };

        match self.parse_move(&completion.content) {
            Some(san) => Some(ProposedMove {
                san,
                prompt_tokens: completion.prompt_tokens,
                completion_tokens: completion.completion_tokens,
            }),
            None => {
                let preview: String = completion.content.chars().take(100).collect();
                warn!(model = %self.model, content = %preview, "no move found in model reply");
                None
            }
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn propose_move(
        &self,
        fen: &str,
        legal_moves: &[String],
        color: Color,
    ) -> Option<ProposedMove> {
        let messages = self.build_messages(fen, legal_moves, color);
        self.request(messages, INITIAL_TEMPERATURE).await
    }

    async fn propose_retry(
        &self,
        rejected: &[String],
        fen: &str,
        legal_moves: &[String],
        color: Color,
    ) -> Option<ProposedMove> {
        let mut messages = self.build_messages(fen, legal_moves, color);
        for bad_move in rejected {
            messages.push(ChatMessage::assistant(format!(
                "<FinalMove>{bad_move}</FinalMove>"
            )));
            messages.push(ChatMessage::user(format!(
                "The move {bad_move} is illegal or invalid. \
                 Please choose a legal move from the list: {}. \
                 Wrap it in <FinalMove> tags.",
                legal_moves.join(", ")
            )));
        }
        self.request(messages, RETRY_TEMPERATURE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, ProviderError};
    use std::sync::Mutex;

    /// Provider returning a canned reply and recording each transcript.
    struct CannedProvider {
        reply: String,
        transcripts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                transcripts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for CannedProvider {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _model: &str,
            _temperature: f64,
        ) -> Result<Completion, ProviderError> {
            self.transcripts.lock().unwrap().push(messages.to_vec());
            Ok(Completion {
                content: self.reply.clone(),
                prompt_tokens: 42,
                completion_tokens: 7,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ChatProvider for FailingProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _model: &str,
            _temperature: f64,
        ) -> Result<Completion, ProviderError> {
            Err(ProviderError::EmptyResponse)
        }
    }

    fn legal() -> Vec<String> {
        vec!["Nxe5".to_string(), "Qe7".to_string()]
    }

    #[tokio::test]
    async fn test_extracts_tagged_move_with_usage() {
        let provider =
            CannedProvider::new("The knight recapture is forced.\n<FinalMove>Nxe5</FinalMove>");
        let agent = LlmAgent::new(provider, "test-model");
        let proposed = agent
            .propose_move("fen", &legal(), Color::Black)
            .await
            .unwrap();
        assert_eq!(proposed.san, "Nxe5");
        assert_eq!(proposed.prompt_tokens, 42);
        assert_eq!(proposed.completion_tokens, 7);
    }

    #[tokio::test]
    async fn test_strips_punctuation_and_whitespace() {
        let provider = CannedProvider::new("<FinalMove> 1. Nxe5 </FinalMove>");
        let agent = LlmAgent::new(provider, "test-model");
        let proposed = agent
            .propose_move("fen", &legal(), Color::Black)
            .await
            .unwrap();
        assert_eq!(proposed.san, "1Nxe5");
    }

    #[tokio::test]
    async fn test_tag_matching_is_case_insensitive() {
        let provider = CannedProvider::new("<finalmove>Qe7</FINALMOVE>");
        let agent = LlmAgent::new(provider, "test-model");
        let proposed = agent
            .propose_move("fen", &legal(), Color::Black)
            .await
            .unwrap();
        assert_eq!(proposed.san, "Qe7");
    }

    #[tokio::test]
    async fn test_untagged_reply_is_unavailable() {
        let provider = CannedProvider::new("I think the best move is Nxe5.");
        let agent = LlmAgent::new(provider, "test-model");
        assert!(agent
            .propose_move("fen", &legal(), Color::Black)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_unavailable() {
        let agent = LlmAgent::new(Arc::new(FailingProvider), "test-model");
        assert!(agent
            .propose_move("fen", &legal(), Color::Black)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_retry_replays_rejection_history() {
        let provider = CannedProvider::new("<FinalMove>Qe7</FinalMove>");
        let agent = LlmAgent::new(Arc::clone(&provider) as Arc<dyn ChatProvider>, "test-model");
        let rejected = vec!["Qh5".to_string(), "Ke2".to_string()];
        agent
            .propose_retry(&rejected, "fen", &legal(), Color::Black)
            .await
            .unwrap();

        let transcripts = provider.transcripts.lock().unwrap();
        let messages = &transcripts[0];
        // System + user position, then an assistant/user pair per rejection.
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[2].role, "assistant");
        assert!(messages[2].content.contains("Qh5"));
        assert_eq!(messages[3].role, "user");
        assert!(messages[3].content.contains("illegal or invalid"));
        assert!(messages[4].content.contains("Ke2"));
    }

    #[tokio::test]
    async fn test_prompt_names_color_fen_and_legal_moves() {
        let provider = CannedProvider::new("<FinalMove>Nxe5</FinalMove>");
        let agent = LlmAgent::new(Arc::clone(&provider) as Arc<dyn ChatProvider>, "test-model");
        agent.propose_move("some-fen", &legal(), Color::Black).await;

        let transcripts = provider.transcripts.lock().unwrap();
        let messages = &transcripts[0];
        assert!(messages[0].content.contains("playing as black"));
        assert!(messages[1].content.contains("FEN: some-fen"));
        assert!(messages[1].content.contains("Nxe5, Qe7"));
    }
}
