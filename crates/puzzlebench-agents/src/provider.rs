//! Chat-completion providers.
//!
//! [`ChatProvider`] is the seam between the LLM agent and any
//! OpenAI-compatible chat API. [`OpenRouterProvider`] is the concrete
//! implementation, with bearer-token auth, a per-request timeout, and a
//! sliding-window rate limit so large batches don't trip provider-side
//! throttling.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Default OpenRouter API endpoint.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default request budget per minute.
pub const DEFAULT_MAX_RPM: usize = 100;

/// Provider-layer failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API returned no choices")]
    EmptyResponse,
}

/// One turn of a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A completed chat request: the reply text plus token usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// An OpenAI-compatible chat completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one chat completion and return the first choice.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> Result<Completion, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Sliding one-minute window over request start times.
struct RateWindow {
    max_rpm: usize,
    starts: VecDeque<Instant>,
}

impl RateWindow {
    /// How long to wait before the next request may start; records the
    /// request once admitted.
    fn admit_after(&mut self, now: Instant) -> Duration {
        let window = Duration::from_secs(60);
        while let Some(&front) = self.starts.front() {
            if now.duration_since(front) >= window {
                self.starts.pop_front();
            } else {
                break;
            }
        }
        let wait = if self.starts.len() < self.max_rpm {
            Duration::ZERO
        } else {
            window - now.duration_since(*self.starts.front().unwrap_or(&now))
        };
        self.starts.push_back(now + wait);
        wait
    }
}

/// [`ChatProvider`] for the OpenRouter API (or any endpoint speaking the
/// OpenAI chat-completions dialect).
pub struct OpenRouterProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    window: Mutex<RateWindow>,
}

impl OpenRouterProvider {
    /// Provider against [`OPENROUTER_BASE_URL`] with default limits.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(OPENROUTER_BASE_URL, api_key, DEFAULT_MAX_RPM)
    }

    /// Provider against a custom endpoint with an explicit request budget.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_rpm: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            window: Mutex::new(RateWindow {
                max_rpm: max_rpm.max(1),
                starts: VecDeque::new(),
            }),
        }
    }

    async fn throttle(&self) {
        let wait = {
            let mut window = self.window.lock().await;
            window.admit_after(Instant::now())
        };
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
        // Small jitter smooths out bursts when many evaluations fire at once.
        let jitter = rand::thread_rng().gen_range(0..500);
        tokio::time::sleep(Duration::from_millis(jitter)).await;
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> Result<Completion, ProviderError> {
        self.throttle().await;

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model,
                messages,
                temperature,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(model = %model, status = status.as_u16(), "chat completion request rejected");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        debug!(
            model = %model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion received"
        );

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;
        let usage = parsed.usage.unwrap_or(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parses_content_and_usage() {
        let raw = r#"{
            "choices": [{"message": {"content": "<FinalMove>Nxe5</FinalMove>"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("<FinalMove>Nxe5</FinalMove>")
        );
        assert_eq!(parsed.usage.as_ref().unwrap().prompt_tokens, 120);
    }

    #[test]
    fn test_response_tolerates_missing_usage() {
        let raw = r#"{"choices": [{"message": {"content": "hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_rate_window_admits_up_to_budget() {
        let mut window = RateWindow {
            max_rpm: 2,
            starts: VecDeque::new(),
        };
        let now = Instant::now();
        assert_eq!(window.admit_after(now), Duration::ZERO);
        assert_eq!(window.admit_after(now), Duration::ZERO);
        assert!(window.admit_after(now) > Duration::ZERO);
    }
}
