//! HTTP client for the external scoring backend.

use std::time::Duration;

use async_trait::async_trait;
use grantmap_core::{CandidateGrant, Confidence, Judgment, Publication};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::{SYSTEM_PROMPT, build_user_prompt};
use crate::response::parse_reply;
use crate::{Judge, JudgeOutcome};

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration for the HTTP scoring backend.
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    /// Full URL of the chat-completions endpoint.
    pub base_url: String,
    /// Value sent in the `authorization` header.
    pub authorization: String,
    /// Model identifier passed through to the backend.
    pub model: String,
    /// Sampling temperature; kept low for stable ordinal answers.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Token budget for the reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// HTTP-backed relevance judge speaking the chat-completions protocol.
///
/// Classification of replies follows a strict policy: only a 429 surfaces
/// as [`JudgeOutcome::RateLimited`]; unparseable replies, other error
/// statuses, and transport failures all degrade to an answered Low so that
/// one bad candidate can never halt a batch.
pub struct LlmJudge {
    client: reqwest::Client,
    config: JudgeConfig,
}

impl LlmJudge {
    pub fn new(config: JudgeConfig) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// A degraded Low-confidence judgment carrying the failure note.
    fn answered_low(&self, candidate: &CandidateGrant<'_>, reasoning: String) -> Judgment {
        Judgment {
            grant_title: candidate.grant.title.clone(),
            grant_code: candidate.grant.code.clone(),
            confidence: Confidence::Low,
            reasoning,
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn judge(
        &self,
        publication: &Publication,
        candidate: &CandidateGrant<'_>,
    ) -> (Judgment, JudgeOutcome) {
        let user_prompt = build_user_prompt(publication, candidate);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let response = match self
            .client
            .post(&self.config.base_url)
            .header("accept", "application/json")
            .header("authorization", &self.config.authorization)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(grant = %candidate.grant.code, error = %e, "judge request failed");
                return (
                    self.answered_low(candidate, format!("Error: {e}")),
                    JudgeOutcome::Answered,
                );
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(grant = %candidate.grant.code, "scoring backend rate limited");
            return (
                self.answered_low(candidate, "Rate limit exceeded".into()),
                JudgeOutcome::RateLimited,
            );
        }
        if !status.is_success() {
            warn!(grant = %candidate.grant.code, status = status.as_u16(), "judge returned error status");
            return (
                self.answered_low(candidate, format!("HTTP {} error", status.as_u16())),
                JudgeOutcome::Answered,
            );
        }

        let content = match response.json::<ChatResponse>().await {
            Ok(body) => body.choices.into_iter().next().map(|c| c.message.content),
            Err(e) => {
                warn!(grant = %candidate.grant.code, error = %e, "judge reply body unreadable");
                None
            }
        };

        let parsed = content.as_deref().and_then(parse_reply);
        match parsed {
            Some(parsed) => {
                debug!(
                    grant = %candidate.grant.code,
                    confidence = parsed.confidence.as_str(),
                    "judgment received"
                );
                (
                    Judgment {
                        grant_title: candidate.grant.title.clone(),
                        grant_code: candidate.grant.code.clone(),
                        confidence: parsed.confidence,
                        reasoning: parsed.reasoning,
                    },
                    JudgeOutcome::Answered,
                )
            }
            None => (
                self.answered_low(candidate, "Failed to parse judge reply".into()),
                JudgeOutcome::Answered,
            ),
        }
    }
}
