//! Reply sources.
//!
//! A reply source turns the text a user submitted into the assistant's
//! answer. The conversation treats it as a black box with a single
//! request/response contract: one string in, one string or one
//! [`ReplyError`] out.
//!
//! # Sources
//!
//! - [`StubReplySource`]: fixed-delay canned reply, no network
//! - [`ChatCompletionsReplySource`]: `OpenAI`-compatible `/v1/chat/completions`

pub mod chat_completions;
pub mod provider;
pub mod stub;

pub use chat_completions::ChatCompletionsReplySource;
pub use provider::Provider;
pub use stub::StubReplySource;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

/// Which reply source the server uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySourceKind {
    /// Canned replies after a fixed delay.
    #[default]
    Stub,
    /// Pass-through to a chat completions API.
    ChatCompletions,
}

/// Connection and sampling settings for the chat completions source.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    /// Base URL for the API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// API key; `None` leaves the source unconfigured.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-3.5-turbo`).
    pub model: String,
    /// Provider (auto-detected from `base_url`).
    pub provider: Provider,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// HTTP request timeout.
    pub timeout: Duration,
}

/// What the reply source receives for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    /// Raw text as typed, untrimmed.
    pub text: String,
}

/// Why a reply could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// No API key was configured for a networked source.
    #[error("reply source is not configured: {0}")]
    NotConfigured(String),
    /// Transport failure, including timeouts.
    #[error("request to reply service failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("reply service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for logs.
        body: String,
    },
    /// The response did not contain a reply.
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl ReplyError {
    /// Short text suitable for an error bubble.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => {
                "AI features are currently unavailable. Please check your configuration."
            }
            Self::Http(e) if e.is_timeout() => "The AI service took too long to answer.",
            Self::Http(_) | Self::Status { .. } => "AI service temporarily unavailable.",
            Self::Malformed(_) => "AI service error.",
        }
    }
}

/// The external reply boundary.
#[async_trait::async_trait]
pub trait ReplySource: Send + Sync {
    /// Produce the assistant's answer for one submission.
    async fn reply(&self, request: ReplyRequest) -> Result<String, ReplyError>;

    /// Short name for logs and the status endpoint.
    fn kind(&self) -> &'static str;

    /// Whether the source has what it needs to answer.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Build the reply source selected by configuration.
#[must_use]
pub fn build_reply_source(
    kind: ReplySourceKind,
    stub_delay: Duration,
    settings: ReplySettings,
) -> Arc<dyn ReplySource> {
    match kind {
        ReplySourceKind::Stub => Arc::new(StubReplySource::new(stub_delay)),
        ReplySourceKind::ChatCompletions => Arc::new(ChatCompletionsReplySource::new(settings)),
    }
}
