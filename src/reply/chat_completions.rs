//! `OpenAI` Chat Completions reply source.
//!
//! Sends the submitted text as a single user message to
//! `/v1/chat/completions` (non-streaming) and returns the first choice.

use serde_json::Value;

use super::{ReplyError, ReplyRequest, ReplySettings, ReplySource};

/// Reply source backed by a chat completions API.
#[derive(Clone)]
pub struct ChatCompletionsReplySource {
    http: reqwest::Client,
    settings: ReplySettings,
}

impl std::fmt::Debug for ChatCompletionsReplySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsReplySource")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .field("api_key", &self.settings.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsReplySource {
    /// Create a source with the given settings.
    #[must_use]
    pub fn new(settings: ReplySettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { http, settings }
    }

    fn request_body(&self, request: &ReplyRequest) -> Value {
        serde_json::json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": request.text }],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

#[async_trait::async_trait]
impl ReplySource for ChatCompletionsReplySource {
    async fn reply(&self, request: ReplyRequest) -> Result<String, ReplyError> {
        let Some(api_key) = &self.settings.api_key else {
            return Err(ReplyError::NotConfigured("no API key".to_string()));
        };
        if let Some(missing) = self.settings.provider.missing_setting() {
            return Err(ReplyError::NotConfigured(format!("no {missing}")));
        }

        let url = self.settings.provider.chat_url(&self.settings.base_url);
        let rb = self.http.post(&url).json(&self.request_body(&request));
        let rb = self.settings.provider.authorize(rb, api_key);

        tracing::debug!(url = %url, model = %self.settings.model, "Requesting chat completion");

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReplyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let v: Value = resp.json().await?;
        extract_reply(&v)
    }

    fn kind(&self) -> &'static str {
        "chat_completions"
    }

    fn is_configured(&self) -> bool {
        self.settings.api_key.is_some() && self.settings.provider.missing_setting().is_none()
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_reply(v: &Value) -> Result<String, ReplyError> {
    v["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ReplyError::Malformed("missing choices[0].message.content".to_string()))
}
