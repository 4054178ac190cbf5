//! Fixed-delay stub reply source.

use std::time::Duration;

use super::{ReplyError, ReplyRequest, ReplySource};

/// Default delay before the stub answers.
pub const DEFAULT_STUB_DELAY: Duration = Duration::from_millis(700);

/// Characters of the user's text echoed back in the reply.
const PREVIEW_CHARS: usize = 50;

/// Answers every request with a canned acknowledgement after a fixed delay.
#[derive(Debug, Clone)]
pub struct StubReplySource {
    delay: Duration,
}

impl Default for StubReplySource {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DELAY)
    }
}

impl StubReplySource {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl ReplySource for StubReplySource {
    async fn reply(&self, request: ReplyRequest) -> Result<String, ReplyError> {
        tokio::time::sleep(self.delay).await;
        Ok(canned_reply(&request.text))
    }

    fn kind(&self) -> &'static str {
        "stub"
    }
}

fn canned_reply(text: &str) -> String {
    let text = text.trim();
    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if text.chars().count() > PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    format!("Thank you for your message: '{preview}{ellipsis}'. This is a placeholder response.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_echoed_whole() {
        assert_eq!(
            canned_reply("  hi there "),
            "Thank you for your message: 'hi there'. This is a placeholder response."
        );
    }

    #[test]
    fn test_long_text_is_truncated() {
        let long = "x".repeat(80);
        let reply = canned_reply(&long);
        assert!(reply.contains(&format!("'{}...'", "x".repeat(50))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_configured_delay() {
        let stub = StubReplySource::new(Duration::from_millis(700));
        let started = tokio::time::Instant::now();
        let reply = stub
            .reply(ReplyRequest {
                text: "ping".into(),
            })
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(700));
        assert!(reply.contains("ping"));
    }
}
