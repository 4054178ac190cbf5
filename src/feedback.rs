//! Upvote/downvote feedback on assistant messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rating of one assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// One recorded rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub message_id: Uuid,
    pub vote: Vote,
    pub recorded_at: DateTime<Utc>,
}

/// Receives feedback; where it goes is up to the implementation.
pub trait FeedbackSink: Send + Sync {
    fn record(&self, feedback: &Feedback);
}

/// Emits each rating as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedbackSink;

impl FeedbackSink for TracingFeedbackSink {
    fn record(&self, feedback: &Feedback) {
        tracing::info!(
            name: "feedback.recorded",
            message_id = %feedback.message_id,
            vote = ?feedback.vote,
            recorded_at = %feedback.recorded_at.to_rfc3339(),
            "Feedback recorded"
        );
    }
}
