//! Conversation entries and attachment references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::format::{Markup, format};

/// Identifies one outstanding reply and the placeholder shown for it.
pub type ReplyTicket = Uuid;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person using the page.
    User,
    /// Text produced by the reply source.
    Assistant,
}

impl Role {
    /// Lowercase name used in markup and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Whether an assistant message carries a real reply or a failure notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Normal content.
    Delivered,
    /// The reply source failed; the text explains why.
    Failed,
}

/// One rendered turn of the conversation.
///
/// Messages are immutable once built: fields are private and only exposed
/// through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    text: String,
    content: Markup,
    timestamp: DateTime<Utc>,
    status: MessageStatus,
}

impl Message {
    fn build(role: Role, text: impl Into<String>, status: MessageStatus) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4(),
            role,
            content: format(&text),
            text,
            timestamp: Utc::now(),
            status,
        }
    }

    /// A message typed by the user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::build(Role::User, text, MessageStatus::Delivered)
    }

    /// A reply produced by the reply source.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::build(Role::Assistant, text, MessageStatus::Delivered)
    }

    /// An assistant bubble reporting a failed reply.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::build(Role::Assistant, reason, MessageStatus::Failed)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The raw text the message was built from.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Formatted content.
    #[must_use]
    pub fn content(&self) -> &Markup {
        &self.content
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn status(&self) -> MessageStatus {
        self.status
    }

    /// Whether this is an assistant error bubble.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == MessageStatus::Failed
    }
}

/// An item in the displayed sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A finished message.
    Message(Message),
    /// Transient assistant entry shown while a reply is outstanding.
    Placeholder(ReplyTicket),
}

impl Entry {
    /// The message, if this entry is not a placeholder.
    #[must_use]
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            Self::Placeholder(_) => None,
        }
    }
}

/// Name and size of a file picked in the browser.
///
/// Display only: the file itself never leaves the browser and is never added
/// to message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// File name as reported by the picker.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

impl AttachmentRef {
    /// Human-readable size, e.g. `512 B`, `1.5 KB`, `3.2 MB`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn display_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        match self.size {
            s if s < KB => format!("{s} B"),
            s if s < MB => format!("{:.1} KB", s as f64 / KB as f64),
            s => format!("{:.1} MB", s as f64 / MB as f64),
        }
    }
}
