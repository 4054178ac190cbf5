//! The conversation state machine.
//!
//! [`Conversation`] is plain synchronous state: the ordered entry list, the
//! pending reply, the draft and the attachment chips. It never awaits; the
//! async orchestration around it lives in [`super::ConversationView`].

use uuid::Uuid;

use super::message::{AttachmentRef, Entry, Message, ReplyTicket, Role};
use crate::reply::{ReplyError, ReplyRequest};

/// Default upper bound on a submitted message, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 1000;

/// Errors from conversation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    /// A reply is still outstanding; overlapping submissions are rejected.
    #[error("a reply is already in progress")]
    ReplyInFlight,
    /// The submitted text exceeds the configured limit.
    #[error("message too long ({len} characters, max {max})")]
    MessageTooLong {
        /// Length of the rejected text.
        len: usize,
        /// Configured limit.
        max: usize,
    },
    /// The ticket does not match the outstanding reply.
    #[error("no pending reply for ticket {0}")]
    UnknownReply(ReplyTicket),
    /// The reply was dropped before it resolved (conversation cleared).
    #[error("reply for ticket {0} was discarded")]
    ReplyDiscarded(ReplyTicket),
    /// No message with this id.
    #[error("message {0} not found")]
    MessageNotFound(Uuid),
    /// Only assistant messages can be copied or rated.
    #[error("message {0} is not an assistant message")]
    NotAssistant(Uuid),
}

/// The outstanding reply.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingReply {
    ticket: ReplyTicket,
}

/// What a successful submission produced.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The appended user message.
    pub user: Message,
    /// Ticket of the placeholder shown for the reply.
    pub ticket: ReplyTicket,
    /// What to send to the reply source.
    pub request: ReplyRequest,
}

/// Ordered entries plus transient UI state.
#[derive(Debug, Clone)]
pub struct Conversation {
    entries: Vec<Entry>,
    attachments: Vec<AttachmentRef>,
    draft: String,
    pending: Option<PendingReply>,
    max_message_chars: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_CHARS)
    }
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(max_message_chars: usize) -> Self {
        Self {
            entries: Vec::new(),
            attachments: Vec::new(),
            draft: String::new(),
            pending: None,
            max_message_chars,
        }
    }

    /// Start a submission.
    ///
    /// Returns `Ok(None)` without touching any state when the draft is blank.
    /// Otherwise appends the user message, clears the draft and appends a
    /// single placeholder for the reply.
    pub fn begin_submit(&mut self, draft: &str) -> Result<Option<Submission>, ConversationError> {
        if draft.trim().is_empty() {
            return Ok(None);
        }
        if self.pending.is_some() {
            return Err(ConversationError::ReplyInFlight);
        }
        // Surrounding whitespace does not count against the limit.
        let len = draft.trim().chars().count();
        if len > self.max_message_chars {
            return Err(ConversationError::MessageTooLong {
                len,
                max: self.max_message_chars,
            });
        }

        let user = Message::user(draft);
        self.entries.push(Entry::Message(user.clone()));
        self.draft.clear();

        let ticket = Uuid::new_v4();
        self.entries.push(Entry::Placeholder(ticket));
        self.pending = Some(PendingReply { ticket });

        Ok(Some(Submission {
            user,
            ticket,
            request: ReplyRequest {
                text: draft.to_string(),
            },
        }))
    }

    /// Finish the outstanding reply.
    ///
    /// The placeholder is removed on success and on failure; a failure
    /// becomes an assistant error bubble.
    pub fn complete(
        &mut self,
        ticket: ReplyTicket,
        outcome: Result<String, ReplyError>,
    ) -> Result<Message, ConversationError> {
        match &self.pending {
            Some(p) if p.ticket == ticket => {}
            _ => return Err(ConversationError::UnknownReply(ticket)),
        }
        self.pending = None;
        self.entries
            .retain(|e| !matches!(e, Entry::Placeholder(t) if *t == ticket));

        let message = match outcome {
            Ok(text) => Message::assistant(text),
            Err(e) => Message::failure(e.user_message()),
        };
        self.entries.push(Entry::Message(message.clone()));
        Ok(message)
    }

    /// Discard every entry, the draft, the chips and any pending reply.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.attachments.clear();
        self.draft.clear();
        self.pending = None;
    }

    /// Replace the attachment chips wholesale.
    pub fn set_attachments(&mut self, attachments: Vec<AttachmentRef>) {
        self.attachments = attachments;
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// The displayed sequence, placeholders included.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Finished messages in display order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(Entry::as_message)
    }

    #[must_use]
    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages().find(|m| m.id() == id)
    }

    /// Ticket of the outstanding reply, if any.
    #[must_use]
    pub fn pending_ticket(&self) -> Option<ReplyTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    #[must_use]
    pub fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    /// Look up an assistant message.
    pub fn assistant_message(&self, id: Uuid) -> Result<&Message, ConversationError> {
        let message = self
            .message(id)
            .ok_or(ConversationError::MessageNotFound(id))?;
        if message.role() != Role::Assistant {
            return Err(ConversationError::NotAssistant(id));
        }
        Ok(message)
    }

    /// Rendered plain text of an assistant message, for the clipboard.
    pub fn copy_text(&self, id: Uuid) -> Result<String, ConversationError> {
        Ok(self.assistant_message(id)?.content().plain_text())
    }
}
