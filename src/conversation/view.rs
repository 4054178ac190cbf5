//! Conversation orchestration.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, oneshot};
use uuid::Uuid;

use super::message::{AttachmentRef, Message, ReplyTicket};
use super::state::{Conversation, ConversationError, Submission};
use crate::feedback::{Feedback, FeedbackSink, Vote};
use crate::reply::ReplySource;
use crate::theme::{Theme, ThemePreference};

/// Shared handle to the conversation and its collaborators.
///
/// Cloning is cheap; every clone sees the same conversation.
#[derive(Clone)]
pub struct ConversationView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    conversation: Mutex<Conversation>,
    replies: Arc<dyn ReplySource>,
    theme: Arc<ThemePreference>,
    feedback: Arc<dyn FeedbackSink>,
    /// Always locked after `conversation` when both are held.
    handoff: Mutex<Handoff>,
}

/// Hands a finished reply to whoever renders its placeholder.
///
/// With one reply in flight at a time this holds at most one parked fetch
/// and one unclaimed reply.
#[derive(Default)]
struct Handoff {
    /// A fetch waiting on the pending reply.
    waiting: Option<(ReplyTicket, oneshot::Sender<Message>)>,
    /// The latest reply that landed before anyone asked for it.
    unclaimed: Option<(ReplyTicket, Message)>,
}

impl std::fmt::Debug for ConversationView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationView")
            .field("replies", &self.inner.replies.kind())
            .field("theme", &self.inner.theme)
            .finish_non_exhaustive()
    }
}

impl ConversationView {
    #[must_use]
    pub fn new(
        conversation: Conversation,
        replies: Arc<dyn ReplySource>,
        theme: Arc<ThemePreference>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                conversation: Mutex::new(conversation),
                replies,
                theme,
                feedback,
                handoff: Mutex::new(Handoff::default()),
            }),
        }
    }

    /// Append the user message and placeholder, then fetch the reply in the
    /// background.
    ///
    /// Returns as soon as the placeholder is in place. The reply is picked
    /// up with [`ConversationView::await_reply`].
    pub async fn begin_submit(&self, draft: &str) -> Result<Option<Submission>, ConversationError> {
        let submission = {
            let mut conversation = self.inner.conversation.lock().await;
            match conversation.begin_submit(draft) {
                Ok(Some(submission)) => {
                    // The previous reply has landed; its placeholder is gone.
                    self.inner.handoff.lock().await.unclaimed = None;
                    submission
                }
                Ok(None) => {
                    tracing::debug!("Ignoring blank submission");
                    return Ok(None);
                }
                Err(e) => {
                    tracing::info!(name: "chat.submit.rejected", reason = %e, "Submission rejected");
                    return Err(e);
                }
            }
        };

        tracing::info!(
            name: "chat.message.submitted",
            message_id = %submission.user.id(),
            ticket = %submission.ticket,
            length = submission.request.text.len(),
            "User message appended"
        );

        let inner = Arc::clone(&self.inner);
        let ticket = submission.ticket;
        let request = submission.request.clone();
        tokio::spawn(async move {
            let outcome = inner.replies.reply(request).await;
            if let Err(e) = &outcome {
                tracing::warn!(
                    name: "chat.reply.failed",
                    ticket = %ticket,
                    source = inner.replies.kind(),
                    error = %e,
                    "Reply source failed"
                );
            }

            let mut conversation = inner.conversation.lock().await;
            match conversation.complete(ticket, outcome) {
                Ok(message) => {
                    tracing::info!(
                        name: "chat.reply.completed",
                        ticket = %ticket,
                        message_id = %message.id(),
                        failed = message.is_failure(),
                        "Assistant message appended"
                    );
                    let mut handoff = inner.handoff.lock().await;
                    match handoff.waiting.take_if(|(waiting, _)| *waiting == ticket) {
                        Some((_, tx)) => {
                            // A dropped fetch is fine: the message is already in the conversation.
                            let _ = tx.send(message);
                        }
                        None => handoff.unclaimed = Some((ticket, message)),
                    }
                }
                Err(e) => {
                    tracing::debug!(name: "chat.reply.discarded", ticket = %ticket, reason = %e, "Reply dropped");
                }
            }
        });

        Ok(Some(submission))
    }

    /// Wait for the reply belonging to `ticket`.
    ///
    /// Each ticket can be awaited once. Only the pending reply and the most
    /// recent unclaimed one are known; anything older is `UnknownReply`.
    pub async fn await_reply(&self, ticket: ReplyTicket) -> Result<Message, ConversationError> {
        let rx = {
            let conversation = self.inner.conversation.lock().await;
            let mut handoff = self.inner.handoff.lock().await;
            if let Some((_, message)) = handoff.unclaimed.take_if(|(landed, _)| *landed == ticket) {
                return Ok(message);
            }
            if conversation.pending_ticket() != Some(ticket) || handoff.waiting.is_some() {
                return Err(ConversationError::UnknownReply(ticket));
            }
            let (tx, rx) = oneshot::channel();
            handoff.waiting = Some((ticket, tx));
            rx
        };
        rx.await
            .map_err(|_closed| ConversationError::ReplyDiscarded(ticket))
    }

    /// Submit and wait for the reply.
    ///
    /// Returns the user message and the assistant message, or `None` for a
    /// blank draft.
    pub async fn submit(&self, draft: &str) -> Result<Option<(Message, Message)>, ConversationError> {
        let Some(submission) = self.begin_submit(draft).await? else {
            return Ok(None);
        };
        let reply = self.await_reply(submission.ticket).await?;
        Ok(Some((submission.user, reply)))
    }

    /// Plain text of an assistant message, for the clipboard.
    pub async fn copy_text(&self, id: Uuid) -> Result<String, ConversationError> {
        self.inner.conversation.lock().await.copy_text(id)
    }

    /// Reset the conversation to empty.
    pub async fn clear(&self) {
        let dropped = {
            let mut conversation = self.inner.conversation.lock().await;
            let count = conversation.entries().len();
            conversation.clear();
            // Dropping a parked sender resolves its fetch as discarded.
            *self.inner.handoff.lock().await = Handoff::default();
            count
        };
        tracing::info!(name: "chat.cleared", entries = dropped, "Conversation cleared");
    }

    /// Start over. Same state reset as [`ConversationView::clear`]; the HTTP
    /// layer additionally refocuses the input.
    pub async fn new_conversation(&self) {
        self.clear().await;
        tracing::info!(name: "chat.new", "New conversation started");
    }

    /// Replace the attachment chips with one per selected file.
    pub async fn set_attachments(&self, files: Vec<AttachmentRef>) -> Vec<AttachmentRef> {
        tracing::debug!(count = files.len(), "Attachment selection replaced");
        let mut conversation = self.inner.conversation.lock().await;
        conversation.set_attachments(files);
        conversation.attachments().to_vec()
    }

    pub async fn set_draft(&self, draft: impl Into<String>) {
        self.inner.conversation.lock().await.set_draft(draft);
    }

    /// Rate an assistant message.
    pub async fn record_feedback(&self, id: Uuid, vote: Vote) -> Result<Feedback, ConversationError> {
        self.inner.conversation.lock().await.assistant_message(id)?;
        let feedback = Feedback {
            message_id: id,
            vote,
            recorded_at: Utc::now(),
        };
        self.inner.feedback.record(&feedback);
        Ok(feedback)
    }

    /// Theme for a client whose ambient preference is `ambient`.
    #[must_use]
    pub fn theme(&self, ambient: Option<Theme>) -> Theme {
        self.inner.theme.resolve(ambient)
    }

    /// Whether the theme was chosen explicitly (and persisted).
    #[must_use]
    pub fn theme_is_explicit(&self) -> bool {
        self.inner.theme.explicit().is_some()
    }

    /// Flip and persist the theme.
    pub fn toggle_theme(&self, ambient: Option<Theme>) -> Theme {
        self.inner.theme.toggle(ambient)
    }

    /// A copy of the current state, for rendering.
    pub async fn snapshot(&self) -> Conversation {
        self.inner.conversation.lock().await.clone()
    }

    #[must_use]
    pub fn reply_source(&self) -> &dyn ReplySource {
        self.inner.replies.as_ref()
    }

    /// Parked fetches plus unclaimed replies.
    #[cfg(test)]
    async fn handoff_len(&self) -> usize {
        let handoff = self.inner.handoff.lock().await;
        usize::from(handoff.waiting.is_some()) + usize::from(handoff.unclaimed.is_some())
    }
}
