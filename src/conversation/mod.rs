//! Conversation state and orchestration.
//!
//! # Architecture
//!
//! - [`Conversation`]: ordered entries, pending reply, draft and attachment chips
//! - [`ConversationView`]: shared async handle that runs the submit lifecycle
//!   against a [`crate::reply::ReplySource`]
//!
//! # Example
//!
//! ```rust
//! use htmx_chat::conversation::{Conversation, Entry};
//!
//! let mut conversation = Conversation::default();
//! let submission = conversation.begin_submit("Hello!").unwrap().unwrap();
//! assert!(matches!(conversation.entries()[1], Entry::Placeholder(_)));
//!
//! let reply = conversation
//!     .complete(submission.ticket, Ok("Hi there".to_string()))
//!     .unwrap();
//! assert_eq!(conversation.messages().count(), 2);
//! assert_eq!(reply.content().to_html(), "<p>Hi there</p>");
//! ```

mod message;
mod state;
mod view;

pub use message::{AttachmentRef, Entry, Message, MessageStatus, ReplyTicket, Role};
pub use state::{Conversation, ConversationError, DEFAULT_MAX_MESSAGE_CHARS, Submission};
pub use view::ConversationView;
