//! Axum + HTMX chat
//!
//! A single-page chat UI: the server renders the conversation as HTML, htmx
//! swaps fragments in as messages are sent and replies arrive, and a small
//! browser module handles the clipboard, keyboard, file picker and theme.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server serving the page, htmx fragments and a JSON API
//! - **Replies**: Pluggable [`reply::ReplySource`] (canned stub or Chat Completions)
//! - **UI**: Server-rendered HTML fragments, no client-side framework
//!
//! # Modules
//!
//! - [`format`]: Plain text with fenced code blocks to escaped HTML
//! - [`conversation`]: Ordered entries, submit/reply lifecycle, the shared view
//! - [`reply`]: Reply sources behind a `Result`-typed boundary
//! - [`theme`]: Light/dark preference with persistence
//! - [`feedback`]: Upvote/downvote recording
//! - [`ui`]: Page and fragment rendering
//! - [`server`]: Router and handlers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod conversation;
pub mod feedback;
pub mod format;
pub mod reply;
pub mod server;
pub mod theme;
pub mod ui;

use crate::config::AppConfig;
use crate::conversation::ConversationView;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The one conversation this process serves.
    pub view: ConversationView,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
