//! Server-rendered HTML.
//!
//! # Structure
//!
//! - [`page`]: the full chat page
//! - [`fragments`]: entries, placeholder and attachment chips swapped in by htmx

pub mod fragments;
pub mod page;

pub use fragments::COPY_FEEDBACK_MS;
pub use page::chat_page;
