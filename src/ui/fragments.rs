//! HTML fragments swapped into the page by htmx.

use std::fmt::Write as _;

use crate::conversation::{AttachmentRef, Entry, Message, ReplyTicket, Role};
use crate::format::escape_html;

/// How long the copy button shows "Copied" before reverting, in milliseconds.
pub const COPY_FEEDBACK_MS: u64 = 900;

/// Swap used for every append so the newest entry scrolls into view.
pub const APPEND_SWAP: &str = "beforeend scroll:bottom";

/// Swap used when a reply replaces its placeholder.
const REPLACE_SWAP: &str = "outerHTML scroll:#messages:bottom";

/// Render one finished message.
#[must_use]
pub fn message(msg: &Message) -> String {
    let id = msg.id();
    let role = msg.role().as_str();
    let failed = if msg.is_failure() { " message-failed" } else { "" };
    let timestamp = msg.timestamp();

    let actions = match msg.role() {
        Role::Assistant => assistant_actions(msg),
        Role::User => String::new(),
    };

    format!(
        r#"<article class="message message-{role}{failed}" id="msg-{id}" data-message-id="{id}">
    <div class="bubble">{content}</div>
    <footer class="message-meta">
        <time datetime="{datetime}">{clock}</time>{actions}
    </footer>
</article>
"#,
        content = msg.content().to_html(),
        datetime = timestamp.to_rfc3339(),
        clock = timestamp.format("%H:%M"),
    )
}

fn assistant_actions(msg: &Message) -> String {
    let id = msg.id();
    format!(
        r#"
        <div class="message-actions">
            <button type="button" class="copy-btn" data-copy-url="/api/messages/{id}/text" data-copied-ms="{COPY_FEEDBACK_MS}" aria-label="Copy message">Copy</button>
            <button type="button" class="vote-btn" hx-post="/api/messages/{id}/feedback" hx-vals='{{"vote":"up"}}' hx-swap="none" aria-label="Good response">&#128077;</button>
            <button type="button" class="vote-btn" hx-post="/api/messages/{id}/feedback" hx-vals='{{"vote":"down"}}' hx-swap="none" aria-label="Bad response">&#128078;</button>
        </div>"#
    )
}

/// The transient entry shown while a reply is outstanding.
///
/// On load it asks for the reply and is replaced by whatever comes back.
#[must_use]
pub fn placeholder(ticket: ReplyTicket) -> String {
    format!(
        r#"<article class="message message-assistant message-pending" id="pending-{ticket}" hx-get="/chat/replies/{ticket}" hx-trigger="load" hx-swap="{REPLACE_SWAP}" aria-busy="true">
    <div class="bubble"><span class="typing-indicator"><span></span><span></span><span></span></span></div>
</article>
"#
    )
}

/// Render the whole displayed sequence.
#[must_use]
pub fn entries(entries: &[Entry]) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry {
            Entry::Message(m) => out.push_str(&message(m)),
            Entry::Placeholder(ticket) => out.push_str(&placeholder(*ticket)),
        }
    }
    out
}

/// Attachment chips; empty when nothing is selected.
#[must_use]
pub fn attachment_chips(attachments: &[AttachmentRef]) -> String {
    if attachments.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<ul class="attachment-chips">"#);
    for att in attachments {
        let _ = write!(
            out,
            r#"<li class="chip"><span class="chip-name">{}</span><span class="chip-size">{}</span></li>"#,
            escape_html(&att.name),
            att.display_size()
        );
    }
    out.push_str("</ul>");
    out
}

/// Out-of-band replacement for the chip container, sent alongside a clear.
#[must_use]
pub fn attachment_chips_oob(attachments: &[AttachmentRef]) -> String {
    format!(
        r#"<div id="attachment-chips" hx-swap-oob="true">{}</div>"#,
        attachment_chips(attachments)
    )
}
