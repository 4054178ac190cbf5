//! Full-page rendering.

use crate::conversation::Conversation;
use crate::format::escape_html;
use crate::theme::Theme;

use super::fragments::{APPEND_SWAP, attachment_chips, entries};

/// Generate the HTML shell for the application.
fn html_shell(title: &str, theme: Theme, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{theme}" data-theme="{theme}">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="color-scheme" content="light dark">
    <title>{title}</title>

    <!-- htmx (local, no CDN) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>

    <!-- Browser-only behaviour: clipboard, keys, file picker, theme -->
    <script type="module" src="/static/app.js"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <div id="app-shell">
        {content}
    </div>
</body>
</html>"#
    )
}

/// The chat page for the current conversation.
#[must_use]
pub fn chat_page(conversation: &Conversation, theme: Theme) -> String {
    let content = format!(
        r##"<header class="chat-header">
            <h1 class="chat-title">Chat</h1>
            <nav class="chat-controls">
                <button type="button" class="control-btn" hx-post="/chat/new" hx-target="#messages" hx-swap="innerHTML">New chat</button>
                <button type="button" class="control-btn" hx-post="/chat/clear" hx-target="#messages" hx-swap="innerHTML">Clear</button>
                <button type="button" class="control-btn" id="theme-toggle" aria-label="Toggle theme">Theme</button>
            </nav>
        </header>

        <main id="messages" class="message-list" aria-live="polite" aria-label="Chat messages">
{entries}        </main>

        <section class="composer">
            <div id="attachment-chips">{chips}</div>
            <form id="composer-form" hx-post="/chat/messages" hx-target="#messages" hx-swap="{APPEND_SWAP}" hx-on::after-request="if (event.detail.elt === this && event.detail.successful) {{ this.reset(); this.elements.message.value = ''; }}">
                <label class="attach-btn" aria-label="Attach files">
                    &#128206;
                    <input type="file" id="attachment-input" multiple hidden>
                </label>
                <textarea id="message-input" name="message" rows="1" maxlength="{max}" placeholder="Type your message..." hx-put="/chat/draft" hx-trigger="input changed delay:500ms" hx-swap="none" required>{draft}</textarea>
                <button type="submit" class="send-btn" aria-label="Send">Send</button>
            </form>
            <p class="composer-hint">Press Enter to send, Shift+Enter for new line</p>
        </section>"##,
        entries = entries(conversation.entries()),
        chips = attachment_chips(conversation.attachments()),
        max = conversation.max_message_chars(),
        draft = escape_html(conversation.draft()),
    );
    html_shell("Chat", theme, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_applies_theme() {
        let html = chat_page(&Conversation::default(), Theme::Dark);
        assert!(html.contains(r#"<html lang="en" class="dark" data-theme="dark">"#));
    }

    #[test]
    fn test_page_renders_existing_entries_and_draft() {
        let mut c = Conversation::default();
        let sub = c.begin_submit("first question").unwrap().unwrap();
        c.complete(sub.ticket, Ok("an answer".into())).unwrap();
        c.set_draft("half <typed>");

        let html = chat_page(&c, Theme::Light);
        assert!(html.contains("<p>first question</p>"));
        assert!(html.contains("<p>an answer</p>"));
        assert!(html.contains(">half &lt;typed&gt;</textarea>"));
        assert!(html.contains(r#"maxlength="1000""#));
    }

    #[test]
    fn test_composer_resets_only_after_its_own_submit() {
        let html = chat_page(&Conversation::default(), Theme::Light);
        // The draft PUT from the textarea bubbles up to the form and must not reset it.
        assert!(html.contains(
            r#"hx-on::after-request="if (event.detail.elt === this && event.detail.successful)"#
        ));
        assert!(html.contains("this.elements.message.value = ''"));
        assert!(html.contains(r#"hx-put="/chat/draft""#));
    }

    #[test]
    fn test_composer_appends_with_scroll() {
        let html = chat_page(&Conversation::default(), Theme::Light);
        assert!(html.contains(r#"hx-swap="beforeend scroll:bottom""#));
        assert!(html.contains(r#"hx-post="/chat/messages""#));
    }
}
