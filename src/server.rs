use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::conversation::{
    AttachmentRef, Conversation, ConversationError, ConversationView, Message, MessageStatus,
};
use crate::feedback::{TracingFeedbackSink, Vote};
use crate::reply::build_reply_source;
use crate::theme::{FileThemeStore, Theme, ThemePreference};
use crate::ui::{self, fragments};

/// Client hint carrying the browser's light/dark preference.
const PREFERS_COLOR_SCHEME: &str = "sec-ch-prefers-color-scheme";

/// The same preference sent by the page script; `fetch` cannot set `Sec-*` headers.
const PAGE_COLOR_SCHEME: &str = "x-prefers-color-scheme";

/// Event the page listens for to refocus the input after "new chat".
const NEW_CONVERSATION_EVENT: &str = "chat:new-conversation";

/// Wire up the conversation view and its collaborators from configuration.
#[must_use]
pub fn build_state(config: Arc<AppConfig>) -> AppState {
    let store = Arc::new(FileThemeStore::new(config.theme.store_path.clone()));
    let theme = Arc::new(ThemePreference::init(store, config.theme.default));

    let replies = build_reply_source(
        config.reply.source,
        config.stub_delay(),
        config.reply_settings(),
    );
    if !replies.is_configured() {
        tracing::warn!(
            name: "reply.unconfigured",
            source = replies.kind(),
            "Reply source is missing settings; replies will report the service as unavailable"
        );
    }

    let view = ConversationView::new(
        Conversation::new(config.chat.max_message_chars),
        replies,
        theme,
        Arc::new(TracingFeedbackSink),
    );

    AppState { view, config }
}

/// Build the router for the given state.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        // HTML page and htmx fragments
        .route("/", get(index_handler))
        .route("/chat/messages", post(submit_handler))
        .route("/chat/replies/{ticket}", get(reply_handler))
        .route("/chat/clear", post(clear_handler))
        .route("/chat/new", post(new_conversation_handler))
        .route("/chat/attachments", post(attachments_handler))
        .route("/chat/draft", put(draft_handler))
        // JSON API
        .route("/api/chat", post(api_chat))
        .route("/api/messages", get(api_list_messages))
        .route("/api/messages/{id}/text", get(api_message_text))
        .route("/api/messages/{id}/feedback", post(api_feedback))
        .route("/api/theme", get(api_get_theme))
        .route("/api/theme/toggle", post(api_toggle_theme))
        .route("/api/status", get(api_status))
        // Static assets
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "reply.config.loaded",
        source = ?config.reply.source,
        model = %config.reply.model,
        base_url = %config.reply.base_url,
        "Reply configuration loaded"
    );

    let state = build_state(Arc::clone(&config));
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// The client's ambient light/dark preference, if it sent one.
fn ambient_theme(headers: &HeaderMap) -> Option<Theme> {
    [PAGE_COLOR_SCHEME, PREFERS_COLOR_SCHEME]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .find_map(|v| v.to_str().ok().and_then(|s| s.parse().ok()))
}

/// Map a conversation error to a status code and message.
fn conversation_error(e: &ConversationError) -> (StatusCode, String) {
    let status = match e {
        ConversationError::ReplyInFlight => StatusCode::CONFLICT,
        ConversationError::MessageTooLong { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ConversationError::UnknownReply(_)
        | ConversationError::ReplyDiscarded(_)
        | ConversationError::MessageNotFound(_) => StatusCode::NOT_FOUND,
        ConversationError::NotAssistant(_) => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page and Fragment Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - The chat page.
async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let theme = state.view.theme(ambient_theme(&headers));
    let snapshot = state.view.snapshot().await;
    (
        [
            (HeaderName::from_static("accept-ch"), PREFERS_COLOR_SCHEME),
            (header::VARY, PREFERS_COLOR_SCHEME),
        ],
        Html(ui::chat_page(&snapshot, theme)),
    )
}

/// Form body carrying the composer text.
#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    message: String,
}

/// POST /chat/messages - Append the user entry and the reply placeholder.
async fn submit_handler(State(state): State<AppState>, Form(form): Form<MessageForm>) -> Response {
    match state.view.begin_submit(&form.message).await {
        Ok(Some(submission)) => Html(format!(
            "{}{}",
            fragments::message(&submission.user),
            fragments::placeholder(submission.ticket)
        ))
        .into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => conversation_error(&e).into_response(),
    }
}

/// GET /chat/replies/{ticket} - The assistant entry that replaces the placeholder.
///
/// A reply that no longer exists renders as nothing, which removes the
/// placeholder.
async fn reply_handler(State(state): State<AppState>, Path(ticket): Path<Uuid>) -> Html<String> {
    match state.view.await_reply(ticket).await {
        Ok(message) => Html(fragments::message(&message)),
        Err(e) => {
            tracing::debug!(ticket = %ticket, reason = %e, "No reply to render");
            Html(String::new())
        }
    }
}

/// POST /chat/clear - Empty the conversation.
async fn clear_handler(State(state): State<AppState>) -> Html<String> {
    state.view.clear().await;
    Html(fragments::attachment_chips_oob(&[]))
}

/// POST /chat/new - Empty the conversation and refocus the input.
async fn new_conversation_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.view.new_conversation().await;
    (
        [(HeaderName::from_static("hx-trigger"), NEW_CONVERSATION_EVENT)],
        Html(fragments::attachment_chips_oob(&[])),
    )
}

/// POST /chat/attachments - Replace the attachment chips.
async fn attachments_handler(
    State(state): State<AppState>,
    Json(files): Json<Vec<AttachmentRef>>,
) -> Html<String> {
    let attachments = state.view.set_attachments(files).await;
    Html(fragments::attachment_chips(&attachments))
}

/// PUT /chat/draft - Remember the unsent composer text.
async fn draft_handler(State(state): State<AppState>, Form(form): Form<MessageForm>) -> StatusCode {
    state.view.set_draft(form.message).await;
    StatusCode::NO_CONTENT
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the chat API.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// Successful chat API response.
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    html: String,
    timestamp: String,
    ai_generated: bool,
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// POST /api/chat - Submit and wait for the reply.
async fn api_chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    tracing::info!(message_length = req.message.len(), "Received chat request");

    match state.view.submit(&req.message).await {
        Ok(Some((_, reply))) if reply.is_failure() => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, reply.text())
        }
        Ok(Some((_, reply))) => Json(ChatResponse {
            response: reply.text().to_string(),
            html: reply.content().to_html(),
            timestamp: reply.timestamp().to_rfc3339(),
            ai_generated: true,
        })
        .into_response(),
        Ok(None) => json_error(StatusCode::BAD_REQUEST, "Message is required"),
        Err(ConversationError::MessageTooLong { max, .. }) => json_error(
            StatusCode::BAD_REQUEST,
            format!("Message too long (max {max} characters)"),
        ),
        Err(e) => {
            let (status, message) = conversation_error(&e);
            json_error(status, message)
        }
    }
}

/// Message DTO for API responses.
#[derive(Debug, Serialize)]
struct MessageDto {
    id: Uuid,
    role: &'static str,
    text: String,
    html: String,
    timestamp: String,
    status: MessageStatus,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id(),
            role: m.role().as_str(),
            text: m.text().to_string(),
            html: m.content().to_html(),
            timestamp: m.timestamp().to_rfc3339(),
            status: m.status(),
        }
    }
}

/// GET /api/messages - The finished messages in display order.
async fn api_list_messages(State(state): State<AppState>) -> Json<Vec<MessageDto>> {
    let snapshot = state.view.snapshot().await;
    Json(snapshot.messages().map(MessageDto::from).collect())
}

/// GET /api/messages/{id}/text - Plain text of an assistant message.
async fn api_message_text(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.view.copy_text(id).await {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response(),
        Err(e) => conversation_error(&e).into_response(),
    }
}

/// Feedback form body.
#[derive(Debug, Deserialize)]
struct FeedbackForm {
    vote: Vote,
}

/// POST /api/messages/{id}/feedback - Upvote or downvote an assistant message.
async fn api_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<FeedbackForm>,
) -> Response {
    match state.view.record_feedback(id, form.vote).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => conversation_error(&e).into_response(),
    }
}

/// Theme API response.
#[derive(Debug, Serialize)]
struct ThemeResponse {
    theme: Theme,
    explicit: bool,
}

/// GET /api/theme - The theme this client should see.
async fn api_get_theme(State(state): State<AppState>, headers: HeaderMap) -> Json<ThemeResponse> {
    Json(ThemeResponse {
        theme: state.view.theme(ambient_theme(&headers)),
        explicit: state.view.theme_is_explicit(),
    })
}

/// POST /api/theme/toggle - Flip and persist the theme.
async fn api_toggle_theme(State(state): State<AppState>, headers: HeaderMap) -> Json<ThemeResponse> {
    let theme = state.view.toggle_theme(ambient_theme(&headers));
    Json(ThemeResponse {
        theme,
        explicit: true,
    })
}

/// Status response.
#[derive(Debug, Serialize)]
struct StatusResponse {
    reply_source: &'static str,
    reply_source_configured: bool,
    theme: Theme,
    messages: usize,
    reply_pending: bool,
}

/// GET /api/status - Reply source and conversation status.
async fn api_status(State(state): State<AppState>, headers: HeaderMap) -> Json<StatusResponse> {
    let snapshot = state.view.snapshot().await;
    let replies = state.view.reply_source();
    Json(StatusResponse {
        reply_source: replies.kind(),
        reply_source_configured: replies.is_configured(),
        theme: state.view.theme(ambient_theme(&headers)),
        messages: snapshot.messages().count(),
        reply_pending: snapshot.pending_ticket().is_some(),
    })
}

/// Fallback for unknown routes.
async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Endpoint not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_ambient_theme_from_client_hint() {
        let mut headers = HeaderMap::new();
        assert_eq!(ambient_theme(&headers), None);

        headers.insert(PREFERS_COLOR_SCHEME, HeaderValue::from_static("dark"));
        assert_eq!(ambient_theme(&headers), Some(Theme::Dark));

        headers.insert(PREFERS_COLOR_SCHEME, HeaderValue::from_static("\"light\""));
        assert_eq!(ambient_theme(&headers), Some(Theme::Light));

        headers.insert(PREFERS_COLOR_SCHEME, HeaderValue::from_static("no-preference"));
        assert_eq!(ambient_theme(&headers), None);
    }

    #[test]
    fn test_ambient_theme_from_page_header() {
        let mut headers = HeaderMap::new();
        headers.insert(PAGE_COLOR_SCHEME, HeaderValue::from_static("dark"));
        assert_eq!(ambient_theme(&headers), Some(Theme::Dark));

        // The page script's value wins over a stale client hint.
        headers.insert(PREFERS_COLOR_SCHEME, HeaderValue::from_static("light"));
        assert_eq!(ambient_theme(&headers), Some(Theme::Dark));

        headers.insert(PAGE_COLOR_SCHEME, HeaderValue::from_static("bogus"));
        assert_eq!(ambient_theme(&headers), Some(Theme::Light));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            conversation_error(&ConversationError::ReplyInFlight).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            conversation_error(&ConversationError::MessageTooLong { len: 2, max: 1 }).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            conversation_error(&ConversationError::NotAssistant(Uuid::nil())).0,
            StatusCode::BAD_REQUEST
        );
    }
}
