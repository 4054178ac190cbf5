use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use htmx_chat::config::AppConfig;
use htmx_chat::reply::ReplySourceKind;
use htmx_chat::server;
use serde_json::{Value, json};
use tempfile::TempDir;

const CLIENT_HINT: HeaderName = HeaderName::from_static("sec-ch-prefers-color-scheme");

fn test_config(dir: &TempDir) -> AppConfig {
    let store = dir.path().join("theme.json");
    let mut config = AppConfig::load_from_args([
        "htmx-chat",
        "--theme-store",
        store.to_str().expect("temp path is utf-8"),
    ])
    .expect("Failed to load config");
    config.reply.source = ReplySourceKind::Stub;
    config.reply.stub_delay_ms = 0;
    config
}

fn test_server(config: AppConfig) -> TestServer {
    let state = server::build_state(Arc::new(config));
    TestServer::new(server::router(state)).expect("Failed to start test server")
}

/// Pull the reply ticket out of a submit response.
fn ticket_from(html: &str) -> String {
    let start = html
        .find("/chat/replies/")
        .expect("placeholder present")
        + "/chat/replies/".len();
    html[start..start + 36].to_string()
}

async fn messages(server: &TestServer) -> Vec<Value> {
    server.get("/api/messages").await.json::<Vec<Value>>()
}

#[tokio::test]
async fn test_index_renders_page() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let response = server.get("/").await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains(r#"id="messages""#));
    assert!(html.contains(r#"class="light""#));
    assert!(html.contains("Press Enter to send, Shift+Enter for new line"));
    assert_eq!(
        response.headers().get("accept-ch").unwrap(),
        "sec-ch-prefers-color-scheme"
    );
}

#[tokio::test]
async fn test_submit_then_reply_replaces_placeholder() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let response = server
        .post("/chat/messages")
        .form(&[("message", "hello")])
        .await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("message-user"));
    assert!(html.contains("<p>hello</p>"));
    assert!(html.contains("message-pending"));

    let ticket = ticket_from(&html);
    let reply = server.get(&format!("/chat/replies/{ticket}")).await;
    reply.assert_status_ok();
    let reply_html = reply.text();
    assert!(reply_html.contains("message-assistant"));
    assert!(reply_html.contains("Thank you for your message: 'hello'"));
    assert!(!reply_html.contains("message-pending"));

    // A second fetch has nothing left to render.
    let again = server.get(&format!("/chat/replies/{ticket}")).await;
    again.assert_status_ok();
    assert!(again.text().is_empty());

    let list = messages(&server).await;
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["role"], "user");
    assert_eq!(list[1]["role"], "assistant");
    assert_eq!(list[1]["status"], "delivered");
}

#[tokio::test]
async fn test_blank_submit_is_ignored() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let response = server
        .post("/chat/messages")
        .form(&[("message", "  \n ")])
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert!(messages(&server).await.is_empty());
}

#[tokio::test]
async fn test_over_long_submit_is_rejected() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let long = "x".repeat(1001);
    let response = server
        .post("/chat/messages")
        .form(&[("message", long.as_str())])
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(messages(&server).await.is_empty());
}

#[tokio::test]
async fn test_second_submit_while_reply_pending_conflicts() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.reply.stub_delay_ms = 60_000;
    let server = test_server(config);

    server
        .post("/chat/messages")
        .form(&[("message", "first")])
        .await
        .assert_status_ok();
    let second = server
        .post("/chat/messages")
        .form(&[("message", "second")])
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);

    let list = messages(&server).await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["text"], "first");

    let status = server.get("/api/status").await.json::<Value>();
    assert_eq!(status["reply_pending"], true);
}

#[tokio::test]
async fn test_clear_discards_pending_reply() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.reply.stub_delay_ms = 60_000;
    let server = test_server(config);

    let html = server
        .post("/chat/messages")
        .form(&[("message", "first")])
        .await
        .text();
    let ticket = ticket_from(&html);

    let cleared = server.post("/chat/clear").await;
    cleared.assert_status_ok();
    assert!(cleared.text().contains(r#"hx-swap-oob="true""#));
    assert!(messages(&server).await.is_empty());

    // The stale placeholder resolves to nothing.
    let reply = server.get(&format!("/chat/replies/{ticket}")).await;
    reply.assert_status_ok();
    assert!(reply.text().is_empty());

    // And a new submission is accepted straight away.
    server
        .post("/chat/messages")
        .form(&[("message", "again")])
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_new_conversation_triggers_refocus() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    server
        .post("/api/chat")
        .json(&json!({ "message": "hi" }))
        .await
        .assert_status_ok();

    let response = server.post("/chat/new").await;
    response.assert_status_ok();
    assert_eq!(
        response.headers().get("hx-trigger").unwrap(),
        "chat:new-conversation"
    );
    assert!(messages(&server).await.is_empty());
}

#[tokio::test]
async fn test_api_chat_round_trip() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let response = server
        .post("/api/chat")
        .json(&json!({ "message": "Show me ```let x = 1;```" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["ai_generated"], true);
    assert!(
        body["response"]
            .as_str()
            .unwrap()
            .starts_with("Thank you for your message: 'Show me")
    );
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_api_chat_validation() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let empty = server.post("/api/chat").json(&json!({ "message": "" })).await;
    assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(empty.json::<Value>()["error"], "Message is required");

    let missing = server.post("/api/chat").json(&json!({})).await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

    let long = server
        .post("/api/chat")
        .json(&json!({ "message": "y".repeat(1001) }))
        .await;
    assert_eq!(long.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        long.json::<Value>()["error"],
        "Message too long (max 1000 characters)"
    );
}

#[tokio::test]
async fn test_unconfigured_reply_source_becomes_failure_message() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.reply.source = ReplySourceKind::ChatCompletions;
    config.reply.api_key = None;
    let server = test_server(config);

    let response = server
        .post("/api/chat")
        .json(&json!({ "message": "hello?" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    // The conversation keeps the failure as an assistant entry and is
    // ready for the next submission.
    let list = messages(&server).await;
    assert_eq!(list.len(), 2);
    assert_eq!(list[1]["status"], "failed");

    let status = server.get("/api/status").await.json::<Value>();
    assert_eq!(status["reply_source"], "chat_completions");
    assert_eq!(status["reply_source_configured"], false);
    assert_eq!(status["reply_pending"], false);
}

#[tokio::test]
async fn test_copy_text_and_feedback() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    server
        .post("/api/chat")
        .json(&json!({ "message": "code please" }))
        .await
        .assert_status_ok();
    let list = messages(&server).await;
    let user_id = list[0]["id"].as_str().unwrap().to_string();
    let assistant_id = list[1]["id"].as_str().unwrap().to_string();

    let text = server
        .get(&format!("/api/messages/{assistant_id}/text"))
        .await;
    text.assert_status_ok();
    assert_eq!(text.text(), list[1]["text"].as_str().unwrap());

    let not_assistant = server.get(&format!("/api/messages/{user_id}/text")).await;
    assert_eq!(not_assistant.status_code(), StatusCode::BAD_REQUEST);

    let vote = server
        .post(&format!("/api/messages/{assistant_id}/feedback"))
        .form(&[("vote", "up")])
        .await;
    assert_eq!(vote.status_code(), StatusCode::NO_CONTENT);

    let unknown = server
        .post(&format!("/api/messages/{}/feedback", uuid::Uuid::new_v4()))
        .form(&[("vote", "down")])
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attachments_and_draft_show_on_page() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let chips = server
        .post("/chat/attachments")
        .json(&json!([{ "name": "notes.txt", "size": 2048 }]))
        .await;
    chips.assert_status_ok();
    assert!(chips.text().contains("notes.txt"));
    assert!(chips.text().contains("2.0 KB"));

    let draft = server
        .put("/chat/draft")
        .form(&[("message", "unsent <b>")])
        .await;
    assert_eq!(draft.status_code(), StatusCode::NO_CONTENT);

    let html = server.get("/").await.text();
    assert!(html.contains("notes.txt"));
    assert!(html.contains(">unsent &lt;b&gt;</textarea>"));
}

#[tokio::test]
async fn test_theme_toggle_persists_across_restart() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let dark = HeaderValue::from_static("dark");
    let initial = server
        .get("/api/theme")
        .add_header(CLIENT_HINT, dark.clone())
        .await
        .json::<Value>();
    assert_eq!(initial["theme"], "dark");
    assert_eq!(initial["explicit"], false);

    let toggled = server
        .post("/api/theme/toggle")
        .add_header(CLIENT_HINT, dark.clone())
        .await
        .json::<Value>();
    assert_eq!(toggled["theme"], "light");
    assert_eq!(toggled["explicit"], true);

    // A fresh server reading the same store keeps the explicit choice over
    // the ambient preference.
    let restarted = test_server(test_config(&dir));
    let after = restarted
        .get("/api/theme")
        .add_header(CLIENT_HINT, dark)
        .await
        .json::<Value>();
    assert_eq!(after["theme"], "light");
    assert_eq!(after["explicit"], true);
}

#[tokio::test]
async fn test_page_script_header_carries_ambient_theme() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let body = server
        .get("/api/theme")
        .add_header(
            HeaderName::from_static("x-prefers-color-scheme"),
            HeaderValue::from_static("dark"),
        )
        .await
        .json::<Value>();
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["explicit"], false);

    let toggled = server
        .post("/api/theme/toggle")
        .add_header(
            HeaderName::from_static("x-prefers-color-scheme"),
            HeaderValue::from_static("dark"),
        )
        .await
        .json::<Value>();
    assert_eq!(toggled["theme"], "light");
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let dir = TempDir::new().unwrap();
    let server = test_server(test_config(&dir));

    let response = server.get("/does/not/exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "Endpoint not found" })
    );
}
