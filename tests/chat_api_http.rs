use chatwidget::chat_api::{ChatClient, ChatConfig, ChatError, NO_ANSWER_TEXT};
use httpmock::prelude::*;
use serde_json::json;

fn client_for(server: &MockServer) -> ChatClient {
    ChatClient::new(ChatConfig {
        base_url: server.base_url(),
        ..ChatConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn chat_posts_query_and_reads_markdown_and_buttons() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .header("content-type", "application/json")
            .json_body(json!({ "query": "What courses do you offer?" }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "markdown": "**hi**",
                "buttons": ["A", "B"]
            }));
    });

    let reply = client_for(&server)
        .chat("What courses do you offer?")
        .await
        .unwrap();

    mock.assert();
    assert_eq!(reply.renderable_markdown(), "**hi**");
    assert_eq!(reply.quick_replies(), ["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn chat_falls_back_to_response_field() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "response": "plain text" }));
    });

    let reply = client_for(&server).chat("hello").await.unwrap();

    assert_eq!(reply.renderable_markdown(), "plain text");
    assert!(reply.quick_replies().is_empty());
}

#[tokio::test]
async fn chat_with_empty_object_uses_fixed_text() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({}));
    });

    let reply = client_for(&server).chat("hello").await.unwrap();

    assert_eq!(reply.renderable_markdown(), NO_ANSWER_TEXT);
}

#[tokio::test]
async fn non_success_status_is_http_error() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(429).body("slow down");
    });

    let err = client_for(&server).chat("hello").await.unwrap_err();

    mock.assert();
    assert_eq!(err, ChatError::Http { status: 429 });
    assert!(!err.is_network());
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200)
            .header("content-type", "text/html")
            .body("<html>oops</html>");
    });

    let err = client_for(&server).chat("hello").await.unwrap_err();

    assert!(matches!(err, ChatError::Decode(_)), "got {err:?}");
    assert!(err.is_network());
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let client = ChatClient::new(ChatConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 5,
        ..ChatConfig::default()
    })
    .unwrap();

    let err = client.chat("hello").await.unwrap_err();

    assert!(matches!(err, ChatError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn track_view_posts_to_tracking_endpoint() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/track_view");
        then.status(204);
    });

    client_for(&server).track_view().await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn track_view_failure_is_reported() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/api/track_view");
        then.status(500);
    });

    let err = client_for(&server).track_view().await.unwrap_err();

    assert_eq!(err, ChatError::Http { status: 500 });
}
