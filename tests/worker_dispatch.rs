use chatwidget::chat_api::{ChatConfig, ChatError};
use chatwidget::widget::{ChatWidget, Role, WidgetSlots, APOLOGY_TEXT, NETWORK_ERROR_TEXT};
use chatwidget::worker::{Dispatch, ThreadDispatcher, WorkerEvent};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn config_for(server: &MockServer) -> ChatConfig {
    ChatConfig {
        base_url: server.base_url(),
        timeout_seconds: 5,
        ..ChatConfig::default()
    }
}

fn next_event(rx: &Receiver<WorkerEvent>) -> WorkerEvent {
    rx.recv_timeout(WAIT).expect("worker should report a reply")
}

#[test]
fn dispatched_chat_reports_reply_with_its_id() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body(json!({ "query": "hi" }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "markdown": "hello", "buttons": ["Book"] }));
    });

    let (mut dispatcher, rx) = ThreadDispatcher::channel(config_for(&server));
    dispatcher.chat(7, "hi".to_string());

    let WorkerEvent::Reply { id, outcome } = next_event(&rx);
    assert_eq!(id, 7);
    let reply = outcome.unwrap();
    assert_eq!(reply.renderable_markdown(), "hello");
    assert_eq!(reply.quick_replies(), ["Book".to_string()]);
}

#[test]
fn dispatched_chat_reports_http_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(503);
    });

    let (mut dispatcher, rx) = ThreadDispatcher::channel(config_for(&server));
    dispatcher.chat(1, "hi".to_string());

    let WorkerEvent::Reply { outcome, .. } = next_event(&rx);
    assert_eq!(outcome.unwrap_err(), ChatError::Http { status: 503 });
}

#[test]
fn track_view_failure_produces_no_event() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/track_view");
        then.status(500);
    });

    let (mut dispatcher, rx) = ThreadDispatcher::channel(config_for(&server));
    dispatcher.track_view();

    let deadline = Instant::now() + WAIT;
    while mock.hits() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    mock.assert();
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn first_open_round_trip_through_widget() {
    let server = MockServer::start();
    let greeting = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body(json!({ "query": "hello" }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "markdown": "Welcome! How can I help?",
                "buttons": ["Courses", "Contact"]
            }));
    });
    let track = server.mock(|when, then| {
        when.method(POST).path("/api/track_view");
        then.status(200);
    });
    let failing = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body(json!({ "query": "Courses" }));
        then.status(500);
    });

    let (dispatcher, rx) = ThreadDispatcher::channel(config_for(&server));
    let mut widget = ChatWidget::new(dispatcher, WidgetSlots::default());

    widget.toggle_chat_window();
    assert!(widget.typing_visible());
    widget.handle_event(next_event(&rx));

    greeting.assert();
    assert!(!widget.typing_visible());
    assert_eq!(widget.messages().len(), 1);
    assert_eq!(widget.messages()[0].role, Role::Bot);
    assert_eq!(widget.messages()[0].display_text(), "Welcome! How can I help?");
    assert_eq!(widget.quick_replies().len(), 2);

    widget.activate_quick_reply(0);
    widget.handle_event(next_event(&rx));

    failing.assert();
    let last = widget.messages().last().unwrap();
    assert_eq!(last.content, APOLOGY_TEXT);
    assert!(widget.quick_replies().is_empty());

    let deadline = Instant::now() + WAIT;
    while track.hits() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    track.assert();
}

#[test]
fn offline_backend_shows_network_error() {
    let config = ChatConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 5,
        ..ChatConfig::default()
    };
    let (dispatcher, rx) = ThreadDispatcher::channel(config);
    let mut widget = ChatWidget::new(dispatcher, WidgetSlots::default());

    widget.input = "anyone there?".to_string();
    widget.handle_enter(false);
    widget.handle_event(next_event(&rx));

    let bots: Vec<_> = widget
        .messages()
        .iter()
        .filter(|m| m.role == Role::Bot)
        .collect();
    assert_eq!(bots.len(), 1);
    assert_eq!(bots[0].content, NETWORK_ERROR_TEXT);
}
