//! Notification sink behavior against an in-process bot-API stand-in.

mod support;

use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;

use mailburst::{NotificationSink, config::NotifierConfig, notify::TelegramSink};

type Posted = Arc<Mutex<Vec<Value>>>;

async fn spawn_bot_api(fail: bool) -> (String, Posted) {
    let posted: Posted = Arc::new(Mutex::new(Vec::new()));
    let state = Arc::clone(&posted);

    let handler = move |State(posted): State<Posted>, Json(body): Json<Value>| async move {
        posted.lock().expect("lock").push(body);
        if fail {
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        } else {
            axum::http::StatusCode::OK
        }
    };

    let app = Router::new()
        .route("/{bot}/sendMessage", post(handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind bot api");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), posted)
}

fn config(api_base: String) -> NotifierConfig {
    NotifierConfig {
        api_base,
        timeout_secs: 5,
        fragment_pause_ms: 10,
        ..NotifierConfig::default()
    }
}

#[tokio::test]
async fn short_report_is_a_single_post() {
    let (base, posted) = spawn_bot_api(false).await;
    let sink = TelegramSink::new(&config(base), "test-token", "42");

    sink.notify("report text").await;

    let posts = posted.lock().expect("lock").clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["chat_id"], "42");
    assert_eq!(posts[0]["text"], "report text");
}

#[tokio::test]
async fn oversized_report_is_fragmented_in_order() {
    let (base, posted) = spawn_bot_api(false).await;
    let sink = TelegramSink::new(&config(base), "test-token", "42");

    let long = format!("{}{}", "a".repeat(4096), "tail");
    sink.notify(&long).await;

    let posts = posted.lock().expect("lock").clone();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["text"], "a".repeat(4096));
    assert_eq!(posts[1]["text"], "tail");
}

#[tokio::test]
async fn sink_failures_are_swallowed() {
    let (base, posted) = spawn_bot_api(true).await;
    let sink = TelegramSink::new(&config(base), "test-token", "42");

    // Must not panic or propagate anything
    sink.notify("report text").await;

    assert_eq!(posted.lock().expect("lock").len(), 1);
}
