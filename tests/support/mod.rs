//! Shared test doubles: scripted senders, a capturing notification sink,
//! and an in-process stand-in for the delivery API.
#![allow(dead_code)] // Test utility module - not all helpers used in every suite

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tempfile::TempDir;

use mailburst::{
    Message, NotificationSink, Recipient, SendError, Sender, config::DefaultsStore,
};

/// Sender double that resolves instantly (or after a scripted delay),
/// failing a fixed set of addresses and recording invocation order.
#[derive(Default)]
pub struct StubSender {
    calls: Mutex<Vec<String>>,
    fail: HashSet<String>,
    panic: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl StubSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<'a>(addresses: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            fail: addresses.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// Panics mid-send for the given addresses, taking the whole task down.
    pub fn panicking<'a>(addresses: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            panic: addresses.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sender for StubSender {
    async fn send(&self, recipient: &Recipient, _message: &Message) -> Result<(), SendError> {
        self.calls.lock().unwrap().push(recipient.as_str().to_string());

        if let Some(delay) = self.delays.get(recipient.as_str()) {
            tokio::time::sleep(*delay).await;
        }

        assert!(
            !self.panic.contains(recipient.as_str()),
            "scripted panic for {recipient}"
        );

        if self.fail.contains(recipient.as_str()) {
            Err(SendError::ApiRejected("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Notification sink that records everything it is handed.
#[derive(Default)]
pub struct CaptureSink {
    texts: Mutex<Vec<String>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for CaptureSink {
    async fn notify(&self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }
}

/// A defaults store backed by a fresh temporary directory. Keep the
/// `TempDir` alive for the duration of the test.
pub fn temp_store() -> (TempDir, DefaultsStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = DefaultsStore::new(dir.path().join("defaults.toml"));
    (dir, store)
}

/// Behavior of the in-process delivery API stand-in.
#[derive(Clone, Debug)]
pub enum ApiMode {
    /// 2xx with a JSON body.
    Accept,
    /// Fixed non-2xx with a JSON `{message}` body.
    Reject(u16, &'static str),
    /// 2xx whose body is not JSON.
    InvalidBody,
    /// Reject the first `n` requests with a 500, accept afterwards.
    FailTimes(usize),
    /// Sleep before answering 2xx, to trip the attempt timeout.
    Slow(Duration),
}

struct ApiState {
    mode: ApiMode,
    hits: Arc<AtomicUsize>,
}

async fn api_handler(State(state): State<Arc<ApiState>>) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst) + 1;

    match &state.mode {
        ApiMode::Accept => (StatusCode::ACCEPTED, Json(json!({ "id": hit }))).into_response(),
        ApiMode::Reject(code, message) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({ "message": message })),
        )
            .into_response(),
        ApiMode::InvalidBody => (StatusCode::OK, "plainly not json").into_response(),
        ApiMode::FailTimes(n) => {
            if hit <= *n {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "temporary upstream error" })),
                )
                    .into_response()
            } else {
                (StatusCode::ACCEPTED, Json(json!({ "id": hit }))).into_response()
            }
        }
        ApiMode::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            (StatusCode::ACCEPTED, Json(json!({ "id": hit }))).into_response()
        }
    }
}

/// Spawn the delivery API stand-in on an ephemeral port. Returns the send
/// endpoint URL and the request counter.
pub async fn spawn_delivery_api(mode: ApiMode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(ApiState {
        mode,
        hits: Arc::clone(&hits),
    });

    let app = Router::new()
        .route("/v1/email", post(api_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock api");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}/v1/email"), hits)
}
