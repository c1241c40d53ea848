//! HTTP surface: token gating, stored-defaults endpoints, the send route.

mod support;

use std::sync::Arc;

use mailburst::{BatchPolicy, Engine, config::StoredDefaults, server};
use support::{StubSender, temp_store};

async fn spawn(engine: Engine) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");

    let app = server::router(Arc::new(engine));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

fn batch() -> BatchPolicy {
    BatchPolicy {
        group_size: 50,
        inter_group_delay_ms: 0,
    }
}

#[tokio::test]
async fn requests_without_the_token_are_rejected() {
    let (_dir, store) = temp_store();
    let engine = Engine::with_parts(
        Some(Arc::new(StubSender::new()) as _),
        None,
        batch(),
        store,
        Some("s3cret".to_string()),
    );
    let base = spawn(engine).await;
    let client = reqwest::Client::new();

    let response = client.get(&base).send().await.expect("request");
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{base}/?token=wrong"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{base}/?token=s3cret"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let page = response.text().await.expect("body");
    assert!(page.contains("mailburst"));
}

#[tokio::test]
async fn stored_defaults_roundtrip_through_the_config_routes() {
    let (_dir, store) = temp_store();
    let engine = Engine::with_parts(None, None, batch(), store, None);
    let base = spawn(engine).await;
    let client = reqwest::Client::new();

    // Nothing stored yet: empty defaults come back
    let empty: StoredDefaults = client
        .get(format!("{base}/config"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(empty, StoredDefaults::default());

    let defaults = StoredDefaults {
        from_email: "from@example.com".to_string(),
        to_emails: "x@y.com".to_string(),
        subject: "subject".to_string(),
        body: "body".to_string(),
    };
    let response = client
        .post(format!("{base}/config"))
        .json(&defaults)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);

    let loaded: StoredDefaults = client
        .get(format!("{base}/config"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(loaded, defaults);
}

#[tokio::test]
async fn send_route_returns_the_completion_report() {
    let (_dir, store) = temp_store();
    let engine = Engine::with_parts(
        Some(Arc::new(StubSender::new()) as _),
        None,
        batch(),
        store,
        None,
    );
    let base = spawn(engine).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/send"))
        .form(&[
            ("fromEmail", "from@example.com"),
            ("toEmails", "x@y.com\nbad\nz@y.com"),
            ("subject", "subject"),
            ("body", "body"),
        ])
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), 200);
    let report = response.text().await.expect("body");
    assert!(report.contains("Total: 2"));
    assert!(report.contains("Succeeded: 2"));
    assert!(report.contains("⚠️ Invalid addresses:\nbad\n"));
}

#[tokio::test]
async fn send_route_returns_500_with_the_abort_report() {
    let (_dir, store) = temp_store();
    let engine = Engine::with_parts(None, None, batch(), store, None);
    let base = spawn(engine).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/send"))
        .form(&[("toEmails", "x@y.com")])
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), 500);
    let report = response.text().await.expect("body");
    assert!(report.starts_with("❌ Dispatch aborted: delivery API key is not set"));
}
