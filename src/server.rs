//! Inbound HTTP trigger surface.
//!
//! Three routes: the compose form, the stored-defaults config endpoints,
//! and the send endpoint that runs the dispatch path and returns the report
//! as plain text. All routes honor the optional access token.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::{
    config::{HttpConfig, StoredDefaults},
    engine::{Engine, Submission},
};

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Form fields of the compose page. Field names mirror the page itself.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SendForm {
    from_email: String,
    to_emails: String,
    subject: String,
    body: String,
}

impl From<SendForm> for Submission {
    fn from(form: SendForm) -> Self {
        Self {
            from: form.from_email,
            recipients: form.to_emails,
            subject: form.subject,
            body: form.body,
        }
    }
}

/// Build the application router.
#[must_use]
pub fn router(engine: Arc<Engine>) -> Router {
    // The dispatch route can legitimately run for minutes on a large batch,
    // so the timeout only covers the small routes
    let quick = Router::new()
        .route("/", get(index))
        .route("/config", get(load_config).post(save_config))
        .layer(TimeoutLayer::new(Duration::from_secs(10)));

    Router::new()
        .merge(quick)
        .route("/send", post(send))
        .with_state(engine)
}

/// Bind and run the server until ctrl-c.
///
/// # Errors
/// Returns a [`ServeError`] if binding fails or the server errors out.
pub async fn serve(engine: Arc<Engine>, config: &HttpConfig) -> Result<(), ServeError> {
    let listener =
        TcpListener::bind(&config.listen_address)
            .await
            .map_err(|source| ServeError::Bind {
                address: config.listen_address.clone(),
                source,
            })?;

    info!(address = %config.listen_address, "http listener bound");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    info!("server stopped");
    Ok(())
}

fn guard(engine: &Engine, auth: &AuthQuery) -> Result<(), Response> {
    if engine.authorized(auth.token.as_deref()) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "unauthorized").into_response())
    }
}

async fn index(State(engine): State<Arc<Engine>>, Query(auth): Query<AuthQuery>) -> Response {
    if let Err(denied) = guard(&engine, &auth) {
        return denied;
    }
    Html(COMPOSE_PAGE).into_response()
}

async fn load_config(State(engine): State<Arc<Engine>>, Query(auth): Query<AuthQuery>) -> Response {
    if let Err(denied) = guard(&engine, &auth) {
        return denied;
    }

    match engine.store().load().await {
        Ok(defaults) => Json(defaults).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to load defaults: {error}"),
        )
            .into_response(),
    }
}

async fn save_config(
    State(engine): State<Arc<Engine>>,
    Query(auth): Query<AuthQuery>,
    Json(defaults): Json<StoredDefaults>,
) -> Response {
    if let Err(denied) = guard(&engine, &auth) {
        return denied;
    }

    match engine.store().save(&defaults).await {
        Ok(()) => (StatusCode::OK, "saved").into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to save defaults: {error}"),
        )
            .into_response(),
    }
}

async fn send(
    State(engine): State<Arc<Engine>>,
    Query(auth): Query<AuthQuery>,
    Form(form): Form<SendForm>,
) -> Response {
    if let Err(denied) = guard(&engine, &auth) {
        return denied;
    }

    let outcome = engine.run(form.into()).await;
    let status = if outcome.aborted {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, outcome.report).into_response()
}

const COMPOSE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>mailburst</title>
    <style>
        body { font-family: sans-serif; max-width: 800px; margin: 20px auto; padding: 0 20px; }
        label { display: block; margin: 12px 0 4px; font-weight: bold; }
        input, textarea { width: 100%; padding: 8px; box-sizing: border-box; }
        button { margin-top: 15px; padding: 10px 15px; }
        pre { margin-top: 20px; padding: 10px; background: #f4f4f4; white-space: pre-wrap; }
    </style>
</head>
<body>
    <h1>mailburst</h1>
    <form id="composeForm">
        <label for="fromEmail">From</label>
        <input type="email" id="fromEmail" name="fromEmail">
        <label for="toEmails">Recipients (one per line)</label>
        <textarea id="toEmails" name="toEmails" rows="6"></textarea>
        <label for="subject">Subject</label>
        <input type="text" id="subject" name="subject">
        <label for="body">Body</label>
        <textarea id="body" name="body" rows="10"></textarea>
        <button type="submit">Send</button>
        <button type="button" id="saveButton">Save as defaults</button>
    </form>
    <pre id="result" hidden></pre>
    <script>
        const form = document.getElementById('composeForm');
        const result = document.getElementById('result');
        const fields = ['fromEmail', 'toEmails', 'subject', 'body'];
        const query = window.location.search;

        function values() {
            const out = {};
            for (const field of fields) {
                out[field] = document.getElementById(field).value;
            }
            return out;
        }

        window.addEventListener('load', async () => {
            const response = await fetch('/config' + query);
            if (!response.ok) return;
            const config = await response.json();
            for (const field of fields) {
                if (config[field]) document.getElementById(field).value = config[field];
            }
        });

        document.getElementById('saveButton').addEventListener('click', async () => {
            await fetch('/config' + query, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(values()),
            });
        });

        form.addEventListener('submit', async (event) => {
            event.preventDefault();
            result.hidden = false;
            result.textContent = 'Sending...';
            const response = await fetch('/send' + query, {
                method: 'POST',
                headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
                body: new URLSearchParams(values()),
            });
            result.textContent = await response.text();
        });
    </script>
</body>
</html>
"#;
