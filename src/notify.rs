//! Best-effort forwarding of the finished report.
//!
//! The sink never influences the dispatch result: every failure here is
//! logged and swallowed.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::NotifierConfig;

/// Hard limit the bot API places on a single message.
pub const MAX_FRAGMENT_CHARS: usize = 4096;

/// Receives the finished report text, best-effort.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, text: &str);
}

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Posts reports to a Telegram chat, fragmenting oversized text.
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
    timeout: Duration,
    fragment_pause: Duration,
}

impl TelegramSink {
    #[must_use]
    pub fn new(config: &NotifierConfig, token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/bot{token}/sendMessage", config.api_base),
            chat_id: chat_id.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            fragment_pause: Duration::from_millis(config.fragment_pause_ms),
        }
    }

    async fn post_fragment(&self, text: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&TelegramMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn notify(&self, text: &str) {
        let fragments = fragment(text);
        let count = fragments.len();

        for (index, piece) in fragments.iter().enumerate() {
            match self.post_fragment(piece).await {
                Ok(()) => debug!(fragment = index + 1, fragments = count, "notification sent"),
                Err(error) => {
                    // Swallowed: the report is already computed and returned
                    warn!(
                        fragment = index + 1,
                        fragments = count,
                        error = %error,
                        "failed to send notification fragment"
                    );
                }
            }

            if count > 1 && index + 1 < count {
                tokio::time::sleep(self.fragment_pause).await;
            }
        }
    }
}

/// Split `text` into sequential pieces of at most [`MAX_FRAGMENT_CHARS`]
/// characters. Short text yields a single fragment.
#[must_use]
pub fn fragment(text: &str) -> Vec<String> {
    if text.chars().count() <= MAX_FRAGMENT_CHARS {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == MAX_FRAGMENT_CHARS {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
