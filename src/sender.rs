//! Single-message delivery with timeout and bounded retry.
//!
//! [`Sender`] is the seam between the batch dispatcher and the delivery API;
//! [`ApiSender`] is the production implementation speaking the MailerSend
//! wire shape. A sender has no shared mutable state and is safe to invoke
//! concurrently for distinct recipients.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{address::Recipient, error::SendError, message::Message};

/// Retry configuration for a single message send.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per recipient, including the first.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Independent timeout applied to each attempt.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Base delay for linear backoff: attempt `k` is followed by a wait of
    /// `retry_delay * k` before attempt `k + 1`.
    ///
    /// Default: 1000 ms
    #[serde(default = "defaults::retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            attempt_timeout_secs: defaults::attempt_timeout_secs(),
            retry_delay_ms: defaults::retry_delay_ms(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Backoff to observe after failed attempt `attempt` (1-indexed).
    #[must_use]
    pub const fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms * attempt as u64)
    }

    /// Attempts are 1-indexed; at least one attempt is always made.
    #[must_use]
    pub const fn final_attempt(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn attempt_timeout_secs() -> u64 {
        30
    }

    pub const fn retry_delay_ms() -> u64 {
        1000
    }
}

/// One message to one recipient, retries included.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Deliver `message` to `recipient`.
    ///
    /// # Errors
    /// Returns the last observed [`SendError`] once all attempts are
    /// exhausted. Never fails in a way that should abort sibling sends.
    async fn send(&self, recipient: &Recipient, message: &Message) -> Result<(), SendError>;
}

/// JSON request body for the delivery API: `{from:{email}, to:[{email}], subject, text}`.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: Party<'a>,
    to: Vec<Party<'a>>,
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Party<'a> {
    email: &'a str,
}

/// Error body shape the API uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// [`Sender`] implementation over the HTTP delivery API.
pub struct ApiSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl ApiSender {
    #[must_use]
    pub fn new(endpoint: String, api_key: String, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            retry,
        }
    }

    /// One attempt: POST the message, judge the response.
    ///
    /// Success requires both a 2xx status and a parseable JSON body; a 2xx
    /// with an unparseable body is `InvalidResponse` and gets retried.
    async fn attempt(&self, recipient: &Recipient, message: &Message) -> Result<(), SendError> {
        let request = SendRequest {
            from: Party {
                email: &message.from,
            },
            to: vec![Party {
                email: recipient.as_str(),
            }],
            subject: &message.subject,
            text: &message.body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.retry.attempt_timeout())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            match response.json::<serde_json::Value>().await {
                Ok(_) => Ok(()),
                Err(_) => Err(SendError::InvalidResponse),
            }
        } else {
            let text = response
                .json::<ApiErrorBody>()
                .await
                .map_or_else(|_| format!("HTTP {status}"), |body| body.message);
            Err(SendError::ApiRejected(text))
        }
    }
}

#[async_trait]
impl Sender for ApiSender {
    async fn send(&self, recipient: &Recipient, message: &Message) -> Result<(), SendError> {
        let final_attempt = self.retry.final_attempt();

        for attempt in 1..=final_attempt {
            match self.attempt(recipient, message).await {
                Ok(()) => {
                    debug!(recipient = %recipient, attempt, "message accepted by delivery API");
                    return Ok(());
                }
                Err(error) if attempt == final_attempt => {
                    warn!(
                        recipient = %recipient,
                        attempt,
                        error = %error,
                        "send failed, retries exhausted"
                    );
                    return Err(error);
                }
                Err(error) => {
                    debug!(
                        recipient = %recipient,
                        attempt,
                        error = %error,
                        "send attempt failed, backing off"
                    );
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                }
            }
        }

        // 1..=final_attempt always returns from inside the loop
        Err(SendError::Orchestration("no attempt was made".to_string()))
    }
}

fn classify_transport_error(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        SendError::Timeout
    } else {
        SendError::NetworkFailure(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.attempt_timeout_secs, 30);
        assert_eq!(policy.retry_delay_ms, 1000);
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
    }

    #[test]
    fn at_least_one_attempt_is_made() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.final_attempt(), 1);
    }
}
