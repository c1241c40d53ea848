//! Orchestration of one dispatch run, from raw submission to report.
//!
//! Fatal errors here (missing credential, malformed message fields, zero
//! valid recipients) abort before any send and render the abort report.
//! Once dispatch begins, per-recipient failures are never fatal.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    address::{self, Classification},
    config::{Config, DefaultsStore},
    dispatcher::{BatchPolicy, DispatchStats, Dispatcher},
    error::{ConfigError, FatalError, ValidationError},
    message::Message,
    notify::{NotificationSink, TelegramSink},
    report,
    sender::{ApiSender, Sender},
};

/// One dispatch request. Blank fields fall back to stored defaults, so a
/// wholly empty submission is how the scheduled trigger runs.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    pub from: String,
    pub recipients: String,
    pub subject: String,
    pub body: String,
}

/// What a run produced: the report text and whether the run aborted before
/// any send was attempted.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub report: String,
    pub aborted: bool,
}

/// Ties the pieces together: stored defaults, sender, dispatcher, report,
/// notification sink.
pub struct Engine {
    sender: Option<Arc<dyn Sender>>,
    sink: Option<Arc<dyn NotificationSink>>,
    batch: BatchPolicy,
    store: DefaultsStore,
    access_token: Option<String>,
}

impl Engine {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let sender = config.api.key.as_ref().map(|key| {
            Arc::new(ApiSender::new(
                config.api.endpoint.clone(),
                key.clone(),
                config.retry.clone(),
            )) as Arc<dyn Sender>
        });

        let sink = match (&config.notifier.tg_token, &config.notifier.tg_chat) {
            (Some(token), Some(chat)) => Some(
                Arc::new(TelegramSink::new(&config.notifier, token, chat))
                    as Arc<dyn NotificationSink>,
            ),
            _ => None,
        };

        Self::with_parts(
            sender,
            sink,
            config.batch.clone(),
            DefaultsStore::new(config.defaults_path()),
            config.http.access_token.clone(),
        )
    }

    /// Assemble an engine from explicit parts. This is the seam tests use to
    /// substitute mock senders and sinks.
    #[must_use]
    pub const fn with_parts(
        sender: Option<Arc<dyn Sender>>,
        sink: Option<Arc<dyn NotificationSink>>,
        batch: BatchPolicy,
        store: DefaultsStore,
        access_token: Option<String>,
    ) -> Self {
        Self {
            sender,
            sink,
            batch,
            store,
            access_token,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &DefaultsStore {
        &self.store
    }

    /// When an access token is configured, requests must present it.
    #[must_use]
    pub fn authorized(&self, token: Option<&str>) -> bool {
        match &self.access_token {
            Some(required) => token == Some(required.as_str()),
            None => true,
        }
    }

    /// Run the full dispatch path for one submission and return the report.
    pub async fn run(&self, submission: Submission) -> RunOutcome {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(error = %error, "failed to load stored defaults, proceeding without");
                crate::config::StoredDefaults::default()
            }
        };

        let from = pick(&submission.from, &stored.from_email);
        let recipients_text = pick(&submission.recipients, &stored.to_emails);
        let subject = pick(&submission.subject, &stored.subject);
        let body = pick(&submission.body, &stored.body);

        let classification = address::classify(recipients_text);
        if !classification.invalid.is_empty() {
            warn!(
                invalid = classification.invalid.len(),
                "some recipient addresses failed the syntax check"
            );
        }

        match self.prepare(from, subject, body, &classification) {
            Err(fatal) => {
                warn!(error = %fatal, "dispatch aborted before any send");
                let stats = DispatchStats::aborted(classification.invalid);
                let text = report::abort(&fatal.to_string(), &stats);
                self.forward(&text).await;
                RunOutcome {
                    report: text,
                    aborted: true,
                }
            }
            Ok((sender, message)) => {
                info!(
                    recipients = classification.valid.len(),
                    invalid = classification.invalid.len(),
                    "starting dispatch run"
                );
                let dispatcher = Dispatcher::new(sender, self.batch.clone());
                let stats = dispatcher
                    .dispatch(
                        classification.valid,
                        classification.invalid,
                        Arc::new(message),
                    )
                    .await;
                debug_assert!(stats.is_balanced());

                let text = report::completion(&stats);
                self.forward(&text).await;
                RunOutcome {
                    report: text,
                    aborted: false,
                }
            }
        }
    }

    /// Everything that must hold before the first send.
    fn prepare(
        &self,
        from: &str,
        subject: &str,
        body: &str,
        classification: &Classification,
    ) -> Result<(Arc<dyn Sender>, Message), FatalError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(ConfigError::MissingApiKey)?
            .clone();

        let message = Message::validated(from, subject, body)?;

        if classification.valid.is_empty() {
            return Err(ValidationError::NoValidRecipients.into());
        }

        Ok((sender, message))
    }

    async fn forward(&self, text: &str) {
        if let Some(sink) = &self.sink {
            sink.notify(text).await;
        }
    }
}

fn pick<'a>(given: &'a str, fallback: &'a str) -> &'a str {
    if given.trim().is_empty() {
        fallback
    } else {
        given
    }
}
