//! Typed error handling for the dispatch path.
//!
//! Two families of errors exist here:
//! - Fatal errors occur before any send is attempted and abort the whole run
//! - Send errors are per-recipient, recovered into an outcome, and never
//!   propagate past the sender once retries are exhausted

use thiserror::Error;

use crate::message::{MAX_BODY_LEN, MAX_SUBJECT_LEN};

/// Per-recipient send failure, surfaced after all retry attempts are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The final attempt did not complete within the per-attempt timeout.
    #[error("request timed out")]
    Timeout,

    /// The delivery API answered with a non-2xx status. Carries the error
    /// text from the response body when it was parseable.
    #[error("rejected by delivery API: {0}")]
    ApiRejected(String),

    /// A 2xx response whose body could not be parsed. Not accepted as
    /// success; retried like any other failed attempt.
    #[error("invalid response from delivery API")]
    InvalidResponse,

    /// The request never produced a response (connect failure, DNS, etc.).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The task coordinating a batch failed before this send resolved.
    #[error("send was not completed: {0}")]
    Orchestration(String),
}

impl SendError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::ApiRejected(_))
    }
}

/// Malformed or missing message fields. Fatal, pre-dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sender address is not set")]
    MissingFrom,

    #[error("sender address is malformed")]
    InvalidFrom,

    #[error("subject must not be empty")]
    EmptySubject,

    #[error("subject exceeds {MAX_SUBJECT_LEN} characters")]
    SubjectTooLong,

    #[error("body must not be empty")]
    EmptyBody,

    #[error("body exceeds {MAX_BODY_LEN} characters")]
    BodyTooLong,

    #[error("no valid recipient addresses")]
    NoValidRecipients,
}

/// Missing or unusable configuration. Fatal, pre-dispatch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("delivery API key is not set")]
    MissingApiKey,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Any error that prevents a dispatch run from starting.
///
/// Fatal errors are rendered as an abort report so the caller always
/// receives structured text rather than a bare error chain.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Config(#[from] ConfigError),
}
