//! The message shared read-only across all sends in a run.

use serde::{Deserialize, Serialize};

use crate::{address, error::ValidationError};

/// RFC 2822 line length limit for the subject.
pub const MAX_SUBJECT_LEN: usize = 998;

/// Upper bound on the plain-text body.
pub const MAX_BODY_LEN: usize = 100_000;

/// A validated outbound message. Field checks happen once, before any send
/// attempt; after that the message is immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Trim and validate the message fields.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] when the sender address is missing or
    /// malformed, or when subject/body are empty or exceed their bounds.
    pub fn validated(from: &str, subject: &str, body: &str) -> Result<Self, ValidationError> {
        let from = from.trim();
        if from.is_empty() {
            return Err(ValidationError::MissingFrom);
        }
        if !address::is_valid_address(from) {
            return Err(ValidationError::InvalidFrom);
        }

        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(ValidationError::SubjectTooLong);
        }

        let body = body.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        if body.chars().count() > MAX_BODY_LEN {
            return Err(ValidationError::BodyTooLong);
        }

        Ok(Self {
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }
}
