//! Syntactic recipient address classification.
//!
//! Raw recipient input is newline-separated, one address per line. Each line
//! is trimmed and classified; classification never fails. Duplicates are
//! preserved deliberately: each occurrence is a separate send attempt.

use std::fmt::{self, Display};

use serde::Serialize;

/// A syntactically valid recipient address.
///
/// Can only be constructed through [`Recipient::new`] or [`classify`], so
/// holding one is proof the address passed the syntax check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recipient(String);

impl Recipient {
    /// Validate `candidate` and wrap it. Returns `None` for malformed input.
    #[must_use]
    pub fn new(candidate: &str) -> Option<Self> {
        let trimmed = candidate.trim();
        is_valid_address(trimmed).then(|| Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two ordered halves of a classified recipient list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// Valid addresses in encounter order, duplicates preserved.
    pub valid: Vec<Recipient>,
    /// Trimmed raw text of lines that failed the syntax check, in encounter
    /// order. Empty lines are skipped silently and never land here.
    pub invalid: Vec<String>,
}

/// Split newline-separated recipient text into valid and invalid addresses.
#[must_use]
pub fn classify(text: &str) -> Classification {
    let mut classification = Classification::default();

    for line in text.lines() {
        let candidate = line.trim();
        if candidate.is_empty() {
            continue;
        }

        if is_valid_address(candidate) {
            classification.valid.push(Recipient(candidate.to_string()));
        } else {
            classification.invalid.push(candidate.to_string());
        }
    }

    classification
}

/// Syntax check: no whitespace, exactly one `@` with a non-empty local part,
/// and a domain containing at least one `.` that is neither its first nor
/// its last character.
#[must_use]
pub fn is_valid_address(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // Any interior dot qualifies; a sole leading or trailing dot does not
    domain
        .char_indices()
        .any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len())
}
