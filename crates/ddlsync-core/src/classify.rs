//! Driver error classification.
//!
//! PostgreSQL reports most conditions the reconciler cares about through
//! SQLSTATE codes, but not every driver path preserves the code, so the
//! message text is matched as a fallback. The accepted substrings are
//! pinned by the tests below.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// An error reported by the database driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DbError {
    /// SQLSTATE, when the driver provides one.
    pub code: Option<String>,
    pub message: String,
}

impl DbError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Shorthand for [`classify`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        classify(self)
    }
}

/// What a driver error means to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    AlreadyExists,
    /// The object must be dropped before it can be redefined.
    NeedsReplace,
    /// Carries the missing relation name, without schema.
    RelationDoesNotExist(String),
    TypeDoesNotExist(String),
    NullConstraintViolation,
    ScanArityMismatch {
        expected: usize,
        actual: Option<usize>,
    },
    Unclassified,
}

const NEEDS_REPLACE: &[&str] = &[
    "cannot change return type of existing function",
    "cannot change name of input parameter",
    "cannot remove parameter defaults from existing function",
    "cannot change name of view column",
    "cannot drop columns from view",
    "cannot change data type of view column",
];

const NULL_VIOLATION: &[&str] = &["contains null values", "violates not-null constraint"];

static RELATION_MISSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|: )relation "(?:[^".]+\.)?([^"]+)" does not exist"#)
        .expect("valid classifier regex")
});

static TYPE_MISSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"type "(?:[^".]+\.)?([^"]+)" does not exist"#).expect("valid classifier regex")
});

static SCAN_DEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"can't scan into dest\[(\d+)\]").expect("valid classifier regex")
});

static SCAN_COUNTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"got (\d+) and (\d+)").expect("valid classifier regex"));

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
}

/// Maps a driver error to an [`ErrorKind`]. SQLSTATE wins when present.
#[must_use]
pub fn classify(err: &DbError) -> ErrorKind {
    let message = err.message.as_str();

    match err.code.as_deref() {
        Some("42P07" | "42710" | "42723" | "42P06" | "42701") => return ErrorKind::AlreadyExists,
        Some("42P13") => return ErrorKind::NeedsReplace,
        Some("42P01") => {
            return capture(&RELATION_MISSING, message)
                .map_or(ErrorKind::Unclassified, ErrorKind::RelationDoesNotExist)
        }
        // Undefined column: its message also names the relation.
        Some("42703") => return ErrorKind::Unclassified,
        Some("42704") => {
            if let Some(name) = capture(&TYPE_MISSING, message) {
                return ErrorKind::TypeDoesNotExist(name);
            }
        }
        Some("23502") => return ErrorKind::NullConstraintViolation,
        _ => {}
    }

    if message.contains("already exists") {
        return ErrorKind::AlreadyExists;
    }
    if NEEDS_REPLACE.iter().any(|s| message.contains(s)) {
        return ErrorKind::NeedsReplace;
    }
    if let Some(name) = capture(&RELATION_MISSING, message) {
        return ErrorKind::RelationDoesNotExist(name);
    }
    if let Some(name) = capture(&TYPE_MISSING, message) {
        return ErrorKind::TypeDoesNotExist(name);
    }
    if NULL_VIOLATION.iter().any(|s| message.contains(s)) {
        return ErrorKind::NullConstraintViolation;
    }
    if let Some(expected) = capture(&SCAN_DEST, message).and_then(|n| n.parse().ok()) {
        return ErrorKind::ScanArityMismatch {
            expected,
            actual: None,
        };
    }
    if let Some(caps) = SCAN_COUNTS.captures(message) {
        let expected = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let actual = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let Some(expected) = expected {
            return ErrorKind::ScanArityMismatch { expected, actual };
        }
    }
    ErrorKind::Unclassified
}
