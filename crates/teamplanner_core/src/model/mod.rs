//! Domain model for groups, memberships, tasks and calendar events.
//!
//! # Responsibility
//! - Define the canonical records exchanged between repositories, services
//!   and the controller layer.
//! - Provide input drafts with field-level validation that runs before any
//!   storage access.
//!
//! # Invariants
//! - Every entity except priorities is identified by a UUID v4.
//! - Timestamps are Unix epoch milliseconds.
//! - Soft delete exists only for memberships (`GroupMember::left_at`).

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod attachment;
pub mod event;
pub mod group;
pub mod invitation;
pub mod notification;
pub mod task;
pub mod user;

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Field-level input error raised before any service logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trimming.
    Blank(&'static str),
    /// Text exceeds the column limit.
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Email does not look like `local@domain.tld`.
    InvalidEmail,
    /// Upload exceeds the configured ceiling.
    FileTooLarge { max_bytes: u64, actual_bytes: u64 },
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Blank(field) | Self::TooLong { field, .. } => *field,
            Self::InvalidEmail => "email",
            Self::FileTooLarge { .. } => "file",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::InvalidEmail => write!(f, "email address is not valid"),
            Self::FileTooLarge {
                max_bytes,
                actual_bytes,
            } => write!(
                f,
                "file of {actual_bytes} bytes exceeds the {max_bytes} byte limit"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects blank or over-long input.
pub(crate) fn required_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    bounded_text(field, trimmed, max_chars)
}

/// Trims `value` and rejects over-long input; blank is allowed.
pub(crate) fn bounded_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}

/// Normalizes optional free text: trims and maps blank to `None`.
pub(crate) fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => bounded_text(field, value, max_chars).map(Some),
        None => Ok(None),
    }
}
