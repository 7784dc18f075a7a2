//! User profile model.
//!
//! Credentials live with the external identity provider; this record only
//! carries what groups, tasks and notifications reference.

use super::{optional_text, required_text, ValidationError};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

pub const FULL_NAME_MAX_CHARS: usize = 100;
pub const ADDRESS_MAX_CHARS: usize = 200;
pub const EMAIL_MAX_CHARS: usize = 254;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lowercased, unique.
    pub email: String,
    pub full_name: String,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}

/// Input for registering a profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub email: String,
    pub full_name: String,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl UserDraft {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            full_name: full_name.into(),
            address: None,
            date_of_birth: None,
        }
    }

    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            email: normalize_email(&self.email)?,
            full_name: required_text("full_name", &self.full_name, FULL_NAME_MAX_CHARS)?,
            address: optional_text("address", self.address.as_deref(), ADDRESS_MAX_CHARS)?,
            date_of_birth: self.date_of_birth,
        })
    }
}

/// Trims and lowercases an email, rejecting malformed addresses.
pub fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let normalized = required_text("email", value, EMAIL_MAX_CHARS)?.to_ascii_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(normalized)
}
