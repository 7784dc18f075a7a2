//! Response envelopes shared by all controllers.
//!
//! # Invariants
//! - Every service error maps to exactly one outcome by its kind.
//! - Internal failures are logged here and reach callers without details.

use crate::service::error::{ErrorKind, ServiceError, ServiceResult};
use log::error;
use serde::Serialize;
use std::error::Error;

pub(crate) const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again.";

/// One invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Transport-agnostic controller result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome<T> {
    Ok(T),
    NotFound,
    Forbidden,
    /// Business rule rejected the request; shown as a form-level message.
    FormError { message: String },
    FieldErrors(Vec<FieldError>),
    Internal,
}

impl<T> RequestOutcome<T> {
    /// Maps a service result, logging internal failures under `action`.
    pub fn from_result(action: &str, result: ServiceResult<T>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::from_error(action, &err),
        }
    }

    pub fn from_error(action: &str, err: &ServiceError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Unauthorized => Self::Forbidden,
            ErrorKind::InvalidOperation => Self::FormError {
                message: err.to_string(),
            },
            ErrorKind::Validation => {
                let field = match err {
                    ServiceError::Validation(inner) => inner.field(),
                    _ => "",
                };
                Self::FieldErrors(vec![FieldError {
                    field: field.to_string(),
                    message: err.to_string(),
                }])
            }
            ErrorKind::Internal => Self::internal(action, err),
        }
    }

    /// Logs an unexpected failure and returns [`RequestOutcome::Internal`].
    pub fn internal(action: &str, err: &dyn Error) -> Self {
        log_internal(action, err);
        Self::Internal
    }

    /// HTTP status conventionally used for this outcome.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::FormError { .. } => 400,
            Self::FieldErrors(_) => 422,
            Self::Internal => 500,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Success payload, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            Self::Ok(value) => RequestOutcome::Ok(f(value)),
            Self::NotFound => RequestOutcome::NotFound,
            Self::Forbidden => RequestOutcome::Forbidden,
            Self::FormError { message } => RequestOutcome::FormError { message },
            Self::FieldErrors(errors) => RequestOutcome::FieldErrors(errors),
            Self::Internal => RequestOutcome::Internal,
        }
    }
}

/// `{success, message}` body returned by member actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Failure envelope for a service error; internal details are hidden.
    pub fn from_error(action: &str, err: &ServiceError) -> Self {
        match err.kind() {
            ErrorKind::Internal => {
                log_internal(action, err);
                Self::failure(INTERNAL_MESSAGE)
            }
            ErrorKind::NotFound
            | ErrorKind::Unauthorized
            | ErrorKind::InvalidOperation
            | ErrorKind::Validation => Self::failure(err.to_string()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "success": self.success, "message": self.message }).to_string()
    }
}

pub(crate) fn log_internal(action: &str, err: &dyn Error) {
    error!("event={action} module=api status=error error={err}");
}
