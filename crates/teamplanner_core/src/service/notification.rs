//! Notification sink contract.
//!
//! Services hand notices to a sink after their write has committed. Delivery
//! is best effort: a failing sink is logged and never fails the operation
//! that produced the notice.

use crate::model::notification::NewNotification;
use crate::repo::RepoError;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by a notification sink.
#[derive(Debug)]
pub enum NotifyError {
    /// Persisting the notice failed.
    Store(RepoError),
    /// Transport-specific failure reported by an external sink.
    Delivery(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "notification store failed: {err}"),
            Self::Delivery(message) => write!(f, "notification delivery failed: {message}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Delivery(_) => None,
        }
    }
}

impl From<RepoError> for NotifyError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Receiver of user notifications.
pub trait NotificationSink {
    fn create_notification(&self, notice: &NewNotification) -> Result<(), NotifyError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn create_notification(&self, notice: &NewNotification) -> Result<(), NotifyError> {
        (**self).create_notification(notice)
    }
}

/// Delivers every notice, logging failures instead of propagating them.
pub(crate) fn deliver<N, I>(sink: &N, module: &str, notices: I)
where
    N: NotificationSink + ?Sized,
    I: IntoIterator<Item = NewNotification>,
{
    for notice in notices {
        if let Err(err) = sink.create_notification(&notice) {
            warn!(
                "event=notify module={} status=error kind={} user_id={} error={}",
                module,
                notice.kind.as_str(),
                notice.user_id,
                err
            );
        }
    }
}
