//! Controller layer over the services.
//!
//! # Responsibility
//! - Wire repositories and services over one borrowed connection.
//! - Translate service results into [`RequestOutcome`] and
//!   [`ActionResponse`] envelopes.
//! - Shape calendar feeds as JSON.
//!
//! # Invariants
//! - Callers are already authenticated; the acting user id is passed in.
//! - Controller methods never panic and never leak internal error text.

pub mod events;
pub mod groups;
pub mod response;
pub mod tasks;

pub use events::{feed_json, CalendarEventsController, CalendarFeedItem, FeedItemProps};
pub use groups::{GroupPage, GroupsController};
pub use response::{ActionResponse, FieldError, RequestOutcome};
pub use tasks::{TaskDetails, TaskItemsController};

use crate::repo::RepoResult;
use crate::service::error::ServiceResult;
use response::{log_internal, INTERNAL_MESSAGE};

/// Builds a service and runs one call against it.
pub(crate) fn run<S, T>(
    action: &str,
    build: impl FnOnce() -> RepoResult<S>,
    call: impl FnOnce(&S) -> ServiceResult<T>,
) -> RequestOutcome<T> {
    match build() {
        Ok(service) => RequestOutcome::from_result(action, call(&service)),
        Err(err) => RequestOutcome::internal(action, &err),
    }
}

/// Like [`run`] for `{success, message}` actions; `call` yields the success
/// message.
pub(crate) fn run_action<S>(
    action: &str,
    build: impl FnOnce() -> RepoResult<S>,
    call: impl FnOnce(&S) -> ServiceResult<String>,
) -> ActionResponse {
    let service = match build() {
        Ok(service) => service,
        Err(err) => {
            log_internal(action, &err);
            return ActionResponse::failure(INTERNAL_MESSAGE);
        }
    };
    match call(&service) {
        Ok(message) => ActionResponse::success(message),
        Err(err) => ActionResponse::from_error(action, &err),
    }
}
