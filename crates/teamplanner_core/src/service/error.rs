//! Service-layer error taxonomy.
//!
//! Each variant names one concrete failure. [`ServiceError::kind`] folds them
//! into the five outcome classes callers branch on.

use crate::model::attachment::AttachmentId;
use crate::model::event::EventId;
use crate::model::group::GroupId;
use crate::model::task::{PriorityId, TaskId};
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Outcome class of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidOperation,
    Validation,
    Internal,
}

/// Error returned by every service operation.
#[derive(Debug)]
pub enum ServiceError {
    GroupNotFound(GroupId),
    TaskNotFound(TaskId),
    EventNotFound(EventId),
    AttachmentNotFound(AttachmentId),
    /// Unknown user id or email.
    UserNotFound(String),
    /// No active membership for `(group, user)`.
    MemberNotFound { group_id: GroupId, user_id: UserId },
    InvitationNotFound,

    /// Caller has no active membership in the group.
    NotGroupMember(GroupId),
    /// Caller is not an active admin of the group.
    NotGroupAdmin(GroupId),
    /// Caller is neither the task's assignee nor a group admin.
    NotTaskEditor(TaskId),
    /// Profile writes are limited to the profile owner.
    NotProfileOwner(UserId),

    DuplicateGroupName(String),
    DuplicatePriorityName(String),
    EmailTaken,
    AlreadyMember(UserId),
    AssigneeNotMember(UserId),
    PriorityNotFound(PriorityId),
    StartNotInFuture,
    EndNotAfterStart,
    InvalidRecurrenceRule(String),
    InvalidTimeZone(String),
    SoleAdminCannotLeave,
    /// A roster edit would leave active members without an admin.
    GroupWithoutAdmin,
    CannotRemoveSelf,
    CannotRemoveAdmin,
    CannotDemoteSelf,
    UploadAfterDeadline,
    InvitationAlreadyAccepted,
    InvitationEmailMismatch,

    /// Field-level validation failure raised before any write.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal mismatch between a write and its read-back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GroupNotFound(_)
            | Self::TaskNotFound(_)
            | Self::EventNotFound(_)
            | Self::AttachmentNotFound(_)
            | Self::UserNotFound(_)
            | Self::MemberNotFound { .. }
            | Self::InvitationNotFound
            | Self::Repo(RepoError::NotFound { .. }) => ErrorKind::NotFound,
            Self::NotGroupMember(_)
            | Self::NotGroupAdmin(_)
            | Self::NotTaskEditor(_)
            | Self::NotProfileOwner(_) => ErrorKind::Unauthorized,
            Self::DuplicateGroupName(_)
            | Self::DuplicatePriorityName(_)
            | Self::EmailTaken
            | Self::AlreadyMember(_)
            | Self::AssigneeNotMember(_)
            | Self::PriorityNotFound(_)
            | Self::StartNotInFuture
            | Self::EndNotAfterStart
            | Self::InvalidRecurrenceRule(_)
            | Self::InvalidTimeZone(_)
            | Self::SoleAdminCannotLeave
            | Self::GroupWithoutAdmin
            | Self::CannotRemoveSelf
            | Self::CannotRemoveAdmin
            | Self::CannotDemoteSelf
            | Self::UploadAfterDeadline
            | Self::InvitationAlreadyAccepted
            | Self::InvitationEmailMismatch => ErrorKind::InvalidOperation,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Repo(_) | Self::InconsistentState(_) => ErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::EventNotFound(id) => write!(f, "event not found: {id}"),
            Self::AttachmentNotFound(id) => write!(f, "attachment not found: {id}"),
            Self::UserNotFound(key) => write!(f, "user not found: {key}"),
            Self::MemberNotFound { group_id, user_id } => {
                write!(f, "member {user_id} not found in group {group_id}")
            }
            Self::InvitationNotFound => write!(f, "invitation not found"),
            Self::NotGroupMember(id) => write!(f, "not a member of group {id}"),
            Self::NotGroupAdmin(id) => write!(f, "admin role required in group {id}"),
            Self::NotTaskEditor(id) => {
                write!(f, "only the assignee or a group admin may change task {id}")
            }
            Self::NotProfileOwner(id) => write!(f, "profile {id} belongs to another user"),
            Self::DuplicateGroupName(name) => {
                write!(f, "a group named `{name}` already exists")
            }
            Self::DuplicatePriorityName(name) => {
                write!(f, "a priority named `{name}` already exists")
            }
            Self::EmailTaken => write!(f, "email address is already registered"),
            Self::AlreadyMember(id) => write!(f, "user {id} is already a member of this group"),
            Self::AssigneeNotMember(id) => {
                write!(f, "assignee {id} is not an active member of the group")
            }
            Self::PriorityNotFound(id) => write!(f, "priority {id} does not exist"),
            Self::StartNotInFuture => write!(f, "start time must be in the future"),
            Self::EndNotAfterStart => write!(f, "end time must be after start time"),
            Self::InvalidRecurrenceRule(reason) => {
                write!(f, "recurrence rule is not valid: {reason}")
            }
            Self::InvalidTimeZone(id) => write!(f, "unknown time zone `{id}`"),
            Self::SoleAdminCannotLeave => write!(
                f,
                "the only admin cannot leave while other members remain; assign another admin first"
            ),
            Self::GroupWithoutAdmin => {
                write!(f, "the group must keep at least one admin")
            }
            Self::CannotRemoveSelf => write!(f, "cannot remove yourself from the group"),
            Self::CannotRemoveAdmin => write!(f, "cannot remove another admin"),
            Self::CannotDemoteSelf => write!(f, "cannot change your own role away from admin"),
            Self::UploadAfterDeadline => {
                write!(f, "task files can only change before the task deadline")
            }
            Self::InvitationAlreadyAccepted => write!(f, "invitation was already accepted"),
            Self::InvitationEmailMismatch => {
                write!(f, "invitation was issued to a different email address")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
