//! Core domain logic for TeamPlanner.
//! This crate is the single source of truth for group, task and calendar
//! access rules.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attachment::{AttachmentOwner, AttachmentUpload, FileAttachment};
pub use model::event::{
    CalendarEvent, EventDraft, EventFields, EventType, EventUpdate, EventWindow,
};
pub use model::group::{
    Group, GroupDetails, GroupDraft, GroupMember, GroupUpdate, MemberRole, Visibility,
};
pub use model::invitation::Invitation;
pub use model::notification::{NewNotification, Notification, NotificationKind};
pub use model::task::{
    Priority, TaskDraft, TaskFields, TaskFilter, TaskItem, TaskStatus, TaskUpdate,
};
pub use model::user::{User, UserDraft};
pub use model::ValidationError;
pub use repo::attachment_repo::{AttachmentRepository, SqliteAttachmentRepository};
pub use repo::event_repo::{EventFeedRow, EventRepository, SqliteEventRepository};
pub use repo::group_repo::{GroupRepository, LeaveOutcome, SqliteGroupRepository};
pub use repo::invitation_repo::{InvitationRepository, SqliteInvitationRepository};
pub use repo::membership::MembershipLookup;
pub use repo::notification_repo::SqliteNotificationStore;
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attachment_service::AttachmentService;
pub use service::error::{ErrorKind, ServiceError, ServiceResult};
pub use service::event_service::EventService;
pub use service::group_service::GroupService;
pub use service::invitation_service::InvitationService;
pub use service::notification::{NotificationSink, NotifyError};
pub use service::task_service::TaskService;
pub use service::user_service::UserService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
