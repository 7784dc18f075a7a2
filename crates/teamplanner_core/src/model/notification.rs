//! Notification model.
//!
//! Mirrors the push payload `(message, type, relatedEntityId,
//! relatedEntityType)` delivered to a user's live connections.

use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    GroupInvitation,
    MemberRemoved,
    RoleChanged,
    GroupDeleted,
    TaskAssigned,
    TaskStatusChanged,
    EventScheduled,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GroupInvitation => "group_invitation",
            Self::MemberRemoved => "member_removed",
            Self::RoleChanged => "role_changed",
            Self::GroupDeleted => "group_deleted",
            Self::TaskAssigned => "task_assigned",
            Self::TaskStatusChanged => "task_status_changed",
            Self::EventScheduled => "event_scheduled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "group_invitation" => Some(Self::GroupInvitation),
            "member_removed" => Some(Self::MemberRemoved),
            "role_changed" => Some(Self::RoleChanged),
            "group_deleted" => Some(Self::GroupDeleted),
            "task_assigned" => Some(Self::TaskAssigned),
            "task_status_changed" => Some(Self::TaskStatusChanged),
            "event_scheduled" => Some(Self::EventScheduled),
            _ => None,
        }
    }
}

/// Notice handed to a [`crate::service::notification::NotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub kind: NotificationKind,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
}

impl NewNotification {
    pub fn new(user_id: UserId, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            kind,
            related_entity_id: None,
            related_entity_type: None,
        }
    }

    /// Attaches the entity the notice is about.
    pub fn about(mut self, entity_type: &str, entity_id: Uuid) -> Self {
        self.related_entity_type = Some(entity_type.to_string());
        self.related_entity_id = Some(entity_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub kind: NotificationKind,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    pub created_at: i64,
    pub is_read: bool,
}
