//! Group and membership model.
//!
//! # Invariants
//! - Group names are unique across all groups (exact match).
//! - One membership row exists per `(group_id, user_id)`; leaving stamps
//!   `left_at` instead of deleting the row.
//! - The creator is recorded as an `Admin` membership at creation time.

use super::user::UserId;
use super::{bounded_text, required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GroupId = Uuid;

pub const GROUP_NAME_MAX_CHARS: usize = 100;
pub const GROUP_DESCRIPTION_MAX_CHARS: usize = 500;

/// Who can discover a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Hidden,
}

/// Role carried by an active membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Manages the group, its members, tasks and events.
    Admin,
    /// Participates in tasks and events.
    Member,
}

impl MemberRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Member => "Member",
        }
    }
}

/// Lifecycle state derived from `GroupMember::left_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    Active,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    /// `None` once the creating user has been deleted.
    pub created_by: Option<UserId>,
    pub created_at: i64,
    pub is_archived: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: i64,
    pub left_at: Option<i64>,
}

impl GroupMember {
    pub fn state(&self) -> MembershipState {
        match self.left_at {
            None => MembershipState::Active,
            Some(_) => MembershipState::Left,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == MembershipState::Active
    }

    /// Active and holding the admin role.
    pub fn is_active_admin(&self) -> bool {
        self.is_active() && self.role == MemberRole::Admin
    }
}

/// Input for creating a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    /// Users to add as plain members besides the creator.
    pub member_ids: Vec<UserId>,
}

impl GroupDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a trimmed copy, or the first field error.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, GROUP_NAME_MAX_CHARS)?,
            description: bounded_text(
                "description",
                &self.description,
                GROUP_DESCRIPTION_MAX_CHARS,
            )?,
            visibility: self.visibility,
            member_ids: dedup_ids(&self.member_ids),
        })
    }
}

/// Input for editing a group; `member_ids` is the complete desired roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdate {
    pub group_id: GroupId,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub member_ids: Vec<UserId>,
}

impl GroupUpdate {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            group_id: self.group_id,
            name: required_text("name", &self.name, GROUP_NAME_MAX_CHARS)?,
            description: bounded_text(
                "description",
                &self.description,
                GROUP_DESCRIPTION_MAX_CHARS,
            )?,
            visibility: self.visibility,
            member_ids: dedup_ids(&self.member_ids),
        })
    }
}

/// Group read model with its active roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDetails {
    pub group: Group,
    /// Active members ordered by join time.
    pub members: Vec<GroupMember>,
}

fn dedup_ids(ids: &[UserId]) -> Vec<UserId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}
