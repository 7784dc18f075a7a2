//! Task model.
//!
//! # Invariants
//! - `completed_at` is `Some` iff `status == TaskStatus::Done`.
//! - `assignee_id`, when set, names an active member of `group_id` at the
//!   time of the last write.

use super::group::GroupId;
use super::user::UserId;
use super::{bounded_text, optional_text, required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;
pub type PriorityId = i64;

pub const TASK_TITLE_MAX_CHARS: usize = 200;
pub const TASK_DESCRIPTION_MAX_CHARS: usize = 1000;
pub const TASK_TAGS_MAX_CHARS: usize = 500;

/// Task workflow state. Every transition is allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::ToDo => "ToDo",
            Self::InProgress => "InProgress",
            Self::Done => "Done",
            Self::Blocked => "Blocked",
        }
    }

    /// Completion stamp implied by entering this status at `now`.
    pub fn completed_at(self, now: i64) -> Option<i64> {
        match self {
            Self::Done => Some(now),
            Self::ToDo | Self::InProgress | Self::Blocked => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub id: PriorityId,
    pub name: String,
    /// Higher is more urgent.
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: TaskId,
    pub group_id: GroupId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: i64,
    pub deadline: Option<i64>,
    pub assignee_id: Option<UserId>,
    pub priority_id: Option<PriorityId>,
    /// Free text, typically comma separated.
    pub tags: Option<String>,
    pub completed_at: Option<i64>,
}

impl TaskItem {
    /// Applies a status and recomputes `completed_at` unconditionally.
    pub fn set_status(&mut self, status: TaskStatus, now: i64) {
        self.status = status;
        self.completed_at = status.completed_at(now);
    }
}

/// Editable task fields shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub deadline: Option<i64>,
    pub assignee_id: Option<UserId>,
    pub priority_id: Option<PriorityId>,
    pub tags: Option<String>,
}

impl TaskFields {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: required_text("title", &self.title, TASK_TITLE_MAX_CHARS)?,
            description: bounded_text(
                "description",
                &self.description,
                TASK_DESCRIPTION_MAX_CHARS,
            )?,
            status: self.status,
            deadline: self.deadline,
            assignee_id: self.assignee_id,
            priority_id: self.priority_id,
            tags: optional_text("tags", self.tags.as_deref(), TASK_TAGS_MAX_CHARS)?,
        })
    }
}

/// Input for creating a task inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub group_id: GroupId,
    pub fields: TaskFields,
}

/// Input for replacing every editable field of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub task_id: TaskId,
    pub fields: TaskFields,
}

/// Listing filter inside one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<UserId>,
}
