//! File attachment model.
//!
//! Bytes live in external storage; rows keep the storage URL and a
//! polymorphic owner reference.

use super::event::EventId;
use super::task::TaskId;
use super::user::UserId;
use super::{required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AttachmentId = Uuid;

pub const FILE_NAME_MAX_CHARS: usize = 255;
pub const FILE_URL_MAX_CHARS: usize = 2048;

/// Entity an attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "entity_id", rename_all = "snake_case")]
pub enum AttachmentOwner {
    TaskItem(TaskId),
    CalendarEvent(EventId),
}

impl AttachmentOwner {
    /// Stable type discriminator shared by storage and notifications.
    pub fn entity_type(self) -> &'static str {
        match self {
            Self::TaskItem(_) => "task_item",
            Self::CalendarEvent(_) => "calendar_event",
        }
    }

    pub fn entity_id(self) -> Uuid {
        match self {
            Self::TaskItem(id) | Self::CalendarEvent(id) => id,
        }
    }

    pub fn from_parts(entity_type: &str, entity_id: Uuid) -> Option<Self> {
        match entity_type {
            "task_item" => Some(Self::TaskItem(entity_id)),
            "calendar_event" => Some(Self::CalendarEvent(entity_id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: AttachmentId,
    pub file_name: String,
    pub file_url: String,
    pub owner: AttachmentOwner,
    pub uploaded_by: Option<UserId>,
    pub uploaded_at: i64,
    pub size_bytes: u64,
}

/// Metadata of a file already written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub file_url: String,
    pub size_bytes: u64,
}

impl AttachmentUpload {
    /// Validates names and enforces the byte ceiling.
    pub fn validated(&self, max_bytes: u64) -> Result<Self, ValidationError> {
        check_file_size(self.size_bytes, max_bytes)?;
        Ok(Self {
            file_name: required_text("file_name", &self.file_name, FILE_NAME_MAX_CHARS)?,
            file_url: required_text("file_url", &self.file_url, FILE_URL_MAX_CHARS)?,
            size_bytes: self.size_bytes,
        })
    }
}

/// Rejects uploads above `max_bytes`.
pub fn check_file_size(size_bytes: u64, max_bytes: u64) -> Result<(), ValidationError> {
    if size_bytes > max_bytes {
        return Err(ValidationError::FileTooLarge {
            max_bytes,
            actual_bytes: size_bytes,
        });
    }
    Ok(())
}
