//! Calendar event model.
//!
//! # Invariants
//! - `end`, when set, is strictly after `start`.
//! - `time_zone` is an IANA identifier and `recurrence_rule` parses as an
//!   iCalendar RRULE; both are checked by the event service, not here.

use super::group::GroupId;
use super::{bounded_text, optional_text, required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EventId = Uuid;

pub const EVENT_TITLE_MAX_CHARS: usize = 200;
pub const EVENT_DESCRIPTION_MAX_CHARS: usize = 1000;
pub const RECURRENCE_RULE_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    Meeting,
    Deadline,
    Reminder,
}

impl EventType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Meeting => "Meeting",
            Self::Deadline => "Deadline",
            Self::Reminder => "Reminder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub group_id: GroupId,
    pub title: String,
    pub description: String,
    pub start: i64,
    pub end: Option<i64>,
    pub is_all_day: bool,
    pub recurrence_rule: Option<String>,
    pub time_zone: String,
    pub kind: EventType,
}

/// Editable event fields shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub title: String,
    pub description: String,
    pub start: i64,
    pub end: Option<i64>,
    pub is_all_day: bool,
    pub recurrence_rule: Option<String>,
    pub time_zone: String,
    pub kind: EventType,
}

impl EventFields {
    pub fn new(title: impl Into<String>, start: i64, time_zone: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start,
            end: None,
            is_all_day: false,
            recurrence_rule: None,
            time_zone: time_zone.into(),
            kind: EventType::Meeting,
        }
    }

    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: required_text("title", &self.title, EVENT_TITLE_MAX_CHARS)?,
            description: bounded_text(
                "description",
                &self.description,
                EVENT_DESCRIPTION_MAX_CHARS,
            )?,
            start: self.start,
            end: self.end,
            is_all_day: self.is_all_day,
            recurrence_rule: optional_text(
                "recurrence_rule",
                self.recurrence_rule.as_deref(),
                RECURRENCE_RULE_MAX_CHARS,
            )?,
            time_zone: required_text("time_zone", &self.time_zone, 64)?,
            kind: self.kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub group_id: GroupId,
    pub fields: EventFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUpdate {
    pub event_id: EventId,
    pub fields: EventFields,
}

/// Inclusive feed window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: i64,
    pub end: i64,
}

impl EventWindow {
    /// Event starts at or after the window start and, when it has an end,
    /// finishes by the window end.
    pub fn contains(&self, event: &CalendarEvent) -> bool {
        event.start >= self.start && event.end.map_or(true, |end| end <= self.end)
    }
}
