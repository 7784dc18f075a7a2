//! Calendar event use-case service.
//!
//! # Responsibility
//! - Schedule, edit, move and delete group events.
//! - Serve per-group and per-user calendar feeds.
//!
//! # Invariants
//! - New events start in the future; `end`, when set, is after `start`.
//! - Time zones are IANA ids; recurrence rules parse with the event start
//!   as DTSTART.
//! - Members schedule events; only admins change or remove them.

use crate::model::event::{
    CalendarEvent, EventDraft, EventFields, EventId, EventUpdate, EventWindow,
};
use crate::model::group::GroupId;
use crate::model::notification::{NewNotification, NotificationKind};
use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::repo::event_repo::{EventFeedRow, EventRepository};
use crate::service::access::{self, require_admin, require_member};
use crate::service::calendar_rules::{
    validate_recurrence_rule, validate_schedule, validate_time_zone,
};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::notification::{deliver, NotificationSink};
use log::info;
use uuid::Uuid;

const MODULE: &str = "event";

/// Event service facade over repository and notification implementations.
pub struct EventService<R: EventRepository, N: NotificationSink> {
    repo: R,
    notifier: N,
}

impl<R: EventRepository, N: NotificationSink> EventService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    /// Schedules an event and notifies the other active members.
    pub fn create_event(
        &self,
        draft: &EventDraft,
        user_id: UserId,
    ) -> ServiceResult<CalendarEvent> {
        let fields = draft.fields.validated()?;
        require_member(&self.repo, draft.group_id, user_id)?;
        check_fields(&fields, now_epoch_ms())?;

        let event = from_fields(Uuid::new_v4(), draft.group_id, fields);
        self.repo.insert_event(&event)?;

        info!(
            "event=event_create module={MODULE} status=ok event_id={} group_id={}",
            event.id, event.group_id
        );
        let recipients: Vec<UserId> = self
            .repo
            .active_member_ids(event.group_id)?
            .into_iter()
            .filter(|id| *id != user_id)
            .collect();
        deliver(
            &self.notifier,
            MODULE,
            recipients.into_iter().map(|id| {
                NewNotification::new(
                    id,
                    NotificationKind::EventScheduled,
                    format!("New {} scheduled: {}.", event.kind.label(), event.title),
                )
                .about("calendar_event", event.id)
            }),
        );
        Ok(event)
    }

    /// Replaces every editable field of an event.
    pub fn update_event(
        &self,
        update: &EventUpdate,
        user_id: UserId,
    ) -> ServiceResult<CalendarEvent> {
        let fields = update.fields.validated()?;
        let existing = self.load_event(update.event_id)?;
        require_admin(&self.repo, existing.group_id, user_id)?;
        check_fields(&fields, now_epoch_ms())?;

        let event = from_fields(existing.id, existing.group_id, fields);
        self.repo.update_event(&event)?;
        info!(
            "event=event_update module={MODULE} status=ok event_id={}",
            event.id
        );
        Ok(event)
    }

    /// Moves an event to a new time range, keeping everything else.
    pub fn reschedule_event(
        &self,
        event_id: EventId,
        start: i64,
        end: Option<i64>,
        user_id: UserId,
    ) -> ServiceResult<CalendarEvent> {
        let mut event = self.load_event(event_id)?;
        require_admin(&self.repo, event.group_id, user_id)?;
        validate_schedule(start, end, now_epoch_ms(), false)?;
        if let Some(rule) = event.recurrence_rule.as_deref() {
            let zone = validate_time_zone(&event.time_zone)?;
            validate_recurrence_rule(rule, start, zone)?;
        }

        event.start = start;
        event.end = end;
        self.repo.update_event(&event)?;
        info!("event=event_move module={MODULE} status=ok event_id={event_id}");
        Ok(event)
    }

    /// Deletes an event and its attachments.
    pub fn delete_event(&self, event_id: EventId, user_id: UserId) -> ServiceResult<()> {
        let event = self.load_event(event_id)?;
        require_admin(&self.repo, event.group_id, user_id)?;
        self.repo.delete_event(event_id)?;
        info!("event=event_delete module={MODULE} status=ok event_id={event_id}");
        Ok(())
    }

    /// Whether the caller is an active member of the event's group; `false`
    /// for unknown events.
    pub fn can_access_event(&self, event_id: EventId, user_id: UserId) -> ServiceResult<bool> {
        match self.repo.get_event(event_id)? {
            Some(event) => Ok(access::can_access(&self.repo, event.group_id, user_id)?),
            None => Ok(false),
        }
    }

    pub fn get_event(&self, event_id: EventId, user_id: UserId) -> ServiceResult<CalendarEvent> {
        let event = self.load_event(event_id)?;
        require_member(&self.repo, event.group_id, user_id)?;
        Ok(event)
    }

    /// Events of one group inside the window.
    pub fn group_feed(
        &self,
        group_id: GroupId,
        window: EventWindow,
        user_id: UserId,
    ) -> ServiceResult<Vec<EventFeedRow>> {
        require_member(&self.repo, group_id, user_id)?;
        Ok(self.repo.list_group_events(group_id, window)?)
    }

    /// Events across every group the caller is active in. Titles carry the
    /// group name as a ` (Group)` suffix.
    pub fn user_feed(
        &self,
        window: EventWindow,
        user_id: UserId,
    ) -> ServiceResult<Vec<EventFeedRow>> {
        let mut rows = self.repo.list_events_for_member(user_id, window)?;
        for row in &mut rows {
            row.event.title = format!("{} ({})", row.event.title, row.group_name);
        }
        Ok(rows)
    }

    fn load_event(&self, event_id: EventId) -> ServiceResult<CalendarEvent> {
        self.repo
            .get_event(event_id)?
            .ok_or(ServiceError::EventNotFound(event_id))
    }
}

fn check_fields(fields: &EventFields, now: i64) -> ServiceResult<()> {
    validate_schedule(fields.start, fields.end, now, true)?;
    let zone = validate_time_zone(&fields.time_zone)?;
    if let Some(rule) = fields.recurrence_rule.as_deref() {
        validate_recurrence_rule(rule, fields.start, zone)?;
    }
    Ok(())
}

fn from_fields(id: EventId, group_id: GroupId, fields: EventFields) -> CalendarEvent {
    CalendarEvent {
        id,
        group_id,
        title: fields.title,
        description: fields.description,
        start: fields.start,
        end: fields.end,
        is_all_day: fields.is_all_day,
        recurrence_rule: fields.recurrence_rule,
        time_zone: fields.time_zone,
        kind: fields.kind,
    }
}
