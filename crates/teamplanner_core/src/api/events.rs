//! Calendar event pages and the calendar feed.
//!
//! Feed items follow the calendar widget shape: camelCase keys, RFC 3339
//! times rendered in the event's own time zone, and per-event details under
//! `extendedProps`.

use super::{run, RequestOutcome};
use crate::config::CoreConfig;
use crate::model::attachment::{AttachmentUpload, FileAttachment};
use crate::model::event::{CalendarEvent, EventDraft, EventId, EventUpdate, EventWindow};
use crate::model::group::GroupId;
use crate::model::user::UserId;
use crate::repo::attachment_repo::SqliteAttachmentRepository;
use crate::repo::event_repo::{EventFeedRow, SqliteEventRepository};
use crate::repo::notification_repo::SqliteNotificationStore;
use crate::repo::RepoResult;
use crate::service::attachment_service::AttachmentService;
use crate::service::event_service::EventService;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

type SqliteEventService<'conn> =
    EventService<SqliteEventRepository<'conn>, SqliteNotificationStore<'conn>>;

/// One entry of a calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarFeedItem {
    pub id: Uuid,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub all_day: bool,
    pub rrule: Option<String>,
    pub extended_props: FeedItemProps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemProps {
    /// `Meeting`, `Deadline` or `Reminder`.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub time_zone: String,
    pub group_name: String,
}

impl From<EventFeedRow> for CalendarFeedItem {
    fn from(row: EventFeedRow) -> Self {
        let EventFeedRow { event, group_name } = row;
        let zone = event.time_zone.parse::<Tz>().ok();
        Self {
            id: event.id,
            start: render_time(event.start, zone),
            end: event.end.map(|end| render_time(end, zone)),
            title: event.title,
            all_day: event.is_all_day,
            rrule: event.recurrence_rule,
            extended_props: FeedItemProps {
                kind: event.kind.label().to_string(),
                description: event.description,
                time_zone: event.time_zone,
                group_name,
            },
        }
    }
}

/// RFC 3339 in the given zone, UTC when the zone is unknown.
fn render_time(epoch_ms: i64, zone: Option<Tz>) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(epoch_ms) else {
        return epoch_ms.to_string();
    };
    match zone {
        Some(zone) => utc
            .with_timezone(&zone)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
        None => utc.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// Serializes feed items as a JSON array.
pub fn feed_json(items: &[CalendarFeedItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Controller for `/CalendarEvents` style endpoints.
pub struct CalendarEventsController<'conn> {
    conn: &'conn Connection,
    config: &'conn CoreConfig,
}

impl<'conn> CalendarEventsController<'conn> {
    pub fn new(conn: &'conn Connection, config: &'conn CoreConfig) -> Self {
        Self { conn, config }
    }

    pub fn create(&self, draft: &EventDraft, user_id: UserId) -> RequestOutcome<CalendarEvent> {
        run(
            "api_event_create",
            || self.events(),
            |service| service.create_event(draft, user_id),
        )
    }

    pub fn edit(&self, update: &EventUpdate, user_id: UserId) -> RequestOutcome<CalendarEvent> {
        run(
            "api_event_edit",
            || self.events(),
            |service| service.update_event(update, user_id),
        )
    }

    pub fn details(&self, event_id: EventId, user_id: UserId) -> RequestOutcome<CalendarEvent> {
        run(
            "api_event_details",
            || self.events(),
            |service| service.get_event(event_id, user_id),
        )
    }

    /// Drag-and-drop move from the calendar view.
    pub fn update_event_time(
        &self,
        event_id: EventId,
        start: i64,
        end: Option<i64>,
        user_id: UserId,
    ) -> RequestOutcome<CalendarEvent> {
        run(
            "api_event_move",
            || self.events(),
            |service| service.reschedule_event(event_id, start, end, user_id),
        )
    }

    pub fn delete(&self, event_id: EventId, user_id: UserId) -> RequestOutcome<()> {
        run(
            "api_event_delete",
            || self.events(),
            |service| service.delete_event(event_id, user_id),
        )
    }

    /// Feed of one group.
    pub fn get_events(
        &self,
        group_id: GroupId,
        window: EventWindow,
        user_id: UserId,
    ) -> RequestOutcome<Vec<CalendarFeedItem>> {
        run(
            "api_event_feed_group",
            || self.events(),
            |service| service.group_feed(group_id, window, user_id),
        )
        .map(|rows| rows.into_iter().map(CalendarFeedItem::from).collect())
    }

    /// Feed across every group of the caller.
    pub fn get_all_events(
        &self,
        window: EventWindow,
        user_id: UserId,
    ) -> RequestOutcome<Vec<CalendarFeedItem>> {
        run(
            "api_event_feed_user",
            || self.events(),
            |service| service.user_feed(window, user_id),
        )
        .map(|rows| rows.into_iter().map(CalendarFeedItem::from).collect())
    }

    pub fn upload_attachment(
        &self,
        event_id: EventId,
        upload: &AttachmentUpload,
        user_id: UserId,
    ) -> RequestOutcome<FileAttachment> {
        run(
            "api_event_attachment_upload",
            || {
                let repo = SqliteAttachmentRepository::try_new(self.conn)?;
                Ok(AttachmentService::new(repo, self.config.attachment_max_bytes))
            },
            |service| service.attach_to_event(event_id, upload, user_id),
        )
    }

    fn events(&self) -> RepoResult<SqliteEventService<'conn>> {
        let repo = SqliteEventRepository::try_new(self.conn)?;
        let notifier = SqliteNotificationStore::try_new(self.conn)?;
        Ok(EventService::new(repo, notifier))
    }
}

#[cfg(test)]
mod tests {
    use super::{feed_json, render_time, CalendarFeedItem};
    use crate::model::event::{CalendarEvent, EventType};
    use crate::repo::event_repo::EventFeedRow;
    use chrono_tz::Tz;
    use uuid::Uuid;

    // 2030-01-01T00:00:00Z
    const JAN_2030: i64 = 1_893_456_000_000;

    #[test]
    fn times_render_in_event_zone() {
        let zone: Tz = "Asia/Ho_Chi_Minh".parse().unwrap();
        assert_eq!(render_time(JAN_2030, Some(zone)), "2030-01-01T07:00:00+07:00");
        assert_eq!(render_time(JAN_2030, None), "2030-01-01T00:00:00Z");
    }

    #[test]
    fn feed_item_uses_calendar_widget_keys() {
        let row = EventFeedRow {
            event: CalendarEvent {
                id: Uuid::new_v4(),
                group_id: Uuid::new_v4(),
                title: "Standup".to_string(),
                description: "Daily".to_string(),
                start: JAN_2030,
                end: None,
                is_all_day: false,
                recurrence_rule: Some("FREQ=DAILY".to_string()),
                time_zone: "UTC".to_string(),
                kind: EventType::Meeting,
            },
            group_name: "Alpha".to_string(),
        };
        let json = feed_json(&[CalendarFeedItem::from(row)]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let item = &value[0];
        assert_eq!(item["allDay"], false);
        assert!(item["end"].is_null());
        assert_eq!(item["rrule"], "FREQ=DAILY");
        assert_eq!(item["extendedProps"]["type"], "Meeting");
        assert_eq!(item["extendedProps"]["timeZone"], "UTC");
        assert_eq!(item["extendedProps"]["groupName"], "Alpha");
    }
}
