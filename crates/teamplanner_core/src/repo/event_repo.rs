//! Calendar event persistence and feed queries.
//!
//! # Invariants
//! - Feed queries return events starting at or after the window start whose
//!   end is unset or at or before the window end.
//! - Member feeds cover groups where the user is currently active.

use super::membership::impl_membership_lookup;
use super::{bool_to_int, ensure_connection_ready, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::model::event::{CalendarEvent, EventId, EventType, EventWindow};
use crate::model::group::GroupId;
use crate::model::user::UserId;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const EVENT_SELECT_SQL: &str = "SELECT
    e.id AS id,
    e.group_id AS group_id,
    e.title AS title,
    e.description AS description,
    e.start_time AS start_time,
    e.end_time AS end_time,
    e.is_all_day AS is_all_day,
    e.recurrence_rule AS recurrence_rule,
    e.time_zone AS time_zone,
    e.event_type AS event_type,
    g.name AS group_name
FROM calendar_events e
INNER JOIN team_groups g ON g.id = e.group_id";

/// Event plus the display name of its owning group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFeedRow {
    pub event: CalendarEvent,
    pub group_name: String,
}

/// Repository interface for calendar events.
pub trait EventRepository: super::membership::MembershipLookup {
    fn insert_event(&self, event: &CalendarEvent) -> RepoResult<()>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<CalendarEvent>>;
    fn update_event(&self, event: &CalendarEvent) -> RepoResult<()>;
    /// Deletes the event and its attachments.
    fn delete_event(&self, id: EventId) -> RepoResult<()>;
    /// Events of one group inside `window`, ordered by start.
    fn list_group_events(
        &self,
        group_id: GroupId,
        window: EventWindow,
    ) -> RepoResult<Vec<EventFeedRow>>;
    /// Events of every group the user is active in, ordered by start.
    fn list_events_for_member(
        &self,
        user_id: UserId,
        window: EventWindow,
    ) -> RepoResult<Vec<EventFeedRow>>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["calendar_events", "team_groups", "group_members", "file_attachments"],
        )?;
        Ok(Self { conn })
    }

    fn query_feed(
        &self,
        sql: &str,
        key: String,
        window: EventWindow,
    ) -> RepoResult<Vec<EventFeedRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params![key, window.start, window.end])?;
        let mut feed = Vec::new();
        while let Some(row) = rows.next()? {
            feed.push(EventFeedRow {
                event: parse_event_row(row)?,
                group_name: row.get("group_name")?,
            });
        }
        Ok(feed)
    }
}

impl_membership_lookup!(SqliteEventRepository);

impl EventRepository for SqliteEventRepository<'_> {
    fn insert_event(&self, event: &CalendarEvent) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO calendar_events (
                id,
                group_id,
                title,
                description,
                start_time,
                end_time,
                is_all_day,
                recurrence_rule,
                time_zone,
                event_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                event.id.to_string(),
                event.group_id.to_string(),
                event.title.as_str(),
                event.description.as_str(),
                event.start,
                event.end,
                bool_to_int(event.is_all_day),
                event.recurrence_rule.as_deref(),
                event.time_zone.as_str(),
                event_type_to_db(event.kind),
            ],
        )?;
        Ok(())
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<CalendarEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE e.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn update_event(&self, event: &CalendarEvent) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE calendar_events
             SET title = ?2,
                 description = ?3,
                 start_time = ?4,
                 end_time = ?5,
                 is_all_day = ?6,
                 recurrence_rule = ?7,
                 time_zone = ?8,
                 event_type = ?9
             WHERE id = ?1;",
            params![
                event.id.to_string(),
                event.title.as_str(),
                event.description.as_str(),
                event.start,
                event.end,
                bool_to_int(event.is_all_day),
                event.recurrence_rule.as_deref(),
                event.time_zone.as_str(),
                event_type_to_db(event.kind),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("event", event.id));
        }
        Ok(())
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM file_attachments
             WHERE entity_type = 'calendar_event'
               AND entity_id = ?1;",
            [id.to_string()],
        )?;
        let changed = tx.execute(
            "DELETE FROM calendar_events WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("event", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_group_events(
        &self,
        group_id: GroupId,
        window: EventWindow,
    ) -> RepoResult<Vec<EventFeedRow>> {
        self.query_feed(
            &format!(
                "{EVENT_SELECT_SQL}
                 WHERE e.group_id = ?1
                   AND e.start_time >= ?2
                   AND (e.end_time IS NULL OR e.end_time <= ?3)
                 ORDER BY e.start_time ASC, e.id ASC;"
            ),
            group_id.to_string(),
            window,
        )
    }

    fn list_events_for_member(
        &self,
        user_id: UserId,
        window: EventWindow,
    ) -> RepoResult<Vec<EventFeedRow>> {
        self.query_feed(
            &format!(
                "{EVENT_SELECT_SQL}
                 INNER JOIN group_members m
                    ON m.group_id = e.group_id
                   AND m.user_id = ?1
                   AND m.left_at IS NULL
                 WHERE e.start_time >= ?2
                   AND (e.end_time IS NULL OR e.end_time <= ?3)
                 ORDER BY e.start_time ASC, e.id ASC;"
            ),
            user_id.to_string(),
            window,
        )
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<CalendarEvent> {
    let id_text: String = row.get("id")?;
    let group_text: String = row.get("group_id")?;
    let type_text: String = row.get("event_type")?;
    let kind = parse_event_type(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid event type `{type_text}` in calendar_events.event_type"
        ))
    })?;

    Ok(CalendarEvent {
        id: parse_uuid(&id_text, "calendar_events.id")?,
        group_id: parse_uuid(&group_text, "calendar_events.group_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        start: row.get("start_time")?,
        end: row.get("end_time")?,
        is_all_day: parse_bool(row.get("is_all_day")?, "calendar_events.is_all_day")?,
        recurrence_rule: row.get("recurrence_rule")?,
        time_zone: row.get("time_zone")?,
        kind,
    })
}

fn event_type_to_db(kind: EventType) -> &'static str {
    match kind {
        EventType::Meeting => "meeting",
        EventType::Deadline => "deadline",
        EventType::Reminder => "reminder",
    }
}

fn parse_event_type(value: &str) -> Option<EventType> {
    match value {
        "meeting" => Some(EventType::Meeting),
        "deadline" => Some(EventType::Deadline),
        "reminder" => Some(EventType::Reminder),
        _ => None,
    }
}
