//! Persisted in-app notifications.
//!
//! The store doubles as the default [`NotificationSink`]: delivering a
//! notice means inserting an unread row for the recipient.

use super::{bool_to_int, ensure_connection_ready, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::model::notification::{NewNotification, Notification, NotificationId, NotificationKind};
use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::service::notification::{NotificationSink, NotifyError};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// SQLite-backed notification store.
pub struct SqliteNotificationStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["notifications"])?;
        Ok(Self { conn })
    }

    /// Inserts one unread notification and returns the stored row.
    pub fn insert(&self, notice: &NewNotification) -> RepoResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: notice.user_id,
            message: notice.message.clone(),
            kind: notice.kind,
            related_entity_id: notice.related_entity_id.clone(),
            related_entity_type: notice.related_entity_type.clone(),
            created_at: now_epoch_ms(),
            is_read: false,
        };
        self.conn.execute(
            "INSERT INTO notifications (
                id,
                user_id,
                message,
                kind,
                related_entity_id,
                related_entity_type,
                created_at,
                is_read
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                notification.id.to_string(),
                notification.user_id.to_string(),
                notification.message.as_str(),
                notification.kind.as_str(),
                notification.related_entity_id.as_deref(),
                notification.related_entity_type.as_deref(),
                notification.created_at,
                bool_to_int(notification.is_read),
            ],
        )?;
        Ok(notification)
    }

    /// Notifications of one user, newest first.
    pub fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                user_id,
                message,
                kind,
                related_entity_id,
                related_entity_type,
                created_at,
                is_read
             FROM notifications
             WHERE user_id = ?1
               AND (?2 = 0 OR is_read = 0)
             ORDER BY created_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query(params![user_id.to_string(), bool_to_int(unread_only)])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    /// Marks a notification read; only its recipient may do so.
    pub fn mark_read(&self, id: NotificationId, user_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications
             SET is_read = 1
             WHERE id = ?1
               AND user_id = ?2;",
            params![id.to_string(), user_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("notification", id));
        }
        Ok(())
    }
}

impl NotificationSink for SqliteNotificationStore<'_> {
    fn create_notification(&self, notice: &NewNotification) -> Result<(), NotifyError> {
        self.insert(notice)?;
        Ok(())
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let id_text: String = row.get("id")?;
    let user_text: String = row.get("user_id")?;
    let kind_text: String = row.get("kind")?;
    let kind = NotificationKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid kind `{kind_text}` in notifications.kind"))
    })?;

    Ok(Notification {
        id: parse_uuid(&id_text, "notifications.id")?,
        user_id: parse_uuid(&user_text, "notifications.user_id")?,
        message: row.get("message")?,
        kind,
        related_entity_id: row.get("related_entity_id")?,
        related_entity_type: row.get("related_entity_type")?,
        created_at: row.get("created_at")?,
        is_read: parse_bool(row.get("is_read")?, "notifications.is_read")?,
    })
}
