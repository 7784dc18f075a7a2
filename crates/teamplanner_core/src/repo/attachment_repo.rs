//! File attachment metadata persistence.
//!
//! Attachments reference their owner by `(entity_type, entity_id)` rather
//! than a foreign key, so owner resolution happens here.

use super::membership::impl_membership_lookup;
use super::{ensure_connection_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use crate::model::attachment::{AttachmentId, AttachmentOwner, FileAttachment};
use crate::model::group::GroupId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ATTACHMENT_SELECT_SQL: &str = "SELECT
    id,
    file_name,
    file_url,
    entity_type,
    entity_id,
    uploaded_by,
    uploaded_at,
    size_bytes
FROM file_attachments";

/// Group and optional deadline of the entity an attachment hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerContext {
    pub group_id: GroupId,
    /// Task deadline; always `None` for events.
    pub deadline: Option<i64>,
}

/// Repository interface for attachment metadata.
pub trait AttachmentRepository: super::membership::MembershipLookup {
    fn insert_attachment(&self, attachment: &FileAttachment) -> RepoResult<()>;
    fn get_attachment(&self, id: AttachmentId) -> RepoResult<Option<FileAttachment>>;
    fn delete_attachment(&self, id: AttachmentId) -> RepoResult<()>;
    /// Attachments of one owner, oldest first.
    fn list_attachments(&self, owner: AttachmentOwner) -> RepoResult<Vec<FileAttachment>>;
    /// Resolves the owning entity, or `None` when it does not exist.
    fn owner_context(&self, owner: AttachmentOwner) -> RepoResult<Option<OwnerContext>>;
}

/// SQLite-backed attachment repository.
pub struct SqliteAttachmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttachmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["file_attachments", "task_items", "calendar_events", "group_members"],
        )?;
        Ok(Self { conn })
    }
}

impl_membership_lookup!(SqliteAttachmentRepository);

impl AttachmentRepository for SqliteAttachmentRepository<'_> {
    fn insert_attachment(&self, attachment: &FileAttachment) -> RepoResult<()> {
        let size_bytes = i64::try_from(attachment.size_bytes).map_err(|_| {
            RepoError::InvalidData(format!(
                "attachment size {} does not fit storage",
                attachment.size_bytes
            ))
        })?;
        self.conn.execute(
            "INSERT INTO file_attachments (
                id,
                file_name,
                file_url,
                entity_type,
                entity_id,
                uploaded_by,
                uploaded_at,
                size_bytes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                attachment.id.to_string(),
                attachment.file_name.as_str(),
                attachment.file_url.as_str(),
                attachment.owner.entity_type(),
                attachment.owner.entity_id().to_string(),
                attachment.uploaded_by.map(|id| id.to_string()),
                attachment.uploaded_at,
                size_bytes,
            ],
        )?;
        Ok(())
    }

    fn get_attachment(&self, id: AttachmentId) -> RepoResult<Option<FileAttachment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATTACHMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attachment_row(row)?));
        }
        Ok(None)
    }

    fn delete_attachment(&self, id: AttachmentId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM file_attachments WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("attachment", id));
        }
        Ok(())
    }

    fn list_attachments(&self, owner: AttachmentOwner) -> RepoResult<Vec<FileAttachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTACHMENT_SELECT_SQL}
             WHERE entity_type = ?1
               AND entity_id = ?2
             ORDER BY uploaded_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            owner.entity_type(),
            owner.entity_id().to_string()
        ])?;
        let mut attachments = Vec::new();
        while let Some(row) = rows.next()? {
            attachments.push(parse_attachment_row(row)?);
        }
        Ok(attachments)
    }

    fn owner_context(&self, owner: AttachmentOwner) -> RepoResult<Option<OwnerContext>> {
        let row: Option<(String, Option<i64>)> = match owner {
            AttachmentOwner::TaskItem(id) => self
                .conn
                .query_row(
                    "SELECT group_id, deadline FROM task_items WHERE id = ?1;",
                    [id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?,
            AttachmentOwner::CalendarEvent(id) => self
                .conn
                .query_row(
                    "SELECT group_id, NULL FROM calendar_events WHERE id = ?1;",
                    [id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?,
        };

        row.map(|(group_text, deadline)| {
            Ok(OwnerContext {
                group_id: parse_uuid(&group_text, "owner.group_id")?,
                deadline,
            })
        })
        .transpose()
    }
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<FileAttachment> {
    let id_text: String = row.get("id")?;
    let entity_type: String = row.get("entity_type")?;
    let entity_text: String = row.get("entity_id")?;
    let entity_id = parse_uuid(&entity_text, "file_attachments.entity_id")?;
    let owner = AttachmentOwner::from_parts(&entity_type, entity_id).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid entity type `{entity_type}` in file_attachments.entity_type"
        ))
    })?;
    let size: i64 = row.get("size_bytes")?;
    let size_bytes = u64::try_from(size).map_err(|_| {
        RepoError::InvalidData(format!("negative size `{size}` in file_attachments.size_bytes"))
    })?;

    Ok(FileAttachment {
        id: parse_uuid(&id_text, "file_attachments.id")?,
        file_name: row.get("file_name")?,
        file_url: row.get("file_url")?,
        owner,
        uploaded_by: parse_optional_uuid(row.get("uploaded_by")?, "file_attachments.uploaded_by")?,
        uploaded_at: row.get("uploaded_at")?,
        size_bytes,
    })
}
