//! Task item and priority persistence.
//!
//! # Invariants
//! - `completed_at` is written from the status on every write path, so a
//!   stored row is `done` exactly when it carries a completion stamp.
//! - Deleting a task removes its attachments in the same transaction.

use super::membership::impl_membership_lookup;
use super::{
    ensure_connection_ready, parse_optional_uuid, parse_uuid, unique_conflict, RepoError,
    RepoResult,
};
use crate::model::group::GroupId;
use crate::model::task::{Priority, PriorityId, TaskFilter, TaskId, TaskItem, TaskStatus};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    group_id,
    title,
    description,
    status,
    created_at,
    deadline,
    assignee_id,
    priority_id,
    tags,
    completed_at
FROM task_items";

/// Repository interface for tasks and the priority lookup table.
pub trait TaskRepository: super::membership::MembershipLookup {
    fn insert_task(&self, task: &TaskItem) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<TaskItem>>;
    /// Overwrites every mutable column of an existing task.
    fn update_task(&self, task: &TaskItem) -> RepoResult<()>;
    /// Deletes the task and its attachments.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Tasks of one group, newest first.
    fn list_tasks(&self, group_id: GroupId, filter: &TaskFilter) -> RepoResult<Vec<TaskItem>>;
    fn priority_exists(&self, id: PriorityId) -> RepoResult<bool>;
    fn insert_priority(&self, name: &str, level: i64) -> RepoResult<Priority>;
    /// Priorities ordered by level, then name.
    fn list_priorities(&self) -> RepoResult<Vec<Priority>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["task_items", "priorities", "group_members", "file_attachments"],
        )?;
        Ok(Self { conn })
    }
}

impl_membership_lookup!(SqliteTaskRepository);

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, task: &TaskItem) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO task_items (
                id,
                group_id,
                title,
                description,
                status,
                created_at,
                deadline,
                assignee_id,
                priority_id,
                tags,
                completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                task.id.to_string(),
                task.group_id.to_string(),
                task.title.as_str(),
                task.description.as_str(),
                status_to_db(task.status),
                task.created_at,
                task.deadline,
                task.assignee_id.map(|id| id.to_string()),
                task.priority_id,
                task.tags.as_deref(),
                task.completed_at,
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<TaskItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn update_task(&self, task: &TaskItem) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE task_items
             SET title = ?2,
                 description = ?3,
                 status = ?4,
                 deadline = ?5,
                 assignee_id = ?6,
                 priority_id = ?7,
                 tags = ?8,
                 completed_at = ?9
             WHERE id = ?1;",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_str(),
                status_to_db(task.status),
                task.deadline,
                task.assignee_id.map(|id| id.to_string()),
                task.priority_id,
                task.tags.as_deref(),
                task.completed_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("task", task.id));
        }
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM file_attachments
             WHERE entity_type = 'task_item'
               AND entity_id = ?1;",
            [id.to_string()],
        )?;
        let changed = tx.execute("DELETE FROM task_items WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("task", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_tasks(&self, group_id: GroupId, filter: &TaskFilter) -> RepoResult<Vec<TaskItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE group_id = ?1
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR assignee_id = ?3)
             ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            group_id.to_string(),
            filter.status.map(status_to_db),
            filter.assignee_id.map(|id| id.to_string()),
        ])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn priority_exists(&self, id: PriorityId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM priorities WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_priority(&self, name: &str, level: i64) -> RepoResult<Priority> {
        self.conn
            .execute(
                "INSERT INTO priorities (name, level) VALUES (?1, ?2);",
                params![name, level],
            )
            .map_err(|err| unique_conflict(err, "priorities.name"))?;
        Ok(Priority {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            level,
        })
    }

    fn list_priorities(&self) -> RepoResult<Vec<Priority>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, level
             FROM priorities
             ORDER BY level ASC, name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut priorities = Vec::new();
        while let Some(row) = rows.next()? {
            priorities.push(Priority {
                id: row.get(0)?,
                name: row.get(1)?,
                level: row.get(2)?,
            });
        }
        Ok(priorities)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<TaskItem> {
    let id_text: String = row.get("id")?;
    let group_text: String = row.get("group_id")?;
    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in task_items.status"))
    })?;

    Ok(TaskItem {
        id: parse_uuid(&id_text, "task_items.id")?,
        group_id: parse_uuid(&group_text, "task_items.group_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        created_at: row.get("created_at")?,
        deadline: row.get("deadline")?,
        assignee_id: parse_optional_uuid(row.get("assignee_id")?, "task_items.assignee_id")?,
        priority_id: row.get("priority_id")?,
        tags: row.get("tags")?,
        completed_at: row.get("completed_at")?,
    })
}

fn status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ToDo => "todo",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Done => "done",
        TaskStatus::Blocked => "blocked",
    }
}

fn parse_status(value: &str) -> Option<TaskStatus> {
    match value {
        "todo" => Some(TaskStatus::ToDo),
        "in_progress" => Some(TaskStatus::InProgress),
        "done" => Some(TaskStatus::Done),
        "blocked" => Some(TaskStatus::Blocked),
        _ => None,
    }
}
