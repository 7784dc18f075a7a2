//! Task item pages and task attachments.

use super::{run, RequestOutcome};
use crate::config::CoreConfig;
use crate::model::attachment::{AttachmentId, AttachmentOwner, AttachmentUpload, FileAttachment};
use crate::model::group::GroupId;
use crate::model::task::{
    Priority, TaskDraft, TaskFilter, TaskId, TaskItem, TaskStatus, TaskUpdate,
};
use crate::model::user::UserId;
use crate::repo::attachment_repo::SqliteAttachmentRepository;
use crate::repo::notification_repo::SqliteNotificationStore;
use crate::repo::task_repo::SqliteTaskRepository;
use crate::repo::RepoResult;
use crate::service::attachment_service::AttachmentService;
use crate::service::task_service::TaskService;
use rusqlite::Connection;
use serde::Serialize;

type SqliteTaskService<'conn> =
    TaskService<SqliteTaskRepository<'conn>, SqliteNotificationStore<'conn>>;

/// Task with its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDetails {
    pub task: TaskItem,
    pub attachments: Vec<FileAttachment>,
}

/// Controller for `/TaskItems` style endpoints.
pub struct TaskItemsController<'conn> {
    conn: &'conn Connection,
    config: &'conn CoreConfig,
}

impl<'conn> TaskItemsController<'conn> {
    pub fn new(conn: &'conn Connection, config: &'conn CoreConfig) -> Self {
        Self { conn, config }
    }

    pub fn create(&self, draft: &TaskDraft, user_id: UserId) -> RequestOutcome<TaskItem> {
        run(
            "api_task_create",
            || self.tasks(),
            |service| service.create_task(draft, user_id),
        )
    }

    pub fn edit(&self, update: &TaskUpdate, user_id: UserId) -> RequestOutcome<TaskItem> {
        run(
            "api_task_edit",
            || self.tasks(),
            |service| service.update_task(update, user_id),
        )
    }

    pub fn update_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        user_id: UserId,
    ) -> RequestOutcome<TaskItem> {
        run(
            "api_task_status",
            || self.tasks(),
            |service| service.update_task_status(task_id, status, user_id),
        )
    }

    pub fn delete(&self, task_id: TaskId, user_id: UserId) -> RequestOutcome<()> {
        run(
            "api_task_delete",
            || self.tasks(),
            |service| service.delete_task(task_id, user_id),
        )
    }

    pub fn details(&self, task_id: TaskId, user_id: UserId) -> RequestOutcome<TaskDetails> {
        run(
            "api_task_details",
            || Ok((self.tasks()?, self.attachments()?)),
            |(tasks, attachments)| {
                let task = tasks.get_task(task_id, user_id)?;
                let attachments =
                    attachments.list_attachments(AttachmentOwner::TaskItem(task.id), user_id)?;
                Ok(TaskDetails { task, attachments })
            },
        )
    }

    /// Tasks of one group, newest first.
    pub fn index(
        &self,
        group_id: GroupId,
        filter: &TaskFilter,
        user_id: UserId,
    ) -> RequestOutcome<Vec<TaskItem>> {
        run(
            "api_task_index",
            || self.tasks(),
            |service| service.list_tasks(group_id, filter, user_id),
        )
    }

    pub fn priorities(&self) -> RequestOutcome<Vec<Priority>> {
        run(
            "api_task_priorities",
            || self.tasks(),
            |service| service.list_priorities(),
        )
    }

    pub fn upload_attachment(
        &self,
        task_id: TaskId,
        upload: &AttachmentUpload,
        user_id: UserId,
    ) -> RequestOutcome<FileAttachment> {
        run(
            "api_task_attachment_upload",
            || self.attachments(),
            |service| service.attach_to_task(task_id, upload, user_id),
        )
    }

    /// Deletes an attachment and returns its storage URL.
    pub fn delete_attachment(
        &self,
        attachment_id: AttachmentId,
        user_id: UserId,
    ) -> RequestOutcome<String> {
        run(
            "api_task_attachment_delete",
            || self.attachments(),
            |service| service.delete_attachment(attachment_id, user_id),
        )
    }

    fn tasks(&self) -> RepoResult<SqliteTaskService<'conn>> {
        let repo = SqliteTaskRepository::try_new(self.conn)?;
        let notifier = SqliteNotificationStore::try_new(self.conn)?;
        Ok(TaskService::new(repo, notifier))
    }

    fn attachments(&self) -> RepoResult<AttachmentService<SqliteAttachmentRepository<'conn>>> {
        let repo = SqliteAttachmentRepository::try_new(self.conn)?;
        Ok(AttachmentService::new(repo, self.config.attachment_max_bytes))
    }
}
