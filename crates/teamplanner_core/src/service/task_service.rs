//! Task use-case service.
//!
//! # Responsibility
//! - Create, edit, re-status and delete task items inside a group.
//! - Keep assignment and priority references valid.
//!
//! # Invariants
//! - Only active members create tasks; only the assignee or an admin edits.
//! - Assignees are active members of the task's group.
//! - `completed_at` is set exactly when status is `Done`.

use crate::model::group::GroupId;
use crate::model::notification::{NewNotification, NotificationKind};
use crate::model::task::{
    Priority, TaskDraft, TaskFields, TaskFilter, TaskId, TaskItem, TaskStatus, TaskUpdate,
};
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, required_text};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use crate::service::access::{self, require_member};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::notification::{deliver, NotificationSink};
use log::info;
use uuid::Uuid;

const MODULE: &str = "task";
const PRIORITY_NAME_MAX_CHARS: usize = 50;

/// Task service facade over repository and notification implementations.
pub struct TaskService<R: TaskRepository, N: NotificationSink> {
    repo: R,
    notifier: N,
}

impl<R: TaskRepository, N: NotificationSink> TaskService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    /// Creates a task in a group the caller belongs to.
    pub fn create_task(&self, draft: &TaskDraft, user_id: UserId) -> ServiceResult<TaskItem> {
        let fields = draft.fields.validated()?;
        require_member(&self.repo, draft.group_id, user_id)?;
        self.check_references(draft.group_id, &fields)?;

        let now = now_epoch_ms();
        let task = TaskItem {
            id: Uuid::new_v4(),
            group_id: draft.group_id,
            title: fields.title,
            description: fields.description,
            status: fields.status,
            created_at: now,
            deadline: fields.deadline,
            assignee_id: fields.assignee_id,
            priority_id: fields.priority_id,
            tags: fields.tags,
            completed_at: fields.status.completed_at(now),
        };
        self.repo.insert_task(&task)?;

        info!(
            "event=task_create module={MODULE} status=ok task_id={} group_id={}",
            task.id, task.group_id
        );
        if let Some(assignee) = task.assignee_id.filter(|id| *id != user_id) {
            deliver(&self.notifier, MODULE, [assigned_notice(assignee, &task)]);
        }
        Ok(task)
    }

    /// Replaces every editable field of a task.
    pub fn update_task(&self, update: &TaskUpdate, user_id: UserId) -> ServiceResult<TaskItem> {
        let fields = update.fields.validated()?;
        let mut task = self.load_task(update.task_id)?;
        self.require_editor(&task, user_id)?;
        self.check_references(task.group_id, &fields)?;

        let previous_assignee = task.assignee_id;
        task.title = fields.title;
        task.description = fields.description;
        task.deadline = fields.deadline;
        task.assignee_id = fields.assignee_id;
        task.priority_id = fields.priority_id;
        task.tags = fields.tags;
        task.set_status(fields.status, now_epoch_ms());
        self.repo.update_task(&task)?;

        info!(
            "event=task_update module={MODULE} status=ok task_id={}",
            task.id
        );
        if let Some(assignee) = task
            .assignee_id
            .filter(|id| Some(*id) != previous_assignee && *id != user_id)
        {
            deliver(&self.notifier, MODULE, [assigned_notice(assignee, &task)]);
        }
        Ok(task)
    }

    /// Moves a task to `status`; any transition is allowed.
    pub fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        user_id: UserId,
    ) -> ServiceResult<TaskItem> {
        let mut task = self.load_task(task_id)?;
        self.require_editor(&task, user_id)?;

        task.set_status(status, now_epoch_ms());
        self.repo.update_task(&task)?;

        info!(
            "event=task_status module={MODULE} status=ok task_id={task_id} task_status={}",
            status.label()
        );
        if let Some(assignee) = task.assignee_id.filter(|id| *id != user_id) {
            deliver(
                &self.notifier,
                MODULE,
                [NewNotification::new(
                    assignee,
                    NotificationKind::TaskStatusChanged,
                    format!("Task {} is now {}.", task.title, status.label()),
                )
                .about("task_item", task.id)],
            );
        }
        Ok(task)
    }

    /// Deletes a task and its attachments.
    pub fn delete_task(&self, task_id: TaskId, user_id: UserId) -> ServiceResult<()> {
        let task = self.load_task(task_id)?;
        self.require_editor(&task, user_id)?;
        self.repo.delete_task(task_id)?;
        info!("event=task_delete module={MODULE} status=ok task_id={task_id}");
        Ok(())
    }

    /// Whether the caller is an active member of the task's group; `false`
    /// for unknown tasks.
    pub fn can_access_task(&self, task_id: TaskId, user_id: UserId) -> ServiceResult<bool> {
        match self.repo.get_task(task_id)? {
            Some(task) => Ok(access::can_access(&self.repo, task.group_id, user_id)?),
            None => Ok(false),
        }
    }

    pub fn get_task(&self, task_id: TaskId, user_id: UserId) -> ServiceResult<TaskItem> {
        let task = self.load_task(task_id)?;
        require_member(&self.repo, task.group_id, user_id)?;
        Ok(task)
    }

    /// Tasks of a group, newest first, narrowed by `filter`.
    pub fn list_tasks(
        &self,
        group_id: GroupId,
        filter: &TaskFilter,
        user_id: UserId,
    ) -> ServiceResult<Vec<TaskItem>> {
        require_member(&self.repo, group_id, user_id)?;
        Ok(self.repo.list_tasks(group_id, filter)?)
    }

    pub fn create_priority(&self, name: &str, level: i64) -> ServiceResult<Priority> {
        let name = required_text("name", name, PRIORITY_NAME_MAX_CHARS)?;
        self.repo
            .insert_priority(&name, level)
            .map_err(|err| match err {
                RepoError::Conflict(_) => ServiceError::DuplicatePriorityName(name),
                other => other.into(),
            })
    }

    pub fn list_priorities(&self) -> ServiceResult<Vec<Priority>> {
        Ok(self.repo.list_priorities()?)
    }

    fn load_task(&self, task_id: TaskId) -> ServiceResult<TaskItem> {
        self.repo
            .get_task(task_id)?
            .ok_or(ServiceError::TaskNotFound(task_id))
    }

    /// Assignee or active admin of the owning group.
    fn require_editor(&self, task: &TaskItem, user_id: UserId) -> ServiceResult<()> {
        let is_assignee = task.assignee_id == Some(user_id)
            && access::can_access(&self.repo, task.group_id, user_id)?;
        if is_assignee || access::is_admin(&self.repo, task.group_id, user_id)? {
            return Ok(());
        }
        Err(ServiceError::NotTaskEditor(task.id))
    }

    fn check_references(&self, group_id: GroupId, fields: &TaskFields) -> ServiceResult<()> {
        if let Some(assignee) = fields.assignee_id {
            if !access::can_access(&self.repo, group_id, assignee)? {
                return Err(ServiceError::AssigneeNotMember(assignee));
            }
        }
        if let Some(priority_id) = fields.priority_id {
            if !self.repo.priority_exists(priority_id)? {
                return Err(ServiceError::PriorityNotFound(priority_id));
            }
        }
        Ok(())
    }
}

fn assigned_notice(user_id: UserId, task: &TaskItem) -> NewNotification {
    NewNotification::new(
        user_id,
        NotificationKind::TaskAssigned,
        format!("You were assigned to task {}.", task.title),
    )
    .about("task_item", task.id)
}
