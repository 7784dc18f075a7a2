//! Attachment metadata service.
//!
//! The core never touches file bytes: callers store the upload elsewhere and
//! register its URL and size here. Deleting returns the URL so the caller
//! can drop the stored bytes.

use crate::model::attachment::{
    AttachmentId, AttachmentOwner, AttachmentUpload, FileAttachment,
};
use crate::model::event::EventId;
use crate::model::now_epoch_ms;
use crate::model::task::TaskId;
use crate::model::user::UserId;
use crate::repo::attachment_repo::{AttachmentRepository, OwnerContext};
use crate::service::access::{self, require_member};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

const MODULE: &str = "attachment";

/// Attachment service facade over a repository implementation.
pub struct AttachmentService<R: AttachmentRepository> {
    repo: R,
    max_bytes: u64,
}

impl<R: AttachmentRepository> AttachmentService<R> {
    /// Creates a service accepting files up to `max_bytes`.
    pub fn new(repo: R, max_bytes: u64) -> Self {
        Self { repo, max_bytes }
    }

    pub fn attach_to_task(
        &self,
        task_id: TaskId,
        upload: &AttachmentUpload,
        user_id: UserId,
    ) -> ServiceResult<FileAttachment> {
        self.attach(AttachmentOwner::TaskItem(task_id), upload, user_id)
    }

    pub fn attach_to_event(
        &self,
        event_id: EventId,
        upload: &AttachmentUpload,
        user_id: UserId,
    ) -> ServiceResult<FileAttachment> {
        self.attach(AttachmentOwner::CalendarEvent(event_id), upload, user_id)
    }

    /// Removes the attachment row and returns its storage URL.
    pub fn delete_attachment(
        &self,
        attachment_id: AttachmentId,
        user_id: UserId,
    ) -> ServiceResult<String> {
        let attachment = self
            .repo
            .get_attachment(attachment_id)?
            .ok_or(ServiceError::AttachmentNotFound(attachment_id))?;
        self.require_writer(attachment.owner, user_id)?;

        self.repo.delete_attachment(attachment_id)?;
        info!("event=attachment_delete module={MODULE} status=ok attachment_id={attachment_id}");
        Ok(attachment.file_url)
    }

    pub fn list_attachments(
        &self,
        owner: AttachmentOwner,
        user_id: UserId,
    ) -> ServiceResult<Vec<FileAttachment>> {
        let context = self.load_owner(owner)?;
        require_member(&self.repo, context.group_id, user_id)?;
        Ok(self.repo.list_attachments(owner)?)
    }

    fn attach(
        &self,
        owner: AttachmentOwner,
        upload: &AttachmentUpload,
        user_id: UserId,
    ) -> ServiceResult<FileAttachment> {
        let upload = upload.validated(self.max_bytes)?;
        self.require_writer(owner, user_id)?;

        let attachment = FileAttachment {
            id: Uuid::new_v4(),
            file_name: upload.file_name,
            file_url: upload.file_url,
            owner,
            uploaded_by: Some(user_id),
            uploaded_at: now_epoch_ms(),
            size_bytes: upload.size_bytes,
        };
        self.repo.insert_attachment(&attachment)?;
        info!(
            "event=attachment_create module={MODULE} status=ok attachment_id={} owner_type={} size_bytes={}",
            attachment.id,
            owner.entity_type(),
            attachment.size_bytes
        );
        Ok(attachment)
    }

    /// Members may change task files only while the task has a future
    /// deadline; admins always may.
    fn require_writer(&self, owner: AttachmentOwner, user_id: UserId) -> ServiceResult<()> {
        let context = self.load_owner(owner)?;
        require_member(&self.repo, context.group_id, user_id)?;
        if let AttachmentOwner::TaskItem(_) = owner {
            let before_deadline = context
                .deadline
                .is_some_and(|deadline| deadline > now_epoch_ms());
            if !before_deadline && !access::is_admin(&self.repo, context.group_id, user_id)? {
                return Err(ServiceError::UploadAfterDeadline);
            }
        }
        Ok(())
    }

    fn load_owner(&self, owner: AttachmentOwner) -> ServiceResult<OwnerContext> {
        self.repo.owner_context(owner)?.ok_or(match owner {
            AttachmentOwner::TaskItem(id) => ServiceError::TaskNotFound(id),
            AttachmentOwner::CalendarEvent(id) => ServiceError::EventNotFound(id),
        })
    }
}
