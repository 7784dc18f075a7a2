//! Token-based group invitations.
//!
//! An admin issues an invitation to an email address with an offered role.
//! The user registered under that address redeems the token once.

use crate::model::group::{GroupId, GroupMember, MemberRole};
use crate::model::invitation::Invitation;
use crate::model::now_epoch_ms;
use crate::model::user::{normalize_email, UserId};
use crate::repo::invitation_repo::InvitationRepository;
use crate::service::access::{self, require_admin};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

const MODULE: &str = "invitation";

/// Invitation service facade over a repository implementation.
pub struct InvitationService<R: InvitationRepository> {
    repo: R,
}

impl<R: InvitationRepository> InvitationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Issues an invitation with a fresh random token.
    pub fn create_invitation(
        &self,
        group_id: GroupId,
        email: &str,
        role: MemberRole,
        acting_user_id: UserId,
    ) -> ServiceResult<Invitation> {
        let email = normalize_email(email)?;
        require_admin(&self.repo, group_id, acting_user_id)?;

        let invitation = Invitation {
            id: Uuid::new_v4(),
            group_id,
            email,
            role,
            token: Uuid::new_v4().simple().to_string(),
            is_accepted: false,
            created_at: now_epoch_ms(),
            accepted_at: None,
        };
        self.repo.insert_invitation(&invitation)?;
        info!(
            "event=invitation_create module={MODULE} status=ok invitation_id={} group_id={group_id}",
            invitation.id
        );
        Ok(invitation)
    }

    /// Redeems a token for the user registered under the invited email.
    pub fn accept_invitation(&self, token: &str, user_id: UserId) -> ServiceResult<GroupMember> {
        let invitation = self
            .repo
            .get_by_token(token.trim())?
            .ok_or(ServiceError::InvitationNotFound)?;
        if invitation.is_accepted {
            return Err(ServiceError::InvitationAlreadyAccepted);
        }

        let email = self
            .repo
            .user_email(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))?;
        if !email.eq_ignore_ascii_case(&invitation.email) {
            return Err(ServiceError::InvitationEmailMismatch);
        }
        if access::can_access(&self.repo, invitation.group_id, user_id)? {
            return Err(ServiceError::AlreadyMember(user_id));
        }

        let member = self.repo.accept(&invitation, user_id, now_epoch_ms())?;
        info!(
            "event=invitation_accept module={MODULE} status=ok invitation_id={} user_id={user_id}",
            invitation.id
        );
        Ok(member)
    }

    /// Open invitations of a group; admin only.
    pub fn list_pending(
        &self,
        group_id: GroupId,
        acting_user_id: UserId,
    ) -> ServiceResult<Vec<Invitation>> {
        require_admin(&self.repo, group_id, acting_user_id)?;
        Ok(self.repo.list_pending(group_id)?)
    }
}
