//! Group pages, member actions and invitations.

use super::{run, run_action, ActionResponse, RequestOutcome};
use crate::config::CoreConfig;
use crate::model::group::{
    Group, GroupDetails, GroupDraft, GroupId, GroupMember, GroupUpdate, MemberRole,
};
use crate::model::invitation::Invitation;
use crate::model::user::UserId;
use crate::repo::group_repo::{LeaveOutcome, SqliteGroupRepository};
use crate::repo::invitation_repo::SqliteInvitationRepository;
use crate::repo::notification_repo::SqliteNotificationStore;
use crate::repo::RepoResult;
use crate::service::group_service::GroupService;
use crate::service::invitation_service::InvitationService;
use rusqlite::Connection;
use serde::Serialize;

type SqliteGroupService<'conn> =
    GroupService<SqliteGroupRepository<'conn>, SqliteNotificationStore<'conn>>;

/// Group details plus whether the viewer may manage the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPage {
    #[serde(flatten)]
    pub details: GroupDetails,
    pub is_admin: bool,
}

/// Controller for `/Groups` style endpoints.
pub struct GroupsController<'conn> {
    conn: &'conn Connection,
    config: &'conn CoreConfig,
}

impl<'conn> GroupsController<'conn> {
    pub fn new(conn: &'conn Connection, config: &'conn CoreConfig) -> Self {
        Self { conn, config }
    }

    pub fn create(&self, draft: &GroupDraft, user_id: UserId) -> RequestOutcome<Group> {
        run(
            "api_group_create",
            || self.groups(),
            |service| service.create_group(draft, user_id),
        )
    }

    pub fn edit(&self, update: &GroupUpdate, user_id: UserId) -> RequestOutcome<Group> {
        run(
            "api_group_edit",
            || self.groups(),
            |service| service.update_group(update, user_id),
        )
    }

    pub fn details(&self, group_id: GroupId, user_id: UserId) -> RequestOutcome<GroupPage> {
        run(
            "api_group_details",
            || self.groups(),
            |service| {
                let details = service.group_details(group_id, user_id)?;
                let is_admin = service.is_admin(group_id, user_id)?;
                Ok(GroupPage { details, is_admin })
            },
        )
    }

    /// Groups the caller belongs to.
    pub fn index(&self, user_id: UserId) -> RequestOutcome<Vec<Group>> {
        run(
            "api_group_index",
            || self.groups(),
            |service| service.list_groups_for_user(user_id),
        )
    }

    /// Adds a registered user directly, by email.
    pub fn invite_member(
        &self,
        group_id: GroupId,
        email: &str,
        user_id: UserId,
    ) -> RequestOutcome<GroupMember> {
        run(
            "api_group_invite_member",
            || self.groups(),
            |service| service.invite_member(group_id, email, user_id),
        )
    }

    pub fn remove_member(
        &self,
        group_id: GroupId,
        member_id: UserId,
        user_id: UserId,
    ) -> ActionResponse {
        run_action(
            "api_group_remove_member",
            || self.groups(),
            |service| {
                service.remove_member(group_id, member_id, user_id)?;
                Ok("Member removed.".to_string())
            },
        )
    }

    pub fn change_role(
        &self,
        group_id: GroupId,
        member_id: UserId,
        role: MemberRole,
        user_id: UserId,
    ) -> ActionResponse {
        run_action(
            "api_group_change_role",
            || self.groups(),
            |service| {
                let member = service.change_role(group_id, member_id, role, user_id)?;
                Ok(format!("Role updated to {}.", member.role.label()))
            },
        )
    }

    pub fn assign_admin(
        &self,
        group_id: GroupId,
        member_id: UserId,
        user_id: UserId,
    ) -> ActionResponse {
        run_action(
            "api_group_assign_admin",
            || self.groups(),
            |service| {
                service.assign_admin(group_id, member_id, user_id)?;
                Ok("Admin role granted.".to_string())
            },
        )
    }

    pub fn leave_group(&self, group_id: GroupId, user_id: UserId) -> ActionResponse {
        run_action(
            "api_group_leave",
            || self.groups(),
            |service| {
                let message = match service.leave_group(group_id, user_id)? {
                    LeaveOutcome::Left => "You left the group.",
                    LeaveOutcome::GroupDeleted => {
                        "You left the group. It had no members left and was deleted."
                    }
                };
                Ok(message.to_string())
            },
        )
    }

    pub fn archive(
        &self,
        group_id: GroupId,
        archived: bool,
        user_id: UserId,
    ) -> RequestOutcome<Group> {
        run(
            "api_group_archive",
            || self.groups(),
            |service| service.set_archived(group_id, archived, user_id),
        )
    }

    pub fn delete(&self, group_id: GroupId, user_id: UserId) -> RequestOutcome<()> {
        run(
            "api_group_delete",
            || self.groups(),
            |service| service.delete_group(group_id, user_id),
        )
    }

    pub fn create_invitation(
        &self,
        group_id: GroupId,
        email: &str,
        role: MemberRole,
        user_id: UserId,
    ) -> RequestOutcome<Invitation> {
        run(
            "api_invitation_create",
            || self.invitations(),
            |service| service.create_invitation(group_id, email, role, user_id),
        )
    }

    pub fn accept_invitation(&self, token: &str, user_id: UserId) -> RequestOutcome<GroupMember> {
        run(
            "api_invitation_accept",
            || self.invitations(),
            |service| service.accept_invitation(token, user_id),
        )
    }

    fn groups(&self) -> RepoResult<SqliteGroupService<'conn>> {
        let repo = SqliteGroupRepository::try_new(self.conn)?;
        let notifier = SqliteNotificationStore::try_new(self.conn)?;
        Ok(GroupService::new(repo, notifier)
            .with_delete_empty_groups(self.config.delete_empty_groups))
    }

    fn invitations(&self) -> RepoResult<InvitationService<SqliteInvitationRepository<'conn>>> {
        Ok(InvitationService::new(SqliteInvitationRepository::try_new(
            self.conn,
        )?))
    }
}
