//! Group access service.
//!
//! # Responsibility
//! - Answer access and admin checks for a group.
//! - Create, edit, archive and delete groups.
//! - Manage the roster: invite, remove, role changes, leaving.
//!
//! # Invariants
//! - Access means an active membership row; the creator starts with an
//!   Admin row and has no other privilege.
//! - Only active admins edit a group or its roster.
//! - A group always keeps an admin while it has other active members.

use crate::model::group::{
    Group, GroupDetails, GroupDraft, GroupId, GroupMember, GroupUpdate, MemberRole,
};
use crate::model::notification::{NewNotification, NotificationKind};
use crate::model::now_epoch_ms;
use crate::model::user::{normalize_email, UserId};
use crate::repo::group_repo::{GroupRepository, LeaveOutcome, RosterChange};
use crate::repo::RepoError;
use crate::service::access::{self, require_admin};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::notification::{deliver, NotificationSink};
use log::info;
use uuid::Uuid;

const MODULE: &str = "group";

/// Group service facade over repository and notification implementations.
pub struct GroupService<R: GroupRepository, N: NotificationSink> {
    repo: R,
    notifier: N,
    delete_empty_groups: bool,
}

impl<R: GroupRepository, N: NotificationSink> GroupService<R, N> {
    /// Creates a service that deletes groups left without members.
    pub fn new(repo: R, notifier: N) -> Self {
        Self {
            repo,
            notifier,
            delete_empty_groups: true,
        }
    }

    /// Overrides what happens when the last active member leaves.
    pub fn with_delete_empty_groups(mut self, enabled: bool) -> Self {
        self.delete_empty_groups = enabled;
        self
    }

    pub fn can_access_group(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<bool> {
        Ok(access::can_access(&self.repo, group_id, user_id)?)
    }

    pub fn is_admin(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<bool> {
        Ok(access::is_admin(&self.repo, group_id, user_id)?)
    }

    /// Creates a group with the creator as Admin and the listed users as
    /// Members. Unknown user ids are skipped.
    pub fn create_group(&self, draft: &GroupDraft, creator_id: UserId) -> ServiceResult<Group> {
        let draft = draft.validated()?;
        if self.repo.name_taken(&draft.name, None)? {
            return Err(ServiceError::DuplicateGroupName(draft.name));
        }

        let now = now_epoch_ms();
        let group = Group {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            created_by: Some(creator_id),
            created_at: now,
            is_archived: false,
            visibility: draft.visibility,
        };

        let candidates: Vec<UserId> = draft
            .member_ids
            .into_iter()
            .filter(|id| *id != creator_id)
            .collect();
        let added = self.repo.existing_user_ids(&candidates)?;

        let mut members = Vec::with_capacity(added.len() + 1);
        members.push(active_row(group.id, creator_id, MemberRole::Admin, now));
        members.extend(
            added
                .iter()
                .map(|id| active_row(group.id, *id, MemberRole::Member, now)),
        );
        self.repo
            .insert_group(&group, &members)
            .map_err(|err| name_conflict(err, &group.name))?;

        info!(
            "event=group_create module={MODULE} status=ok group_id={} members={}",
            group.id,
            members.len()
        );
        deliver(
            &self.notifier,
            MODULE,
            added.iter().map(|id| added_notice(*id, &group)),
        );
        Ok(group)
    }

    /// Edits name/description/visibility and reconciles the roster against
    /// `update.member_ids`. The creator is never removed by an edit, and an
    /// edit that would leave members without an admin is rejected.
    pub fn update_group(&self, update: &GroupUpdate, user_id: UserId) -> ServiceResult<Group> {
        let update = update.validated()?;
        let mut group = self.load_group(update.group_id)?;
        require_admin(&self.repo, group.id, user_id)?;
        if self.repo.name_taken(&update.name, Some(group.id))? {
            return Err(ServiceError::DuplicateGroupName(update.name));
        }

        let active = self.repo.list_members(group.id, false)?;
        let requested = self.repo.existing_user_ids(&update.member_ids)?;
        let (kept, dropped): (Vec<&GroupMember>, Vec<&GroupMember>) =
            active.iter().partition(|member| {
                update.member_ids.contains(&member.user_id)
                    || Some(member.user_id) == group.created_by
            });
        let roster = RosterChange {
            removed: dropped.iter().map(|member| member.user_id).collect(),
            added: requested
                .into_iter()
                .filter(|id| !active.iter().any(|member| member.user_id == *id))
                .collect(),
        };
        let has_members = !kept.is_empty() || !roster.added.is_empty();
        if has_members && !kept.iter().any(|member| member.role == MemberRole::Admin) {
            return Err(ServiceError::GroupWithoutAdmin);
        }

        group.name = update.name;
        group.description = update.description;
        group.visibility = update.visibility;
        self.repo
            .update_group(&group, &roster, now_epoch_ms())
            .map_err(|err| name_conflict(err, &group.name))?;

        info!(
            "event=group_update module={MODULE} status=ok group_id={} added={} removed={}",
            group.id,
            roster.added.len(),
            roster.removed.len()
        );
        deliver(
            &self.notifier,
            MODULE,
            roster
                .added
                .iter()
                .map(|id| added_notice(*id, &group))
                .chain(roster.removed.iter().map(|id| removed_notice(*id, &group))),
        );
        Ok(group)
    }

    /// Group plus its active members.
    pub fn group_details(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<GroupDetails> {
        let group = self.load_group(group_id)?;
        access::require_member(&self.repo, group_id, user_id)?;
        let members = self.repo.list_members(group_id, false)?;
        Ok(GroupDetails { group, members })
    }

    /// Groups where the user is an active member, ordered by name.
    pub fn list_groups_for_user(&self, user_id: UserId) -> ServiceResult<Vec<Group>> {
        Ok(self.repo.list_groups_for_user(user_id)?)
    }

    /// Adds a registered user to the group by email, reactivating a previous
    /// membership if one exists.
    pub fn invite_member(
        &self,
        group_id: GroupId,
        email: &str,
        acting_user_id: UserId,
    ) -> ServiceResult<GroupMember> {
        let group = self.load_group(group_id)?;
        require_admin(&self.repo, group_id, acting_user_id)?;

        let email = normalize_email(email)?;
        let user_id = self
            .repo
            .find_user_id_by_email(&email)?
            .ok_or_else(|| ServiceError::UserNotFound(email.clone()))?;
        if access::can_access(&self.repo, group_id, user_id)? {
            return Err(ServiceError::AlreadyMember(user_id));
        }

        let member = self
            .repo
            .add_member(group_id, user_id, MemberRole::Member, now_epoch_ms())?;
        info!(
            "event=member_invite module={MODULE} status=ok group_id={group_id} user_id={user_id}"
        );
        deliver(&self.notifier, MODULE, [added_notice(user_id, &group)]);
        Ok(member)
    }

    /// Soft-removes a non-admin member and unassigns their tasks.
    pub fn remove_member(
        &self,
        group_id: GroupId,
        member_id: UserId,
        acting_user_id: UserId,
    ) -> ServiceResult<()> {
        let group = self.load_group(group_id)?;
        require_admin(&self.repo, group_id, acting_user_id)?;
        let member = self.load_active_member(group_id, member_id)?;
        if member_id == acting_user_id {
            return Err(ServiceError::CannotRemoveSelf);
        }
        if member.role == MemberRole::Admin {
            return Err(ServiceError::CannotRemoveAdmin);
        }

        self.repo.remove_member(group_id, member_id, now_epoch_ms())?;
        info!(
            "event=member_remove module={MODULE} status=ok group_id={group_id} user_id={member_id}"
        );
        deliver(&self.notifier, MODULE, [removed_notice(member_id, &group)]);
        Ok(())
    }

    /// Sets the role of an active member. Admins may not demote themselves.
    pub fn change_role(
        &self,
        group_id: GroupId,
        member_id: UserId,
        role: MemberRole,
        acting_user_id: UserId,
    ) -> ServiceResult<GroupMember> {
        let group = self.load_group(group_id)?;
        require_admin(&self.repo, group_id, acting_user_id)?;
        let mut member = self.load_active_member(group_id, member_id)?;
        if member_id == acting_user_id && role != MemberRole::Admin {
            return Err(ServiceError::CannotDemoteSelf);
        }

        self.repo.set_member_role(group_id, member_id, role)?;
        member.role = role;
        info!(
            "event=member_role module={MODULE} status=ok group_id={group_id} user_id={member_id} role={}",
            role.label()
        );
        if member_id != acting_user_id {
            deliver(
                &self.notifier,
                MODULE,
                [NewNotification::new(
                    member_id,
                    NotificationKind::RoleChanged,
                    format!("Your role in {} is now {}.", group.name, role.label()),
                )
                .about("group", group.id)],
            );
        }
        Ok(member)
    }

    /// Promotes an active member to Admin.
    pub fn assign_admin(
        &self,
        group_id: GroupId,
        member_id: UserId,
        acting_user_id: UserId,
    ) -> ServiceResult<GroupMember> {
        self.change_role(group_id, member_id, MemberRole::Admin, acting_user_id)
    }

    pub fn set_archived(
        &self,
        group_id: GroupId,
        archived: bool,
        acting_user_id: UserId,
    ) -> ServiceResult<Group> {
        let mut group = self.load_group(group_id)?;
        require_admin(&self.repo, group_id, acting_user_id)?;
        self.repo.set_archived(group_id, archived)?;
        group.is_archived = archived;
        info!(
            "event=group_archive module={MODULE} status=ok group_id={group_id} archived={archived}"
        );
        Ok(group)
    }

    /// Deletes the group and everything that belongs to it.
    pub fn delete_group(&self, group_id: GroupId, acting_user_id: UserId) -> ServiceResult<()> {
        let group = self.load_group(group_id)?;
        require_admin(&self.repo, group_id, acting_user_id)?;
        let recipients: Vec<UserId> = self
            .repo
            .active_member_ids(group_id)?
            .into_iter()
            .filter(|id| *id != acting_user_id)
            .collect();

        self.repo.delete_group(group_id)?;
        info!("event=group_delete module={MODULE} status=ok group_id={group_id}");
        deliver(
            &self.notifier,
            MODULE,
            recipients.into_iter().map(|id| {
                NewNotification::new(
                    id,
                    NotificationKind::GroupDeleted,
                    format!("Group {} was deleted.", group.name),
                )
            }),
        );
        Ok(())
    }

    /// Leaves the group. The sole admin must hand over the role first while
    /// other members remain.
    pub fn leave_group(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<LeaveOutcome> {
        self.load_group(group_id)?;
        let member = self.load_active_member(group_id, user_id)?;

        if member.role == MemberRole::Admin {
            let active = self.repo.list_members(group_id, false)?;
            let admins = active
                .iter()
                .filter(|row| row.role == MemberRole::Admin)
                .count();
            if admins == 1 && active.len() > 1 {
                return Err(ServiceError::SoleAdminCannotLeave);
            }
        }

        let outcome =
            self.repo
                .leave_group(group_id, user_id, now_epoch_ms(), self.delete_empty_groups)?;
        info!(
            "event=group_leave module={MODULE} status=ok group_id={group_id} user_id={user_id} group_deleted={}",
            outcome == LeaveOutcome::GroupDeleted
        );
        Ok(outcome)
    }

    fn load_group(&self, group_id: GroupId) -> ServiceResult<Group> {
        self.repo
            .get_group(group_id)?
            .ok_or(ServiceError::GroupNotFound(group_id))
    }

    fn load_active_member(&self, group_id: GroupId, user_id: UserId) -> ServiceResult<GroupMember> {
        self.repo
            .membership(group_id, user_id)?
            .filter(GroupMember::is_active)
            .ok_or(ServiceError::MemberNotFound { group_id, user_id })
    }
}

fn active_row(group_id: GroupId, user_id: UserId, role: MemberRole, now: i64) -> GroupMember {
    GroupMember {
        group_id,
        user_id,
        role,
        joined_at: now,
        left_at: None,
    }
}

/// Name taken by a concurrent writer after the `name_taken` check.
fn name_conflict(err: RepoError, name: &str) -> ServiceError {
    match err {
        RepoError::Conflict(_) => ServiceError::DuplicateGroupName(name.to_string()),
        other => other.into(),
    }
}

fn added_notice(user_id: UserId, group: &Group) -> NewNotification {
    NewNotification::new(
        user_id,
        NotificationKind::GroupInvitation,
        format!("You were added to group {}.", group.name),
    )
    .about("group", group.id)
}

fn removed_notice(user_id: UserId, group: &Group) -> NewNotification {
    NewNotification::new(
        user_id,
        NotificationKind::MemberRemoved,
        format!("You were removed from group {}.", group.name),
    )
    .about("group", group.id)
}
