//! Membership-based authorization checks shared by all services.
//!
//! Access to any group-scoped entity reduces to the caller's membership row
//! in the owning group: active grants access, active + Admin grants
//! management rights. Left rows grant nothing.

use crate::model::group::{GroupId, GroupMember};
use crate::model::user::UserId;
use crate::repo::membership::MembershipLookup;
use crate::repo::RepoResult;
use crate::service::error::{ServiceError, ServiceResult};

/// Whether the user holds an active membership in the group.
pub fn can_access<L>(lookup: &L, group_id: GroupId, user_id: UserId) -> RepoResult<bool>
where
    L: MembershipLookup + ?Sized,
{
    Ok(lookup
        .membership(group_id, user_id)?
        .is_some_and(|member| member.is_active()))
}

/// Whether the user is an active admin of the group.
pub fn is_admin<L>(lookup: &L, group_id: GroupId, user_id: UserId) -> RepoResult<bool>
where
    L: MembershipLookup + ?Sized,
{
    Ok(lookup
        .membership(group_id, user_id)?
        .is_some_and(|member| member.is_active_admin()))
}

/// Active membership of the caller, failing with `GroupNotFound` or
/// `NotGroupMember`.
pub(crate) fn require_member<L>(
    lookup: &L,
    group_id: GroupId,
    user_id: UserId,
) -> ServiceResult<GroupMember>
where
    L: MembershipLookup + ?Sized,
{
    if !lookup.group_exists(group_id)? {
        return Err(ServiceError::GroupNotFound(group_id));
    }
    match lookup.membership(group_id, user_id)? {
        Some(member) if member.is_active() => Ok(member),
        _ => Err(ServiceError::NotGroupMember(group_id)),
    }
}

/// Like [`require_member`] but also requires the Admin role.
pub(crate) fn require_admin<L>(
    lookup: &L,
    group_id: GroupId,
    user_id: UserId,
) -> ServiceResult<GroupMember>
where
    L: MembershipLookup + ?Sized,
{
    let member = require_member(lookup, group_id, user_id)?;
    if !member.is_active_admin() {
        return Err(ServiceError::NotGroupAdmin(group_id));
    }
    Ok(member)
}
