//! Membership lookups shared by every group-scoped repository.
//!
//! # Responsibility
//! - Answer "does this group exist" and "what is this user's membership row"
//!   for task, event, attachment and invitation repositories.
//! - Own the SQL mapping of `group_members` rows.
//!
//! # Invariants
//! - Lookups return left rows too; callers decide via `GroupMember::is_active`.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::group::{GroupId, GroupMember, MemberRole};
use crate::model::user::UserId;
use rusqlite::{params, Connection, Row};

pub(crate) const MEMBER_SELECT_SQL: &str = "SELECT
    group_id,
    user_id,
    role,
    joined_at,
    left_at
FROM group_members";

/// Read-only membership queries every access check relies on.
pub trait MembershipLookup {
    /// Whether a group row exists.
    fn group_exists(&self, group_id: GroupId) -> RepoResult<bool>;
    /// The `(group, user)` membership row in any state.
    fn membership(&self, group_id: GroupId, user_id: UserId) -> RepoResult<Option<GroupMember>>;
    /// Ids of active members, ordered by join time.
    fn active_member_ids(&self, group_id: GroupId) -> RepoResult<Vec<UserId>>;
}

pub(crate) fn group_exists(conn: &Connection, group_id: GroupId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM team_groups WHERE id = ?1);",
        [group_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn load_membership(
    conn: &Connection,
    group_id: GroupId,
    user_id: UserId,
) -> RepoResult<Option<GroupMember>> {
    let mut stmt = conn.prepare(&format!(
        "{MEMBER_SELECT_SQL}
         WHERE group_id = ?1
           AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![group_id.to_string(), user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_member_row(row)?));
    }
    Ok(None)
}

pub(crate) fn active_member_ids(conn: &Connection, group_id: GroupId) -> RepoResult<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT user_id
         FROM group_members
         WHERE group_id = ?1
           AND left_at IS NULL
         ORDER BY joined_at ASC, user_id ASC;",
    )?;
    let mut rows = stmt.query([group_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "group_members.user_id")?);
    }
    Ok(ids)
}

/// Inserts or reactivates the single `(group, user)` row.
///
/// A previously left row gets `left_at` cleared, the given role, and a fresh
/// `joined_at`.
pub(crate) fn upsert_active_member(
    conn: &Connection,
    group_id: GroupId,
    user_id: UserId,
    role: MemberRole,
    now: i64,
) -> RepoResult<GroupMember> {
    conn.execute(
        "INSERT INTO group_members (group_id, user_id, role, joined_at, left_at)
         VALUES (?1, ?2, ?3, ?4, NULL)
         ON CONFLICT (group_id, user_id) DO UPDATE
         SET role = excluded.role,
             joined_at = excluded.joined_at,
             left_at = NULL;",
        params![
            group_id.to_string(),
            user_id.to_string(),
            role_to_db(role),
            now
        ],
    )?;
    Ok(GroupMember {
        group_id,
        user_id,
        role,
        joined_at: now,
        left_at: None,
    })
}

/// Stamps `left_at` on an active row and unassigns the user's tasks in the
/// group.
pub(crate) fn soft_remove_member(
    conn: &Connection,
    group_id: GroupId,
    user_id: UserId,
    now: i64,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE group_members
         SET left_at = ?3
         WHERE group_id = ?1
           AND user_id = ?2
           AND left_at IS NULL;",
        params![group_id.to_string(), user_id.to_string(), now],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(
            "group member",
            format!("{group_id}/{user_id}"),
        ));
    }

    conn.execute(
        "UPDATE task_items
         SET assignee_id = NULL
         WHERE group_id = ?1
           AND assignee_id = ?2;",
        params![group_id.to_string(), user_id.to_string()],
    )?;
    Ok(())
}

pub(crate) fn parse_member_row(row: &Row<'_>) -> RepoResult<GroupMember> {
    let group_text: String = row.get("group_id")?;
    let user_text: String = row.get("user_id")?;
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in group_members.role"))
    })?;

    Ok(GroupMember {
        group_id: parse_uuid(&group_text, "group_members.group_id")?,
        user_id: parse_uuid(&user_text, "group_members.user_id")?,
        role,
        joined_at: row.get("joined_at")?,
        left_at: row.get("left_at")?,
    })
}

pub(crate) fn role_to_db(role: MemberRole) -> &'static str {
    match role {
        MemberRole::Admin => "admin",
        MemberRole::Member => "member",
    }
}

pub(crate) fn parse_role(value: &str) -> Option<MemberRole> {
    match value {
        "admin" => Some(MemberRole::Admin),
        "member" => Some(MemberRole::Member),
        _ => None,
    }
}

/// Implements [`MembershipLookup`] for a repository holding `conn`.
macro_rules! impl_membership_lookup {
    ($repo:ident) => {
        impl $crate::repo::membership::MembershipLookup for $repo<'_> {
            fn group_exists(
                &self,
                group_id: $crate::model::group::GroupId,
            ) -> $crate::repo::RepoResult<bool> {
                $crate::repo::membership::group_exists(self.conn, group_id)
            }

            fn membership(
                &self,
                group_id: $crate::model::group::GroupId,
                user_id: $crate::model::user::UserId,
            ) -> $crate::repo::RepoResult<Option<$crate::model::group::GroupMember>> {
                $crate::repo::membership::load_membership(self.conn, group_id, user_id)
            }

            fn active_member_ids(
                &self,
                group_id: $crate::model::group::GroupId,
            ) -> $crate::repo::RepoResult<Vec<$crate::model::user::UserId>> {
                $crate::repo::membership::active_member_ids(self.conn, group_id)
            }
        }
    };
}

pub(crate) use impl_membership_lookup;
