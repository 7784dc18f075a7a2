//! Group and membership repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist groups and their membership rows.
//! - Apply roster changes, leaves and cascading deletes atomically.
//!
//! # Invariants
//! - Group deletion removes attachments, tasks, events, invitations and
//!   memberships before the group row, inside one immediate transaction.
//! - Soft removal of a member also clears their task assignments in that
//!   group within the same transaction.

use super::membership::{
    impl_membership_lookup, parse_member_row, role_to_db, soft_remove_member,
    upsert_active_member, MembershipLookup, MEMBER_SELECT_SQL,
};
use super::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_optional_uuid, parse_uuid,
    unique_conflict, RepoError, RepoResult,
};
use crate::model::group::{Group, GroupId, GroupMember, MemberRole, Visibility};
use crate::model::user::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const GROUP_SELECT_SQL: &str = "SELECT
    g.id AS id,
    g.name AS name,
    g.description AS description,
    g.created_by AS created_by,
    g.created_at AS created_at,
    g.is_archived AS is_archived,
    g.visibility AS visibility
FROM team_groups g";

/// Membership changes computed by the service for one roster edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterChange {
    /// Active members to soft-remove.
    pub removed: Vec<UserId>,
    /// Users to add or reactivate with role `Member`.
    pub added: Vec<UserId>,
}

/// Result of a member leaving a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Membership stamped as left; the group remains.
    Left,
    /// The last active member left and the group was deleted.
    GroupDeleted,
}

/// Repository interface for groups and their rosters.
pub trait GroupRepository: MembershipLookup {
    /// Inserts a group plus its initial membership rows.
    fn insert_group(&self, group: &Group, members: &[GroupMember]) -> RepoResult<()>;
    fn get_group(&self, group_id: GroupId) -> RepoResult<Option<Group>>;
    /// Whether `name` is used by a group other than `excluding`.
    fn name_taken(&self, name: &str, excluding: Option<GroupId>) -> RepoResult<bool>;
    /// Groups where the user holds an active membership, ordered by name.
    fn list_groups_for_user(&self, user_id: UserId) -> RepoResult<Vec<Group>>;
    fn list_members(&self, group_id: GroupId, include_left: bool)
        -> RepoResult<Vec<GroupMember>>;
    /// Subset of `ids` naming existing users, input order preserved.
    fn existing_user_ids(&self, ids: &[UserId]) -> RepoResult<Vec<UserId>>;
    fn find_user_id_by_email(&self, email: &str) -> RepoResult<Option<UserId>>;
    /// Writes group details and applies a roster change atomically.
    fn update_group(&self, group: &Group, roster: &RosterChange, now: i64) -> RepoResult<()>;
    /// Inserts or reactivates one membership.
    fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: MemberRole,
        now: i64,
    ) -> RepoResult<GroupMember>;
    fn set_member_role(&self, group_id: GroupId, user_id: UserId, role: MemberRole)
        -> RepoResult<()>;
    /// Soft-removes one active member.
    fn remove_member(&self, group_id: GroupId, user_id: UserId, now: i64) -> RepoResult<()>;
    /// Soft-removes the member and, when requested, deletes a group left
    /// without active members.
    fn leave_group(
        &self,
        group_id: GroupId,
        user_id: UserId,
        now: i64,
        delete_when_empty: bool,
    ) -> RepoResult<LeaveOutcome>;
    fn set_archived(&self, group_id: GroupId, archived: bool) -> RepoResult<()>;
    /// Hard-deletes a group and every dependent row.
    fn delete_group(&self, group_id: GroupId) -> RepoResult<()>;
}

/// SQLite-backed group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["team_groups", "group_members", "users"])?;
        Ok(Self { conn })
    }
}

impl_membership_lookup!(SqliteGroupRepository);

impl GroupRepository for SqliteGroupRepository<'_> {
    fn insert_group(&self, group: &Group, members: &[GroupMember]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO team_groups (
                id,
                name,
                description,
                created_by,
                created_at,
                is_archived,
                visibility
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                group.id.to_string(),
                group.name.as_str(),
                group.description.as_str(),
                group.created_by.map(|id| id.to_string()),
                group.created_at,
                bool_to_int(group.is_archived),
                visibility_to_db(group.visibility),
            ],
        )
        .map_err(|err| unique_conflict(err, "team_groups.name"))?;

        for member in members {
            upsert_active_member(
                &tx,
                member.group_id,
                member.user_id,
                member.role,
                member.joined_at,
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_group(&self, group_id: GroupId) -> RepoResult<Option<Group>> {
        load_group(self.conn, group_id)
    }

    fn name_taken(&self, name: &str, excluding: Option<GroupId>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM team_groups
                WHERE name = ?1
                  AND (?2 IS NULL OR id <> ?2)
            );",
            params![name, excluding.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_groups_for_user(&self, user_id: UserId) -> RepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             INNER JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ?1
               AND m.left_at IS NULL
             ORDER BY g.name ASC, g.id ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn list_members(
        &self,
        group_id: GroupId,
        include_left: bool,
    ) -> RepoResult<Vec<GroupMember>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE group_id = ?1
               AND (?2 = 1 OR left_at IS NULL)
             ORDER BY joined_at ASC, user_id ASC;"
        ))?;
        let mut rows = stmt.query(params![group_id.to_string(), bool_to_int(include_left)])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn existing_user_ids(&self, ids: &[UserId]) -> RepoResult<Vec<UserId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);")?;
        let mut existing = Vec::with_capacity(ids.len());
        for id in ids {
            let exists: i64 = stmt.query_row([id.to_string()], |row| row.get(0))?;
            if exists == 1 {
                existing.push(*id);
            }
        }
        Ok(existing)
    }

    fn find_user_id_by_email(&self, email: &str) -> RepoResult<Option<UserId>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT id FROM users WHERE email = ?1;", [email], |row| {
                row.get(0)
            })
            .optional()?;
        value
            .map(|value| parse_uuid(&value, "users.id"))
            .transpose()
    }

    fn update_group(&self, group: &Group, roster: &RosterChange, now: i64) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE team_groups
             SET name = ?2,
                 description = ?3,
                 visibility = ?4,
                 is_archived = ?5
             WHERE id = ?1;",
            params![
                group.id.to_string(),
                group.name.as_str(),
                group.description.as_str(),
                visibility_to_db(group.visibility),
                bool_to_int(group.is_archived),
            ],
        )
        .map_err(|err| unique_conflict(err, "team_groups.name"))?;
        if changed == 0 {
            return Err(RepoError::not_found("group", group.id));
        }

        for user_id in &roster.removed {
            soft_remove_member(&tx, group.id, *user_id, now)?;
        }
        for user_id in &roster.added {
            upsert_active_member(&tx, group.id, *user_id, MemberRole::Member, now)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: MemberRole,
        now: i64,
    ) -> RepoResult<GroupMember> {
        upsert_active_member(self.conn, group_id, user_id, role, now)
    }

    fn set_member_role(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: MemberRole,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE group_members
             SET role = ?3
             WHERE group_id = ?1
               AND user_id = ?2
               AND left_at IS NULL;",
            params![
                group_id.to_string(),
                user_id.to_string(),
                role_to_db(role)
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(
                "group member",
                format!("{group_id}/{user_id}"),
            ));
        }
        Ok(())
    }

    fn remove_member(&self, group_id: GroupId, user_id: UserId, now: i64) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        soft_remove_member(&tx, group_id, user_id, now)?;
        tx.commit()?;
        Ok(())
    }

    fn leave_group(
        &self,
        group_id: GroupId,
        user_id: UserId,
        now: i64,
        delete_when_empty: bool,
    ) -> RepoResult<LeaveOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        soft_remove_member(&tx, group_id, user_id, now)?;

        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*)
             FROM group_members
             WHERE group_id = ?1
               AND left_at IS NULL;",
            [group_id.to_string()],
            |row| row.get(0),
        )?;

        let outcome = if remaining == 0 && delete_when_empty {
            delete_group_rows(&tx, group_id)?;
            LeaveOutcome::GroupDeleted
        } else {
            LeaveOutcome::Left
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn set_archived(&self, group_id: GroupId, archived: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE team_groups SET is_archived = ?2 WHERE id = ?1;",
            params![group_id.to_string(), bool_to_int(archived)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("group", group_id));
        }
        Ok(())
    }

    fn delete_group(&self, group_id: GroupId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_group_rows(&tx, group_id)?;
        tx.commit()?;
        Ok(())
    }
}

/// Deletes a group's dependents, children first, then the group row.
fn delete_group_rows(conn: &Connection, group_id: GroupId) -> RepoResult<()> {
    let id = group_id.to_string();
    conn.execute(
        "DELETE FROM file_attachments
         WHERE (entity_type = 'task_item'
                AND entity_id IN (SELECT id FROM task_items WHERE group_id = ?1))
            OR (entity_type = 'calendar_event'
                AND entity_id IN (SELECT id FROM calendar_events WHERE group_id = ?1));",
        [&id],
    )?;
    conn.execute("DELETE FROM task_items WHERE group_id = ?1;", [&id])?;
    conn.execute("DELETE FROM calendar_events WHERE group_id = ?1;", [&id])?;
    conn.execute("DELETE FROM invitations WHERE group_id = ?1;", [&id])?;
    conn.execute("DELETE FROM group_members WHERE group_id = ?1;", [&id])?;
    let changed = conn.execute("DELETE FROM team_groups WHERE id = ?1;", [&id])?;
    if changed == 0 {
        return Err(RepoError::not_found("group", group_id));
    }
    Ok(())
}

fn load_group(conn: &Connection, group_id: GroupId) -> RepoResult<Option<Group>> {
    let mut stmt = conn.prepare(&format!("{GROUP_SELECT_SQL} WHERE g.id = ?1;"))?;
    let mut rows = stmt.query([group_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_group_row(row)?));
    }
    Ok(None)
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let id_text: String = row.get("id")?;
    let visibility_text: String = row.get("visibility")?;
    let visibility = parse_visibility(&visibility_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid visibility `{visibility_text}` in team_groups.visibility"
        ))
    })?;

    Ok(Group {
        id: parse_uuid(&id_text, "team_groups.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_by: parse_optional_uuid(row.get("created_by")?, "team_groups.created_by")?,
        created_at: row.get("created_at")?,
        is_archived: parse_bool(row.get("is_archived")?, "team_groups.is_archived")?,
        visibility,
    })
}

fn visibility_to_db(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Private => "private",
        Visibility::Hidden => "hidden",
    }
}

fn parse_visibility(value: &str) -> Option<Visibility> {
    match value {
        "public" => Some(Visibility::Public),
        "private" => Some(Visibility::Private),
        "hidden" => Some(Visibility::Hidden),
        _ => None,
    }
}
