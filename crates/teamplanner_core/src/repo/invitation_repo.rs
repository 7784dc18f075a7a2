//! Email invitation persistence.

use super::membership::{impl_membership_lookup, parse_role, role_to_db, upsert_active_member};
use super::{bool_to_int, ensure_connection_ready, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::model::group::{GroupId, GroupMember};
use crate::model::invitation::Invitation;
use crate::model::user::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const INVITATION_SELECT_SQL: &str = "SELECT
    id,
    group_id,
    email,
    role,
    token,
    is_accepted,
    created_at,
    accepted_at
FROM invitations";

/// Repository interface for group invitations.
pub trait InvitationRepository: super::membership::MembershipLookup {
    fn insert_invitation(&self, invitation: &Invitation) -> RepoResult<()>;
    fn get_by_token(&self, token: &str) -> RepoResult<Option<Invitation>>;
    /// Marks the invitation accepted and activates the membership in one
    /// transaction.
    fn accept(&self, invitation: &Invitation, user_id: UserId, now: i64)
        -> RepoResult<GroupMember>;
    /// Stored email of a user profile.
    fn user_email(&self, user_id: UserId) -> RepoResult<Option<String>>;
    /// Unaccepted invitations of a group, newest first.
    fn list_pending(&self, group_id: GroupId) -> RepoResult<Vec<Invitation>>;
}

/// SQLite-backed invitation repository.
pub struct SqliteInvitationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInvitationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["invitations", "group_members", "users"])?;
        Ok(Self { conn })
    }
}

impl_membership_lookup!(SqliteInvitationRepository);

impl InvitationRepository for SqliteInvitationRepository<'_> {
    fn insert_invitation(&self, invitation: &Invitation) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO invitations (
                id,
                group_id,
                email,
                role,
                token,
                is_accepted,
                created_at,
                accepted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                invitation.id.to_string(),
                invitation.group_id.to_string(),
                invitation.email.as_str(),
                role_to_db(invitation.role),
                invitation.token.as_str(),
                bool_to_int(invitation.is_accepted),
                invitation.created_at,
                invitation.accepted_at,
            ],
        )?;
        Ok(())
    }

    fn get_by_token(&self, token: &str) -> RepoResult<Option<Invitation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INVITATION_SELECT_SQL} WHERE token = ?1;"))?;
        let mut rows = stmt.query([token])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_invitation_row(row)?));
        }
        Ok(None)
    }

    fn accept(
        &self,
        invitation: &Invitation,
        user_id: UserId,
        now: i64,
    ) -> RepoResult<GroupMember> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE invitations
             SET is_accepted = 1,
                 accepted_at = ?2
             WHERE id = ?1
               AND is_accepted = 0;",
            params![invitation.id.to_string(), now],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("pending invitation", invitation.id));
        }
        let member =
            upsert_active_member(&tx, invitation.group_id, user_id, invitation.role, now)?;
        tx.commit()?;
        Ok(member)
    }

    fn user_email(&self, user_id: UserId) -> RepoResult<Option<String>> {
        let email = self
            .conn
            .query_row(
                "SELECT email FROM users WHERE id = ?1;",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(email)
    }

    fn list_pending(&self, group_id: GroupId) -> RepoResult<Vec<Invitation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INVITATION_SELECT_SQL}
             WHERE group_id = ?1
               AND is_accepted = 0
             ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([group_id.to_string()])?;
        let mut invitations = Vec::new();
        while let Some(row) = rows.next()? {
            invitations.push(parse_invitation_row(row)?);
        }
        Ok(invitations)
    }
}

fn parse_invitation_row(row: &Row<'_>) -> RepoResult<Invitation> {
    let id_text: String = row.get("id")?;
    let group_text: String = row.get("group_id")?;
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in invitations.role"))
    })?;

    Ok(Invitation {
        id: parse_uuid(&id_text, "invitations.id")?,
        group_id: parse_uuid(&group_text, "invitations.group_id")?,
        email: row.get("email")?,
        role,
        token: row.get("token")?,
        is_accepted: parse_bool(row.get("is_accepted")?, "invitations.is_accepted")?,
        created_at: row.get("created_at")?,
        accepted_at: row.get("accepted_at")?,
    })
}
