//! User profile repository contracts and SQLite implementation.

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::user::{User, UserId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    full_name,
    address,
    date_of_birth,
    avatar_url,
    created_at
FROM users";

/// Repository interface for profile rows.
pub trait UserRepository {
    fn insert_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Exact match on the normalized (lowercase) email.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn set_full_name(&self, id: UserId, full_name: &str) -> RepoResult<()>;
    fn set_avatar_url(&self, id: UserId, avatar_url: &str) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &User) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (
                id,
                email,
                full_name,
                address,
                date_of_birth,
                avatar_url,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                user.id.to_string(),
                user.email.as_str(),
                user.full_name.as_str(),
                user.address.as_deref(),
                user.date_of_birth.map(|date| date.to_string()),
                user.avatar_url.as_deref(),
                user.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn set_full_name(&self, id: UserId, full_name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET full_name = ?2 WHERE id = ?1;",
            params![id.to_string(), full_name],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn set_avatar_url(&self, id: UserId, avatar_url: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET avatar_url = ?2 WHERE id = ?1;",
            params![id.to_string(), avatar_url],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let date_of_birth = match row.get::<_, Option<String>>("date_of_birth")? {
        Some(value) => Some(value.parse::<NaiveDate>().map_err(|_| {
            RepoError::InvalidData(format!("invalid date `{value}` in users.date_of_birth"))
        })?),
        None => None,
    };

    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        email: row.get("email")?,
        full_name: row.get("full_name")?,
        address: row.get("address")?,
        date_of_birth,
        avatar_url: row.get("avatar_url")?,
        created_at: row.get("created_at")?,
    })
}
