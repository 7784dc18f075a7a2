//! Profile rows referenced by groups, tasks and notifications.

use crate::model::attachment::check_file_size;
use crate::model::user::{normalize_email, User, UserDraft, UserId, FULL_NAME_MAX_CHARS};
use crate::model::{now_epoch_ms, required_text};
use crate::repo::user_repo::UserRepository;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

const AVATAR_URL_MAX_CHARS: usize = 2048;

/// User profile service facade over a repository implementation.
pub struct UserService<R: UserRepository> {
    repo: R,
    avatar_max_bytes: u64,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service accepting avatars up to `avatar_max_bytes`.
    pub fn new(repo: R, avatar_max_bytes: u64) -> Self {
        Self {
            repo,
            avatar_max_bytes,
        }
    }

    /// Registers the profile for an identity created elsewhere.
    pub fn register_profile(&self, draft: &UserDraft) -> ServiceResult<User> {
        let draft = draft.validated()?;
        if self.repo.find_by_email(&draft.email)?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: draft.email,
            full_name: draft.full_name,
            address: draft.address,
            date_of_birth: draft.date_of_birth,
            avatar_url: None,
            created_at: now_epoch_ms(),
        };
        self.repo.insert_user(&user)?;
        info!("event=user_register module=user status=ok user_id={}", user.id);
        Ok(user)
    }

    pub fn get_user(&self, user_id: UserId) -> ServiceResult<User> {
        self.repo
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
    }

    /// Case-insensitive lookup; malformed input is a validation error.
    pub fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let email = normalize_email(email)?;
        Ok(self.repo.find_by_email(&email)?)
    }

    /// Renames the profile. Users may only edit their own profile.
    pub fn update_profile(
        &self,
        user_id: UserId,
        full_name: &str,
        acting_user_id: UserId,
    ) -> ServiceResult<User> {
        if user_id != acting_user_id {
            return Err(ServiceError::NotProfileOwner(user_id));
        }
        let full_name = required_text("full_name", full_name, FULL_NAME_MAX_CHARS)?;

        let mut user = self.get_user(user_id)?;
        self.repo.set_full_name(user_id, &full_name)?;
        user.full_name = full_name;
        info!("event=user_update module=user status=ok user_id={user_id}");
        Ok(user)
    }

    /// Points the profile at a stored avatar. Users may only change their
    /// own avatar.
    pub fn set_avatar(
        &self,
        user_id: UserId,
        avatar_url: &str,
        size_bytes: u64,
        acting_user_id: UserId,
    ) -> ServiceResult<User> {
        if user_id != acting_user_id {
            return Err(ServiceError::NotProfileOwner(user_id));
        }
        check_file_size(size_bytes, self.avatar_max_bytes)?;
        let avatar_url = required_text("avatar_url", avatar_url, AVATAR_URL_MAX_CHARS)?;

        let mut user = self.get_user(user_id)?;
        self.repo.set_avatar_url(user_id, &avatar_url)?;
        user.avatar_url = Some(avatar_url);
        info!("event=user_avatar module=user status=ok user_id={user_id} size_bytes={size_bytes}");
        Ok(user)
    }
}
