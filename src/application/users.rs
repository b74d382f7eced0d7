//! User service.
//!
//! User reads are served straight from the store (they are cheap single-row
//! lookups and the admin surface is low-traffic), but every mutation still
//! runs the invalidation controller for the `user` kind so any future
//! caching of user reads inherits correct invalidation. Mutating a user
//! deliberately does not touch article caches: author snapshots embedded in
//! cached articles may go briefly stale, bounded by the TTL.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::auth::hash_password;
use crate::application::error::AppError;
use crate::application::repos::{CreateUserParams, UpdateUserParams, UsersRepo};
use crate::cache::{CacheConfig, EntityKind, Invalidator};
use crate::domain::entities::UserRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreatedUser {
    pub id: i64,
}

pub struct UserService {
    users: Arc<dyn UsersRepo>,
    invalidator: Invalidator,
    config: CacheConfig,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        cache: Arc<dyn crate::cache::CacheClient>,
        config: CacheConfig,
    ) -> Self {
        Self {
            users,
            invalidator: Invalidator::new(cache),
            config,
        }
    }

    pub async fn create(&self, input: CreateUserInput) -> Result<CreatedUser, AppError> {
        if input.email.trim().is_empty() {
            return Err(AppError::validation("email must not be empty"));
        }

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .users
            .create(CreateUserParams {
                email: input.email,
                name: input.name,
                password_hash,
            })
            .await?;

        if self.config.enabled {
            self.invalidator.on_created(EntityKind::User).await;
        }

        Ok(CreatedUser { id: user.id })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<UserResponse, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn list_all(&self) -> Result<Vec<UserResponse>, AppError> {
        Ok(self
            .users
            .list_all()
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect())
    }

    pub async fn update(&self, id: i64, params: UpdateUserParams) -> Result<(), AppError> {
        let existing = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| user_not_found(id))?;

        if let Some(email) = params.email.as_deref()
            && email != existing.email
            && let Some(other) = self.users.find_by_email(email).await?
            && other.id != id
        {
            return Err(AppError::conflict("Email already in use"));
        }

        self.users.update(id, params).await?;

        if self.config.enabled {
            self.invalidator.on_updated(EntityKind::User, id).await;
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if self.users.find_by_id(id).await?.is_none() {
            return Err(user_not_found(id));
        }

        self.users.delete(id).await?;

        if self.config.enabled {
            self.invalidator.on_deleted(EntityKind::User, id).await;
        }

        Ok(())
    }
}

fn user_not_found(id: i64) -> AppError {
    AppError::not_found(format!("User with id {id} not found"))
}
