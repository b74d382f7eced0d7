//! Registration, login, and signed-token issuance.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::error::AppError;
use crate::application::repos::{CreateUserParams, UsersRepo};

// Matches the work factor the stored credentials were created with.
const BCRYPT_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|err| AppError::unexpected(format!("password hashing failed: {err}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    bcrypt::verify(password, hash)
        .map_err(|err| AppError::unexpected(format!("password verification failed: {err}")))
}

/// Signed-token payload. `sub` is the user id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
}

pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_secs: u64,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, jwt_secret: &str, token_expiry_secs: u64) -> Self {
        Self {
            users,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_expiry_secs,
        }
    }

    pub async fn register(
        &self,
        email: String,
        name: String,
        password: String,
    ) -> Result<RegisteredUser, AppError> {
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let password_hash = hash_password(&password)?;
        let user = self
            .users
            .create(CreateUserParams {
                email,
                name,
                password_hash,
            })
            .await?;

        Ok(RegisteredUser {
            id: user.id,
            email: user.email,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(LoginResponse {
            access_token: self.issue_token(user.id)?,
        })
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.token_expiry_secs as i64,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| AppError::unexpected(format!("token signing failed: {err}")))
    }

    /// Validate a bearer token. Any defect (bad signature, expiry, garbage)
    /// maps to `Unauthorized`; the caller never learns which.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::{RepoError, UpdateUserParams};
    use crate::domain::entities::UserRecord;

    struct SingleUserRepo {
        user: UserRecord,
    }

    #[async_trait]
    impl UsersRepo for SingleUserRepo {
        async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
            Ok((id == self.user.id).then(|| self.user.clone()))
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
            Ok((email == self.user.email).then(|| self.user.clone()))
        }

        async fn list_all(&self) -> Result<Vec<UserRecord>, RepoError> {
            Ok(vec![self.user.clone()])
        }

        async fn create(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
            Ok(UserRecord {
                id: 2,
                email: params.email,
                name: params.name,
                password_hash: params.password_hash,
                created_at: OffsetDateTime::now_utc(),
            })
        }

        async fn update(&self, _id: i64, _params: UpdateUserParams) -> Result<(), RepoError> {
            Ok(())
        }

        async fn delete(&self, _id: i64) -> Result<(), RepoError> {
            Ok(())
        }
    }

    fn service_with(user: UserRecord) -> AuthService {
        AuthService::new(Arc::new(SingleUserRepo { user }), "test-secret", 3600)
    }

    fn ada() -> UserRecord {
        UserRecord {
            id: 1,
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            password_hash: hash_password("correct horse").expect("hash"),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret").expect("hash");
        assert!(verify_password("s3cret", &hash).expect("verify"));
        assert!(!verify_password("other", &hash).expect("verify"));
    }

    #[tokio::test]
    async fn login_issues_a_verifiable_token() {
        let service = service_with(ada());

        let response = service
            .login("ada@example.com", "correct horse")
            .await
            .expect("login");

        let claims = service
            .verify_token(&response.access_token)
            .expect("token verifies");
        assert_eq!(claims.sub, 1);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let service = service_with(ada());

        let result = service.login("ada@example.com", "wrong").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn login_for_unknown_email_is_not_found() {
        let service = service_with(ada());

        let result = service.login("nobody@example.com", "whatever").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let service = service_with(ada());

        let result = service
            .register(
                "ada@example.com".to_string(),
                "Ada".to_string(),
                "pw".to_string(),
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        let service = service_with(ada());
        assert!(matches!(
            service.verify_token("not-a-token"),
            Err(AppError::Unauthorized)
        ));
    }
}
