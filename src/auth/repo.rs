use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let msg = if db.constraint() == Some("users_username_key") {
                    "User with this username already exists"
                } else {
                    "User with this email already exists"
                };
                return StoreError::Conflict(msg.into());
            }
        }
        StoreError::Other(e.into())
    }
}

/// Durable user records. The store is the only shared mutable resource; every
/// component goes through this contract, and the unique constraints on email
/// and username are enforced here rather than by caller pre-checks alone.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    /// Fails with `Conflict` when the email or username is already taken.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    /// Set or clear the pending reset code and its expiry together.
    async fn update_otp(
        &self,
        email: &str,
        otp: Option<(String, OffsetDateTime)>,
    ) -> Result<(), StoreError>;
    async fn update_password_hash(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError>;
}

pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, first_name, last_name, username, email, contact_number,
                   password_hash, account_status, reset_otp, reset_otp_expires_at,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, first_name, last_name, username, email, contact_number,
                   password_hash, account_status, reset_otp, reset_otp_expires_at,
                   created_at, updated_at
            FROM users
            WHERE email = $1 OR username = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, first_name, last_name, username, email, contact_number,
                   password_hash, account_status, reset_otp, reset_otp_expires_at,
                   created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, first_name, last_name, username, email, contact_number,
                   password_hash, account_status, reset_otp, reset_otp_expires_at,
                   created_at, updated_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, username, email, contact_number, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING user_id, first_name, last_name, username, email, contact_number,
                      password_hash, account_status, reset_otp, reset_otp_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.contact_number)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_otp(
        &self,
        email: &str,
        otp: Option<(String, OffsetDateTime)>,
    ) -> Result<(), StoreError> {
        let (code, expires_at) = match otp {
            Some((code, expires_at)) => (Some(code), Some(expires_at)),
            None => (None, None),
        };
        sqlx::query(
            r#"
            UPDATE users
            SET reset_otp = $2, reset_otp_expires_at = $3, updated_at = now()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_password_hash(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
