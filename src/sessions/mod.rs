use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sqlx::PgPool;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

mod extractor;
pub use extractor::AuthUser;

/// An issued bearer session. The token is opaque; nothing is encoded in it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub session_token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> anyhow::Result<()>;
    async fn get(&self, token: &str) -> anyhow::Result<Option<Session>>;
}

pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_token, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&session.session_token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT session_token, user_id, expires_at
            FROM sessions
            WHERE session_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }
}

const TOKEN_BYTES: usize = 32;

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Issue a fresh opaque token for the user. 32 bytes from the OS CSPRNG,
    /// base64url encoded.
    pub async fn issue(&self, user_id: Uuid) -> anyhow::Result<Session> {
        let mut buf = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut buf);
        let session = Session {
            session_token: Base64UrlUnpadded::encode_string(&buf),
            user_id,
            expires_at: OffsetDateTime::now_utc() + self.ttl,
        };
        self.store.insert(&session).await?;
        Ok(session)
    }

    /// Resolve a bearer token to a user id. Unknown, malformed and expired
    /// tokens are indistinguishable to the caller; there is no renewal.
    pub async fn validate(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        if token.is_empty() {
            return Ok(None);
        }
        let session = self.store.get(token).await?;
        Ok(session
            .filter(|s| OffsetDateTime::now_utc() < s.expires_at)
            .map(|s| s.user_id))
    }
}
