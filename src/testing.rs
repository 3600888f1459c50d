//! In-memory capability implementations for unit tests.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::repo::{CredentialStore, StoreError},
    auth::repo_types::{NewUser, User},
    notifier::Notifier,
    sessions::{Session, SessionStore},
};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
}

impl MemoryCredentialStore {
    pub fn user(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn set_status(&self, email: &str, status: &str) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.email == email) {
            user.account_status = status.into();
        }
    }

    /// Backdates the pending OTP expiry, for expiry tests.
    pub fn expire_otp(&self, email: &str) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.email == email) {
            if user.reset_otp.is_some() {
                user.reset_otp_expires_at =
                    Some(OffsetDateTime::now_utc() - Duration::minutes(1));
            }
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == identifier || u.username == identifier)
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict(
                "User with this email already exists".into(),
            ));
        }
        if users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(
                "User with this username already exists".into(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            user_id: Uuid::new_v4(),
            first_name: new.first_name,
            last_name: new.last_name,
            username: new.username,
            email: new.email,
            contact_number: new.contact_number,
            password_hash: new.password_hash,
            account_status: "active".into(),
            reset_otp: None,
            reset_otp_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_otp(
        &self,
        email: &str,
        otp: Option<(String, OffsetDateTime)>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.email == email) {
            match otp {
                Some((code, expires_at)) => {
                    user.reset_otp = Some(code);
                    user.reset_otp_expires_at = Some(expires_at);
                }
                None => {
                    user.reset_otp = None;
                    user.reset_otp_expires_at = None;
                }
            }
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.email == email) {
            user.password_hash = password_hash.into();
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<Session>>,
}

impl MemorySessionStore {
    /// Backdates a stored session, for expiry tests.
    pub fn expire(&self, token: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().find(|s| s.session_token == token) {
            session.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> anyhow::Result<()> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> anyhow::Result<Option<Session>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.session_token == token)
            .cloned())
    }
}

/// Records dispatched codes; can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(&self, email: &str, code: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mail gateway unreachable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}
