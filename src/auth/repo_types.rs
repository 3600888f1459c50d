use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,              // unique
    pub email: String,                 // unique
    pub contact_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,         // Argon2 hash, not exposed in JSON
    pub account_status: String,
    #[serde(skip_serializing)]
    pub reset_otp: Option<String>,     // set and cleared together with the expiry
    #[serde(skip_serializing)]
    pub reset_otp_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.account_status == "active"
    }
}

/// Column values for inserting a new user. The store fills in the id, the
/// default `active` status and the timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub contact_number: String,
    pub password_hash: String,
}
