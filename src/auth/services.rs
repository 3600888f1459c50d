use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password::{hash_password, verify_password},
        repo::CredentialStore,
        repo_types::{NewUser, User},
    },
    error::ApiError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    match field {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{name} is required"))),
    }
}

// Verified when login finds no matching user so an unknown identifier costs
// the same as a wrong password.
fn dummy_hash() -> &'static str {
    lazy_static! {
        static ref DUMMY: String = hash_password("timing-placeholder").unwrap();
    }
    DUMMY.as_str()
}

/// Validate the registration payload, hash the password and insert the user
/// with the default `active` status. The pre-checks give friendly conflict
/// messages; the store's unique constraints close the check-then-insert race.
pub async fn register(
    store: &dyn CredentialStore,
    req: RegisterRequest,
) -> Result<User, ApiError> {
    let email = required(req.email, "email")?.trim().to_lowercase();
    let password = required(req.password, "password")?;
    let first_name = required(req.first_name, "firstName")?;
    let last_name = required(req.last_name, "lastName")?;
    let username = required(req.username, "username")?.trim().to_lowercase();
    let contact_number = required(req.contact_number, "contact_number")?;

    if !req.accept_terms || !req.accept_privacy {
        return Err(ApiError::Validation(
            "Terms of service and privacy policy must be accepted".into(),
        ));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::Validation(
            "Please enter a valid email address".into(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }

    if store.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".into(),
        ));
    }
    if store.find_by_email_or_username(&username).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this username already exists".into(),
        ));
    }

    let password_hash = hash_password(&password)?;
    let user = store
        .create(NewUser {
            first_name,
            last_name,
            username,
            email,
            contact_number,
            password_hash,
        })
        .await?;
    Ok(user)
}

/// Authenticate by email or username. Unknown identifier, inactive account
/// and wrong password all produce the same generic failure.
pub async fn login(store: &dyn CredentialStore, req: LoginRequest) -> Result<User, ApiError> {
    let identifier = required(req.email, "email or username")?
        .trim()
        .to_lowercase();
    let password = required(req.password, "password")?;

    let Some(user) = store.find_by_email_or_username(&identifier).await? else {
        let _ = verify_password(&password, dummy_hash());
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if !user.is_active() {
        let _ = verify_password(&password, dummy_hash());
        warn!(user_id = %user.user_id, "login on inactive account");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    Ok(user)
}

pub async fn list_users(store: &dyn CredentialStore) -> Result<Vec<User>, ApiError> {
    Ok(store.list().await?)
}

pub async fn get_user(store: &dyn CredentialStore, user_id: Uuid) -> Result<User, ApiError> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}
