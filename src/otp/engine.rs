use rand::{rngs::OsRng, Rng};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{password::hash_password, repo::CredentialStore, services::MIN_PASSWORD_LEN},
    error::ApiError,
    notifier::Notifier,
};

pub const OTP_TTL: Duration = Duration::minutes(10);

/// Uniform 6-digit code, leading zeros preserved.
fn generate_code() -> String {
    format!("{:06}", OsRng.gen_range(0..1_000_000u32))
}

/// Non-short-circuiting equality so the position of a mismatch is not
/// observable.
fn codes_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Generate and store a fresh code for the account, then dispatch it. A
/// repeated request supersedes any previous pending code. The code is
/// persisted before dispatch, so a delivery failure leaves a retryable
/// pending reset behind.
pub async fn request_reset(
    store: &dyn CredentialStore,
    notifier: &dyn Notifier,
    email: &str,
) -> Result<(), ApiError> {
    let email = email.trim().to_lowercase();
    if store.find_by_email(&email).await?.is_none() {
        return Err(ApiError::NotFound("No account with that email".into()));
    }

    let code = generate_code();
    let expires_at = OffsetDateTime::now_utc() + OTP_TTL;
    store.update_otp(&email, Some((code.clone(), expires_at))).await?;

    notifier
        .send_otp(&email, &code)
        .await
        .map_err(ApiError::Notification)?;

    info!(%email, "password reset OTP issued");
    Ok(())
}

/// Check the submitted code against the pending one. A match inside the
/// window clears the code immediately, so each code verifies at most once.
pub async fn verify_otp(
    store: &dyn CredentialStore,
    email: &str,
    code: &str,
) -> Result<(), ApiError> {
    let email = email.trim().to_lowercase();
    let user = store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account with that email".into()))?;

    let (stored, expires_at) = match (user.reset_otp.as_deref(), user.reset_otp_expires_at) {
        (Some(stored), Some(expires_at)) => (stored, expires_at),
        _ => return Err(ApiError::InvalidOtp),
    };

    if !codes_match(stored, code) {
        warn!(user_id = %user.user_id, "OTP mismatch");
        return Err(ApiError::InvalidOtp);
    }
    if OffsetDateTime::now_utc() >= expires_at {
        return Err(ApiError::ExpiredOtp);
    }

    store.update_otp(&email, None).await?;
    info!(user_id = %user.user_id, "OTP verified");
    Ok(())
}

/// Replace the account password. The caller is trusted to have completed OTP
/// verification for this email; no verified-ticket is required.
pub async fn reset_password(
    store: &dyn CredentialStore,
    email: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    let email = email.trim().to_lowercase();
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let password_hash = hash_password(new_password)?;
    store.update_password_hash(&email, &password_hash).await?;
    info!(%email, "password reset");
    Ok(())
}
