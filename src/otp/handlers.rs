use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::services::required,
    error::ApiError,
    otp::{
        dto::{ForgotPasswordRequest, OkResponse, ResetPasswordRequest, VerifyOtpRequest},
        engine,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/verify-otp", post(verify_otp))
        .route("/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let email = required(payload.email, "email")?;
    engine::request_reset(state.store.as_ref(), state.notifier.as_ref(), &email).await?;
    Ok(Json(OkResponse {
        success: true,
        message: "OTP sent to your email".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let email = required(payload.email, "email")?;
    let otp = required(payload.otp, "otp")?;
    engine::verify_otp(state.store.as_ref(), &email, &otp).await?;
    Ok(Json(OkResponse {
        success: true,
        message: "OTP verified".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let email = required(payload.email, "email")?;
    let new_password = required(payload.new_password, "newPassword")?;
    engine::reset_password(state.store.as_ref(), &email, &new_password).await?;
    Ok(Json(OkResponse {
        success: true,
        message: "Password has been reset".into(),
    }))
}
