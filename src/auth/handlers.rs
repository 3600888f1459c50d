use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserResponse,
            UsersResponse,
        },
        services,
    },
    error::ApiError,
    sessions::AuthUser,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register).get(list_users))
        .route("/users/:id", get(get_user))
        .route("/login", post(login))
        .route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = services::register(state.store.as_ref(), payload).await?;
    info!(user_id = %user.user_id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User created successfully".into(),
            user_id: user.user_id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = services::login(state.store.as_ref(), payload).await?;
    let session = state.sessions.issue(user.user_id).await?;
    info!(user_id = %user.user_id, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        user: user.into(),
        token: session.session_token,
        expires_at: session.expires_at,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = services::list_users(state.store.as_ref()).await?;
    Ok(Json(UsersResponse {
        success: true,
        users: users.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services::get_user(state.store.as_ref(), id).await?;
    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services::get_user(state.store.as_ref(), user_id).await?;
    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}
