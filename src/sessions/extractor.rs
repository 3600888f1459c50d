use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Extracts the session bearer token from `Authorization` and resolves it to
/// a user ID.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No session token provided".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("No session token provided".into()))?;

        match state.sessions.validate(token).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                warn!("invalid or expired session token");
                Err(ApiError::Unauthorized("Invalid or expired session".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/me");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[tokio::test]
    async fn resolves_bearer_token_to_user() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let session = state.sessions.issue(user_id).await.expect("issue");

        let mut parts = parts_with_auth(Some(&format!("Bearer {}", session.session_token)));
        let AuthUser(resolved) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(resolved, user_id);
    }

    #[tokio::test]
    async fn missing_header_and_bad_token_are_unauthorized() {
        let state = AppState::fake();

        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let mut parts = parts_with_auth(Some("Bearer bogus"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
