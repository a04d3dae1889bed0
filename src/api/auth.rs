use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, validation};

const SESSION_USER_KEY: &str = "user";

/// Minimal identity kept in the session cookie store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserInfoResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Guards mutating and per-user routes: requests without a logged-in
/// session get 401 before any handler runs.
pub async fn auth_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(user)) = session.get::<SessionUser>(SESSION_USER_KEY).await {
        tracing::Span::current().record("user_id", user.id);
        return Ok(next.run(request).await);
    }

    let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
    Ok(response.into_response())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create an account and log it in. Mismatched confirmation and taken
/// usernames are conflicts, surfaced inline to the caller.
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserInfoResponse>>, ApiError> {
    let username = validation::validate_username(&payload.username)?;
    let email = validation::validate_email(&payload.email)?;
    validation::validate_password(&payload.password)?;

    if payload.password != payload.confirmation {
        return Err(ApiError::conflict("Passwords must match"));
    }

    let user = state
        .store()
        .create_user(username, email, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create user: {e}")))?
        .ok_or_else(|| ApiError::conflict("Username already taken"))?;

    tracing::info!("Registered new user: {}", user.username);

    let session_user = SessionUser {
        id: user.id,
        username: user.username.clone(),
    };
    session
        .insert(SESSION_USER_KEY, &session_user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(UserInfoResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    })))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserInfoResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid username and/or password".to_string())
        })?;

    let session_user = SessionUser {
        id: user.id,
        username: user.username.clone(),
    };
    session
        .insert(SESSION_USER_KEY, &session_user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(UserInfoResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    })))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UserInfoResponse>>, ApiError> {
    let session_user = require_session_user(&session).await?;

    let user = state
        .store()
        .get_user_by_id(session_user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(UserInfoResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    })))
}

// ============================================================================
// Helpers
// ============================================================================

/// Get the logged-in user from the session, 401 if absent.
pub async fn require_session_user(session: &Session) -> Result<SessionUser, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))
}

/// Get the logged-in user if any; anonymous readers are fine for
/// public pages like the listing detail.
pub async fn optional_session_user(session: &Session) -> Option<SessionUser> {
    session.get::<SessionUser>(SESSION_USER_KEY).await.ok()?
}
