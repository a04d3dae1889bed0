use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_session_user;
use super::{ApiError, ApiResponse, AppState, validation};
use crate::api::types::CommentDto;

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

/// POST /comment/{id}
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    let user = require_session_user(&session).await?;
    let id = validation::validate_listing_id(id)?;
    let text = validation::validate_comment_text(&payload.text)?;

    if state.store().get_listing(id).await?.is_none() {
        return Err(ApiError::listing_not_found(id));
    }

    let comment = state.store().add_comment(id, user.id, text).await?;
    Ok(Json(ApiResponse::success(CommentDto::from(comment))))
}

/// GET /listings/{id}/comments
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CommentDto>>>, ApiError> {
    let id = validation::validate_listing_id(id)?;

    if state.store().get_listing(id).await?.is_none() {
        return Err(ApiError::listing_not_found(id));
    }

    let comments = state.store().get_comments(id).await?;
    let dtos: Vec<CommentDto> = comments.into_iter().map(CommentDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}
