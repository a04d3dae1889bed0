use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_session_user;
use super::{ApiError, ApiResponse, AppState, validation};
use crate::api::types::ListingDto;

/// GET /watchlist
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ListingDto>>>, ApiError> {
    let user = require_session_user(&session).await?;

    let listings = state.store().get_watchlist(user.id).await?;
    let dtos: Vec<ListingDto> = listings.into_iter().map(ListingDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /watchlist/{id}
/// Idempotent: watching an already-watched listing succeeds quietly.
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let user = require_session_user(&session).await?;
    let id = validation::validate_listing_id(id)?;

    if state.store().get_listing(id).await?.is_none() {
        return Err(ApiError::listing_not_found(id));
    }

    let added = state.store().add_to_watchlist(user.id, id).await?;
    Ok(Json(ApiResponse::success(added)))
}

/// DELETE /watchlist/{id}
/// Idempotent: removing an unwatched listing succeeds quietly.
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let user = require_session_user(&session).await?;
    let id = validation::validate_listing_id(id)?;

    let removed = state.store().remove_from_watchlist(user.id, id).await?;
    Ok(Json(ApiResponse::success(removed)))
}
