use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::require_session_user;
use super::{ApiError, ApiResponse, AppState, validation};
use crate::api::types::BidDto;
use crate::db::{BidOutcome, CloseOutcome};

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct PlaceBidResponse {
    pub listing_id: i32,
    pub current_bid: f64,
}

#[derive(Debug, Serialize)]
pub struct CloseListingResponse {
    pub listing_id: i32,
    pub winner: Option<String>,
}

/// POST /bid/{id}
/// Accepted only when the amount strictly exceeds the leading bid.
pub async fn place_bid(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<Json<ApiResponse<PlaceBidResponse>>, ApiError> {
    let user = require_session_user(&session).await?;
    let id = validation::validate_listing_id(id)?;
    let amount = validation::validate_bid_amount(payload.amount)?;

    match state.store().place_bid(id, user.id, amount).await? {
        BidOutcome::Accepted => Ok(Json(ApiResponse::success(PlaceBidResponse {
            listing_id: id,
            current_bid: amount,
        }))),
        BidOutcome::TooLow { leading } => Err(ApiError::validation(format!(
            "Bid must be greater than {:.2}",
            leading
        ))),
        BidOutcome::Closed => Err(ApiError::conflict("The auction is closed")),
        BidOutcome::NotFound => Err(ApiError::listing_not_found(id)),
    }
}

/// GET /listings/{id}/bids
pub async fn bid_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<BidDto>>>, ApiError> {
    let id = validation::validate_listing_id(id)?;

    if state.store().get_listing(id).await?.is_none() {
        return Err(ApiError::listing_not_found(id));
    }

    let bids = state.store().get_bid_history(id).await?;
    let dtos: Vec<BidDto> = bids.into_iter().map(BidDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /close/{id}
/// Creator-only; terminal and idempotent. Repeated closes return the
/// recorded winner without changing anything.
pub async fn close_listing(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CloseListingResponse>>, ApiError> {
    let user = require_session_user(&session).await?;
    let id = validation::validate_listing_id(id)?;

    let winner_id = match state.store().close_listing(id, user.id).await? {
        CloseOutcome::Closed { winner_id } => winner_id,
        CloseOutcome::AlreadyClosed => {
            // Idempotent: report the stored outcome
            state
                .store()
                .get_listing(id)
                .await?
                .ok_or_else(|| ApiError::listing_not_found(id))?
                .winner_id
        }
        CloseOutcome::Forbidden => {
            return Err(ApiError::forbidden("Only the creator can close a listing"));
        }
        CloseOutcome::NotFound => return Err(ApiError::listing_not_found(id)),
    };

    let winner = match winner_id {
        Some(winner_id) => state
            .store()
            .get_user_by_id(winner_id)
            .await?
            .map(|u| u.username),
        None => None,
    };

    Ok(Json(ApiResponse::success(CloseListingResponse {
        listing_id: id,
        winner,
    })))
}
