use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{optional_session_user, require_session_user};
use super::{ApiError, ApiResponse, AppState, validation};
use crate::db::NewListing;
use crate::models::Category;
use crate::api::types::{CommentDto, ListingDetailDto, ListingDto};

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub starting_bid: f64,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

/// GET /listings
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ListingDto>>>, ApiError> {
    let listings = state.store().list_active_listings().await?;
    let dtos: Vec<ListingDto> = listings.into_iter().map(ListingDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /listings/{id}
/// Public detail page: listing, comments, bid count, winner once closed,
/// and the session user's watchlist flag.
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ListingDetailDto>>, ApiError> {
    let id = validation::validate_listing_id(id)?;

    let listing = state
        .store()
        .get_listing(id)
        .await?
        .ok_or_else(|| ApiError::listing_not_found(id))?;

    let creator = state
        .store()
        .get_user_by_id(listing.creator_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();

    let winner = match listing.winner_id {
        Some(winner_id) if !listing.active => state
            .store()
            .get_user_by_id(winner_id)
            .await?
            .map(|u| u.username),
        _ => None,
    };

    let bid_count = state.store().count_bids(id).await?;
    let comments: Vec<CommentDto> = state
        .store()
        .get_comments(id)
        .await?
        .into_iter()
        .map(CommentDto::from)
        .collect();

    let watched = match optional_session_user(&session).await {
        Some(user) => state.store().is_watched(user.id, id).await?,
        None => false,
    };

    Ok(Json(ApiResponse::success(ListingDetailDto {
        listing: ListingDto::from(listing),
        creator,
        winner,
        bid_count,
        comments,
        watched,
    })))
}

/// POST /create
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CreateListingRequest>,
) -> Result<Json<ApiResponse<ListingDto>>, ApiError> {
    let user = require_session_user(&session).await?;

    let title = validation::validate_title(&payload.title)?.to_string();
    let description = validation::validate_description(&payload.description)?.to_string();
    let starting_bid = validation::validate_starting_bid(payload.starting_bid)?;
    let category = payload
        .category
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(validation::validate_category)
        .transpose()?;

    let listing = state
        .store()
        .create_listing(
            user.id,
            NewListing {
                title,
                description,
                starting_bid,
                image_url: payload.image_url.filter(|s| !s.is_empty()),
                category,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ListingDto::from(listing))))
}

/// GET /mylistings
pub async fn my_listings(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ListingDto>>>, ApiError> {
    let user = require_session_user(&session).await?;

    let listings = state.store().list_listings_by_owner(user.id).await?;
    let dtos: Vec<ListingDto> = listings.into_iter().map(ListingDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /categories
pub async fn list_categories() -> Json<ApiResponse<Vec<&'static str>>> {
    let names: Vec<&'static str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    Json(ApiResponse::success(names))
}

/// GET /categories/{name}
pub async fn listings_in_category(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<ListingDto>>>, ApiError> {
    let category = validation::validate_category(&name)?;

    let listings = state.store().list_listings_by_category(category).await?;
    let dtos: Vec<ListingDto> = listings.into_iter().map(ListingDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}
