use serde::Serialize;

use crate::db::{BidRow, CommentRow};
use crate::entities::listings;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingDto {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub starting_bid: f64,
    pub current_bid: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub active: bool,
    pub created_at: String,
}

impl From<listings::Model> for ListingDto {
    fn from(model: listings::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            starting_bid: model.starting_bid,
            current_bid: model.current_bid,
            image_url: model.image_url,
            category: model.category,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

/// Listing detail page payload: the listing plus everything the page
/// shows alongside it.
#[derive(Debug, Serialize)]
pub struct ListingDetailDto {
    #[serde(flatten)]
    pub listing: ListingDto,
    pub creator: String,
    pub winner: Option<String>,
    pub bid_count: u64,
    pub comments: Vec<CommentDto>,
    /// Whether the session user has this listing on their watchlist.
    /// Always false for anonymous visitors.
    pub watched: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: i32,
    pub author: String,
    pub text: String,
    pub created_at: String,
}

impl From<CommentRow> for CommentDto {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            author: row.author,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BidDto {
    pub bidder: String,
    pub amount: f64,
    pub created_at: String,
}

impl From<BidRow> for BidDto {
    fn from(row: BidRow) -> Self {
        Self {
            bidder: row.bidder,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}
