use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::{bids, prelude::*};

/// A bid joined with its bidder's username for display.
#[derive(Debug, Clone)]
pub struct BidRow {
    pub id: i32,
    pub listing_id: i32,
    pub bidder: String,
    pub amount: f64,
    pub created_at: String,
}

pub struct BidRepository {
    conn: DatabaseConnection,
}

impl BidRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn count_for_listing(&self, listing_id: i32) -> Result<u64> {
        Bids::find()
            .filter(bids::Column::ListingId.eq(listing_id))
            .count(&self.conn)
            .await
            .context("Failed to count bids")
    }

    /// Bid history for a listing, newest first.
    pub async fn history_for_listing(&self, listing_id: i32) -> Result<Vec<BidRow>> {
        let rows = Bids::find()
            .filter(bids::Column::ListingId.eq(listing_id))
            .order_by_desc(bids::Column::Amount)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to query bid history")?;

        Ok(rows
            .into_iter()
            .map(|(bid, user)| BidRow {
                id: bid.id,
                listing_id: bid.listing_id,
                bidder: user.map(|u| u.username).unwrap_or_default(),
                amount: bid.amount,
                created_at: bid.created_at,
            })
            .collect())
    }
}
