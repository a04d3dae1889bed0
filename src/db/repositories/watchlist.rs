use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{listings, prelude::*, watchlist_items};

pub struct WatchlistRepository {
    conn: DatabaseConnection,
}

impl WatchlistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Idempotent set insert. Returns false when already present.
    pub async fn add(&self, user_id: i32, listing_id: i32) -> Result<bool> {
        if self.contains(user_id, listing_id).await? {
            return Ok(false);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let active = watchlist_items::ActiveModel {
            user_id: Set(user_id),
            listing_id: Set(listing_id),
            created_at: Set(now),
            ..Default::default()
        };

        // The unique (user_id, listing_id) index absorbs insert races
        match active.insert(&self.conn).await {
            Ok(_) => {
                info!("User {} added listing {} to watchlist", user_id, listing_id);
                Ok(true)
            }
            Err(e) if e.to_string().to_lowercase().contains("unique") => Ok(false),
            Err(e) => Err(e).context("Failed to insert watchlist item"),
        }
    }

    /// Idempotent set remove. Returns false when not present.
    pub async fn remove(&self, user_id: i32, listing_id: i32) -> Result<bool> {
        let result = WatchlistItems::delete_many()
            .filter(watchlist_items::Column::UserId.eq(user_id))
            .filter(watchlist_items::Column::ListingId.eq(listing_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete watchlist item")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn contains(&self, user_id: i32, listing_id: i32) -> Result<bool> {
        let existing = WatchlistItems::find()
            .filter(watchlist_items::Column::UserId.eq(user_id))
            .filter(watchlist_items::Column::ListingId.eq(listing_id))
            .one(&self.conn)
            .await
            .context("Failed to query watchlist membership")?;

        Ok(existing.is_some())
    }

    pub async fn listings_for_user(&self, user_id: i32) -> Result<Vec<listings::Model>> {
        let rows = WatchlistItems::find()
            .filter(watchlist_items::Column::UserId.eq(user_id))
            .order_by_desc(watchlist_items::Column::Id)
            .find_also_related(Listings)
            .all(&self.conn)
            .await
            .context("Failed to query watchlist listings")?;

        Ok(rows.into_iter().filter_map(|(_, listing)| listing).collect())
    }
}
