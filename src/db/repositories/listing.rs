use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use tracing::info;

use crate::entities::{bids, listings, prelude::*};
use crate::models::Category;

/// Fields for a new listing, already validated by the API layer.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub starting_bid: f64,
    pub image_url: Option<String>,
    pub category: Option<Category>,
}

/// Outcome of a bid placement attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BidOutcome {
    Accepted,
    /// Amount did not exceed the leading bid (current bid if any,
    /// otherwise the starting bid).
    TooLow { leading: f64 },
    Closed,
    NotFound,
}

/// Outcome of a close attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed { winner_id: Option<i32> },
    AlreadyClosed,
    Forbidden,
    NotFound,
}

pub struct ListingRepository {
    conn: DatabaseConnection,
}

impl ListingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, creator_id: i32, new: NewListing) -> Result<listings::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let active = listings::ActiveModel {
            creator_id: Set(creator_id),
            title: Set(new.title),
            description: Set(new.description),
            starting_bid: Set(new.starting_bid),
            current_bid: Set(None),
            image_url: Set(new.image_url),
            category: Set(new.category.map(|c| c.as_str().to_string())),
            active: Set(true),
            winner_id: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert listing")?;
        info!("Listing {} created by user {}", model.id, creator_id);
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<listings::Model>> {
        Listings::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query listing")
    }

    pub async fn list_active(&self) -> Result<Vec<listings::Model>> {
        Listings::find()
            .filter(listings::Column::Active.eq(true))
            .order_by_desc(listings::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query active listings")
    }

    pub async fn list_by_category(&self, category: Category) -> Result<Vec<listings::Model>> {
        Listings::find()
            .filter(listings::Column::Category.eq(category.as_str()))
            .order_by_desc(listings::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query listings by category")
    }

    pub async fn list_by_owner(&self, user_id: i32) -> Result<Vec<listings::Model>> {
        Listings::find()
            .filter(listings::Column::CreatorId.eq(user_id))
            .order_by_desc(listings::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query listings by owner")
    }

    /// Place a bid. The read-compare-update runs as a single transaction
    /// with a guarded `UPDATE`, so two racing bids on the same listing
    /// cannot both be accepted against the same leading amount.
    pub async fn place_bid(&self, listing_id: i32, user_id: i32, amount: f64) -> Result<BidOutcome> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin bid transaction")?;

        // Accepted iff the listing is active and the amount strictly
        // exceeds COALESCE(current_bid, starting_bid).
        let accepted = Listings::update_many()
            .col_expr(listings::Column::CurrentBid, Expr::value(amount))
            .filter(listings::Column::Id.eq(listing_id))
            .filter(listings::Column::Active.eq(true))
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(listings::Column::CurrentBid.is_null())
                            .add(listings::Column::StartingBid.lt(amount)),
                    )
                    .add(listings::Column::CurrentBid.lt(amount)),
            )
            .exec(&txn)
            .await
            .context("Failed to update leading bid")?
            .rows_affected;

        if accepted == 0 {
            let listing = Listings::find_by_id(listing_id)
                .one(&txn)
                .await
                .context("Failed to query listing for bid rejection")?;
            txn.rollback()
                .await
                .context("Failed to roll back bid transaction")?;

            return Ok(match listing {
                None => BidOutcome::NotFound,
                Some(l) if !l.active => BidOutcome::Closed,
                Some(l) => BidOutcome::TooLow {
                    leading: l.current_bid.unwrap_or(l.starting_bid),
                },
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        let bid = bids::ActiveModel {
            listing_id: Set(listing_id),
            user_id: Set(user_id),
            amount: Set(amount),
            created_at: Set(now),
            ..Default::default()
        };
        bid.insert(&txn).await.context("Failed to insert bid")?;

        txn.commit()
            .await
            .context("Failed to commit bid transaction")?;

        info!(
            "Bid of {:.2} accepted on listing {} from user {}",
            amount, listing_id, user_id
        );
        Ok(BidOutcome::Accepted)
    }

    /// Close a listing. Only the creator may close; closing is terminal
    /// and idempotent. The winner is the bidder of the highest amount,
    /// or nobody when no bids were placed.
    pub async fn close(&self, listing_id: i32, requester_id: i32) -> Result<CloseOutcome> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin close transaction")?;

        let Some(listing) = Listings::find_by_id(listing_id)
            .one(&txn)
            .await
            .context("Failed to query listing for close")?
        else {
            txn.rollback().await.ok();
            return Ok(CloseOutcome::NotFound);
        };

        if listing.creator_id != requester_id {
            txn.rollback().await.ok();
            return Ok(CloseOutcome::Forbidden);
        }

        if !listing.active {
            txn.rollback().await.ok();
            return Ok(CloseOutcome::AlreadyClosed);
        }

        let winner_id = Bids::find()
            .filter(bids::Column::ListingId.eq(listing_id))
            .order_by_desc(bids::Column::Amount)
            .one(&txn)
            .await
            .context("Failed to query winning bid")?
            .map(|b| b.user_id);

        // The `active` guard makes a concurrent double-close lose the race
        let closed = Listings::update_many()
            .col_expr(listings::Column::Active, Expr::value(false))
            .col_expr(listings::Column::WinnerId, Expr::value(winner_id))
            .filter(listings::Column::Id.eq(listing_id))
            .filter(listings::Column::Active.eq(true))
            .exec(&txn)
            .await
            .context("Failed to deactivate listing")?
            .rows_affected;

        txn.commit()
            .await
            .context("Failed to commit close transaction")?;

        if closed == 0 {
            return Ok(CloseOutcome::AlreadyClosed);
        }

        info!(
            "Listing {} closed by user {}, winner: {:?}",
            listing_id, requester_id, winner_id
        );
        Ok(CloseOutcome::Closed { winner_id })
    }
}
