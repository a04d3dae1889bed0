use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{comments, prelude::*};

/// A comment joined with its author's username for display.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i32,
    pub listing_id: i32,
    pub author: String,
    pub text: String,
    pub created_at: String,
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, listing_id: i32, user_id: i32, text: &str) -> Result<comments::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let active = comments::ActiveModel {
            listing_id: Set(listing_id),
            user_id: Set(user_id),
            text: Set(text.to_string()),
            created_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert comment")
    }

    /// Comments for a listing in insertion order.
    pub async fn list_for_listing(&self, listing_id: i32) -> Result<Vec<CommentRow>> {
        let rows = Comments::find()
            .filter(comments::Column::ListingId.eq(listing_id))
            .order_by_asc(comments::Column::Id)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to query comments")?;

        Ok(rows
            .into_iter()
            .map(|(comment, user)| CommentRow {
                id: comment.id,
                listing_id: comment.listing_id,
                author: user.map(|u| u.username).unwrap_or_default(),
                text: comment.text,
                created_at: comment.created_at,
            })
            .collect())
    }
}
