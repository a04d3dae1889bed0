use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::listings;
use crate::models::Category;

pub mod migrator;
pub mod repositories;

pub use repositories::bid::BidRow;
pub use repositories::comment::CommentRow;
pub use repositories::listing::{BidOutcome, CloseOutcome, NewListing};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn listing_repo(&self) -> repositories::listing::ListingRepository {
        repositories::listing::ListingRepository::new(self.conn.clone())
    }

    fn bid_repo(&self) -> repositories::bid::BidRepository {
        repositories::bid::BidRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn watchlist_repo(&self) -> repositories::watchlist::WatchlistRepository {
        repositories::watchlist::WatchlistRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().create(username, email, password).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    // ========================================================================
    // Listings
    // ========================================================================

    pub async fn create_listing(&self, creator_id: i32, new: NewListing) -> Result<listings::Model> {
        self.listing_repo().create(creator_id, new).await
    }

    pub async fn get_listing(&self, id: i32) -> Result<Option<listings::Model>> {
        self.listing_repo().get(id).await
    }

    pub async fn list_active_listings(&self) -> Result<Vec<listings::Model>> {
        self.listing_repo().list_active().await
    }

    pub async fn list_listings_by_category(&self, category: Category) -> Result<Vec<listings::Model>> {
        self.listing_repo().list_by_category(category).await
    }

    pub async fn list_listings_by_owner(&self, user_id: i32) -> Result<Vec<listings::Model>> {
        self.listing_repo().list_by_owner(user_id).await
    }

    pub async fn place_bid(&self, listing_id: i32, user_id: i32, amount: f64) -> Result<BidOutcome> {
        self.listing_repo().place_bid(listing_id, user_id, amount).await
    }

    pub async fn close_listing(&self, listing_id: i32, requester_id: i32) -> Result<CloseOutcome> {
        self.listing_repo().close(listing_id, requester_id).await
    }

    // ========================================================================
    // Bids
    // ========================================================================

    pub async fn count_bids(&self, listing_id: i32) -> Result<u64> {
        self.bid_repo().count_for_listing(listing_id).await
    }

    pub async fn get_bid_history(&self, listing_id: i32) -> Result<Vec<BidRow>> {
        self.bid_repo().history_for_listing(listing_id).await
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub async fn add_comment(&self, listing_id: i32, user_id: i32, text: &str) -> Result<CommentRow> {
        let model = self.comment_repo().add(listing_id, user_id, text).await?;
        let author = self
            .get_user_by_id(model.user_id)
            .await?
            .map(|u| u.username)
            .unwrap_or_default();

        Ok(CommentRow {
            id: model.id,
            listing_id: model.listing_id,
            author,
            text: model.text,
            created_at: model.created_at,
        })
    }

    pub async fn get_comments(&self, listing_id: i32) -> Result<Vec<CommentRow>> {
        self.comment_repo().list_for_listing(listing_id).await
    }

    // ========================================================================
    // Watchlist
    // ========================================================================

    pub async fn add_to_watchlist(&self, user_id: i32, listing_id: i32) -> Result<bool> {
        self.watchlist_repo().add(user_id, listing_id).await
    }

    pub async fn remove_from_watchlist(&self, user_id: i32, listing_id: i32) -> Result<bool> {
        self.watchlist_repo().remove(user_id, listing_id).await
    }

    pub async fn is_watched(&self, user_id: i32, listing_id: i32) -> Result<bool> {
        self.watchlist_repo().contains(user_id, listing_id).await
    }

    pub async fn get_watchlist(&self, user_id: i32) -> Result<Vec<listings::Model>> {
        self.watchlist_repo().listings_for_user(user_id).await
    }
}
