pub use super::bids::Entity as Bids;
pub use super::comments::Entity as Comments;
pub use super::listings::Entity as Listings;
pub use super::users::Entity as Users;
pub use super::watchlist_items::Entity as WatchlistItems;
