pub mod prelude;

pub mod bids;
pub mod comments;
pub mod listings;
pub mod users;
pub mod watchlist_items;
