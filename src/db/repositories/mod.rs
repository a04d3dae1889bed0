pub mod bid;
pub mod comment;
pub mod listing;
pub mod user;
pub mod watchlist;
