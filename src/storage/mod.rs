//! Local SQLite storage for feeds, article content and article statuses.

mod articles;
mod feeds;
mod schema;
mod statuses;
mod types;

pub use schema::Database;
pub use types::{DatabaseError, FeedUnread};
