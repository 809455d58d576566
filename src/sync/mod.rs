//! Article sync against the remote `Articles` zone.
//!
//! - `session` - the account object that owns the store handle and feed directory
//! - `articles_zone` - local → remote: record construction and reconciliation
//! - `delegate` - remote → local: applying fetched changes to the database

mod articles_zone;
mod delegate;
mod session;

use thiserror::Error;

use crate::cloud::ZoneError;

pub use articles_zone::{
    article_fields, status_fields, ArticlesZone, RecordKey, ZoneBatches, ARTICLES_ZONE_NAME,
    ARTICLE_RECORD_TYPE, STATUS_RECORD_TYPE,
};
pub use delegate::{
    decode_deletion, decode_record, ArticleRecordChange, ArticlesZoneDelegate, RemoteChange,
    StatusRecordChange,
};
pub use session::SyncSession;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SyncError {
    /// The account session backing the adapter has gone away.
    #[error("Sync session is no longer available")]
    SessionUnavailable,

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error("Failed to encode record field: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SyncError {
    /// The underlying store error, if this failure came from the store.
    pub fn zone_error(&self) -> Option<&ZoneError> {
        match self {
            SyncError::Zone(e) => Some(e),
            _ => None,
        }
    }
}
