use async_trait::async_trait;
use thiserror::Error;

use super::record::{Record, RecordId, RecordQuery, ZoneId};

// ============================================================================
// Error Types
// ============================================================================

/// Failures reported by a record store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ZoneError {
    /// The zone no longer exists, typically because the user deleted it
    /// from another device or the account settings.
    #[error("Zone was deleted by the user")]
    ZoneDeleted,

    /// The store refused the request (quota, permissions, invalid record).
    #[error("Record store rejected the request: {0}")]
    ServerRejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Record store error: {0}")]
    Other(String),
}

impl ZoneError {
    /// True for the one failure the sync layer recovers from on its own.
    pub fn is_zone_deleted(&self) -> bool {
        matches!(self, ZoneError::ZoneDeleted)
    }
}

// ============================================================================
// Store traits
// ============================================================================

/// Receives changes pulled by [`ZoneStore::fetch_changes`].
#[async_trait]
pub trait ZoneDelegate: Send + Sync {
    async fn apply_changes(
        &self,
        zone: &ZoneId,
        changed: Vec<Record>,
        deleted: Vec<RecordId>,
    ) -> Result<(), ZoneError>;
}

/// Zone-level operations offered by a managed record store.
///
/// Implementations own batching, throttling and conflict resolution. Every
/// operation reports either success or a single [`ZoneError`].
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Pull outstanding changes and hand them to the registered delegate.
    async fn fetch_changes(&self, zone: &ZoneId) -> Result<(), ZoneError>;

    async fn create_zone(&self, zone: &ZoneId) -> Result<(), ZoneError>;

    /// Create each record unless one with the same ID already exists.
    async fn save_if_new(&self, records: Vec<Record>) -> Result<(), ZoneError>;

    /// Save `records` (create or overwrite) and delete `delete_ids` in one request.
    async fn modify(&self, records: Vec<Record>, delete_ids: Vec<RecordId>)
        -> Result<(), ZoneError>;

    /// Delete every record in `zone` matched by `query`.
    async fn delete_matching(&self, zone: &ZoneId, query: RecordQuery) -> Result<(), ZoneError>;
}
