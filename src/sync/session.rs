use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::cloud::ZoneStore;
use crate::models::WebFeed;
use crate::storage::Database;

/// The signed-in account as seen by the sync layer.
///
/// Owns the record store handle and a directory of known feeds. Zone
/// adapters only hold a `Weak` reference to it, so signing out (dropping the
/// session) turns further sync calls into precondition failures.
pub struct SyncSession {
    store: Arc<dyn ZoneStore>,
    feeds: RwLock<HashMap<String, WebFeed>>,
}

impl SyncSession {
    pub fn new(store: Arc<dyn ZoneStore>) -> Self {
        Self {
            store,
            feeds: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ZoneStore> {
        &self.store
    }

    /// Add or replace feeds in the directory, keyed by `feed_id`.
    pub fn register_feeds(&self, feeds: impl IntoIterator<Item = WebFeed>) {
        let mut directory = self.feeds.write().unwrap_or_else(PoisonError::into_inner);
        for feed in feeds {
            directory.insert(feed.feed_id.clone(), feed);
        }
    }

    /// Replace the directory with every feed stored in `db`.
    pub async fn load_feeds(&self, db: &Database) -> anyhow::Result<usize> {
        let feeds = db.get_feeds().await?;
        let count = feeds.len();
        let mut directory = self.feeds.write().unwrap_or_else(PoisonError::into_inner);
        directory.clear();
        directory.extend(feeds.into_iter().map(|f| (f.feed_id.clone(), f)));
        tracing::debug!(feeds = count, "Loaded feed directory");
        Ok(count)
    }

    pub fn web_feed(&self, feed_id: &str) -> Option<WebFeed> {
        self.feeds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(feed_id)
            .cloned()
    }
}
