//! Mirrors local articles and their read/starred state into the remote
//! `Articles` zone.
//!
//! Each article maps to two records: an `ArticleStatus` record (`s|<id>`)
//! holding the read/starred flags, and an `Article` record (`a|<id>`)
//! holding content. The article record references its status record with
//! `DeleteSelf`, so deleting a status removes the content with it.
//!
//! Only unread or starred articles are worth keeping remotely. A plain
//! read/starred toggle rewrites the status record and never resends content.

use std::future::Future;
use std::sync::{Arc, Weak};

use super::session::SyncSession;
use super::SyncError;
use crate::cloud::{
    FieldValue, Record, RecordId, RecordQuery, RecordReference, ReferenceAction, ZoneError,
    ZoneId, ZoneStore,
};
use crate::models::{Article, ArticleStatus, StatusKey, StatusUpdate, WebFeed};

pub const ARTICLES_ZONE_NAME: &str = "Articles";

pub const ARTICLE_RECORD_TYPE: &str = "Article";
pub const STATUS_RECORD_TYPE: &str = "ArticleStatus";

const ARTICLE_ID_PREFIX: &str = "a|";
const STATUS_ID_PREFIX: &str = "s|";

/// Field names of `Article` records.
pub mod article_fields {
    pub const ARTICLE_STATUS: &str = "articleStatus";
    pub const WEB_FEED_URL: &str = "webFeedURL";
    pub const UNIQUE_ID: &str = "uniqueID";
    pub const TITLE: &str = "title";
    pub const CONTENT_HTML: &str = "contentHTML";
    pub const CONTENT_TEXT: &str = "contentText";
    pub const URL: &str = "url";
    pub const EXTERNAL_URL: &str = "externalURL";
    pub const SUMMARY: &str = "summary";
    pub const IMAGE_URL: &str = "imageURL";
    pub const DATE_PUBLISHED: &str = "datePublished";
    pub const DATE_MODIFIED: &str = "dateModified";
    pub const PARSED_AUTHORS: &str = "parsedAuthors";
}

/// Field names of `ArticleStatus` records.
pub mod status_fields {
    pub const WEB_FEED_EXTERNAL_ID: &str = "webFeedExternalID";
    pub const READ: &str = "read";
    pub const STARRED: &str = "starred";
}

/// Which kind of record a record name refers to, with the article ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey<'a> {
    Article(&'a str),
    Status(&'a str),
}

impl<'a> RecordKey<'a> {
    pub fn parse(record_name: &'a str) -> Option<Self> {
        if let Some(id) = record_name.strip_prefix(ARTICLE_ID_PREFIX) {
            Some(RecordKey::Article(id))
        } else {
            record_name
                .strip_prefix(STATUS_ID_PREFIX)
                .map(RecordKey::Status)
        }
    }
}

/// Flags travel as the strings "1"/"0", not native booleans.
pub(crate) fn encode_flag(flag: bool) -> &'static str {
    if flag {
        "1"
    } else {
        "0"
    }
}

/// Records grouped by how they must be submitted.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ZoneBatches {
    /// Saved with create-if-not-present semantics.
    pub create: Vec<Record>,
    /// Saved (overwriting) together with `delete`.
    pub update: Vec<Record>,
    pub delete: Vec<RecordId>,
}

impl ZoneBatches {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Adapter between local article state and the remote `Articles` zone.
pub struct ArticlesZone {
    session: Weak<SyncSession>,
    zone: ZoneId,
}

impl ArticlesZone {
    pub fn new(session: &Arc<SyncSession>) -> Self {
        Self {
            session: Arc::downgrade(session),
            zone: ZoneId::current_user(ARTICLES_ZONE_NAME),
        }
    }

    pub fn zone_id(&self) -> &ZoneId {
        &self.zone
    }

    fn session(&self) -> Result<Arc<SyncSession>, SyncError> {
        self.session.upgrade().ok_or(SyncError::SessionUnavailable)
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Pull outstanding remote changes.
    ///
    /// Changes are delivered through the store's delegate, not returned here.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let session = self.session()?;
        let store = session.store().as_ref();
        self.with_zone_recovery(store, "refresh", || store.fetch_changes(&self.zone))
            .await?;
        Ok(())
    }

    /// Create records for newly arrived articles that are unread or starred.
    pub async fn save_new_articles(&self, articles: &[Article]) -> Result<(), SyncError> {
        if articles.is_empty() {
            return Ok(());
        }
        let session = self.session()?;

        let mut records = Vec::new();
        for article in articles.iter().filter(|a| a.is_worth_syncing()) {
            let feed = session.web_feed(&article.web_feed_id);
            records.push(self.make_status_record(&article.status, feed.as_ref()));
            records.push(self.make_article_record(article, feed.as_ref())?);
        }

        if records.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            articles = records.len() / 2,
            skipped = articles.len() - records.len() / 2,
            "Saving new articles"
        );
        let store = session.store().as_ref();
        self.with_zone_recovery(store, "save_new_articles", || {
            store.save_if_new(records.clone())
        })
        .await?;
        Ok(())
    }

    /// Delete every status record (and, by cascade, article record) of a feed.
    pub async fn delete_articles(&self, feed_external_id: &str) -> Result<(), SyncError> {
        let session = self.session()?;
        let store = session.store().as_ref();
        let query = RecordQuery::new(
            STATUS_RECORD_TYPE,
            status_fields::WEB_FEED_EXTERNAL_ID,
            feed_external_id,
        );

        tracing::debug!(feed_external_id, "Deleting remote articles for feed");
        self.with_zone_recovery(store, "delete_articles", || {
            store.delete_matching(&self.zone, query.clone())
        })
        .await?;
        Ok(())
    }

    /// Push a list of status changes (optionally with article content).
    ///
    /// The create batch goes first with create-if-not-present semantics;
    /// the update and delete batches then go out as one modify request.
    ///
    /// # Arguments
    ///
    /// * `updates` - Status changes as produced by local mark operations.
    ///   An update carrying its article also uploads the article body.
    ///
    /// # Returns
    ///
    /// `Ok(())` once both stages succeeded, or immediately for an empty
    /// list without contacting the store.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SessionUnavailable`] if the session was dropped
    /// - [`SyncError::Zone`] if either stage fails, including a second
    ///   `ZoneDeleted` after the zone was recreated once
    /// - [`SyncError::Encode`] if article authors cannot be serialized
    pub async fn modify_articles(&self, updates: &[StatusUpdate]) -> Result<(), SyncError> {
        if updates.is_empty() {
            return Ok(());
        }

        let session = self.session()?;
        let batches = self.classify(&session, updates)?;
        if batches.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            create = batches.create.len(),
            update = batches.update.len(),
            delete = batches.delete.len(),
            "Modifying remote articles"
        );
        let store = session.store().as_ref();
        self.with_zone_recovery(store, "modify_articles", || {
            Self::submit(store, &batches)
        })
        .await?;
        Ok(())
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Sort status updates into create, update and delete batches.
    ///
    /// Anything that is not a new article, a star, an un-read or a deletion
    /// (notably marking an article read) both rewrites the status record and
    /// queues that same record for deletion.
    pub fn classify(
        &self,
        session: &SyncSession,
        updates: &[StatusUpdate],
    ) -> Result<ZoneBatches, SyncError> {
        let mut batches = ZoneBatches::default();

        for update in updates {
            let feed = update
                .article
                .as_ref()
                .and_then(|article| session.web_feed(&article.web_feed_id));

            match (update.change.key, update.change.flag) {
                (StatusKey::New, true) => {
                    batches
                        .create
                        .push(self.make_status_record(&update.status, feed.as_ref()));
                    if let Some(article) = &update.article {
                        batches
                            .create
                            .push(self.make_article_record(article, feed.as_ref())?);
                    }
                }
                (StatusKey::Starred, true) | (StatusKey::Read, false) => {
                    batches
                        .update
                        .push(self.make_status_record(&update.status, feed.as_ref()));
                    if let Some(article) = &update.article {
                        batches
                            .update
                            .push(self.make_article_record(article, feed.as_ref())?);
                    }
                }
                (StatusKey::Deleted, true) => {
                    batches
                        .delete
                        .push(self.status_record_id(update.article_id()));
                }
                _ => {
                    batches
                        .update
                        .push(self.make_status_record(&update.status, feed.as_ref()));
                    batches
                        .delete
                        .push(self.status_record_id(update.article_id()));
                }
            }
        }

        Ok(batches)
    }

    async fn submit(store: &dyn ZoneStore, batches: &ZoneBatches) -> Result<(), ZoneError> {
        if !batches.create.is_empty() {
            store.save_if_new(batches.create.clone()).await?;
        }
        if !batches.update.is_empty() || !batches.delete.is_empty() {
            store
                .modify(batches.update.clone(), batches.delete.clone())
                .await?;
        }
        Ok(())
    }

    /// Run `attempt`; if the zone turns out to have been deleted, recreate
    /// it and run `attempt` exactly once more. Other failures pass through.
    async fn with_zone_recovery<F, Fut>(
        &self,
        store: &dyn ZoneStore,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<(), ZoneError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ZoneError>>,
    {
        match attempt().await {
            Err(ZoneError::ZoneDeleted) => {
                tracing::info!(zone = %self.zone, operation, "Zone was deleted, recreating and retrying");
                store.create_zone(&self.zone).await?;
                attempt().await
            }
            result => result,
        }
    }

    // ========================================================================
    // Record construction
    // ========================================================================

    pub fn article_record_id(&self, article_id: &str) -> RecordId {
        RecordId::new(format!("{ARTICLE_ID_PREFIX}{article_id}"), &self.zone)
    }

    pub fn status_record_id(&self, article_id: &str) -> RecordId {
        RecordId::new(format!("{STATUS_ID_PREFIX}{article_id}"), &self.zone)
    }

    /// Build the content record for `article`.
    ///
    /// Absent optional values leave their field out entirely; with no
    /// authors, `parsedAuthors` is omitted rather than set to an empty list.
    pub fn make_article_record(
        &self,
        article: &Article,
        feed: Option<&WebFeed>,
    ) -> Result<Record, SyncError> {
        use article_fields::*;

        let mut record = Record::new(
            ARTICLE_RECORD_TYPE,
            self.article_record_id(&article.article_id),
        );

        record.set(
            ARTICLE_STATUS,
            FieldValue::Reference(RecordReference {
                target: self.status_record_id(&article.article_id),
                action: ReferenceAction::DeleteSelf,
            }),
        );
        record.set_string(WEB_FEED_URL, feed.map(|f| f.url.as_str()));
        record.set_string(UNIQUE_ID, Some(article.article_id.as_str()));
        record.set_string(TITLE, article.title.as_deref());
        record.set_string(CONTENT_HTML, article.content_html.as_deref());
        record.set_string(CONTENT_TEXT, article.content_text.as_deref());
        record.set_string(URL, article.url.as_deref());
        record.set_string(EXTERNAL_URL, article.external_url.as_deref());
        record.set_string(SUMMARY, article.summary.as_deref());
        record.set_string(IMAGE_URL, article.image_url.as_deref());
        record.set_date(DATE_PUBLISHED, article.date_published);
        record.set_date(DATE_MODIFIED, article.date_modified);

        if !article.authors.is_empty() {
            let authors = article
                .authors
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            record.set(PARSED_AUTHORS, FieldValue::StringList(authors));
        }

        Ok(record)
    }

    pub fn make_status_record(&self, status: &ArticleStatus, feed: Option<&WebFeed>) -> Record {
        use status_fields::*;

        let mut record = Record::new(
            STATUS_RECORD_TYPE,
            self.status_record_id(&status.article_id),
        );
        record.set_string(
            WEB_FEED_EXTERNAL_ID,
            feed.and_then(|f| f.external_id.as_deref()),
        );
        record.set_string(READ, Some(encode_flag(status.read)));
        record.set_string(STARRED, Some(encode_flag(status.starred)));
        record
    }
}
