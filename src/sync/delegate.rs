//! Applies changes pulled from the `Articles` zone to the local database.

use async_trait::async_trait;

use super::articles_zone::{
    article_fields, status_fields, RecordKey, ARTICLE_RECORD_TYPE, STATUS_RECORD_TYPE,
};
use crate::cloud::{Record, RecordId, ZoneDelegate, ZoneError, ZoneId};
use crate::models::{Article, ArticleStatus, Author};
use crate::storage::Database;

/// A remote status record decoded into local terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecordChange {
    pub article_id: String,
    pub read: bool,
    pub starred: bool,
    pub web_feed_external_id: Option<String>,
}

/// A remote article record decoded into local terms. The parent feed is
/// still identified by URL; it is resolved against the database on apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecordChange {
    pub web_feed_url: Option<String>,
    pub article: Article,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    Status(StatusRecordChange),
    Article(Box<ArticleRecordChange>),
    StatusDeleted(String),
    ArticleDeleted(String),
}

/// Decode one changed record. Unknown record types or names yield `None`.
pub fn decode_record(record: &Record) -> Option<RemoteChange> {
    match (record.record_type.as_str(), RecordKey::parse(&record.id.name)) {
        (STATUS_RECORD_TYPE, Some(RecordKey::Status(article_id))) => {
            Some(RemoteChange::Status(StatusRecordChange {
                article_id: article_id.to_string(),
                read: record.string(status_fields::READ) == Some("1"),
                starred: record.string(status_fields::STARRED) == Some("1"),
                web_feed_external_id: record
                    .string(status_fields::WEB_FEED_EXTERNAL_ID)
                    .map(str::to_string),
            }))
        }
        (ARTICLE_RECORD_TYPE, Some(RecordKey::Article(article_id))) => Some(
            RemoteChange::Article(Box::new(decode_article(article_id, record))),
        ),
        _ => {
            tracing::debug!(record = %record.id, record_type = %record.record_type, "Ignoring unrecognized record");
            None
        }
    }
}

fn decode_article(article_id: &str, record: &Record) -> ArticleRecordChange {
    use article_fields::*;

    let text = |key: &str| record.string(key).map(str::to_string);
    let authors = record
        .string_list(PARSED_AUTHORS)
        .unwrap_or_default()
        .iter()
        .filter_map(|json| match serde_json::from_str::<Author>(json) {
            Ok(author) => Some(author),
            Err(e) => {
                tracing::warn!(article_id, error = %e, "Skipping undecodable author");
                None
            }
        })
        .collect();

    ArticleRecordChange {
        web_feed_url: text(WEB_FEED_URL),
        article: Article {
            article_id: article_id.to_string(),
            web_feed_id: String::new(),
            title: text(TITLE),
            content_html: text(CONTENT_HTML),
            content_text: text(CONTENT_TEXT),
            url: text(URL),
            external_url: text(EXTERNAL_URL),
            summary: text(SUMMARY),
            image_url: text(IMAGE_URL),
            date_published: record.date(DATE_PUBLISHED),
            date_modified: record.date(DATE_MODIFIED),
            authors,
            status: ArticleStatus::unread(article_id),
        },
    }
}

/// Decode a deleted record ID. Names without a known prefix yield `None`.
pub fn decode_deletion(id: &RecordId) -> Option<RemoteChange> {
    match RecordKey::parse(&id.name) {
        Some(RecordKey::Status(article_id)) => {
            Some(RemoteChange::StatusDeleted(article_id.to_string()))
        }
        Some(RecordKey::Article(article_id)) => {
            Some(RemoteChange::ArticleDeleted(article_id.to_string()))
        }
        None => {
            tracing::debug!(record = %id, "Ignoring unrecognized deletion");
            None
        }
    }
}

/// Zone delegate that writes remote article changes into the local database.
pub struct ArticlesZoneDelegate {
    db: Database,
}

impl ArticlesZoneDelegate {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Apply decoded changes in order: article content, then statuses, then
    /// deletions, so a status in the same batch wins over the default status
    /// created with its article.
    pub async fn apply(&self, changes: Vec<RemoteChange>) -> anyhow::Result<()> {
        let mut articles = Vec::new();
        let mut statuses = Vec::new();
        let mut deletions = Vec::new();
        for change in changes {
            match change {
                RemoteChange::Article(change) => articles.push(*change),
                RemoteChange::Status(change) => statuses.push(change),
                other => deletions.push(other),
            }
        }

        let mut resolved = Vec::with_capacity(articles.len());
        for ArticleRecordChange {
            web_feed_url,
            mut article,
        } in articles
        {
            let feed = match web_feed_url.as_deref() {
                Some(url) => self.db.get_feed_by_url(url).await?,
                None => None,
            };
            match feed {
                Some(feed) => {
                    article.web_feed_id = feed.feed_id;
                    resolved.push(article);
                }
                None => {
                    tracing::warn!(
                        article_id = %article.article_id,
                        web_feed_url = ?web_feed_url,
                        "Skipping remote article for unknown feed"
                    );
                }
            }
        }
        self.db.upsert_articles(&resolved).await?;

        for change in &statuses {
            self.db
                .upsert_status(&ArticleStatus {
                    article_id: change.article_id.clone(),
                    read: change.read,
                    starred: change.starred,
                })
                .await?;
        }

        for change in deletions {
            match change {
                RemoteChange::StatusDeleted(article_id) => {
                    // Gone remotely means no longer worth keeping: read and unstarred
                    self.db
                        .upsert_status(&ArticleStatus {
                            article_id,
                            read: true,
                            starred: false,
                        })
                        .await?;
                }
                RemoteChange::ArticleDeleted(article_id) => {
                    self.db.delete_article_content(&article_id).await?;
                }
                RemoteChange::Article(_) | RemoteChange::Status(_) => {}
            }
        }

        tracing::debug!(
            articles = resolved.len(),
            statuses = statuses.len(),
            "Applied remote article changes"
        );
        Ok(())
    }
}

#[async_trait]
impl ZoneDelegate for ArticlesZoneDelegate {
    async fn apply_changes(
        &self,
        zone: &ZoneId,
        changed: Vec<Record>,
        deleted: Vec<RecordId>,
    ) -> Result<(), ZoneError> {
        tracing::debug!(
            zone = %zone,
            changed = changed.len(),
            deleted = deleted.len(),
            "Received remote changes"
        );
        let changes = changed
            .iter()
            .filter_map(decode_record)
            .chain(deleted.iter().filter_map(decode_deletion))
            .collect();
        self.apply(changes)
            .await
            .map_err(|e| ZoneError::Other(format!("Failed to apply remote changes: {e}")))
    }
}
