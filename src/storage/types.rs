use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Article, ArticleStatus, Author, WebFeed};

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of feedsync appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// one of these messages.
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Query results
// ============================================================================

/// A feed together with the number of unread articles it holds.
#[derive(Debug, Clone)]
pub struct FeedUnread {
    pub feed: WebFeed,
    pub unread_count: i64,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedDbRow {
    pub feed_id: String,
    pub url: String,
    pub external_id: Option<String>,
    pub title: String,
    pub home_page_url: Option<String>,
    pub icon_url: Option<String>,
}

impl FeedDbRow {
    pub(crate) fn into_feed(self) -> WebFeed {
        WebFeed {
            feed_id: self.feed_id,
            url: self.url,
            external_id: self.external_id,
            title: self.title,
            home_page_url: self.home_page_url,
            icon_url: self.icon_url,
        }
    }
}

/// Article joined with its status row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleDbRow {
    pub article_id: String,
    pub feed_id: String,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
    pub url: Option<String>,
    pub external_url: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    /// Milliseconds since the epoch.
    pub date_published: Option<i64>,
    pub date_modified: Option<i64>,
    pub authors: Option<String>,
    pub read: bool,
    pub starred: bool,
}

impl ArticleDbRow {
    pub(crate) fn into_article(self) -> Article {
        let authors = match self.authors.as_deref() {
            Some(json) => serde_json::from_str::<Vec<Author>>(json).unwrap_or_else(|e| {
                tracing::warn!(article_id = %self.article_id, error = %e, "Discarding undecodable authors column");
                Vec::new()
            }),
            None => Vec::new(),
        };
        Article {
            status: ArticleStatus {
                article_id: self.article_id.clone(),
                read: self.read,
                starred: self.starred,
            },
            article_id: self.article_id,
            web_feed_id: self.feed_id,
            title: self.title,
            content_html: self.content_html,
            content_text: self.content_text,
            url: self.url,
            external_url: self.external_url,
            summary: self.summary,
            image_url: self.image_url,
            date_published: from_millis(self.date_published),
            date_modified: from_millis(self.date_modified),
            authors,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StatusDbRow {
    pub article_id: String,
    pub read: bool,
    pub starred: bool,
}

impl StatusDbRow {
    pub(crate) fn into_status(self) -> ArticleStatus {
        ArticleStatus {
            article_id: self.article_id,
            read: self.read,
            starred: self.starred,
        }
    }
}

pub(crate) fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}
