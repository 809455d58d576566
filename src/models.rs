//! Local value types shared by storage, sync and the sidebar.
//!
//! `Article` is immutable once parsed. `ArticleStatus` is the mutable
//! read/starred state keyed by the same article ID, and `StatusUpdate`
//! carries a status change (optionally with the article body) to the
//! sync layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Feeds
// ============================================================================

/// A subscribed web feed.
///
/// `external_id` is the identifier the remote zone uses to group status
/// records by feed; it is `None` until the feed has been registered remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebFeed {
    pub feed_id: String,
    pub url: String,
    pub external_id: Option<String>,
    pub title: String,
    pub home_page_url: Option<String>,
    pub icon_url: Option<String>,
}

// ============================================================================
// Articles
// ============================================================================

/// One author of an article. Every field is optional.
///
/// The serde names match the remote `parsedAuthors` JSON encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "avatarURL", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(rename = "emailAddress", skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Article content as parsed from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub article_id: String,
    pub web_feed_id: String,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
    pub url: Option<String>,
    pub external_url: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub date_published: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub authors: Vec<Author>,
    pub status: ArticleStatus,
}

impl Article {
    /// A bare article with only its identifiers set and a fresh unread status.
    pub fn new(article_id: impl Into<String>, web_feed_id: impl Into<String>) -> Self {
        let article_id = article_id.into();
        Self {
            status: ArticleStatus::unread(article_id.clone()),
            article_id,
            web_feed_id: web_feed_id.into(),
            title: None,
            content_html: None,
            content_text: None,
            url: None,
            external_url: None,
            summary: None,
            image_url: None,
            date_published: None,
            date_modified: None,
            authors: Vec::new(),
        }
    }

    /// Whether the article is worth keeping remotely (unread or starred).
    pub fn is_worth_syncing(&self) -> bool {
        !self.status.read || self.status.starred
    }
}

// ============================================================================
// Status
// ============================================================================

/// Read/starred state of one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleStatus {
    pub article_id: String,
    pub read: bool,
    pub starred: bool,
}

impl ArticleStatus {
    pub fn unread(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            read: false,
            starred: false,
        }
    }
}

/// Which aspect of a status changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    New,
    Read,
    Starred,
    Deleted,
}

/// A status change: the key that changed and whether it was set or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusChange {
    pub key: StatusKey,
    pub flag: bool,
}

impl StatusChange {
    pub fn new(key: StatusKey, flag: bool) -> Self {
        Self { key, flag }
    }
}

/// A status change queued for the remote zone, optionally carrying the
/// article so its content record can be written alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: ArticleStatus,
    pub change: StatusChange,
    pub article: Option<Article>,
}

impl StatusUpdate {
    pub fn new(status: ArticleStatus, change: StatusChange) -> Self {
        Self {
            status,
            change,
            article: None,
        }
    }

    pub fn with_article(mut self, article: Article) -> Self {
        self.article = Some(article);
        self
    }

    pub fn article_id(&self) -> &str {
        &self.status.article_id
    }
}
