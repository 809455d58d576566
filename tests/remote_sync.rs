//! Integration tests for the round trip: local changes are pushed through
//! `ArticlesZone`, pulled back with `refresh`, and applied to a local
//! database by `ArticlesZoneDelegate`.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use pretty_assertions::assert_eq;
use std::sync::Arc;

use feedsync::cloud::{FieldValue, MemoryZoneStore, Record, RecordId, ZoneId};
use feedsync::models::{Article, ArticleStatus, Author, StatusChange, StatusKey, StatusUpdate, WebFeed};
use feedsync::storage::Database;
use feedsync::sync::{ArticlesZone, ArticlesZoneDelegate, SyncSession, ARTICLES_ZONE_NAME};

fn zone() -> ZoneId {
    ZoneId::current_user(ARTICLES_ZONE_NAME)
}

fn feed() -> WebFeed {
    WebFeed {
        feed_id: "feed-1".to_string(),
        url: "https://example.com/feed.xml".to_string(),
        external_id: Some("ext-1".to_string()),
        title: "Example".to_string(),
        home_page_url: None,
        icon_url: None,
    }
}

struct Harness {
    db: Database,
    store: Arc<MemoryZoneStore>,
    _session: Arc<SyncSession>,
    adapter: ArticlesZone,
}

async fn harness() -> Harness {
    let db = Database::open(":memory:").await.unwrap();
    db.upsert_feeds(&[feed()]).await.unwrap();

    let store = Arc::new(MemoryZoneStore::with_zone(&zone()));
    store
        .set_delegate(Arc::new(ArticlesZoneDelegate::new(db.clone())))
        .await;

    let session = Arc::new(SyncSession::new(store.clone()));
    session.load_feeds(&db).await.unwrap();
    let adapter = ArticlesZone::new(&session);

    Harness {
        db,
        store,
        _session: session,
        adapter,
    }
}

fn article(id: &str, read: bool, starred: bool) -> Article {
    let mut article = Article::new(id, "feed-1");
    article.title = Some(format!("Article {id}"));
    article.content_html = Some(format!("<p>{id}</p>"));
    article.authors = vec![Author::named("Ada")];
    article.status.read = read;
    article.status.starred = starred;
    article
}

#[tokio::test]
async fn test_saved_articles_arrive_in_local_database() {
    let h = harness().await;

    h.adapter
        .save_new_articles(&[article("1", false, false), article("2", true, true)])
        .await
        .unwrap();
    h.adapter.refresh().await.unwrap();

    let first = h.db.get_article("1").await.unwrap().unwrap();
    assert_eq!(first.web_feed_id, "feed-1");
    assert_eq!(first.title.as_deref(), Some("Article 1"));
    assert_eq!(first.authors, vec![Author::named("Ada")]);
    assert_eq!(first.status, ArticleStatus::unread("1"));

    let second = h.db.get_status("2").await.unwrap().unwrap();
    assert!(second.read);
    assert!(second.starred);
}

#[tokio::test]
async fn test_refresh_without_changes_is_quiet() {
    let h = harness().await;

    h.adapter.refresh().await.unwrap();
    h.adapter.refresh().await.unwrap();

    assert!(h.db.get_articles_for_feed("feed-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_marking_read_removes_remote_records_and_local_content() {
    let h = harness().await;
    h.adapter
        .save_new_articles(&[article("1", false, false)])
        .await
        .unwrap();
    h.adapter.refresh().await.unwrap();

    let mut status = ArticleStatus::unread("1");
    status.read = true;
    h.adapter
        .modify_articles(&[StatusUpdate::new(
            status,
            StatusChange::new(StatusKey::Read, true),
        )])
        .await
        .unwrap();

    // The status record was rewritten and deleted in one request; the
    // article record went with it through the DeleteSelf reference.
    assert!(h.store.records(&zone()).await.is_empty());

    h.adapter.refresh().await.unwrap();
    assert!(h.db.get_article("1").await.unwrap().is_none());
    let status = h.db.get_status("1").await.unwrap().unwrap();
    assert!(status.read);
    assert!(!status.starred);
}

#[tokio::test]
async fn test_remote_star_updates_local_status() {
    let h = harness().await;
    h.adapter
        .save_new_articles(&[article("1", false, false)])
        .await
        .unwrap();
    h.adapter.refresh().await.unwrap();

    let mut status = ArticleStatus::unread("1");
    status.starred = true;
    h.adapter
        .modify_articles(&[StatusUpdate::new(
            status,
            StatusChange::new(StatusKey::Starred, true),
        )])
        .await
        .unwrap();
    h.adapter.refresh().await.unwrap();

    let status = h.db.get_status("1").await.unwrap().unwrap();
    assert!(status.starred);
    assert!(!status.read);
    // Content is untouched by a status-only change
    assert!(h.db.get_article("1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_article_for_unknown_feed_is_skipped() {
    let h = harness().await;

    let mut record = Record::new("Article", RecordId::new("a|stray", &zone()));
    record.set(
        "webFeedURL",
        FieldValue::String("https://unknown.example.com/rss".to_string()),
    );
    record.set("title", FieldValue::String("Stray".to_string()));
    h.store.seed(vec![record]).await;

    h.adapter.refresh().await.unwrap();
    assert!(h.db.get_article("stray").await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_feed_articles_clears_local_content() {
    let h = harness().await;
    h.adapter
        .save_new_articles(&[article("1", false, false), article("2", false, true)])
        .await
        .unwrap();
    h.adapter.refresh().await.unwrap();

    h.adapter.delete_articles("ext-1").await.unwrap();
    h.adapter.refresh().await.unwrap();

    assert!(h.db.get_articles_for_feed("feed-1").await.unwrap().is_empty());
    assert_eq!(h.db.total_unread_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_sub_second_dates_survive_local_round_trip() {
    use chrono::{TimeZone, Utc};

    let h = harness().await;
    let published = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        + chrono::Duration::milliseconds(123);
    let mut original = article("1", false, false);
    original.date_published = Some(published);
    h.adapter.save_new_articles(&[original]).await.unwrap();
    h.adapter.refresh().await.unwrap();

    let local = h.db.get_article("1").await.unwrap().unwrap();
    assert_eq!(local.date_published, Some(published));

    // Re-uploading the locally stored copy must produce the same record
    let remote = h
        .store
        .record(&RecordId::new("a|1", &zone()))
        .await
        .unwrap();
    let rebuilt = h.adapter.make_article_record(&local, Some(&feed())).unwrap();
    assert_eq!(rebuilt, remote);
}

#[tokio::test]
async fn test_removing_feed_clears_both_sides_and_keeps_statuses() {
    let h = harness().await;
    h.adapter
        .save_new_articles(&[article("1", false, false), article("2", false, true)])
        .await
        .unwrap();
    h.adapter.refresh().await.unwrap();

    assert!(h.db.delete_feed("feed-1").await.unwrap());
    assert!(h.db.get_feed("feed-1").await.unwrap().is_none());
    assert!(h.db.get_articles_for_feed("feed-1").await.unwrap().is_empty());
    // Statuses are keyed by article and outlive the feed locally
    assert!(h.db.get_status("1").await.unwrap().is_some());
    assert!(h.db.get_status("2").await.unwrap().unwrap().starred);

    h.adapter.delete_articles("ext-1").await.unwrap();
    assert!(h.store.records(&zone()).await.is_empty());

    h.adapter.refresh().await.unwrap();
    assert!(h.db.get_feed("feed-1").await.unwrap().is_none());
    for id in ["1", "2"] {
        let status = h.db.get_status(id).await.unwrap().unwrap();
        assert!(status.read);
        assert!(!status.starred);
    }
    assert_eq!(h.db.total_unread_count().await.unwrap(), 0);
    assert!(!h.db.delete_feed("feed-1").await.unwrap());
}
