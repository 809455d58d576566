//! Integration tests for sidebar rows built from the local database.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedsync::models::{Article, WebFeed};
use feedsync::sidebar::{
    self, plain_text, FaviconLoader, IconLoader, ItemKind, MenuEntry, SidebarRow,
};
use feedsync::storage::Database;

async fn seeded_db(feed_url: &str) -> Database {
    let db = Database::open(":memory:").await.unwrap();
    db.upsert_feeds(&[
        WebFeed {
            feed_id: "busy".to_string(),
            url: feed_url.to_string(),
            external_id: None,
            title: "Busy Feed".to_string(),
            home_page_url: None,
            icon_url: None,
        },
        WebFeed {
            feed_id: "quiet".to_string(),
            url: "https://quiet.example.com/rss".to_string(),
            external_id: None,
            title: "Quiet Feed".to_string(),
            home_page_url: None,
            icon_url: None,
        },
    ])
    .await
    .unwrap();

    let mut starred = Article::new("3", "busy");
    starred.status.starred = true;
    db.upsert_articles(&[Article::new("1", "busy"), Article::new("2", "busy"), starred])
        .await
        .unwrap();
    db
}

#[tokio::test]
async fn test_load_items_puts_smart_feeds_first() {
    let db = seeded_db("https://busy.example.com/rss").await;

    let items = sidebar::load_items(&db).await.unwrap();
    let summary: Vec<(&str, ItemKind, i64)> = items
        .iter()
        .map(|i| (i.name.as_str(), i.kind, i.unread_count))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("All Unread", ItemKind::PseudoFeed, 3),
            ("Starred", ItemKind::PseudoFeed, 1),
            ("Busy Feed", ItemKind::WebFeed, 3),
            ("Quiet Feed", ItemKind::WebFeed, 0),
        ]
    );
}

#[tokio::test]
async fn test_rows_render_badges_only_for_unread() {
    let db = seeded_db("https://busy.example.com/rss").await;
    let rows: Vec<SidebarRow> = sidebar::load_items(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|item| SidebarRow::new(item, true))
        .collect();

    let lines: Vec<String> = rows.iter().map(|r| plain_text(&r.line(24))).collect();
    assert_eq!(
        lines,
        vec![
            "  All Unread          3 ",
            "  Starred             1 ",
            "  Busy Feed           3 ",
            "  Quiet Feed",
        ]
    );
}

#[tokio::test]
async fn test_visible_rows_pick_up_served_icons() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 32]))
        .mount(&server)
        .await;

    let db = seeded_db(&format!("{}/rss", server.uri())).await;
    let loader: Arc<dyn IconLoader> = Arc::new(
        FaviconLoader::new(reqwest::Client::new(), Duration::from_secs(5), 16).allow_local_hosts(),
    );

    let items = sidebar::load_items(&db).await.unwrap();
    let mut busy = SidebarRow::new(items[2].clone(), false);

    let (tx, mut rx) = mpsc::channel(4);
    busy.on_appear(loader, tx).unwrap().await.unwrap();
    let event = rx.recv().await.unwrap();
    assert!(busy.apply(&event));

    // Local server host is 127.0.0.1, whose first alphanumeric is '1'
    assert_eq!(busy.icon().map(|i| i.glyph), Some('1'));
    assert!(plain_text(&busy.line(30)).starts_with("  1 Busy Feed"));
}

#[tokio::test]
async fn test_context_menu_flow_for_feed_row() {
    let db = seeded_db("https://busy.example.com/rss").await;
    let items = sidebar::load_items(&db).await.unwrap();
    let mut row = SidebarRow::new(items[2].clone(), false);

    let menu = row.secondary_action();
    assert_eq!(
        menu.entries(),
        &[MenuEntry::MarkAllRead, MenuEntry::CopyFeedUrl, MenuEntry::Inspector]
    );
    menu.move_highlight(-1);

    assert_eq!(row.select_highlighted(), Some(MenuEntry::Inspector));
    assert!(row.is_inspector_presented());

    let info: Vec<String> = sidebar::inspector_lines(row.item())
        .iter()
        .map(plain_text)
        .collect();
    assert!(info.contains(&"Unread: 3".to_string()));
    assert!(info.contains(&"URL:    https://busy.example.com/rss".to_string()));

    row.dismiss_inspector();
    assert!(!row.is_inspector_presented());

    // Dismissing the menu abandons it without choosing anything
    row.secondary_action();
    assert!(row.menu().is_some());
    row.dismiss_menu();
    assert!(row.menu().is_none());
    assert_eq!(row.select_highlighted(), None);
    assert!(!row.is_inspector_presented());
}
