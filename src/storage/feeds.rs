use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{FeedDbRow, FeedUnread};
use crate::models::WebFeed;

/// Row type for the feed query with unread count
type FeedUnreadRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    i64,
);

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert or update feeds keyed by `feed_id`.
    ///
    /// Batched in chunks of 100 (6 columns * 100 = 600 parameters, under
    /// SQLite's 999 limit).
    pub async fn upsert_feeds(&self, feeds: &[WebFeed]) -> Result<()> {
        if feeds.is_empty() {
            return Ok(());
        }

        const BATCH_SIZE: usize = 100;
        let mut tx = self.pool.begin().await?;

        for chunk in feeds.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO feeds (feed_id, url, external_id, title, home_page_url, icon_url) ",
            );

            builder.push_values(chunk, |mut b, feed| {
                b.push_bind(&feed.feed_id)
                    .push_bind(&feed.url)
                    .push_bind(&feed.external_id)
                    .push_bind(&feed.title)
                    .push_bind(&feed.home_page_url)
                    .push_bind(&feed.icon_url);
            });

            builder.push(
                " ON CONFLICT(feed_id) DO UPDATE SET \
                 url = excluded.url, \
                 external_id = COALESCE(excluded.external_id, feeds.external_id), \
                 title = excluded.title, \
                 home_page_url = excluded.home_page_url, \
                 icon_url = excluded.icon_url",
            );

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_feeds(&self) -> Result<Vec<WebFeed>> {
        let rows = sqlx::query_as::<_, FeedDbRow>(
            "SELECT feed_id, url, external_id, title, home_page_url, icon_url FROM feeds ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FeedDbRow::into_feed).collect())
    }

    pub async fn get_feed(&self, feed_id: &str) -> Result<Option<WebFeed>> {
        let row = sqlx::query_as::<_, FeedDbRow>(
            "SELECT feed_id, url, external_id, title, home_page_url, icon_url FROM feeds WHERE feed_id = ?",
        )
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(FeedDbRow::into_feed))
    }

    /// Look up a feed by its feed URL (the key remote article records carry).
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<WebFeed>> {
        let row = sqlx::query_as::<_, FeedDbRow>(
            "SELECT feed_id, url, external_id, title, home_page_url, icon_url FROM feeds WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(FeedDbRow::into_feed))
    }

    /// Get all feeds with their unread article counts
    pub async fn get_feeds_with_unread_counts(&self) -> Result<Vec<FeedUnread>> {
        let rows: Vec<FeedUnreadRow> = sqlx::query_as(
            r#"
                SELECT
                    f.feed_id, f.url, f.external_id, f.title, f.home_page_url, f.icon_url,
                    COUNT(CASE WHEN s.read = 0 THEN 1 END) as unread_count
                FROM feeds f
                LEFT JOIN articles a ON f.feed_id = a.feed_id
                LEFT JOIN statuses s ON a.article_id = s.article_id
                GROUP BY f.feed_id
                ORDER BY f.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let feeds = rows
            .into_iter()
            .map(
                |(feed_id, url, external_id, title, home_page_url, icon_url, unread_count)| {
                    FeedUnread {
                        feed: WebFeed {
                            feed_id,
                            url,
                            external_id,
                            title,
                            home_page_url,
                            icon_url,
                        },
                        unread_count,
                    }
                },
            )
            .collect();

        Ok(feeds)
    }

    /// Remove a feed and, through the foreign key cascade, its articles.
    ///
    /// Statuses are kept: they are keyed by article only and remain valid if
    /// the feed is re-added.
    pub async fn delete_feed(&self, feed_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feeds WHERE feed_id = ?")
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(id: &str, title: &str) -> WebFeed {
        WebFeed {
            feed_id: id.to_string(),
            url: format!("https://{id}.example.com/feed.xml"),
            external_id: None,
            title: title.to_string(),
            home_page_url: None,
            icon_url: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_feeds_orders_by_title() {
        let db = Database::open(":memory:").await.unwrap();
        db.upsert_feeds(&[feed("b", "Beta"), feed("a", "Alpha")])
            .await
            .unwrap();

        let feeds = db.get_feeds().await.unwrap();
        let titles: Vec<_> = feeds.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_upsert_keeps_known_external_id() {
        let db = Database::open(":memory:").await.unwrap();
        let mut registered = feed("a", "Alpha");
        registered.external_id = Some("ext-a".to_string());
        db.upsert_feeds(&[registered]).await.unwrap();

        // A later import without the external ID must not erase it
        db.upsert_feeds(&[feed("a", "Alpha Renamed")]).await.unwrap();

        let stored = db.get_feed("a").await.unwrap().unwrap();
        assert_eq!(stored.title, "Alpha Renamed");
        assert_eq!(stored.external_id.as_deref(), Some("ext-a"));
    }

    #[tokio::test]
    async fn test_get_feed_by_url() {
        let db = Database::open(":memory:").await.unwrap();
        db.upsert_feeds(&[feed("a", "Alpha")]).await.unwrap();

        let found = db
            .get_feed_by_url("https://a.example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(found.map(|f| f.feed_id), Some("a".to_string()));
        assert!(db.get_feed_by_url("https://nope").await.unwrap().is_none());
    }
}
