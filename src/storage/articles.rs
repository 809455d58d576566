use anyhow::Result;

use super::schema::Database;
use super::types::ArticleDbRow;
use crate::models::Article;

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of articles to return from any single query (OOM protection)
const MAX_ARTICLES: i64 = 2000;

const ARTICLE_COLUMNS: &str = "a.article_id, a.feed_id, a.title, a.content_html, a.content_text, \
     a.url, a.external_url, a.summary, a.image_url, a.date_published, a.date_modified, a.authors, \
     COALESCE(s.read, 0) AS read, COALESCE(s.starred, 0) AS starred";

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Insert or update article content, returning how many articles were new.
    ///
    /// Content columns are overwritten from the incoming value. The status row
    /// is only created when missing so local read/starred state survives a
    /// content refresh.
    pub async fn upsert_articles(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for article in articles {
            let authors = if article.authors.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&article.authors)?)
            };

            sqlx::query(
                r#"
                INSERT INTO articles (article_id, feed_id, title, content_html, content_text,
                                      url, external_url, summary, image_url,
                                      date_published, date_modified, authors)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(article_id) DO UPDATE SET
                    feed_id = excluded.feed_id,
                    title = excluded.title,
                    content_html = excluded.content_html,
                    content_text = excluded.content_text,
                    url = excluded.url,
                    external_url = excluded.external_url,
                    summary = excluded.summary,
                    image_url = excluded.image_url,
                    date_published = excluded.date_published,
                    date_modified = excluded.date_modified,
                    authors = excluded.authors
            "#,
            )
            .bind(&article.article_id)
            .bind(&article.web_feed_id)
            .bind(&article.title)
            .bind(&article.content_html)
            .bind(&article.content_text)
            .bind(&article.url)
            .bind(&article.external_url)
            .bind(&article.summary)
            .bind(&article.image_url)
            .bind(article.date_published.map(|d| d.timestamp_millis()))
            .bind(article.date_modified.map(|d| d.timestamp_millis()))
            .bind(authors)
            .execute(&mut *tx)
            .await?;

            let result = sqlx::query(
                "INSERT OR IGNORE INTO statuses (article_id, read, starred, date_arrived) VALUES (?, ?, ?, ?)",
            )
            .bind(&article.article_id)
            .bind(article.status.read)
            .bind(article.status.starred)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        tracing::debug!(count = articles.len(), inserted, "Upserted articles");
        Ok(inserted)
    }

    /// Get a single article (with its status) by ID.
    pub async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a \
             LEFT JOIN statuses s ON a.article_id = s.article_id \
             WHERE a.article_id = ?"
        );
        let row = sqlx::query_as::<_, ArticleDbRow>(&sql)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ArticleDbRow::into_article))
    }

    /// Articles of one feed, most recently published first.
    pub async fn get_articles_for_feed(&self, feed_id: &str) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a \
             LEFT JOIN statuses s ON a.article_id = s.article_id \
             WHERE a.feed_id = ? \
             ORDER BY a.date_published DESC \
             LIMIT ?"
        );
        let rows = sqlx::query_as::<_, ArticleDbRow>(&sql)
            .bind(feed_id)
            .bind(MAX_ARTICLES)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    /// Drop an article's content row, keeping its status.
    pub async fn delete_article_content(&self, article_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE article_id = ?")
            .bind(article_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
