use anyhow::Result;

use super::schema::Database;
use super::types::StatusDbRow;
use crate::models::{ArticleStatus, StatusChange, StatusKey, StatusUpdate};

impl Database {
    // ========================================================================
    // Status Operations
    // ========================================================================

    pub async fn get_status(&self, article_id: &str) -> Result<Option<ArticleStatus>> {
        let row = sqlx::query_as::<_, StatusDbRow>(
            "SELECT article_id, read, starred FROM statuses WHERE article_id = ?",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StatusDbRow::into_status))
    }

    /// Write a status as-is, creating the row when missing.
    pub async fn upsert_status(&self, status: &ArticleStatus) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO statuses (article_id, read, starred, date_arrived)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(article_id) DO UPDATE SET
                read = excluded.read,
                starred = excluded.starred
        "#,
        )
        .bind(&status.article_id)
        .bind(status.read)
        .bind(status.starred)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set or clear `read`/`starred` on a set of articles.
    ///
    /// Returns one [`StatusUpdate`] per article whose status actually changed,
    /// with the article attached when its content is stored locally, ready to
    /// hand to the sync layer.
    pub async fn mark_articles(
        &self,
        article_ids: &[String],
        key: StatusKey,
        flag: bool,
    ) -> Result<Vec<StatusUpdate>> {
        let column = match key {
            StatusKey::Read => "read",
            StatusKey::Starred => "starred",
            StatusKey::New | StatusKey::Deleted => {
                anyhow::bail!("{key:?} is not a user-settable status")
            }
        };

        let mut updates = Vec::new();
        for article_id in article_ids {
            let sql = format!("UPDATE statuses SET {column} = ? WHERE article_id = ? AND {column} != ?");
            let result = sqlx::query(&sql)
                .bind(flag)
                .bind(article_id)
                .bind(flag)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                continue;
            }

            let Some(status) = self.get_status(article_id).await? else {
                continue;
            };
            let mut update = StatusUpdate::new(status, StatusChange::new(key, flag));
            if let Some(article) = self.get_article(article_id).await? {
                update = update.with_article(article);
            }
            updates.push(update);
        }

        tracing::debug!(
            requested = article_ids.len(),
            changed = updates.len(),
            ?key,
            flag,
            "Marked articles"
        );
        Ok(updates)
    }

    /// Unread articles across all feeds (the "All Unread" pseudo feed).
    pub async fn total_unread_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM articles a JOIN statuses s ON a.article_id = s.article_id WHERE s.read = 0",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Starred articles that are still unread (the "Starred" pseudo feed badge).
    pub async fn starred_unread_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM articles a JOIN statuses s ON a.article_id = s.article_id \
             WHERE s.starred = 1 AND s.read = 0",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
