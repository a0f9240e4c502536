use crate::db::Database;
use crate::error::Result;

/// Tag service
pub struct TagService;

impl TagService {
    /// Register a tag into the distinct tag set.
    ///
    /// Best-effort: the tag set is a denormalized convenience index, not a
    /// source of truth, so failures are logged and swallowed. Empty tags are
    /// not registered.
    pub async fn register(db: &Database, tag: &str) {
        if tag.is_empty() {
            return;
        }

        if let Err(e) = sqlx::query("INSERT OR IGNORE INTO tags (tag) VALUES (?)")
            .bind(tag)
            .execute(db.pool())
            .await
        {
            tracing::warn!("failed to register tag {:?}: {}", tag, e);
        }
    }

    /// List every distinct tag
    pub async fn list(db: &Database) -> Result<Vec<String>> {
        let tags = sqlx::query_scalar("SELECT tag FROM tags")
            .fetch_all(db.pool())
            .await?;
        Ok(tags)
    }
}
