use crate::{database::DatabasePool, error::ApiError, models::JournalEntry};
use super::like_pattern;
use async_trait::async_trait;
use uuid::Uuid;

const JOURNAL_COLUMNS: &str =
    "id, user_id, title, content, mood, energy_level, tags, deleted_at, created_at, updated_at";

#[async_trait]
pub trait JournalRepository: Send + Sync {
    async fn create(&self, entry: &JournalEntry) -> Result<JournalEntry, ApiError>;
    /// Active (not trashed) entry by id.
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>, ApiError>;
    /// Active entries newest first, plus the total matching count.
    async fn list(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<JournalEntry>, i64), ApiError>;
    async fn list_trash(&self, user_id: Uuid) -> Result<Vec<JournalEntry>, ApiError>;
    async fn update(&self, entry: &JournalEntry) -> Result<JournalEntry, ApiError>;
    async fn soft_delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
    async fn restore(&self, user_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>, ApiError>;
    /// Removes a trashed entry for good.
    async fn delete_permanently(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
}

pub struct SqlxJournalRepository {
    pool: DatabasePool,
}

impl SqlxJournalRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JournalRepository for SqlxJournalRepository {
    async fn create(&self, entry: &JournalEntry) -> Result<JournalEntry, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO journal_entries (id, user_id, title, content, mood, energy_level, tags,
                                         deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, $9)
            RETURNING {}
            "#,
            JOURNAL_COLUMNS
        );
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(&entry.title)
            .bind(&entry.content)
            .bind(&entry.mood)
            .bind(&entry.energy_level)
            .bind(&entry.tags)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>, ApiError> {
        let sql = format!(
            "SELECT {} FROM journal_entries WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
            JOURNAL_COLUMNS
        );
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn list(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<JournalEntry>, i64), ApiError> {
        let pattern = search.map(like_pattern);

        let sql = format!(
            r#"
            SELECT {}
            FROM journal_entries
            WHERE user_id = $1
                AND deleted_at IS NULL
                AND ($2::text IS NULL OR title ILIKE $2 OR content ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            JOURNAL_COLUMNS
        );
        let entries = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(user_id)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM journal_entries
            WHERE user_id = $1
                AND deleted_at IS NULL
                AND ($2::text IS NULL OR title ILIKE $2 OR content ILIKE $2)
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok((entries, total))
    }

    async fn list_trash(&self, user_id: Uuid) -> Result<Vec<JournalEntry>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM journal_entries
            WHERE user_id = $1 AND deleted_at IS NOT NULL
            ORDER BY deleted_at DESC
            "#,
            JOURNAL_COLUMNS
        );
        let entries = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn update(&self, entry: &JournalEntry) -> Result<JournalEntry, ApiError> {
        let sql = format!(
            r#"
            UPDATE journal_entries
            SET title = $3, content = $4, mood = $5, energy_level = $6, tags = $7, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            JOURNAL_COLUMNS
        );
        sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(&entry.title)
            .bind(&entry.content)
            .bind(&entry.mood)
            .bind(&entry.energy_level)
            .bind(&entry.tags)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Journal entry {} not found", entry.id)))
    }

    async fn soft_delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE journal_entries SET deleted_at = NOW() WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn restore(&self, user_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>, ApiError> {
        let sql = format!(
            r#"
            UPDATE journal_entries
            SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NOT NULL
            RETURNING {}
            "#,
            JOURNAL_COLUMNS
        );
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn delete_permanently(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "DELETE FROM journal_entries WHERE id = $1 AND user_id = $2 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
