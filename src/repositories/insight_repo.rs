use crate::{
    database::DatabasePool,
    error::ApiError,
    models::{FeedbackLogEntry, Insight, InsightFeedback, InsightFilter, NewInsight},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

const INSIGHT_COLUMNS: &str = "id, user_id, entity_type, entity_id, insight_type, title, summary, \
    detailed_reasoning, confidence_score, impact_score, reasoning_path, expires_at, tags, is_active, \
    is_pinned, application_count, version, user_feedback, feedback_details, last_accessed_at, \
    created_at, updated_at";

#[async_trait]
pub trait InsightRepository: Send + Sync {
    /// Insert, or replace an existing insight with the same id.
    async fn upsert(&self, insight: &NewInsight) -> Result<Insight, ApiError>;
    async fn query(&self, user_id: Uuid, filter: &InsightFilter) -> Result<Vec<Insight>, ApiError>;
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Insight>, ApiError>;
    async fn touch_accessed(&self, ids: &[Uuid]) -> Result<(), ApiError>;
    async fn record_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        feedback: InsightFeedback,
        details: Option<&Value>,
    ) -> Result<Option<Insight>, ApiError>;
    async fn log_feedback(&self, entry: &FeedbackLogEntry) -> Result<(), ApiError>;
    async fn set_pinned(
        &self,
        user_id: Uuid,
        id: Uuid,
        pinned: bool,
    ) -> Result<Option<Insight>, ApiError>;
    async fn deactivate(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
    /// Deactivates every active insight whose expiry has passed; returns the count.
    async fn deactivate_expired(&self) -> Result<u64, ApiError>;
    async fn created_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Insight>, ApiError>;
}

pub struct SqlxInsightRepository {
    pool: DatabasePool,
}

impl SqlxInsightRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsightRepository for SqlxInsightRepository {
    async fn upsert(&self, insight: &NewInsight) -> Result<Insight, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO insights (id, user_id, entity_type, entity_id, insight_type, title, summary,
                                  detailed_reasoning, confidence_score, impact_score, reasoning_path,
                                  expires_at, tags, is_active, is_pinned, application_count, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, TRUE, FALSE, 0, 1)
            ON CONFLICT (id) DO UPDATE SET
                entity_type = EXCLUDED.entity_type,
                entity_id = EXCLUDED.entity_id,
                insight_type = EXCLUDED.insight_type,
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                detailed_reasoning = EXCLUDED.detailed_reasoning,
                confidence_score = EXCLUDED.confidence_score,
                impact_score = EXCLUDED.impact_score,
                reasoning_path = EXCLUDED.reasoning_path,
                expires_at = EXCLUDED.expires_at,
                tags = EXCLUDED.tags,
                is_active = TRUE,
                is_pinned = FALSE,
                application_count = 0,
                version = 1,
                updated_at = NOW()
            WHERE insights.user_id = EXCLUDED.user_id
            RETURNING {}
            "#,
            INSIGHT_COLUMNS
        );
        sqlx::query_as::<_, Insight>(&sql)
            .bind(insight.id)
            .bind(insight.user_id)
            .bind(&insight.entity_type)
            .bind(insight.entity_id)
            .bind(&insight.insight_type)
            .bind(&insight.title)
            .bind(&insight.summary)
            .bind(&insight.detailed_reasoning)
            .bind(insight.confidence_score)
            .bind(insight.impact_score)
            .bind(&insight.reasoning_path)
            .bind(insight.expires_at)
            .bind(&insight.tags)
            .fetch_optional(&self.pool)
            .await?
            // An id owned by another user leaves the row untouched and returns nothing
            .ok_or_else(|| ApiError::conflict(format!("Insight {} already exists", insight.id)))
    }

    async fn query(&self, user_id: Uuid, filter: &InsightFilter) -> Result<Vec<Insight>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM insights
            WHERE user_id = $1
                AND ($2::text IS NULL OR entity_type = $2)
                AND ($3::uuid IS NULL OR entity_id = $3)
                AND ($4::text IS NULL OR insight_type = $4)
                AND ($5::boolean IS NULL OR is_active = $5)
                AND ($6::boolean IS NULL OR is_pinned = $6)
                AND ($7::float8 IS NULL OR confidence_score >= $7)
                AND ($8::text[] IS NULL OR tags && $8)
                AND ($9 OR expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC
            LIMIT $10
            "#,
            INSIGHT_COLUMNS
        );
        let insights = sqlx::query_as::<_, Insight>(&sql)
            .bind(user_id)
            .bind(&filter.entity_type)
            .bind(filter.entity_id)
            .bind(&filter.insight_type)
            .bind(filter.is_active)
            .bind(filter.is_pinned)
            .bind(filter.min_confidence)
            .bind(&filter.tags)
            .bind(filter.include_expired)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(insights)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Insight>, ApiError> {
        let sql = format!(
            "SELECT {} FROM insights WHERE id = $1 AND user_id = $2",
            INSIGHT_COLUMNS
        );
        let insight = sqlx::query_as::<_, Insight>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(insight)
    }

    async fn touch_accessed(&self, ids: &[Uuid]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE insights SET last_accessed_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        feedback: InsightFeedback,
        details: Option<&Value>,
    ) -> Result<Option<Insight>, ApiError> {
        let sql = format!(
            r#"
            UPDATE insights
            SET user_feedback = $3,
                feedback_details = $4,
                application_count = application_count + CASE WHEN $3 = 'accepted' THEN 1 ELSE 0 END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            INSIGHT_COLUMNS
        );
        let insight = sqlx::query_as::<_, Insight>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(feedback.as_str())
            .bind(details)
            .fetch_optional(&self.pool)
            .await?;

        Ok(insight)
    }

    async fn log_feedback(&self, entry: &FeedbackLogEntry) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO insight_feedback_log (id, user_id, insight_id, feedback_type, feedback_text,
                                              suggested_improvement)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.insight_id)
        .bind(&entry.feedback_type)
        .bind(&entry.feedback_text)
        .bind(&entry.suggested_improvement)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_pinned(
        &self,
        user_id: Uuid,
        id: Uuid,
        pinned: bool,
    ) -> Result<Option<Insight>, ApiError> {
        let sql = format!(
            r#"
            UPDATE insights SET is_pinned = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            INSIGHT_COLUMNS
        );
        let insight = sqlx::query_as::<_, Insight>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(pinned)
            .fetch_optional(&self.pool)
            .await?;

        Ok(insight)
    }

    async fn deactivate(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE insights SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE insights SET is_active = FALSE, updated_at = NOW()
            WHERE is_active = TRUE AND expires_at IS NOT NULL AND expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn created_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Insight>, ApiError> {
        let sql = format!(
            "SELECT {} FROM insights WHERE user_id = $1 AND created_at >= $2 ORDER BY created_at ASC",
            INSIGHT_COLUMNS
        );
        let insights = sqlx::query_as::<_, Insight>(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(insights)
    }
}
