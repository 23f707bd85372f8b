use crate::{database::DatabasePool, error::ApiError, models::AlignmentScore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const SCORE_COLUMNS: &str =
    "id, user_id, task_id, points_earned, task_priority, project_priority, area_importance, created_at";

#[async_trait]
pub trait AlignmentRepository: Send + Sync {
    /// Stores the score unless the task already has one; `None` when it did.
    async fn record(&self, score: &AlignmentScore) -> Result<Option<AlignmentScore>, ApiError>;
    async fn sum_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, ApiError>;
    async fn get_monthly_goal(&self, user_id: Uuid) -> Result<Option<i32>, ApiError>;
    async fn set_monthly_goal(&self, user_id: Uuid, goal: i32) -> Result<(), ApiError>;
}

pub struct SqlxAlignmentRepository {
    pool: DatabasePool,
}

impl SqlxAlignmentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlignmentRepository for SqlxAlignmentRepository {
    async fn record(&self, score: &AlignmentScore) -> Result<Option<AlignmentScore>, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO alignment_scores (id, user_id, task_id, points_earned, task_priority,
                                          project_priority, area_importance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (task_id) DO NOTHING
            RETURNING {}
            "#,
            SCORE_COLUMNS
        );
        let stored = sqlx::query_as::<_, AlignmentScore>(&sql)
            .bind(score.id)
            .bind(score.user_id)
            .bind(score.task_id)
            .bind(score.points_earned)
            .bind(&score.task_priority)
            .bind(&score.project_priority)
            .bind(score.area_importance)
            .bind(score.created_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stored)
    }

    async fn sum_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, ApiError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points_earned), 0)::BIGINT FROM alignment_scores WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn get_monthly_goal(&self, user_id: Uuid) -> Result<Option<i32>, ApiError> {
        let goal: Option<Option<i32>> = sqlx::query_scalar(
            "SELECT monthly_alignment_goal FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(goal.flatten())
    }

    async fn set_monthly_goal(&self, user_id: Uuid, goal: i32) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, monthly_alignment_goal) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET monthly_alignment_goal = EXCLUDED.monthly_alignment_goal,
                                                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(goal)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
