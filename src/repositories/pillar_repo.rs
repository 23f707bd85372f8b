use crate::{database::DatabasePool, error::ApiError, models::Pillar};
use async_trait::async_trait;
use uuid::Uuid;

const PILLAR_COLUMNS: &str = "id, user_id, name, description, color, icon, time_allocation_percentage, \
    archived, sort_order, created_at, updated_at";

#[async_trait]
pub trait PillarRepository: Send + Sync {
    async fn create(&self, pillar: &Pillar) -> Result<Pillar, ApiError>;
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Pillar>, ApiError>;
    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Pillar>, ApiError>;
    async fn list(&self, user_id: Uuid, include_archived: bool) -> Result<Vec<Pillar>, ApiError>;
    async fn update(&self, pillar: &Pillar) -> Result<Pillar, ApiError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
}

pub struct SqlxPillarRepository {
    pool: DatabasePool,
}

impl SqlxPillarRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PillarRepository for SqlxPillarRepository {
    async fn create(&self, pillar: &Pillar) -> Result<Pillar, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO pillars (id, user_id, name, description, color, icon, time_allocation_percentage,
                                 archived, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PILLAR_COLUMNS
        );
        let pillar = sqlx::query_as::<_, Pillar>(&sql)
            .bind(pillar.id)
            .bind(pillar.user_id)
            .bind(&pillar.name)
            .bind(&pillar.description)
            .bind(&pillar.color)
            .bind(&pillar.icon)
            .bind(pillar.time_allocation_percentage)
            .bind(pillar.archived)
            .bind(pillar.sort_order)
            .bind(pillar.created_at)
            .bind(pillar.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(pillar)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Pillar>, ApiError> {
        let sql = format!(
            "SELECT {} FROM pillars WHERE id = $1 AND user_id = $2",
            PILLAR_COLUMNS
        );
        let pillar = sqlx::query_as::<_, Pillar>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pillar)
    }

    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Pillar>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM pillars WHERE user_id = $1 AND id = ANY($2)",
            PILLAR_COLUMNS
        );
        let pillars = sqlx::query_as::<_, Pillar>(&sql)
            .bind(user_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(pillars)
    }

    async fn list(&self, user_id: Uuid, include_archived: bool) -> Result<Vec<Pillar>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM pillars
            WHERE user_id = $1 AND ($2 OR archived = FALSE)
            ORDER BY sort_order ASC, created_at ASC
            "#,
            PILLAR_COLUMNS
        );
        let pillars = sqlx::query_as::<_, Pillar>(&sql)
            .bind(user_id)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await?;

        Ok(pillars)
    }

    async fn update(&self, pillar: &Pillar) -> Result<Pillar, ApiError> {
        let sql = format!(
            r#"
            UPDATE pillars
            SET name = $3, description = $4, color = $5, icon = $6, time_allocation_percentage = $7,
                archived = $8, sort_order = $9, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            PILLAR_COLUMNS
        );
        sqlx::query_as::<_, Pillar>(&sql)
            .bind(pillar.id)
            .bind(pillar.user_id)
            .bind(&pillar.name)
            .bind(&pillar.description)
            .bind(&pillar.color)
            .bind(&pillar.icon)
            .bind(pillar.time_allocation_percentage)
            .bind(pillar.archived)
            .bind(pillar.sort_order)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Pillar {} not found", pillar.id)))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE areas SET pillar_id = NULL, updated_at = NOW() WHERE pillar_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM pillars WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
