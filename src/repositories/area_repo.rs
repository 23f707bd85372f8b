use crate::{database::DatabasePool, error::ApiError, models::Area};
use async_trait::async_trait;
use uuid::Uuid;

const AREA_COLUMNS: &str = "id, user_id, pillar_id, name, description, color, icon, importance, \
    archived, sort_order, created_at, updated_at";

#[async_trait]
pub trait AreaRepository: Send + Sync {
    async fn create(&self, area: &Area) -> Result<Area, ApiError>;
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Area>, ApiError>;
    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Area>, ApiError>;
    async fn list(
        &self,
        user_id: Uuid,
        include_archived: bool,
        pillar_id: Option<Uuid>,
    ) -> Result<Vec<Area>, ApiError>;
    async fn update(&self, area: &Area) -> Result<Area, ApiError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
}

pub struct SqlxAreaRepository {
    pool: DatabasePool,
}

impl SqlxAreaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AreaRepository for SqlxAreaRepository {
    async fn create(&self, area: &Area) -> Result<Area, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO areas (id, user_id, pillar_id, name, description, color, icon, importance,
                               archived, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            AREA_COLUMNS
        );
        let area = sqlx::query_as::<_, Area>(&sql)
            .bind(area.id)
            .bind(area.user_id)
            .bind(area.pillar_id)
            .bind(&area.name)
            .bind(&area.description)
            .bind(&area.color)
            .bind(&area.icon)
            .bind(area.importance)
            .bind(area.archived)
            .bind(area.sort_order)
            .bind(area.created_at)
            .bind(area.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(area)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Area>, ApiError> {
        let sql = format!(
            "SELECT {} FROM areas WHERE id = $1 AND user_id = $2",
            AREA_COLUMNS
        );
        let area = sqlx::query_as::<_, Area>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(area)
    }

    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Area>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM areas WHERE user_id = $1 AND id = ANY($2)",
            AREA_COLUMNS
        );
        let areas = sqlx::query_as::<_, Area>(&sql)
            .bind(user_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(areas)
    }

    async fn list(
        &self,
        user_id: Uuid,
        include_archived: bool,
        pillar_id: Option<Uuid>,
    ) -> Result<Vec<Area>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM areas
            WHERE user_id = $1
                AND ($2 OR archived = FALSE)
                AND ($3::uuid IS NULL OR pillar_id = $3)
            ORDER BY sort_order ASC, created_at ASC
            "#,
            AREA_COLUMNS
        );
        let areas = sqlx::query_as::<_, Area>(&sql)
            .bind(user_id)
            .bind(include_archived)
            .bind(pillar_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(areas)
    }

    async fn update(&self, area: &Area) -> Result<Area, ApiError> {
        let sql = format!(
            r#"
            UPDATE areas
            SET pillar_id = $3, name = $4, description = $5, color = $6, icon = $7, importance = $8,
                archived = $9, sort_order = $10, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            AREA_COLUMNS
        );
        sqlx::query_as::<_, Area>(&sql)
            .bind(area.id)
            .bind(area.user_id)
            .bind(area.pillar_id)
            .bind(&area.name)
            .bind(&area.description)
            .bind(&area.color)
            .bind(&area.icon)
            .bind(area.importance)
            .bind(area.archived)
            .bind(area.sort_order)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Area {} not found", area.id)))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE projects SET area_id = NULL, updated_at = NOW() WHERE area_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM areas WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
