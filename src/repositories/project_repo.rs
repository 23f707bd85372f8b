use crate::{
    database::DatabasePool,
    error::ApiError,
    models::{Project, ProjectRow, ProjectStatus},
};
use async_trait::async_trait;
use uuid::Uuid;

const PROJECT_COLUMNS: &str = "id, user_id, area_id, name, description, status, priority, importance, \
    color, icon, deadline, archived, completion_percentage, sort_order, created_at, updated_at";

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> Result<Project, ApiError>;
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Project>, ApiError>;
    async fn list(
        &self,
        user_id: Uuid,
        include_archived: bool,
        area_id: Option<Uuid>,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, ApiError>;
    async fn update(&self, project: &Project) -> Result<Project, ApiError>;
    async fn set_completion_percentage(
        &self,
        user_id: Uuid,
        id: Uuid,
        percentage: f64,
    ) -> Result<(), ApiError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
}

pub struct SqlxProjectRepository {
    pool: DatabasePool,
}

impl SqlxProjectRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for SqlxProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO projects (id, user_id, area_id, name, description, status, priority, importance,
                                  color, icon, deadline, archived, completion_percentage, sort_order,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(project.id)
            .bind(project.user_id)
            .bind(project.area_id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.status.as_str())
            .bind(project.priority.as_str())
            .bind(project.importance)
            .bind(&project.color)
            .bind(&project.icon)
            .bind(project.deadline)
            .bind(project.archived)
            .bind(project.completion_percentage)
            .bind(project.sort_order)
            .bind(project.created_at)
            .bind(project.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(Project::from(row))
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Project>, ApiError> {
        let sql = format!(
            "SELECT {} FROM projects WHERE id = $1 AND user_id = $2",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Project::from);

        Ok(project)
    }

    async fn list(
        &self,
        user_id: Uuid,
        include_archived: bool,
        area_id: Option<Uuid>,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM projects
            WHERE user_id = $1
                AND ($2 OR archived = FALSE)
                AND ($3::uuid IS NULL OR area_id = $3)
                AND ($4::text IS NULL OR status = $4)
            ORDER BY sort_order ASC, created_at ASC
            "#,
            PROJECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(user_id)
            .bind(include_archived)
            .bind(area_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn update(&self, project: &Project) -> Result<Project, ApiError> {
        let sql = format!(
            r#"
            UPDATE projects
            SET area_id = $3, name = $4, description = $5, status = $6, priority = $7, importance = $8,
                color = $9, icon = $10, deadline = $11, archived = $12, completion_percentage = $13,
                sort_order = $14, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(project.id)
            .bind(project.user_id)
            .bind(project.area_id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.status.as_str())
            .bind(project.priority.as_str())
            .bind(project.importance)
            .bind(&project.color)
            .bind(&project.icon)
            .bind(project.deadline)
            .bind(project.archived)
            .bind(project.completion_percentage)
            .bind(project.sort_order)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Project {} not found", project.id)))?;

        Ok(Project::from(row))
    }

    async fn set_completion_percentage(
        &self,
        user_id: Uuid,
        id: Uuid,
        percentage: f64,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE projects SET completion_percentage = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(percentage)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        // Tasks are removed through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
