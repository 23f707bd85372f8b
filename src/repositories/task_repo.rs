use crate::{
    database::DatabasePool,
    error::ApiError,
    models::{Task, TaskFilter, TaskRow},
};
use super::like_pattern;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, user_id, project_id, parent_task_id, name, description, status, priority, \
    kanban_column, due_date, due_time, estimated_duration, completed, completed_at, \
    dependency_task_ids, sort_order, created_at, updated_at";

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> Result<Task, ApiError>;
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, ApiError>;
    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Task>, ApiError>;
    async fn list(&self, user_id: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, ApiError>;
    async fn list_by_projects(
        &self,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> Result<Vec<Task>, ApiError>;
    async fn list_subtasks(&self, user_id: Uuid, parent_id: Uuid) -> Result<Vec<Task>, ApiError>;
    /// Incomplete tasks, due ones first.
    async fn list_incomplete(&self, user_id: Uuid) -> Result<Vec<Task>, ApiError>;
    async fn list_completed_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Task>, ApiError>;
    /// Incomplete tasks of every user due at or before `before`.
    async fn list_due_before(&self, before: DateTime<Utc>) -> Result<Vec<Task>, ApiError>;
    async fn search(&self, user_id: Uuid, query: &str, limit: i64) -> Result<Vec<Task>, ApiError>;
    async fn update(&self, task: &Task) -> Result<Task, ApiError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
}

pub struct SqlxTaskRepository {
    pool: DatabasePool,
}

impl SqlxTaskRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqlxTaskRepository {
    async fn create(&self, task: &Task) -> Result<Task, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO tasks (id, user_id, project_id, parent_task_id, name, description, status, priority,
                               kanban_column, due_date, due_time, estimated_duration, completed, completed_at,
                               dependency_task_ids, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(task.project_id)
            .bind(task.parent_task_id)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(task.kanban_column.as_str())
            .bind(task.due_date)
            .bind(&task.due_time)
            .bind(task.estimated_duration)
            .bind(task.completed)
            .bind(task.completed_at)
            .bind(&task.dependency_task_ids)
            .bind(task.sort_order)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(Task::from(row))
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, ApiError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::from);

        Ok(task)
    }

    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Task>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND id = ANY($2)",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn list(&self, user_id: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE user_id = $1
                AND ($2::uuid IS NULL OR project_id = $2)
                AND ($3::bool IS NULL OR completed = $3)
                AND ($4::text IS NULL OR status = $4)
                AND ($5::text IS NULL OR priority = $5)
            ORDER BY sort_order ASC, created_at DESC
            LIMIT $6 OFFSET $7
            "#,
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(filter.project_id)
            .bind(filter.completed)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(filter.limit.unwrap_or(i64::MAX))
            .bind(filter.offset.max(0))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn list_by_projects(
        &self,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> Result<Vec<Task>, ApiError> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND project_id = ANY($2) ORDER BY sort_order ASC, created_at ASC",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(project_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn list_subtasks(&self, user_id: Uuid, parent_id: Uuid) -> Result<Vec<Task>, ApiError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND parent_task_id = $2 ORDER BY sort_order ASC, created_at ASC",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn list_incomplete(&self, user_id: Uuid) -> Result<Vec<Task>, ApiError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND completed = FALSE ORDER BY due_date ASC NULLS LAST, created_at ASC",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn list_completed_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Task>, ApiError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND completed = TRUE AND completed_at >= $2 ORDER BY completed_at DESC",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn list_due_before(&self, before: DateTime<Utc>) -> Result<Vec<Task>, ApiError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE completed = FALSE AND due_date IS NOT NULL AND due_date <= $1 ORDER BY due_date ASC",
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(before)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn search(&self, user_id: Uuid, query: &str, limit: i64) -> Result<Vec<Task>, ApiError> {
        let pattern = like_pattern(query);
        let sql = format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE user_id = $1 AND (name ILIKE $2 OR description ILIKE $2)
            ORDER BY completed ASC, updated_at DESC
            LIMIT $3
            "#,
            TASK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn update(&self, task: &Task) -> Result<Task, ApiError> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET name = $3, description = $4, status = $5, priority = $6, kanban_column = $7,
                due_date = $8, due_time = $9, estimated_duration = $10, completed = $11,
                completed_at = $12, dependency_task_ids = $13, sort_order = $14, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(task.kanban_column.as_str())
            .bind(task.due_date)
            .bind(&task.due_time)
            .bind(task.estimated_duration)
            .bind(task.completed)
            .bind(task.completed_at)
            .bind(&task.dependency_task_ids)
            .bind(task.sort_order)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Task {} not found", task.id)))?;

        Ok(Task::from(row))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        // Subtasks go with their parent through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
