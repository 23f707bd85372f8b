use crate::{
    database::DatabasePool,
    error::ApiError,
    models::{RecurringTask, RecurringTaskInstance, RecurringTaskRow},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

const RECURRING_COLUMNS: &str = "id, user_id, project_id, name, description, priority, category, \
    estimated_duration, due_time, recurrence_type, recurrence_interval, weekdays, month_day, \
    end_date, max_instances, start_date, is_active, last_generated_date, created_at, updated_at";

const INSTANCE_COLUMNS: &str = "id, recurring_task_id, task_id, user_id, scheduled_date, created_at";

#[async_trait]
pub trait RecurringTaskRepository: Send + Sync {
    async fn create(&self, task: &RecurringTask) -> Result<RecurringTask, ApiError>;
    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<RecurringTask>, ApiError>;
    async fn list(&self, user_id: Uuid, active_only: bool) -> Result<Vec<RecurringTask>, ApiError>;
    /// Active recurring tasks of every user, for the generation job.
    async fn list_all_active(&self) -> Result<Vec<RecurringTask>, ApiError>;
    async fn update(&self, task: &RecurringTask) -> Result<RecurringTask, ApiError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
    async fn mark_generated(&self, id: Uuid, date: NaiveDate) -> Result<(), ApiError>;

    /// Links a generated task; `false` when the date already had one.
    async fn record_instance(&self, instance: &RecurringTaskInstance) -> Result<bool, ApiError>;
    async fn has_instance(&self, recurring_task_id: Uuid, date: NaiveDate) -> Result<bool, ApiError>;
    async fn count_instances(&self, recurring_task_id: Uuid) -> Result<i64, ApiError>;
    async fn list_instances(
        &self,
        user_id: Uuid,
        recurring_task_id: Uuid,
    ) -> Result<Vec<RecurringTaskInstance>, ApiError>;
}

pub struct SqlxRecurringTaskRepository {
    pool: DatabasePool,
}

impl SqlxRecurringTaskRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn weekday_names(task: &RecurringTask) -> Vec<String> {
    task.recurrence_pattern
        .weekdays
        .iter()
        .map(|d| d.as_str().to_string())
        .collect()
}

#[async_trait]
impl RecurringTaskRepository for SqlxRecurringTaskRepository {
    async fn create(&self, task: &RecurringTask) -> Result<RecurringTask, ApiError> {
        let pattern = &task.recurrence_pattern;
        let sql = format!(
            r#"
            INSERT INTO recurring_tasks (id, user_id, project_id, name, description, priority, category,
                                         estimated_duration, due_time, recurrence_type, recurrence_interval,
                                         weekdays, month_day, end_date, max_instances, start_date, is_active,
                                         last_generated_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {}
            "#,
            RECURRING_COLUMNS
        );
        let row = sqlx::query_as::<_, RecurringTaskRow>(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(task.project_id)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.priority.as_str())
            .bind(&task.category)
            .bind(task.estimated_duration)
            .bind(&task.due_time)
            .bind(pattern.recurrence_type.as_str())
            .bind(pattern.interval)
            .bind(weekday_names(task))
            .bind(pattern.month_day)
            .bind(pattern.end_date)
            .bind(pattern.max_instances)
            .bind(task.start_date)
            .bind(task.is_active)
            .bind(task.last_generated_date)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(RecurringTask::from(row))
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<RecurringTask>, ApiError> {
        let sql = format!(
            "SELECT {} FROM recurring_tasks WHERE id = $1 AND user_id = $2",
            RECURRING_COLUMNS
        );
        let task = sqlx::query_as::<_, RecurringTaskRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(RecurringTask::from);

        Ok(task)
    }

    async fn list(&self, user_id: Uuid, active_only: bool) -> Result<Vec<RecurringTask>, ApiError> {
        let sql = format!(
            "SELECT {} FROM recurring_tasks WHERE user_id = $1 AND (NOT $2 OR is_active) ORDER BY created_at ASC",
            RECURRING_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecurringTaskRow>(&sql)
            .bind(user_id)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RecurringTask::from).collect())
    }

    async fn list_all_active(&self) -> Result<Vec<RecurringTask>, ApiError> {
        let sql = format!(
            "SELECT {} FROM recurring_tasks WHERE is_active ORDER BY user_id, created_at ASC",
            RECURRING_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecurringTaskRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RecurringTask::from).collect())
    }

    async fn update(&self, task: &RecurringTask) -> Result<RecurringTask, ApiError> {
        let pattern = &task.recurrence_pattern;
        let sql = format!(
            r#"
            UPDATE recurring_tasks
            SET name = $3, description = $4, priority = $5, category = $6, estimated_duration = $7,
                due_time = $8, recurrence_type = $9, recurrence_interval = $10, weekdays = $11,
                month_day = $12, end_date = $13, max_instances = $14, is_active = $15, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            RECURRING_COLUMNS
        );
        let row = sqlx::query_as::<_, RecurringTaskRow>(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.priority.as_str())
            .bind(&task.category)
            .bind(task.estimated_duration)
            .bind(&task.due_time)
            .bind(pattern.recurrence_type.as_str())
            .bind(pattern.interval)
            .bind(weekday_names(task))
            .bind(pattern.month_day)
            .bind(pattern.end_date)
            .bind(pattern.max_instances)
            .bind(task.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Recurring task {} not found", task.id)))?;

        Ok(RecurringTask::from(row))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM recurring_tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_generated(&self, id: Uuid, date: NaiveDate) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE recurring_tasks SET last_generated_date = GREATEST(last_generated_date, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_instance(&self, instance: &RecurringTaskInstance) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            INSERT INTO recurring_task_instances (id, recurring_task_id, task_id, user_id, scheduled_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (recurring_task_id, scheduled_date) DO NOTHING
            "#,
        )
        .bind(instance.id)
        .bind(instance.recurring_task_id)
        .bind(instance.task_id)
        .bind(instance.user_id)
        .bind(instance.scheduled_date)
        .bind(instance.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_instance(&self, recurring_task_id: Uuid, date: NaiveDate) -> Result<bool, ApiError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM recurring_task_instances WHERE recurring_task_id = $1 AND scheduled_date = $2)",
        )
        .bind(recurring_task_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count_instances(&self, recurring_task_id: Uuid) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM recurring_task_instances WHERE recurring_task_id = $1",
        )
        .bind(recurring_task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_instances(
        &self,
        user_id: Uuid,
        recurring_task_id: Uuid,
    ) -> Result<Vec<RecurringTaskInstance>, ApiError> {
        let sql = format!(
            "SELECT {} FROM recurring_task_instances WHERE user_id = $1 AND recurring_task_id = $2 ORDER BY scheduled_date DESC",
            INSTANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecurringTaskInstance>(&sql)
            .bind(user_id)
            .bind(recurring_task_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
