use crate::{
    database::DatabasePool,
    error::ApiError,
    models::{Notification, NotificationPreferences, NotificationRow, NotificationType},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str = "id, user_id, notification_type, title, message, task_id, \
    task_name, project_name, is_read, read_at, created_at";

const PREFERENCE_COLUMNS: &str = "user_id, email_notifications, browser_notifications, \
    task_due_notifications, task_overdue_notifications, task_reminder_notifications, \
    project_deadline_notifications, recurring_task_notifications, achievement_notifications, \
    unblocked_task_notifications, reminder_advance_time, quiet_hours_start, quiet_hours_end, updated_at";

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationPreferences>, ApiError>;
    async fn save_preferences(
        &self,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences, ApiError>;

    async fn create(&self, notification: &Notification) -> Result<Notification, ApiError>;
    /// Newest first.
    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, ApiError>;
    async fn mark_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool, ApiError>;
    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, ApiError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError>;
    async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError>;
    /// Whether the task already got a notification of this type since `since`.
    async fn exists_for_task(
        &self,
        task_id: Uuid,
        kind: NotificationType,
        since: DateTime<Utc>,
    ) -> Result<bool, ApiError>;
}

pub struct SqlxNotificationRepository {
    pool: DatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationPreferences>, ApiError> {
        let sql = format!(
            "SELECT {} FROM notification_preferences WHERE user_id = $1",
            PREFERENCE_COLUMNS
        );
        let prefs = sqlx::query_as::<_, NotificationPreferences>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(prefs)
    }

    async fn save_preferences(
        &self,
        p: &NotificationPreferences,
    ) -> Result<NotificationPreferences, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO notification_preferences (user_id, email_notifications, browser_notifications,
                task_due_notifications, task_overdue_notifications, task_reminder_notifications,
                project_deadline_notifications, recurring_task_notifications, achievement_notifications,
                unblocked_task_notifications, reminder_advance_time, quiet_hours_start, quiet_hours_end,
                updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                email_notifications = EXCLUDED.email_notifications,
                browser_notifications = EXCLUDED.browser_notifications,
                task_due_notifications = EXCLUDED.task_due_notifications,
                task_overdue_notifications = EXCLUDED.task_overdue_notifications,
                task_reminder_notifications = EXCLUDED.task_reminder_notifications,
                project_deadline_notifications = EXCLUDED.project_deadline_notifications,
                recurring_task_notifications = EXCLUDED.recurring_task_notifications,
                achievement_notifications = EXCLUDED.achievement_notifications,
                unblocked_task_notifications = EXCLUDED.unblocked_task_notifications,
                reminder_advance_time = EXCLUDED.reminder_advance_time,
                quiet_hours_start = EXCLUDED.quiet_hours_start,
                quiet_hours_end = EXCLUDED.quiet_hours_end,
                updated_at = NOW()
            RETURNING {}
            "#,
            PREFERENCE_COLUMNS
        );
        let prefs = sqlx::query_as::<_, NotificationPreferences>(&sql)
            .bind(p.user_id)
            .bind(p.email_notifications)
            .bind(p.browser_notifications)
            .bind(p.task_due_notifications)
            .bind(p.task_overdue_notifications)
            .bind(p.task_reminder_notifications)
            .bind(p.project_deadline_notifications)
            .bind(p.recurring_task_notifications)
            .bind(p.achievement_notifications)
            .bind(p.unblocked_task_notifications)
            .bind(p.reminder_advance_time)
            .bind(&p.quiet_hours_start)
            .bind(&p.quiet_hours_end)
            .fetch_one(&self.pool)
            .await?;

        Ok(prefs)
    }

    async fn create(&self, n: &Notification) -> Result<Notification, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO notifications (id, user_id, notification_type, title, message, task_id,
                                       task_name, project_name, is_read, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(n.id)
            .bind(n.user_id)
            .bind(n.notification_type.as_str())
            .bind(&n.title)
            .bind(&n.message)
            .bind(n.task_id)
            .bind(&n.task_name)
            .bind(&n.project_name)
            .bind(n.is_read)
            .bind(n.read_at)
            .bind(n.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(Notification::from(row))
    }

    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, $3) WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn exists_for_task(
        &self,
        task_id: Uuid,
        kind: NotificationType,
        since: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE task_id = $1 AND notification_type = $2 AND created_at >= $3
            )
            "#,
        )
        .bind(task_id)
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
