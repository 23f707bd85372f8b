//! Notification center: per-user preferences, stored in-app notifications,
//! and the sweep that turns task due dates into reminders.
//!
//! Delivery is in-app only. A notification is dropped when the user's
//! preferences disable its type or the browser channel, or when it falls in
//! quiet hours (evaluated in UTC). Sweep notifications are deduplicated per
//! task, so one skipped during quiet hours goes out on a later sweep.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        notification::parse_hhmm, Notification, NotificationContext, NotificationListQuery,
        NotificationPreferences, NotificationPreferencesUpdate, NotificationType, Task,
    },
    repositories::{NotificationRepository, ProjectRepository, TaskRepository},
    utils::validation::validate_limit,
};

pub const MAX_NOTIFICATION_LIMIT: i64 = 200;
pub const MAX_REMINDER_ADVANCE_MINUTES: i32 = 1440;

/// A task stays "due now" for this long before it counts as overdue.
const DUE_GRACE_MINUTES: i64 = 60;
const OVERDUE_REPEAT_HOURS: i64 = 24;

pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
    task_repo: Arc<dyn TaskRepository>,
    project_repo: Arc<dyn ProjectRepository>,
}

impl NotificationService {
    pub fn new(
        notification_repo: Arc<dyn NotificationRepository>,
        task_repo: Arc<dyn TaskRepository>,
        project_repo: Arc<dyn ProjectRepository>,
    ) -> Self {
        Self {
            notification_repo,
            task_repo,
            project_repo,
        }
    }

    // ========================================================================
    // PREFERENCES
    // ========================================================================

    /// Stored preferences, saving the defaults on first access.
    pub async fn preferences(&self, user_id: Uuid) -> Result<NotificationPreferences, ApiError> {
        match self.notification_repo.get_preferences(user_id).await? {
            Some(prefs) => Ok(prefs),
            None => {
                self.notification_repo
                    .save_preferences(&NotificationPreferences::defaults_for(user_id))
                    .await
            }
        }
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        update: NotificationPreferencesUpdate,
    ) -> Result<NotificationPreferences, ApiError> {
        if let Some(minutes) = update.reminder_advance_time {
            if !(0..=MAX_REMINDER_ADVANCE_MINUTES).contains(&minutes) {
                return Err(ApiError::validation(format!(
                    "reminder_advance_time must be between 0 and {}",
                    MAX_REMINDER_ADVANCE_MINUTES
                )));
            }
        }
        let quiet_start = update
            .quiet_hours_start
            .as_deref()
            .map(quiet_hours_bound)
            .transpose()?;
        let quiet_end = update
            .quiet_hours_end
            .as_deref()
            .map(quiet_hours_bound)
            .transpose()?;

        let mut prefs = self.effective_preferences(user_id).await?;
        prefs.apply(&update);
        if let Some(start) = quiet_start {
            prefs.quiet_hours_start = start;
        }
        if let Some(end) = quiet_end {
            prefs.quiet_hours_end = end;
        }
        if prefs.quiet_hours_start.is_some() != prefs.quiet_hours_end.is_some() {
            return Err(ApiError::validation(
                "Quiet hours need both a start and an end",
            ));
        }

        let saved = self.notification_repo.save_preferences(&prefs).await?;
        tracing::info!(user_id = %user_id, "Notification preferences updated");
        Ok(saved)
    }

    async fn effective_preferences(&self, user_id: Uuid) -> Result<NotificationPreferences, ApiError> {
        Ok(self
            .notification_repo
            .get_preferences(user_id)
            .await?
            .unwrap_or_else(|| NotificationPreferences::defaults_for(user_id)))
    }

    // ========================================================================
    // NOTIFICATION CENTER
    // ========================================================================

    pub async fn list(
        &self,
        user_id: Uuid,
        query: &NotificationListQuery,
    ) -> Result<Vec<Notification>, ApiError> {
        let limit = validate_limit(query.limit, MAX_NOTIFICATION_LIMIT)?;
        self.notification_repo
            .list(user_id, query.unread_only, limit)
            .await
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.notification_repo.mark_read(user_id, id, Utc::now()).await? {
            return Err(ApiError::not_found("Notification not found"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ApiError> {
        self.notification_repo.mark_all_read(user_id, Utc::now()).await
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.notification_repo.delete(user_id, id).await? {
            return Err(ApiError::not_found("Notification not found"));
        }
        Ok(())
    }

    pub async fn clear_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let cleared = self.notification_repo.delete_all(user_id).await?;
        tracing::info!(user_id = %user_id, cleared, "Notifications cleared");
        Ok(cleared)
    }

    /// Stores a system notification regardless of preferences.
    pub async fn send_test(&self, user_id: Uuid) -> Result<Notification, ApiError> {
        let notification = build(
            user_id,
            NotificationType::System,
            "Test notification".to_string(),
            "Notifications are working.".to_string(),
            NotificationContext::default(),
        );
        self.notification_repo.create(&notification).await
    }

    /// Stores a notification when the user's preferences let it through.
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        title: String,
        message: String,
        context: NotificationContext,
    ) -> Result<Option<Notification>, ApiError> {
        let prefs = self.effective_preferences(user_id).await?;
        self.deliver(&prefs, kind, title, message, context, Utc::now())
            .await
    }

    async fn deliver(
        &self,
        prefs: &NotificationPreferences,
        kind: NotificationType,
        title: String,
        message: String,
        context: NotificationContext,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, ApiError> {
        if !prefs.allows(kind) || prefs.in_quiet_hours(now.time()) {
            tracing::debug!(user_id = %prefs.user_id, kind = %kind, "Notification suppressed");
            return Ok(None);
        }
        let notification = build(prefs.user_id, kind, title, message, context);
        let stored = self.notification_repo.create(&notification).await?;
        tracing::debug!(
            user_id = %stored.user_id,
            notification_id = %stored.id,
            kind = %kind,
            "Notification stored"
        );
        Ok(Some(stored))
    }

    // ========================================================================
    // TASK EVENTS
    // ========================================================================

    /// Notifies about open tasks whose last unfinished dependency was
    /// `completed`. Returns how many notifications were stored.
    pub async fn notify_unblocked(&self, completed: &Task) -> Result<usize, ApiError> {
        let dependents: Vec<Task> = self
            .task_repo
            .list_incomplete(completed.user_id)
            .await?
            .into_iter()
            .filter(|t| t.dependency_task_ids.contains(&completed.id))
            .collect();

        let mut sent = 0;
        for task in dependents {
            let deps = self
                .task_repo
                .get_many(task.user_id, &task.dependency_task_ids)
                .await?;
            if deps.iter().any(|d| !d.completed) {
                continue;
            }
            let project_name = self.project_name(&task).await?;
            let message = with_project(
                format!(
                    "'{}' is done, so '{}' is ready to start.",
                    completed.name, task.name
                ),
                project_name.as_deref(),
            );
            let stored = self
                .notify(
                    task.user_id,
                    NotificationType::UnblockedTask,
                    format!("Task Unblocked: {}", task.name),
                    message,
                    context_for(&task, project_name),
                )
                .await?;
            sent += usize::from(stored.is_some());
        }
        Ok(sent)
    }

    pub async fn notify_recurring_generated(&self, task: &Task) -> Result<bool, ApiError> {
        let project_name = self.project_name(task).await?;
        let message = with_project(
            format!("A new instance of '{}' was added to your tasks.", task.name),
            project_name.as_deref(),
        );
        let stored = self
            .notify(
                task.user_id,
                NotificationType::RecurringTask,
                format!("Recurring Task: {}", task.name),
                message,
                context_for(task, project_name),
            )
            .await?;
        Ok(stored.is_some())
    }

    // ========================================================================
    // REMINDER SWEEP
    // ========================================================================

    /// Sends due-soon reminders, due-now notices and overdue notices for
    /// every user's open tasks. Returns how many notifications were stored.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<usize, ApiError> {
        let horizon = now + Duration::minutes(i64::from(MAX_REMINDER_ADVANCE_MINUTES));
        let tasks = self.task_repo.list_due_before(horizon).await?;

        let mut prefs_by_user: HashMap<Uuid, NotificationPreferences> = HashMap::new();
        let mut sent = 0;
        for task in tasks {
            let prefs = match prefs_by_user.get(&task.user_id) {
                Some(prefs) => prefs.clone(),
                None => {
                    let prefs = self.effective_preferences(task.user_id).await?;
                    prefs_by_user.insert(task.user_id, prefs.clone());
                    prefs
                }
            };
            match self.remind(&prefs, &task, now).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Failed to send task reminder")
                }
            }
        }

        if sent > 0 {
            tracing::info!(sent, "Task reminders sent");
        }
        Ok(sent)
    }

    async fn remind(
        &self,
        prefs: &NotificationPreferences,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let Some(due) = task.due_date else {
            return Ok(false);
        };

        let (kind, since) = if due > now {
            let advance = Duration::minutes(i64::from(prefs.reminder_advance_time));
            if prefs.reminder_advance_time == 0 || due - now > advance {
                return Ok(false);
            }
            (NotificationType::TaskReminder, task.updated_at)
        } else if now - due < Duration::minutes(DUE_GRACE_MINUTES) {
            (NotificationType::TaskDue, task.updated_at)
        } else {
            (
                NotificationType::TaskOverdue,
                now - Duration::hours(OVERDUE_REPEAT_HOURS),
            )
        };

        if !prefs.allows(kind)
            || self
                .notification_repo
                .exists_for_task(task.id, kind, since)
                .await?
        {
            return Ok(false);
        }

        let project_name = self.project_name(task).await?;
        let (title, message) = match kind {
            NotificationType::TaskReminder => (
                format!("Task Due Soon: {}", task.name),
                format!(
                    "Your task '{}' is due in {} minutes.",
                    task.name,
                    (due - now).num_minutes().max(1)
                ),
            ),
            NotificationType::TaskDue => (
                format!("Task Due Now: {}", task.name),
                format!("Your task '{}' is due now.", task.name),
            ),
            _ => (
                format!("Overdue Task: {}", task.name),
                format!(
                    "Your task '{}' is overdue. Please review and update it.",
                    task.name
                ),
            ),
        };
        let message = with_project(message, project_name.as_deref());

        let stored = self
            .deliver(prefs, kind, title, message, context_for(task, project_name), now)
            .await?;
        Ok(stored.is_some())
    }

    async fn project_name(&self, task: &Task) -> Result<Option<String>, ApiError> {
        Ok(self
            .project_repo
            .get_by_id(task.user_id, task.project_id)
            .await?
            .map(|p| p.name))
    }
}

fn build(
    user_id: Uuid,
    kind: NotificationType,
    title: String,
    message: String,
    context: NotificationContext,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        notification_type: kind,
        title,
        message,
        task_id: context.task_id,
        task_name: context.task_name,
        project_name: context.project_name,
        is_read: false,
        read_at: None,
        created_at: Utc::now(),
    }
}

fn context_for(task: &Task, project_name: Option<String>) -> NotificationContext {
    NotificationContext {
        task_id: Some(task.id),
        task_name: Some(task.name.clone()),
        project_name,
    }
}

fn with_project(message: String, project_name: Option<&str>) -> String {
    match project_name {
        Some(name) => format!("{} (Project: {})", message, name),
        None => message,
    }
}

/// `Some(None)` clears the bound.
fn quiet_hours_bound(value: &str) -> Result<Option<String>, ApiError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_hhmm(value)
        .map(|t| Some(t.format("%H:%M").to_string()))
        .ok_or_else(|| ApiError::validation("Quiet hours must be in HH:MM format"))
}
