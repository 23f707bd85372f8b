//! Recurring tasks: templates that produce ordinary tasks on a schedule.
//!
//! Each generated task goes through `TaskService::create`, so it is validated
//! and counted toward its project like any other task. Generation is
//! idempotent per template and date: the instance link is unique on
//! `(recurring_task_id, scheduled_date)` and survives deletion of the task.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{NotificationService, ProjectService, TaskService};
use crate::{
    error::ApiError,
    models::{
        GenerationSummary, RecurrencePattern, RecurringTask, RecurringTaskCreate,
        RecurringTaskInstance, RecurringTaskUpdate, Task, TaskCreate,
    },
    repositories::{RecurringTaskRepository, TaskRepository},
    utils::validation::{
        validate_description, validate_due_time, validate_estimated_duration, validate_name,
    },
};

pub const MAX_RECURRENCE_INTERVAL: i32 = 365;

/// Normalized copy of `pattern`, or the first rule it breaks.
pub fn validate_pattern(
    pattern: &RecurrencePattern,
    start_date: NaiveDate,
) -> Result<RecurrencePattern, ApiError> {
    if !(1..=MAX_RECURRENCE_INTERVAL).contains(&pattern.interval) {
        return Err(ApiError::validation(format!(
            "Recurrence interval must be between 1 and {}",
            MAX_RECURRENCE_INTERVAL
        )));
    }
    if pattern.month_day.is_some_and(|d| !(1..=31).contains(&d)) {
        return Err(ApiError::validation("month_day must be between 1 and 31"));
    }
    if pattern.max_instances.is_some_and(|m| m < 1) {
        return Err(ApiError::validation("max_instances must be at least 1"));
    }
    if pattern.end_date.is_some_and(|end| end < start_date) {
        return Err(ApiError::validation("end_date must not be before the start date"));
    }

    let mut normalized = pattern.clone();
    normalized.weekdays.clear();
    for day in &pattern.weekdays {
        if !normalized.weekdays.contains(day) {
            normalized.weekdays.push(*day);
        }
    }
    Ok(normalized)
}

fn validate_category(category: &str) -> Result<Option<String>, ApiError> {
    if category.trim().is_empty() {
        return Ok(None);
    }
    validate_name("Category", category).map(Some)
}

/// Due moment for an instance: the template's due time on `date`, or the end
/// of that day.
fn due_at(date: NaiveDate, due_time: Option<&str>) -> DateTime<Utc> {
    let time = due_time
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN));
    Utc.from_utc_datetime(&date.and_time(time))
}

pub struct RecurringTaskService {
    recurring_repo: Arc<dyn RecurringTaskRepository>,
    task_repo: Arc<dyn TaskRepository>,
    project_service: Arc<ProjectService>,
    task_service: Arc<TaskService>,
    notification_service: Arc<NotificationService>,
}

impl RecurringTaskService {
    pub fn new(
        recurring_repo: Arc<dyn RecurringTaskRepository>,
        task_repo: Arc<dyn TaskRepository>,
        project_service: Arc<ProjectService>,
        task_service: Arc<TaskService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            recurring_repo,
            task_repo,
            project_service,
            task_service,
            notification_service,
        }
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    pub async fn create(
        &self,
        user_id: Uuid,
        payload: RecurringTaskCreate,
    ) -> Result<RecurringTask, ApiError> {
        let start_date = payload.start_date.unwrap_or_else(|| Utc::now().date_naive());
        let recurring = RecurringTask {
            id: Uuid::new_v4(),
            user_id,
            project_id: payload.project_id,
            name: validate_name("Task name", &payload.name)?,
            description: validate_description(&payload.description)?,
            priority: payload.priority,
            category: payload
                .category
                .as_deref()
                .map(validate_category)
                .transpose()?
                .flatten(),
            estimated_duration: payload
                .estimated_duration
                .map(validate_estimated_duration)
                .transpose()?,
            due_time: payload.due_time.as_deref().map(validate_due_time).transpose()?,
            recurrence_pattern: validate_pattern(&payload.recurrence_pattern, start_date)?,
            start_date,
            is_active: true,
            last_generated_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        if self
            .project_service
            .find(user_id, payload.project_id)
            .await?
            .is_none()
        {
            return Err(ApiError::not_found("Project not found"));
        }

        let created = self.recurring_repo.create(&recurring).await?;
        tracing::info!(
            user_id = %user_id,
            recurring_task_id = %created.id,
            recurrence = created.recurrence_pattern.recurrence_type.as_str(),
            "Recurring task created"
        );
        Ok(created)
    }

    pub async fn list(&self, user_id: Uuid, active_only: bool) -> Result<Vec<RecurringTask>, ApiError> {
        self.recurring_repo.list(user_id, active_only).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<RecurringTask, ApiError> {
        self.recurring_repo
            .get_by_id(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Recurring task not found"))
    }

    /// Every field is validated before anything is written.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        payload: RecurringTaskUpdate,
    ) -> Result<RecurringTask, ApiError> {
        let mut recurring = self.get(user_id, id).await?;

        if let Some(name) = payload.name.as_deref() {
            recurring.name = validate_name("Task name", name)?;
        }
        if let Some(description) = payload.description.as_deref() {
            recurring.description = validate_description(description)?;
        }
        if let Some(priority) = payload.priority {
            recurring.priority = priority;
        }
        if let Some(category) = payload.category.as_deref() {
            recurring.category = validate_category(category)?;
        }
        if let Some(minutes) = payload.estimated_duration {
            recurring.estimated_duration = Some(validate_estimated_duration(minutes)?);
        }
        if let Some(due_time) = payload.due_time.as_deref() {
            recurring.due_time = if due_time.trim().is_empty() {
                None
            } else {
                Some(validate_due_time(due_time)?)
            };
        }
        if let Some(pattern) = payload.recurrence_pattern.as_ref() {
            recurring.recurrence_pattern = validate_pattern(pattern, recurring.start_date)?;
        }
        if let Some(active) = payload.is_active {
            recurring.is_active = active;
        }
        recurring.updated_at = Utc::now();

        self.recurring_repo.update(&recurring).await
    }

    /// Generated tasks are kept.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.recurring_repo.delete(user_id, id).await? {
            return Err(ApiError::not_found("Recurring task not found"));
        }
        tracing::info!(user_id = %user_id, recurring_task_id = %id, "Recurring task deleted");
        Ok(())
    }

    /// Tasks generated from this template that still exist, newest first.
    pub async fn instances(&self, user_id: Uuid, id: Uuid) -> Result<Vec<Task>, ApiError> {
        self.get(user_id, id).await?;
        let task_ids: Vec<Uuid> = self
            .recurring_repo
            .list_instances(user_id, id)
            .await?
            .into_iter()
            .filter_map(|i| i.task_id)
            .collect();

        let mut tasks = self.task_repo.get_many(user_id, &task_ids).await?;
        tasks.sort_by(|a, b| b.due_date.cmp(&a.due_date));
        Ok(tasks)
    }

    // ========================================================================
    // GENERATION
    // ========================================================================

    /// Generates the caller's instances due on `date`.
    pub async fn generate_instances(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<GenerationSummary, ApiError> {
        let mut task_ids = Vec::new();
        for recurring in self.recurring_repo.list(user_id, true).await? {
            if let Some(task) = self.generate_for(&recurring, date).await? {
                task_ids.push(task.id);
            }
        }
        Ok(GenerationSummary {
            date,
            generated: task_ids.len(),
            task_ids,
        })
    }

    /// Generates every user's instances due on `date`. A failing template is
    /// logged and skipped.
    pub async fn run_due(&self, date: NaiveDate) -> Result<usize, ApiError> {
        let mut generated = 0;
        for recurring in self.recurring_repo.list_all_active().await? {
            match self.generate_for(&recurring, date).await {
                Ok(Some(_)) => generated += 1,
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    recurring_task_id = %recurring.id,
                    error = %e,
                    "Recurring task generation failed"
                ),
            }
        }
        if generated > 0 {
            tracing::info!(generated, date = %date, "Recurring task instances generated");
        }
        Ok(generated)
    }

    async fn generate_for(
        &self,
        recurring: &RecurringTask,
        date: NaiveDate,
    ) -> Result<Option<Task>, ApiError> {
        let pattern = &recurring.recurrence_pattern;
        if !recurring.is_active || !pattern.occurs_on(recurring.start_date, date) {
            return Ok(None);
        }
        if self.recurring_repo.has_instance(recurring.id, date).await? {
            return Ok(None);
        }
        if let Some(max) = pattern.max_instances {
            if self.recurring_repo.count_instances(recurring.id).await? >= i64::from(max) {
                return Ok(None);
            }
        }

        let task = self
            .task_service
            .create(
                recurring.user_id,
                TaskCreate {
                    project_id: recurring.project_id,
                    name: recurring.name.clone(),
                    description: recurring.description.clone(),
                    priority: recurring.priority,
                    due_date: Some(due_at(date, recurring.due_time.as_deref())),
                    due_time: recurring.due_time.clone(),
                    estimated_duration: recurring.estimated_duration,
                    ..Default::default()
                },
            )
            .await?;

        let instance = RecurringTaskInstance {
            id: Uuid::new_v4(),
            recurring_task_id: recurring.id,
            task_id: Some(task.id),
            user_id: recurring.user_id,
            scheduled_date: date,
            created_at: Utc::now(),
        };
        if !self.recurring_repo.record_instance(&instance).await? {
            // Another run claimed this date first
            self.task_service.delete(recurring.user_id, task.id).await?;
            return Ok(None);
        }
        self.recurring_repo.mark_generated(recurring.id, date).await?;

        tracing::debug!(
            recurring_task_id = %recurring.id,
            task_id = %task.id,
            date = %date,
            "Recurring task instance created"
        );
        if let Err(e) = self.notification_service.notify_recurring_generated(&task).await {
            tracing::warn!(task_id = %task.id, error = %e, "Failed to notify recurring task");
        }
        Ok(Some(task))
    }
}
