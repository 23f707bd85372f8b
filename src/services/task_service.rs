//! Task Service
//!
//! CRUD for tasks plus the completion rules shared by the REST, Today and
//! GraphQL surfaces:
//! - `completed = true` moves the task to `completed` / `done` and stamps
//!   `completed_at`
//! - `completed = false` clears `completed_at` and reopens a completed task
//!   to `todo`
//! - every completion change recalculates the project's completion
//!   percentage, and a fresh completion awards alignment points and
//!   notifies about dependents it unblocked

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{AlignmentService, NotificationService, ProjectService};
use crate::{
    error::ApiError,
    models::{
        KanbanColumn, Task, TaskCreate, TaskFilter, TaskStatus, TaskUpdate,
    },
    repositories::{AreaRepository, TaskRepository},
    utils::validation::{
        validate_description, validate_due_time, validate_estimated_duration, validate_limit,
        validate_name,
    },
};

pub const MAX_LIST_LIMIT: i64 = 1000;
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// Apply a status and/or completion change. Returns true when the task went
/// from open to completed.
pub(crate) fn apply_progress(
    task: &mut Task,
    status: Option<TaskStatus>,
    completed: Option<bool>,
    kanban: Option<KanbanColumn>,
    now: DateTime<Utc>,
) -> bool {
    let was_completed = task.completed;
    let touched = status.is_some() || completed.is_some();

    let want_completed = match (completed, status) {
        (Some(c), _) => c,
        (None, Some(s)) => s == TaskStatus::Completed,
        (None, None) => was_completed,
    };

    if want_completed {
        task.completed = true;
        task.status = TaskStatus::Completed;
        if task.completed_at.is_none() {
            task.completed_at = Some(now);
        }
    } else {
        task.completed = false;
        task.completed_at = None;
        task.status = match status {
            Some(s) if s != TaskStatus::Completed => s,
            _ if task.status == TaskStatus::Completed => TaskStatus::Todo,
            _ => task.status,
        };
    }

    if let Some(column) = kanban {
        task.kanban_column = column;
    } else if touched {
        task.kanban_column = KanbanColumn::for_status(task.status);
    }

    !was_completed && task.completed
}

pub struct TaskService {
    task_repo: Arc<dyn TaskRepository>,
    area_repo: Arc<dyn AreaRepository>,
    project_service: Arc<ProjectService>,
    alignment_service: Arc<AlignmentService>,
    notification_service: Option<Arc<NotificationService>>,
}

impl TaskService {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        area_repo: Arc<dyn AreaRepository>,
        project_service: Arc<ProjectService>,
        alignment_service: Arc<AlignmentService>,
    ) -> Self {
        Self {
            task_repo,
            area_repo,
            project_service,
            alignment_service,
            notification_service: None,
        }
    }

    pub fn with_notifications(mut self, notification_service: Arc<NotificationService>) -> Self {
        self.notification_service = Some(notification_service);
        self
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    pub async fn create(&self, user_id: Uuid, payload: TaskCreate) -> Result<Task, ApiError> {
        if self
            .project_service
            .find(user_id, payload.project_id)
            .await?
            .is_none()
        {
            return Err(ApiError::not_found("Project not found"));
        }

        if let Some(parent_id) = payload.parent_task_id {
            let parent = self
                .task_repo
                .get_by_id(user_id, parent_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Parent task not found"))?;
            if parent.project_id != payload.project_id {
                return Err(ApiError::validation(
                    "Parent task must belong to the same project",
                ));
            }
        }

        let id = Uuid::new_v4();
        let dependency_task_ids = self
            .validate_dependencies(user_id, id, &payload.dependency_task_ids)
            .await?;

        let now = Utc::now();
        let mut task = Task {
            id,
            user_id,
            project_id: payload.project_id,
            parent_task_id: payload.parent_task_id,
            name: validate_name("Task name", &payload.name)?,
            description: validate_description(&payload.description)?,
            status: TaskStatus::Todo,
            priority: payload.priority,
            kanban_column: KanbanColumn::Todo,
            due_date: payload.due_date,
            due_time: payload.due_time.as_deref().map(validate_due_time).transpose()?,
            estimated_duration: payload
                .estimated_duration
                .map(validate_estimated_duration)
                .transpose()?,
            completed: false,
            completed_at: None,
            dependency_task_ids,
            sort_order: payload.sort_order,
            created_at: now,
            updated_at: now,
        };
        let completed = apply_progress(
            &mut task,
            Some(payload.status.unwrap_or(TaskStatus::Todo)),
            None,
            payload.kanban_column,
            now,
        );

        let created = self.task_repo.create(&task).await?;
        tracing::info!(
            user_id = %user_id,
            task_id = %created.id,
            project_id = %created.project_id,
            "Task created"
        );

        self.after_progress_change(&created, completed).await?;
        Ok(created)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Task, ApiError> {
        self.task_repo
            .get_by_id(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    pub async fn list(&self, user_id: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        if let Some(limit) = filter.limit {
            validate_limit(limit, MAX_LIST_LIMIT)?;
        }
        if filter.offset < 0 {
            return Err(ApiError::validation("offset must not be negative"));
        }
        self.task_repo.list(user_id, filter).await
    }

    /// Case-insensitive match on name or description.
    pub async fn search(&self, user_id: Uuid, query: &str, limit: i64) -> Result<Vec<Task>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::validation("Search query is required"));
        }
        let limit = validate_limit(limit, MAX_SEARCH_LIMIT)?;
        self.task_repo.search(user_id, query, limit).await
    }

    pub async fn subtasks(&self, user_id: Uuid, id: Uuid) -> Result<Vec<Task>, ApiError> {
        self.get(user_id, id).await?;
        self.task_repo.list_subtasks(user_id, id).await
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, payload: TaskUpdate) -> Result<Task, ApiError> {
        let mut task = self.get(user_id, id).await?;
        let was_completed = task.completed;

        if let Some(name) = payload.name.as_deref() {
            task.name = validate_name("Task name", name)?;
        }
        if let Some(description) = payload.description.as_deref() {
            task.description = validate_description(description)?;
        }
        if let Some(priority) = payload.priority {
            task.priority = priority;
        }
        if payload.clear_due_date {
            task.due_date = None;
        } else if payload.due_date.is_some() {
            task.due_date = payload.due_date;
        }
        if let Some(due_time) = payload.due_time.as_deref() {
            task.due_time = if due_time.trim().is_empty() {
                None
            } else {
                Some(validate_due_time(due_time)?)
            };
        }
        if let Some(minutes) = payload.estimated_duration {
            task.estimated_duration = Some(validate_estimated_duration(minutes)?);
        }
        if let Some(deps) = payload.dependency_task_ids.as_deref() {
            task.dependency_task_ids = self.validate_dependencies(user_id, id, deps).await?;
        }
        if let Some(sort_order) = payload.sort_order {
            task.sort_order = sort_order;
        }

        let now = Utc::now();
        let newly_completed = apply_progress(
            &mut task,
            payload.status,
            payload.completed,
            payload.kanban_column,
            now,
        );
        task.updated_at = now;

        let updated = self.task_repo.update(&task).await?;
        if was_completed != updated.completed {
            self.after_progress_change(&updated, newly_completed).await?;
        }
        Ok(updated)
    }

    /// Shortcut used by the Today view and GraphQL toggle.
    pub async fn set_completion(&self, user_id: Uuid, id: Uuid, completed: bool) -> Result<Task, ApiError> {
        self.update(
            user_id,
            id,
            TaskUpdate {
                completed: Some(completed),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes the task and, through the cascade, its subtasks.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let task = self.get(user_id, id).await?;
        if !self.task_repo.delete(user_id, id).await? {
            return Err(ApiError::not_found("Task not found"));
        }
        tracing::info!(user_id = %user_id, task_id = %id, "Task deleted");
        self.project_service
            .recalculate_completion(user_id, task.project_id)
            .await?;
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    async fn validate_dependencies(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, ApiError> {
        let mut unique: Vec<Uuid> = Vec::with_capacity(ids.len());
        for id in ids {
            if *id == task_id {
                return Err(ApiError::validation("A task cannot depend on itself"));
            }
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.is_empty() {
            return Ok(unique);
        }

        let found = self.task_repo.get_many(user_id, &unique).await?;
        if found.len() != unique.len() {
            return Err(ApiError::validation("One or more dependency tasks were not found"));
        }
        Ok(unique)
    }

    async fn after_progress_change(&self, task: &Task, newly_completed: bool) -> Result<(), ApiError> {
        self.project_service
            .recalculate_completion(task.user_id, task.project_id)
            .await?;

        if newly_completed {
            if let Err(e) = self.award_points(task).await {
                tracing::warn!(task_id = %task.id, error = %e, "Failed to award alignment points");
            }
            if let Some(notifications) = &self.notification_service {
                if let Err(e) = notifications.notify_unblocked(task).await {
                    tracing::warn!(task_id = %task.id, error = %e, "Failed to notify unblocked tasks");
                }
            }
        }
        Ok(())
    }

    async fn award_points(&self, task: &Task) -> Result<(), ApiError> {
        let project = self.project_service.find(task.user_id, task.project_id).await?;
        let area = match project.as_ref().and_then(|p| p.area_id) {
            Some(area_id) => self.area_repo.get_by_id(task.user_id, area_id).await?,
            None => None,
        };
        self.alignment_service
            .award_task_completion(task, project.as_ref(), area.as_ref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::models::NotificationType;
    use crate::repositories::memory::{
        sample_area, sample_project, sample_task, InMemoryAlignmentRepository,
        InMemoryAreaRepository, InMemoryNotificationRepository, InMemoryProjectRepository,
        InMemoryTaskRepository,
    };

    struct Fixture {
        service: TaskService,
        areas: Arc<InMemoryAreaRepository>,
        projects: Arc<InMemoryProjectRepository>,
        tasks: Arc<InMemoryTaskRepository>,
        scores: Arc<InMemoryAlignmentRepository>,
    }

    fn fixture() -> Fixture {
        let areas = Arc::new(InMemoryAreaRepository::default());
        let projects = Arc::new(InMemoryProjectRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let scores = Arc::new(InMemoryAlignmentRepository::default());
        let project_service = Arc::new(ProjectService::new(
            projects.clone(),
            areas.clone(),
            tasks.clone(),
        ));
        let alignment = Arc::new(AlignmentService::new(scores.clone(), 1000));
        Fixture {
            service: TaskService::new(tasks.clone(), areas.clone(), project_service, alignment),
            areas,
            projects,
            tasks,
            scores,
        }
    }

    fn seed_project(f: &Fixture, user: Uuid) -> Uuid {
        let project = sample_project(user, None, "Inbox");
        let id = project.id;
        f.projects.projects.lock().unwrap().push(project);
        id
    }

    fn payload(project_id: Uuid, name: &str) -> TaskCreate {
        TaskCreate {
            project_id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn project_completion(f: &Fixture, id: Uuid) -> f64 {
        f.projects
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.completion_percentage)
            .unwrap()
    }

    #[test]
    fn test_apply_progress_complete_and_reopen() {
        let now = Utc::now();
        let mut task = sample_task(Uuid::new_v4(), Uuid::new_v4(), "t");

        assert!(apply_progress(&mut task, None, Some(true), None, now));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.kanban_column, KanbanColumn::Done);
        assert_eq!(task.completed_at, Some(now));

        assert!(!apply_progress(&mut task, None, Some(false), None, now));
        assert!(!task.completed);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.kanban_column, KanbanColumn::Todo);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_apply_progress_status_drives_completion() {
        let now = Utc::now();
        let mut task = sample_task(Uuid::new_v4(), Uuid::new_v4(), "t");

        apply_progress(&mut task, Some(TaskStatus::InProgress), None, None, now);
        assert!(!task.completed);
        assert_eq!(task.kanban_column, KanbanColumn::InProgress);

        assert!(apply_progress(&mut task, Some(TaskStatus::Completed), None, None, now));
        assert!(task.completed);

        apply_progress(&mut task, Some(TaskStatus::Review), None, None, now);
        assert!(!task.completed);
        assert_eq!(task.status, TaskStatus::Review);
    }

    #[test]
    fn test_apply_progress_explicit_kanban_wins() {
        let now = Utc::now();
        let mut task = sample_task(Uuid::new_v4(), Uuid::new_v4(), "t");
        apply_progress(
            &mut task,
            Some(TaskStatus::InProgress),
            None,
            Some(KanbanColumn::Review),
            now,
        );
        assert_eq!(task.kanban_column, KanbanColumn::Review);
    }

    #[tokio::test]
    async fn test_create_requires_own_project() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = seed_project(&f, user);

        let err = f
            .service
            .create(Uuid::new_v4(), payload(project, "Nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let task = f.service.create(user, payload(project, "Yes")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.kanban_column, KanbanColumn::Todo);
    }

    #[tokio::test]
    async fn test_subtask_parent_must_share_project() {
        let f = fixture();
        let user = Uuid::new_v4();
        let first = seed_project(&f, user);
        let second = seed_project(&f, user);
        let parent = f.service.create(user, payload(first, "Parent")).await.unwrap();

        let mut wrong = payload(second, "Child");
        wrong.parent_task_id = Some(parent.id);
        let err = f.service.create(user, wrong).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut right = payload(first, "Child");
        right.parent_task_id = Some(parent.id);
        f.service.create(user, right).await.unwrap();
        assert_eq!(f.service.subtasks(user, parent.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dependencies_must_exist_and_not_be_self() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = seed_project(&f, user);
        let dep = f.service.create(user, payload(project, "First")).await.unwrap();

        let mut missing = payload(project, "Second");
        missing.dependency_task_ids = vec![Uuid::new_v4()];
        assert!(matches!(
            f.service.create(user, missing).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let task = f.service.create(user, payload(project, "Second")).await.unwrap();
        let err = f
            .service
            .update(
                user,
                task.id,
                TaskUpdate {
                    dependency_task_ids: Some(vec![task.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let updated = f
            .service
            .update(
                user,
                task.id,
                TaskUpdate {
                    dependency_task_ids: Some(vec![dep.id, dep.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.dependency_task_ids, vec![dep.id]);
    }

    #[tokio::test]
    async fn test_completion_recalculates_project_and_awards_once() {
        let f = fixture();
        let user = Uuid::new_v4();
        let area = sample_area(user, None, "Health");
        let mut project = sample_project(user, Some(area.id), "Run");
        project.priority = Priority::High;
        let project_id = project.id;
        f.areas.areas.lock().unwrap().push(area);
        f.projects.projects.lock().unwrap().push(project);

        let a = f.service.create(user, payload(project_id, "a")).await.unwrap();
        f.service.create(user, payload(project_id, "b")).await.unwrap();

        f.service.set_completion(user, a.id, true).await.unwrap();
        assert_eq!(project_completion(&f, project_id), 50.0);
        {
            let scores = f.scores.scores.lock().unwrap();
            assert_eq!(scores.len(), 1);
            assert_eq!(scores[0].points_earned, 20);
        }

        f.service.set_completion(user, a.id, false).await.unwrap();
        assert_eq!(project_completion(&f, project_id), 0.0);

        f.service.set_completion(user, a.id, true).await.unwrap();
        assert_eq!(f.scores.scores.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_recalculates() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = seed_project(&f, user);
        let parent = f.service.create(user, payload(project, "Parent")).await.unwrap();
        let mut child = payload(project, "Child");
        child.parent_task_id = Some(parent.id);
        f.service.create(user, child).await.unwrap();
        let mut done = payload(project, "Done");
        done.status = Some(TaskStatus::Completed);
        f.service.create(user, done).await.unwrap();
        assert_eq!(project_completion(&f, project), 50.0);

        f.service.delete(user, parent.id).await.unwrap();
        assert_eq!(f.tasks.tasks.lock().unwrap().len(), 1);
        assert_eq!(project_completion(&f, project), 100.0);

        let err = f.service.delete(user, parent.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_validates_query() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = seed_project(&f, user);
        f.service
            .create(user, payload(project, "Buy groceries"))
            .await
            .unwrap();

        assert!(f.service.search(user, "  ", 10).await.is_err());
        let hits = f.service.search(user, "GROCER", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(f.tasks.tasks.lock().unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_invalid_due_time_rejected() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = seed_project(&f, user);
        let mut bad = payload(project, "Late");
        bad.due_time = Some("25:00".into());
        assert!(matches!(
            f.service.create(user, bad).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_completing_last_dependency_notifies_dependent() {
        let areas = Arc::new(InMemoryAreaRepository::default());
        let projects = Arc::new(InMemoryProjectRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let project_service = Arc::new(ProjectService::new(
            projects.clone(),
            areas.clone(),
            tasks.clone(),
        ));
        let alignment = Arc::new(AlignmentService::new(
            Arc::new(InMemoryAlignmentRepository::default()),
            1000,
        ));
        let notifier = Arc::new(NotificationService::new(
            notifications.clone(),
            tasks.clone(),
            projects.clone(),
        ));
        let service = TaskService::new(tasks.clone(), areas, project_service, alignment)
            .with_notifications(notifier);

        let user = Uuid::new_v4();
        let project = sample_project(user, None, "Release");
        let project_id = project.id;
        projects.projects.lock().unwrap().push(project);

        let build = service.create(user, payload(project_id, "Build")).await.unwrap();
        let mut ship = payload(project_id, "Ship");
        ship.dependency_task_ids = vec![build.id];
        service.create(user, ship).await.unwrap();

        service.set_completion(user, build.id, true).await.unwrap();
        {
            let stored = notifications.notifications.lock().unwrap();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].notification_type, NotificationType::UnblockedTask);
            assert_eq!(stored[0].task_name.as_deref(), Some("Ship"));
        }

        // Completing a reopened task counts as a fresh completion
        service.set_completion(user, build.id, false).await.unwrap();
        service.set_completion(user, build.id, true).await.unwrap();
        assert_eq!(notifications.notifications.lock().unwrap().len(), 2);
    }
}
