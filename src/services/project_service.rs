use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        KanbanBoard, KanbanColumn, KanbanColumns, Project, ProjectCreate, ProjectListQuery,
        ProjectUpdate, ProjectWithTasks, Task, DEFAULT_PROJECT_COLOR, DEFAULT_PROJECT_ICON,
    },
    repositories::{AreaRepository, ProjectRepository, TaskRepository},
    utils::validation::{
        validate_color, validate_description, validate_importance, validate_name,
        validate_percentage,
    },
};

/// Share of completed top-level tasks, one decimal.
pub fn completion_percentage(tasks: &[Task]) -> f64 {
    let top_level: Vec<&Task> = tasks.iter().filter(|t| t.parent_task_id.is_none()).collect();
    if top_level.is_empty() {
        return 0.0;
    }
    let done = top_level.iter().filter(|t| t.completed).count();
    let pct = done as f64 / top_level.len() as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

fn with_tasks(project: Project, tasks: Vec<Task>, include: bool) -> ProjectWithTasks {
    ProjectWithTasks {
        task_count: tasks.len(),
        completed_task_count: tasks.iter().filter(|t| t.completed).count(),
        tasks: include.then_some(tasks),
        project,
    }
}

pub struct ProjectService {
    project_repo: Arc<dyn ProjectRepository>,
    area_repo: Arc<dyn AreaRepository>,
    task_repo: Arc<dyn TaskRepository>,
}

impl ProjectService {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        area_repo: Arc<dyn AreaRepository>,
        task_repo: Arc<dyn TaskRepository>,
    ) -> Self {
        Self {
            project_repo,
            area_repo,
            task_repo,
        }
    }

    async fn ensure_area(&self, user_id: Uuid, area_id: Uuid) -> Result<(), ApiError> {
        match self.area_repo.get_by_id(user_id, area_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("Area not found")),
        }
    }

    pub async fn create(&self, user_id: Uuid, payload: ProjectCreate) -> Result<Project, ApiError> {
        if let Some(area_id) = payload.area_id {
            self.ensure_area(user_id, area_id).await?;
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            user_id,
            area_id: payload.area_id,
            name: validate_name("Project name", &payload.name)?,
            description: validate_description(&payload.description)?,
            status: payload.status,
            priority: payload.priority,
            importance: validate_importance(payload.importance)?,
            color: match payload.color.as_deref() {
                Some(c) => validate_color(c)?,
                None => DEFAULT_PROJECT_COLOR.to_string(),
            },
            icon: payload
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROJECT_ICON.to_string()),
            deadline: payload.deadline,
            archived: false,
            completion_percentage: 0.0,
            sort_order: payload.sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = self.project_repo.create(&project).await?;
        tracing::info!(user_id = %user_id, project_id = %created.id, "Project created");
        Ok(created)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: &ProjectListQuery,
    ) -> Result<Vec<ProjectWithTasks>, ApiError> {
        let projects = self
            .project_repo
            .list(user_id, query.include_archived, query.area_id, query.status)
            .await?;
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let tasks = if ids.is_empty() {
            Vec::new()
        } else {
            self.task_repo.list_by_projects(user_id, &ids).await?
        };

        let mut by_project: HashMap<Uuid, Vec<Task>> = HashMap::new();
        for task in tasks {
            by_project.entry(task.project_id).or_default().push(task);
        }

        Ok(projects
            .into_iter()
            .map(|project| {
                let tasks = by_project.remove(&project.id).unwrap_or_default();
                with_tasks(project, tasks, query.include_tasks)
            })
            .collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<ProjectWithTasks, ApiError> {
        let project = self.require(user_id, id).await?;
        let tasks = self.task_repo.list_by_projects(user_id, &[id]).await?;
        Ok(with_tasks(project, tasks, true))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        payload: ProjectUpdate,
    ) -> Result<Project, ApiError> {
        let mut project = self.require(user_id, id).await?;

        if payload.clear_area {
            project.area_id = None;
        } else if let Some(area_id) = payload.area_id {
            self.ensure_area(user_id, area_id).await?;
            project.area_id = Some(area_id);
        }
        if let Some(name) = payload.name.as_deref() {
            project.name = validate_name("Project name", name)?;
        }
        if let Some(description) = payload.description.as_deref() {
            project.description = validate_description(description)?;
        }
        if let Some(status) = payload.status {
            project.status = status;
        }
        if let Some(priority) = payload.priority {
            project.priority = priority;
        }
        if let Some(importance) = payload.importance {
            project.importance = validate_importance(importance)?;
        }
        if let Some(color) = payload.color.as_deref() {
            project.color = validate_color(color)?;
        }
        if let Some(icon) = payload.icon.filter(|i| !i.trim().is_empty()) {
            project.icon = icon;
        }
        if payload.clear_deadline {
            project.deadline = None;
        } else if payload.deadline.is_some() {
            project.deadline = payload.deadline;
        }
        if let Some(archived) = payload.archived {
            project.archived = archived;
        }
        if let Some(pct) = payload.completion_percentage {
            project.completion_percentage = validate_percentage("Completion percentage", pct)?;
        }
        if let Some(sort_order) = payload.sort_order {
            project.sort_order = sort_order;
        }
        project.updated_at = Utc::now();

        self.project_repo.update(&project).await
    }

    /// Deletes the project together with its tasks.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.project_repo.delete(user_id, id).await? {
            return Err(ApiError::not_found("Project not found"));
        }
        tracing::info!(user_id = %user_id, project_id = %id, "Project deleted");
        Ok(())
    }

    pub async fn kanban(&self, user_id: Uuid, id: Uuid) -> Result<KanbanBoard, ApiError> {
        let project = self.require(user_id, id).await?;
        let tasks = self.task_repo.list_by_projects(user_id, &[id]).await?;

        let mut columns = KanbanColumns::default();
        for task in tasks {
            match task.kanban_column {
                KanbanColumn::Todo => columns.todo.push(task),
                KanbanColumn::InProgress => columns.in_progress.push(task),
                KanbanColumn::Review => columns.review.push(task),
                KanbanColumn::Done => columns.done.push(task),
            }
        }

        Ok(KanbanBoard {
            project_id: project.id,
            project_name: project.name,
            columns,
        })
    }

    /// Recompute and persist `completion_percentage` from the project's tasks.
    pub async fn recalculate_completion(&self, user_id: Uuid, id: Uuid) -> Result<f64, ApiError> {
        let tasks = self.task_repo.list_by_projects(user_id, &[id]).await?;
        let pct = completion_percentage(&tasks);
        self.project_repo
            .set_completion_percentage(user_id, id, pct)
            .await?;
        tracing::debug!(project_id = %id, completion = pct, "Project completion recalculated");
        Ok(pct)
    }

    pub async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Project>, ApiError> {
        self.project_repo.get_by_id(user_id, id).await
    }

    async fn require(&self, user_id: Uuid, id: Uuid) -> Result<Project, ApiError> {
        self.find(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectStatus};
    use crate::repositories::memory::{
        sample_area, sample_task, InMemoryAreaRepository, InMemoryProjectRepository,
        InMemoryTaskRepository,
    };

    struct Fixture {
        service: ProjectService,
        areas: Arc<InMemoryAreaRepository>,
        projects: Arc<InMemoryProjectRepository>,
        tasks: Arc<InMemoryTaskRepository>,
    }

    fn fixture() -> Fixture {
        let areas = Arc::new(InMemoryAreaRepository::default());
        let projects = Arc::new(InMemoryProjectRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        Fixture {
            service: ProjectService::new(projects.clone(), areas.clone(), tasks.clone()),
            areas,
            projects,
            tasks,
        }
    }

    fn payload(name: &str, area_id: Option<Uuid>) -> ProjectCreate {
        ProjectCreate {
            area_id,
            name: name.to_string(),
            description: String::new(),
            status: ProjectStatus::NotStarted,
            priority: Priority::Medium,
            importance: 3,
            color: None,
            icon: None,
            deadline: None,
            sort_order: 0,
        }
    }

    #[test]
    fn test_completion_percentage_counts_top_level_only() {
        let user = Uuid::new_v4();
        let project = Uuid::new_v4();
        let mut done = sample_task(user, project, "Done");
        done.completed = true;
        let open = sample_task(user, project, "Open");
        let open2 = sample_task(user, project, "Open 2");
        let mut sub = sample_task(user, project, "Sub");
        sub.parent_task_id = Some(open.id);
        sub.completed = true;

        assert_eq!(completion_percentage(&[done, open, open2, sub]), 33.3);
        assert_eq!(completion_percentage(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_create_requires_own_area() {
        let f = fixture();
        let user = Uuid::new_v4();
        let area = sample_area(user, None, "Career");
        f.areas.areas.lock().unwrap().push(area.clone());

        let project = f
            .service
            .create(user, payload("Launch", Some(area.id)))
            .await
            .unwrap();
        assert_eq!(project.icon, DEFAULT_PROJECT_ICON);

        let err = f
            .service
            .create(Uuid::new_v4(), payload("Launch", Some(area.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_kanban_groups_by_column() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = f.service.create(user, payload("Board", None)).await.unwrap();
        let mut review = sample_task(user, project.id, "Check");
        review.kanban_column = KanbanColumn::Review;
        let todo = sample_task(user, project.id, "Start");
        f.tasks.tasks.lock().unwrap().extend([review, todo]);

        let board = f.service.kanban(user, project.id).await.unwrap();
        assert_eq!(board.project_name, "Board");
        assert_eq!(board.columns.todo.len(), 1);
        assert_eq!(board.columns.review.len(), 1);
        assert!(board.columns.done.is_empty());
    }

    #[tokio::test]
    async fn test_recalculate_completion_persists() {
        let f = fixture();
        let user = Uuid::new_v4();
        let project = f.service.create(user, payload("Half", None)).await.unwrap();
        let mut done = sample_task(user, project.id, "a");
        done.completed = true;
        f.tasks
            .tasks
            .lock()
            .unwrap()
            .extend([done, sample_task(user, project.id, "b")]);

        let pct = f.service.recalculate_completion(user, project.id).await.unwrap();
        assert_eq!(pct, 50.0);
        let stored = f.projects.projects.lock().unwrap()[0].completion_percentage;
        assert_eq!(stored, 50.0);
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let f = fixture();
        let user = Uuid::new_v4();
        let active = f.service.create(user, payload("Active", None)).await.unwrap();
        let mut done = payload("Done", None);
        done.status = ProjectStatus::Completed;
        f.service.create(user, done).await.unwrap();
        f.tasks
            .tasks
            .lock()
            .unwrap()
            .push(sample_task(user, active.id, "t"));

        let completed = f
            .service
            .list(
                user,
                &ProjectListQuery {
                    status: Some(ProjectStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].project.name, "Done");

        let all = f.service.list(user, &ProjectListQuery::default()).await.unwrap();
        let counted = all.iter().find(|p| p.project.id == active.id).unwrap();
        assert_eq!(counted.task_count, 1);
        assert!(counted.tasks.is_none());
    }

    #[tokio::test]
    async fn test_update_clears_deadline() {
        let f = fixture();
        let user = Uuid::new_v4();
        let mut p = payload("Dated", None);
        p.deadline = Some(Utc::now());
        let project = f.service.create(user, p).await.unwrap();

        let updated = f
            .service
            .update(
                user,
                project.id,
                ProjectUpdate {
                    clear_deadline: true,
                    status: Some(ProjectStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.deadline.is_none());
        assert_eq!(updated.status, ProjectStatus::InProgress);
    }
}
