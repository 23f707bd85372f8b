use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        Area, AreaNode, Dashboard, DashboardStats, Hierarchy, PillarNode, Project, ProjectNode,
        ProjectStatus, Task,
    },
    repositories::{
        AreaRepository, PillarRepository, ProjectRepository, TaskRepository, UserRepository,
    },
};

pub const RECENT_TASK_LIMIT: usize = 5;

pub fn dashboard_stats(tasks: &[Task], projects: &[Project], areas: &[Area]) -> DashboardStats {
    let total_tasks = tasks.len();
    let completed_tasks = tasks.iter().filter(|t| t.completed).count();
    let completion_rate = if total_tasks == 0 {
        0
    } else {
        ((completed_tasks as f64 / total_tasks as f64) * 100.0).round() as u32
    };

    DashboardStats {
        completed_tasks,
        total_tasks,
        completion_rate,
        active_projects: projects
            .iter()
            .filter(|p| !p.archived && p.status != ProjectStatus::Completed)
            .count(),
        completed_projects: projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Completed)
            .count(),
        active_areas: areas.iter().filter(|a| !a.archived).count(),
    }
}

/// Most recently created incomplete tasks.
pub fn recent_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut open: Vec<Task> = tasks.iter().filter(|t| !t.completed).cloned().collect();
    open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    open.truncate(RECENT_TASK_LIMIT);
    open
}

pub struct DashboardService {
    user_repo: Arc<dyn UserRepository>,
    pillar_repo: Arc<dyn PillarRepository>,
    area_repo: Arc<dyn AreaRepository>,
    project_repo: Arc<dyn ProjectRepository>,
    task_repo: Arc<dyn TaskRepository>,
}

impl DashboardService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        pillar_repo: Arc<dyn PillarRepository>,
        area_repo: Arc<dyn AreaRepository>,
        project_repo: Arc<dyn ProjectRepository>,
        task_repo: Arc<dyn TaskRepository>,
    ) -> Self {
        Self {
            user_repo,
            pillar_repo,
            area_repo,
            project_repo,
            task_repo,
        }
    }

    async fn projects_and_tasks(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<(Vec<Project>, Vec<Task>), ApiError> {
        let projects = self
            .project_repo
            .list(user_id, include_archived, None, None)
            .await?;
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let tasks = if ids.is_empty() {
            Vec::new()
        } else {
            self.task_repo.list_by_projects(user_id, &ids).await?
        };
        Ok((projects, tasks))
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<Dashboard, ApiError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        let (projects, tasks) = self.projects_and_tasks(user_id, true).await?;
        let areas = self.area_repo.list(user_id, true, None).await?;

        Ok(Dashboard {
            user,
            stats: dashboard_stats(&tasks, &projects, &areas),
            recent_tasks: recent_tasks(&tasks),
        })
    }

    /// Active pillars → areas → projects with task counts. Areas and projects
    /// whose parent is missing or archived land in the unassigned lists.
    pub async fn hierarchy(&self, user_id: Uuid) -> Result<Hierarchy, ApiError> {
        let pillars = self.pillar_repo.list(user_id, false).await?;
        let areas = self.area_repo.list(user_id, false, None).await?;
        let (projects, tasks) = self.projects_and_tasks(user_id, false).await?;

        let mut counts: HashMap<Uuid, (usize, usize)> = HashMap::new();
        for task in &tasks {
            let entry = counts.entry(task.project_id).or_default();
            entry.0 += 1;
            if task.completed {
                entry.1 += 1;
            }
        }

        let area_ids: HashSet<Uuid> = areas.iter().map(|a| a.id).collect();
        let mut projects_by_area: HashMap<Uuid, Vec<ProjectNode>> = HashMap::new();
        let mut unassigned_projects = Vec::new();
        for project in projects {
            let (task_count, completed_task_count) =
                counts.get(&project.id).copied().unwrap_or_default();
            let parent = project.area_id.filter(|id| area_ids.contains(id));
            let node = ProjectNode {
                project,
                task_count,
                completed_task_count,
            };
            match parent {
                Some(area_id) => projects_by_area.entry(area_id).or_default().push(node),
                None => unassigned_projects.push(node),
            }
        }

        let pillar_ids: HashSet<Uuid> = pillars.iter().map(|p| p.id).collect();
        let mut areas_by_pillar: HashMap<Uuid, Vec<AreaNode>> = HashMap::new();
        let mut unassigned_areas = Vec::new();
        for area in areas {
            let parent = area.pillar_id.filter(|id| pillar_ids.contains(id));
            let node = AreaNode {
                projects: projects_by_area.remove(&area.id).unwrap_or_default(),
                area,
            };
            match parent {
                Some(pillar_id) => areas_by_pillar.entry(pillar_id).or_default().push(node),
                None => unassigned_areas.push(node),
            }
        }

        let pillars = pillars
            .into_iter()
            .map(|pillar| PillarNode {
                areas: areas_by_pillar.remove(&pillar.id).unwrap_or_default(),
                pillar,
            })
            .collect();

        Ok(Hierarchy {
            user_id,
            pillars,
            unassigned_areas,
            unassigned_projects,
        })
    }
}
