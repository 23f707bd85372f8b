use serde::Serialize;
use uuid::Uuid;

use super::area::Area;
use super::pillar::Pillar;
use super::project::Project;
use super::task::Task;
use super::user::User;

#[derive(Debug, Clone, Default, Serialize, PartialEq, async_graphql::SimpleObject)]
pub struct DashboardStats {
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// Whole percent
    pub completion_rate: u32,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub active_areas: usize,
}

#[derive(Debug, Clone, Serialize, async_graphql::SimpleObject)]
pub struct Dashboard {
    pub user: User,
    pub stats: DashboardStats,
    pub recent_tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectNode {
    #[serde(flatten)]
    pub project: Project,
    pub task_count: usize,
    pub completed_task_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaNode {
    #[serde(flatten)]
    pub area: Area,
    pub projects: Vec<ProjectNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PillarNode {
    #[serde(flatten)]
    pub pillar: Pillar,
    pub areas: Vec<AreaNode>,
}

/// Full pillar to task-count tree for one user
#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    pub user_id: Uuid,
    pub pillars: Vec<PillarNode>,
    pub unassigned_areas: Vec<AreaNode>,
    pub unassigned_projects: Vec<ProjectNode>,
}
