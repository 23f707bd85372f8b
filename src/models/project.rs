use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::area::default_importance;
use super::task::{Priority, Task};

pub const DEFAULT_PROJECT_COLOR: &str = "#F59E0B";
pub const DEFAULT_PROJECT_ICON: &str = "FolderOpen";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "not_started",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ProjectStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "in_progress" => ProjectStatus::InProgress,
            "completed" => ProjectStatus::Completed,
            "on_hold" => ProjectStatus::OnHold,
            _ => ProjectStatus::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, async_graphql::SimpleObject)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub area_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub importance: i32,
    pub color: String,
    pub icon: String,
    pub deadline: Option<DateTime<Utc>>,
    pub archived: bool,
    pub completion_percentage: f64,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row representation for Project
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub area_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub importance: i32,
    pub color: String,
    pub icon: String,
    pub deadline: Option<DateTime<Utc>>,
    pub archived: bool,
    pub completion_percentage: f64,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            area_id: row.area_id,
            name: row.name,
            description: row.description,
            status: ProjectStatus::from(row.status.as_str()),
            priority: Priority::from(row.priority.as_str()),
            importance: row.importance,
            color: row.color,
            icon: row.icon,
            deadline: row.deadline,
            archived: row.archived,
            completion_percentage: row.completion_percentage,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request payload for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreate {
    pub area_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_importance")]
    pub importance: i32,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Request payload for updating a project
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub area_id: Option<Uuid>,
    /// Set to true to detach the project from its area
    #[serde(default)]
    pub clear_area: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub importance: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_deadline: bool,
    pub archived: Option<bool>,
    pub completion_percentage: Option<f64>,
    pub sort_order: Option<i32>,
}

/// Project with task counts and, on request, the tasks themselves
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithTasks {
    #[serde(flatten)]
    pub project: Project,
    pub task_count: usize,
    pub completed_task_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default)]
    pub include_tasks: bool,
    pub area_id: Option<Uuid>,
    pub status: Option<ProjectStatus>,
}

/// A project's tasks grouped by kanban column
#[derive(Debug, Clone, Serialize)]
pub struct KanbanBoard {
    pub project_id: Uuid,
    pub project_name: String,
    pub columns: KanbanColumns,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KanbanColumns {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub review: Vec<Task>,
    pub done: Vec<Task>,
}
