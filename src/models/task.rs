use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses that make a task a candidate for the Today view.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            TaskStatus::Todo | TaskStatus::InProgress | TaskStatus::Review
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "in_progress" => TaskStatus::InProgress,
            "review" => TaskStatus::Review,
            "completed" => TaskStatus::Completed,
            "cancelled" => TaskStatus::Cancelled,
            _ => TaskStatus::Todo,
        }
    }
}

/// Priority shared by tasks and projects
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum)]
#[serde(rename_all = "snake_case")]
pub enum KanbanColumn {
    Todo,
    InProgress,
    Review,
    Done,
}

impl KanbanColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            KanbanColumn::Todo => "todo",
            KanbanColumn::InProgress => "in_progress",
            KanbanColumn::Review => "review",
            KanbanColumn::Done => "done",
        }
    }

    /// Column a task sits in for a given status.
    pub fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo | TaskStatus::Cancelled => KanbanColumn::Todo,
            TaskStatus::InProgress => KanbanColumn::InProgress,
            TaskStatus::Review => KanbanColumn::Review,
            TaskStatus::Completed => KanbanColumn::Done,
        }
    }
}

impl std::fmt::Display for KanbanColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for KanbanColumn {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "in_progress" => KanbanColumn::InProgress,
            "review" => KanbanColumn::Review,
            "done" => KanbanColumn::Done,
            _ => KanbanColumn::Todo,
        }
    }
}

/// Actionable item inside a project, optionally nested under a parent task
#[derive(Debug, Clone, Serialize, Deserialize, async_graphql::SimpleObject)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub kanban_column: KanbanColumn,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub estimated_duration: Option<i32>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub dependency_task_ids: Vec<Uuid>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row representation for Task
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub kanban_column: String,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub estimated_duration: Option<i32>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub dependency_task_ids: Vec<Uuid>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            project_id: row.project_id,
            parent_task_id: row.parent_task_id,
            name: row.name,
            description: row.description,
            status: TaskStatus::from(row.status.as_str()),
            priority: Priority::from(row.priority.as_str()),
            kanban_column: KanbanColumn::from(row.kanban_column.as_str()),
            due_date: row.due_date,
            due_time: row.due_time,
            estimated_duration: row.estimated_duration,
            completed: row.completed,
            completed_at: row.completed_at,
            dependency_task_ids: row.dependency_task_ids,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request payload for creating a task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskCreate {
    pub project_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Priority,
    pub kanban_column: Option<KanbanColumn>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub estimated_duration: Option<i32>,
    #[serde(default)]
    pub dependency_task_ids: Vec<Uuid>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Partial update for a task. `completed` drives `status` and `completed_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub kanban_column: Option<KanbanColumn>,
    pub due_date: Option<DateTime<Utc>>,
    /// Set to true to remove the due date
    #[serde(default)]
    pub clear_due_date: bool,
    pub due_time: Option<String>,
    pub estimated_duration: Option<i32>,
    pub completed: Option<bool>,
    pub dependency_task_ids: Option<Vec<Uuid>>,
    pub sort_order: Option<i32>,
}

/// List filters for tasks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub completed: Option<bool>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_strings() {
        assert_eq!(TaskStatus::from("in_progress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from("bogus"), TaskStatus::Todo);
        assert_eq!(Priority::from("HIGH"), Priority::High);
        assert_eq!(KanbanColumn::Done.to_string(), "done");
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "in_progress"
        );
    }

    #[test]
    fn test_kanban_for_status() {
        assert_eq!(
            KanbanColumn::for_status(TaskStatus::Completed),
            KanbanColumn::Done
        );
        assert_eq!(
            KanbanColumn::for_status(TaskStatus::Review),
            KanbanColumn::Review
        );
        assert!(TaskStatus::Review.is_actionable());
        assert!(!TaskStatus::Cancelled.is_actionable());
    }

    #[test]
    fn test_create_payload_defaults() {
        let payload: TaskCreate = serde_json::from_value(serde_json::json!({
            "project_id": Uuid::new_v4(),
            "name": "Write report"
        }))
        .unwrap();
        assert_eq!(payload.priority, Priority::Medium);
        assert!(payload.dependency_task_ids.is_empty());
        assert_eq!(payload.description, "");
    }
}
