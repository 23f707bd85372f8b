use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    area::default_importance,
    JournalEntry, JournalEntryCreate, KanbanColumn, Priority, Project, ProjectCreate,
    ProjectStatus, ProjectUpdate, Task, TaskCreate, TaskStatus, TaskUpdate,
};

#[derive(Debug, InputObject)]
pub struct CreateTaskInput {
    pub project_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub kanban_column: Option<KanbanColumn>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub estimated_duration: Option<i32>,
    pub dependency_task_ids: Option<Vec<Uuid>>,
}

impl From<CreateTaskInput> for TaskCreate {
    fn from(input: CreateTaskInput) -> Self {
        Self {
            project_id: input.project_id,
            parent_task_id: input.parent_task_id,
            name: input.name,
            description: input.description.unwrap_or_default(),
            status: input.status,
            priority: input.priority.unwrap_or_default(),
            kanban_column: input.kanban_column,
            due_date: input.due_date,
            due_time: input.due_time,
            estimated_duration: input.estimated_duration,
            dependency_task_ids: input.dependency_task_ids.unwrap_or_default(),
            sort_order: 0,
        }
    }
}

#[derive(Debug, InputObject)]
pub struct UpdateTaskInput {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub kanban_column: Option<KanbanColumn>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub estimated_duration: Option<i32>,
    pub completed: Option<bool>,
    pub dependency_task_ids: Option<Vec<Uuid>>,
}

impl From<UpdateTaskInput> for TaskUpdate {
    fn from(input: UpdateTaskInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
            status: input.status,
            priority: input.priority,
            kanban_column: input.kanban_column,
            due_date: input.due_date,
            due_time: input.due_time,
            estimated_duration: input.estimated_duration,
            completed: input.completed,
            dependency_task_ids: input.dependency_task_ids,
            ..Default::default()
        }
    }
}

#[derive(Debug, InputObject)]
pub struct CreateProjectInput {
    pub area_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub importance: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl From<CreateProjectInput> for ProjectCreate {
    fn from(input: CreateProjectInput) -> Self {
        Self {
            area_id: input.area_id,
            name: input.name,
            description: input.description.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            importance: input.importance.unwrap_or_else(default_importance),
            color: input.color,
            icon: input.icon,
            deadline: input.deadline,
            sort_order: 0,
        }
    }
}

#[derive(Debug, InputObject)]
pub struct UpdateProjectInput {
    pub id: Uuid,
    pub area_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub importance: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub archived: Option<bool>,
}

impl From<UpdateProjectInput> for ProjectUpdate {
    fn from(input: UpdateProjectInput) -> Self {
        Self {
            area_id: input.area_id,
            name: input.name,
            description: input.description,
            status: input.status,
            priority: input.priority,
            importance: input.importance,
            color: input.color,
            icon: input.icon,
            deadline: input.deadline,
            archived: input.archived,
            ..Default::default()
        }
    }
}

#[derive(Debug, InputObject)]
pub struct CreateJournalEntryInput {
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
    pub energy_level: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl From<CreateJournalEntryInput> for JournalEntryCreate {
    fn from(input: CreateJournalEntryInput) -> Self {
        Self {
            title: input.title,
            content: input.content,
            mood: input.mood,
            energy_level: input.energy_level,
            tags: input.tags.unwrap_or_default(),
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct TaskMutationResponse {
    pub success: bool,
    pub message: String,
    pub task: Option<Task>,
}

#[derive(Debug, SimpleObject)]
pub struct ProjectMutationResponse {
    pub success: bool,
    pub message: String,
    pub project: Option<Project>,
}

#[derive(Debug, SimpleObject)]
pub struct JournalMutationResponse {
    pub success: bool,
    pub message: String,
    pub entry: Option<JournalEntry>,
}
