use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Priority, TaskStatus};

/// Multipliers applied to each scoring component
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub urgency: f64,
    pub priority: f64,
    pub project_importance: f64,
    pub area_importance: f64,
    pub dependencies: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            urgency: 1.0,
            priority: 1.0,
            project_importance: 1.0,
            area_importance: 1.0,
            dependencies: 1.0,
        }
    }
}

/// Weighted components of a task's Today score
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub urgency: f64,
    pub priority: f64,
    pub project_importance: f64,
    pub area_importance: f64,
    pub dependencies: f64,
    pub total: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Uuid,
    pub project_name: Option<String>,
    pub area_id: Option<Uuid>,
    pub area_name: Option<String>,
    pub pillar_name: Option<String>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub coaching_message: Option<String>,
    pub ai_powered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayPriorities {
    pub date: NaiveDate,
    pub tasks: Vec<TodayTask>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TodayQuery {
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TodayStats {
    pub total_today: usize,
    pub completed_today: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayTaskList {
    pub tasks: Vec<TodayTask>,
    pub stats: TodayStats,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleCompletionQuery {
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleCompletionResponse {
    pub success: bool,
    pub task_id: Uuid,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TodaySummary {
    pub date: NaiveDate,
    pub completed_count: usize,
    pub projects_touched: usize,
    pub pending_high_priority: usize,
    pub top_project: Option<String>,
}
