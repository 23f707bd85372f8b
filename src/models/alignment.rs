use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlignmentScore {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub points_earned: i32,
    pub task_priority: Option<String>,
    pub project_priority: Option<String>,
    pub area_importance: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Per-component points awarded for completing a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PointsBreakdown {
    pub base: i32,
    pub task_priority: i32,
    pub project_priority: i32,
    pub area_importance: i32,
}

impl PointsBreakdown {
    pub fn total(&self) -> i32 {
        self.base + self.task_priority + self.project_priority + self.area_importance
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentAward {
    pub alignment_score: AlignmentScore,
    pub breakdown: PointsBreakdown,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlignmentDashboard {
    pub rolling_weekly_score: i64,
    pub monthly_score: i64,
    pub monthly_goal: Option<i32>,
    pub progress_percentage: f64,
    pub has_goal_set: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub score: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyGoalRequest {
    pub goal: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyGoalResponse {
    pub monthly_goal: Option<i32>,
}
