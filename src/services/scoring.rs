//! Rule-based Today scorer
//!
//! Each component contributes a fixed number of points when its rule fires.
//! The breakdown keeps the raw points; `total` is the weighted sum.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::models::{Area, Priority, Project, ScoreBreakdown, ScoreWeights, Task};

pub const OVERDUE_POINTS: f64 = 100.0;
pub const DUE_TODAY_POINTS: f64 = 80.0;
pub const HIGH_PRIORITY_POINTS: f64 = 30.0;
pub const PROJECT_IMPORTANCE_POINTS: f64 = 50.0;
pub const AREA_IMPORTANCE_POINTS: f64 = 25.0;
pub const DEPENDENCIES_MET_POINTS: f64 = 60.0;

/// Importance at or above this counts as high.
pub const HIGH_IMPORTANCE: i32 = 4;

/// Everything the scorer needs to know about one task.
pub struct ScoreInput<'a> {
    pub task: &'a Task,
    pub project: Option<&'a Project>,
    pub area: Option<&'a Area>,
    pub dependencies_met: bool,
    pub today: NaiveDate,
}

pub fn score_task(input: &ScoreInput<'_>, weights: &ScoreWeights) -> ScoreBreakdown {
    let mut b = ScoreBreakdown::default();

    if let Some(due) = input.task.due_date.map(|d| d.date_naive()) {
        if due < input.today {
            let days = (input.today - due).num_days();
            b.urgency = OVERDUE_POINTS;
            b.reasons.push(format!(
                "Overdue by {} day{}",
                days,
                if days == 1 { "" } else { "s" }
            ));
        } else if due == input.today {
            b.urgency = DUE_TODAY_POINTS;
            b.reasons.push("Due today".to_string());
        }
    }

    if input.task.priority == Priority::High {
        b.priority = HIGH_PRIORITY_POINTS;
        b.reasons.push("Task priority: High".to_string());
    }

    if input.project.is_some_and(|p| p.importance >= HIGH_IMPORTANCE) {
        b.project_importance = PROJECT_IMPORTANCE_POINTS;
        b.reasons.push("Project importance: High".to_string());
    }

    if input.area.is_some_and(|a| a.importance >= HIGH_IMPORTANCE) {
        b.area_importance = AREA_IMPORTANCE_POINTS;
        b.reasons.push("Area importance: High".to_string());
    }

    if input.dependencies_met {
        b.dependencies = DEPENDENCIES_MET_POINTS;
        b.reasons.push("Dependencies met".to_string());
    }

    b.total = weights.urgency * b.urgency
        + weights.priority * b.priority
        + weights.project_importance * b.project_importance
        + weights.area_importance * b.area_importance
        + weights.dependencies * b.dependencies;
    b
}

/// Highest score first, then earlier due date (undated last), then name.
pub fn rank(a_score: f64, a: &Task, b_score: f64, b: &Task) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.name.cmp(&b.name))
}
