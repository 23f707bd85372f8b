//! Alignment score service
//!
//! Awards points when a task is completed, weighted by how much the task,
//! its project and its area matter, and reports progress against a monthly
//! goal.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        AlignmentAward, AlignmentDashboard, AlignmentScore, Area, PointsBreakdown, Priority,
        Project, Task,
    },
    repositories::AlignmentRepository,
};

pub const BASE_POINTS: i32 = 5;
pub const HIGH_TASK_PRIORITY_BONUS: i32 = 10;
pub const HIGH_PROJECT_PRIORITY_BONUS: i32 = 15;
pub const CRITICAL_AREA_BONUS: i32 = 20;

/// Points a completed task is worth.
pub fn calculate_points(task: &Task, project: Option<&Project>, area: Option<&Area>) -> PointsBreakdown {
    PointsBreakdown {
        base: BASE_POINTS,
        task_priority: if task.priority == Priority::High {
            HIGH_TASK_PRIORITY_BONUS
        } else {
            0
        },
        project_priority: match project {
            Some(p) if p.priority == Priority::High => HIGH_PROJECT_PRIORITY_BONUS,
            _ => 0,
        },
        area_importance: match area {
            Some(a) if a.importance == 5 => CRITICAL_AREA_BONUS,
            _ => 0,
        },
    }
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn progress_percentage(score: i64, goal: i32) -> f64 {
    if goal <= 0 {
        return 0.0;
    }
    let pct = (score as f64 / goal as f64 * 100.0).min(100.0);
    (pct * 10.0).round() / 10.0
}

pub struct AlignmentService {
    alignment_repo: Arc<dyn AlignmentRepository>,
    default_monthly_goal: i32,
}

impl AlignmentService {
    pub fn new(alignment_repo: Arc<dyn AlignmentRepository>, default_monthly_goal: i32) -> Self {
        Self {
            alignment_repo,
            default_monthly_goal,
        }
    }

    /// Record points for a completed task. Returns `None` when the task was
    /// already scored.
    pub async fn award_task_completion(
        &self,
        task: &Task,
        project: Option<&Project>,
        area: Option<&Area>,
    ) -> Result<Option<AlignmentAward>, ApiError> {
        let breakdown = calculate_points(task, project, area);
        let score = AlignmentScore {
            id: Uuid::new_v4(),
            user_id: task.user_id,
            task_id: task.id,
            points_earned: breakdown.total(),
            task_priority: Some(task.priority.as_str().to_string()),
            project_priority: project.map(|p| p.priority.as_str().to_string()),
            area_importance: area.map(|a| a.importance),
            created_at: Utc::now(),
        };

        let recorded = self.alignment_repo.record(&score).await?;
        match recorded {
            Some(alignment_score) => {
                tracing::info!(
                    user_id = %task.user_id,
                    task_id = %task.id,
                    points = alignment_score.points_earned,
                    "Alignment points awarded"
                );
                Ok(Some(AlignmentAward {
                    alignment_score,
                    breakdown,
                }))
            }
            None => {
                tracing::debug!(task_id = %task.id, "Task already scored");
                Ok(None)
            }
        }
    }

    /// Points over the last seven days.
    pub async fn rolling_weekly_score(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let since = Utc::now() - Duration::days(7);
        self.alignment_repo.sum_since(user_id, since).await
    }

    /// Points since the first of the current UTC month.
    pub async fn monthly_score(&self, user_id: Uuid) -> Result<i64, ApiError> {
        self.alignment_repo
            .sum_since(user_id, start_of_month(Utc::now()))
            .await
    }

    pub async fn get_monthly_goal(&self, user_id: Uuid) -> Result<Option<i32>, ApiError> {
        self.alignment_repo.get_monthly_goal(user_id).await
    }

    pub async fn set_monthly_goal(&self, user_id: Uuid, goal: i32) -> Result<i32, ApiError> {
        if goal <= 0 {
            return Err(ApiError::validation("Monthly goal must be a positive integer"));
        }
        self.alignment_repo.set_monthly_goal(user_id, goal).await?;
        tracing::info!(user_id = %user_id, goal, "Monthly alignment goal updated");
        Ok(goal)
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<AlignmentDashboard, ApiError> {
        let rolling_weekly_score = self.rolling_weekly_score(user_id).await?;
        let monthly_score = self.monthly_score(user_id).await?;
        let monthly_goal = self.get_monthly_goal(user_id).await?;

        Ok(AlignmentDashboard {
            rolling_weekly_score,
            monthly_score,
            monthly_goal,
            progress_percentage: progress_percentage(
                monthly_score,
                monthly_goal.unwrap_or(self.default_monthly_goal),
            ),
            has_goal_set: monthly_goal.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::{
        sample_area, sample_project, sample_task, InMemoryAlignmentRepository,
    };

    fn service() -> (AlignmentService, Arc<InMemoryAlignmentRepository>) {
        let repo = Arc::new(InMemoryAlignmentRepository::default());
        (AlignmentService::new(repo.clone(), 1000), repo)
    }

    #[test]
    fn test_points_base_only() {
        let user = Uuid::new_v4();
        let task = sample_task(user, Uuid::new_v4(), "Plain");
        let points = calculate_points(&task, None, None);
        assert_eq!(points.total(), 5);
    }

    #[test]
    fn test_points_maximum() {
        let user = Uuid::new_v4();
        let mut area = sample_area(user, None, "Health");
        area.importance = 5;
        let mut project = sample_project(user, Some(area.id), "Marathon");
        project.priority = Priority::High;
        let mut task = sample_task(user, project.id, "Long run");
        task.priority = Priority::High;

        let points = calculate_points(&task, Some(&project), Some(&area));
        assert_eq!(
            points,
            PointsBreakdown {
                base: 5,
                task_priority: 10,
                project_priority: 15,
                area_importance: 20,
            }
        );
        assert_eq!(points.total(), 50);
    }

    #[test]
    fn test_area_importance_four_earns_nothing() {
        let user = Uuid::new_v4();
        let mut area = sample_area(user, None, "Career");
        area.importance = 4;
        let task = sample_task(user, Uuid::new_v4(), "Update CV");
        assert_eq!(calculate_points(&task, None, Some(&area)).area_importance, 0);
    }

    #[tokio::test]
    async fn test_award_recorded_once_per_task() {
        let (service, repo) = service();
        let user = Uuid::new_v4();
        let task = sample_task(user, Uuid::new_v4(), "Ship it");

        let first = service.award_task_completion(&task, None, None).await.unwrap();
        assert!(first.is_some());
        let second = service.award_task_completion(&task, None, None).await.unwrap();
        assert!(second.is_none());
        assert_eq!(repo.scores.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_uses_default_goal() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let mut task = sample_task(user, Uuid::new_v4(), "Important");
        task.priority = Priority::High;
        service.award_task_completion(&task, None, None).await.unwrap();

        let dashboard = service.dashboard(user).await.unwrap();
        assert_eq!(dashboard.rolling_weekly_score, 15);
        assert_eq!(dashboard.monthly_score, 15);
        assert_eq!(dashboard.monthly_goal, None);
        assert!(!dashboard.has_goal_set);
        assert_eq!(dashboard.progress_percentage, 1.5);
    }

    #[tokio::test]
    async fn test_progress_capped_at_hundred() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        service.set_monthly_goal(user, 10).await.unwrap();
        let task = sample_task(user, Uuid::new_v4(), "One");
        service.award_task_completion(&task, None, None).await.unwrap();
        let task = sample_task(user, Uuid::new_v4(), "Two");
        service.award_task_completion(&task, None, None).await.unwrap();

        let dashboard = service.dashboard(user).await.unwrap();
        assert!(dashboard.has_goal_set);
        assert_eq!(dashboard.monthly_goal, Some(10));
        assert_eq!(dashboard.progress_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_goal_must_be_positive() {
        let (service, _) = service();
        let err = service.set_monthly_goal(Uuid::new_v4(), 0).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(progress_percentage(1, 3), 33.3);
        assert_eq!(progress_percentage(0, 1000), 0.0);
    }
}
