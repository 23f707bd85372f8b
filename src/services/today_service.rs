//! Today view: ranks the caller's open tasks with the rule-based scorer and
//! reports progress for the current UTC day.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::scoring::{rank, score_task, ScoreInput};
use super::TaskService;
use crate::{
    error::ApiError,
    models::{
        Area, Pillar, Priority, Project, ScoreWeights, Task, TodayPriorities, TodayStats,
        TodaySummary, TodayTask, TodayTaskList, ToggleCompletionResponse,
    },
    repositories::{AreaRepository, PillarRepository, ProjectRepository, TaskRepository},
};

pub const TODAY_TASK_LIMIT: usize = 50;

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((completed as f64 / total as f64) * 1000.0).round() / 10.0
}

/// Projects, areas, pillars and dependency states needed to score a batch.
struct ScoringContext {
    projects: HashMap<Uuid, Project>,
    areas: HashMap<Uuid, Area>,
    pillars: HashMap<Uuid, Pillar>,
    completed_dependencies: HashSet<Uuid>,
}

impl ScoringContext {
    fn dependencies_met(&self, task: &Task) -> bool {
        task.dependency_task_ids
            .iter()
            .all(|id| self.completed_dependencies.contains(id))
    }

    fn to_today_task(&self, task: &Task, today: NaiveDate, weights: &ScoreWeights) -> TodayTask {
        let project = self.projects.get(&task.project_id);
        let area = project
            .and_then(|p| p.area_id)
            .and_then(|id| self.areas.get(&id));
        let pillar = area
            .and_then(|a| a.pillar_id)
            .and_then(|id| self.pillars.get(&id));

        let breakdown = score_task(
            &ScoreInput {
                task,
                project,
                area,
                dependencies_met: self.dependencies_met(task),
                today,
            },
            weights,
        );

        TodayTask {
            id: task.id,
            title: task.name.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            project_id: task.project_id,
            project_name: project.map(|p| p.name.clone()),
            area_id: area.map(|a| a.id),
            area_name: area.map(|a| a.name.clone()),
            pillar_name: pillar.map(|p| p.name.clone()),
            score: breakdown.total,
            breakdown,
            coaching_message: None,
            ai_powered: false,
        }
    }
}

pub struct TodayService {
    task_repo: Arc<dyn TaskRepository>,
    project_repo: Arc<dyn ProjectRepository>,
    area_repo: Arc<dyn AreaRepository>,
    pillar_repo: Arc<dyn PillarRepository>,
    task_service: Arc<TaskService>,
    weights: ScoreWeights,
    default_top_n: usize,
}

impl TodayService {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        project_repo: Arc<dyn ProjectRepository>,
        area_repo: Arc<dyn AreaRepository>,
        pillar_repo: Arc<dyn PillarRepository>,
        task_service: Arc<TaskService>,
        weights: ScoreWeights,
        default_top_n: usize,
    ) -> Self {
        Self {
            task_repo,
            project_repo,
            area_repo,
            pillar_repo,
            task_service,
            weights,
            default_top_n,
        }
    }

    async fn load_context(&self, user_id: Uuid, tasks: &[Task]) -> Result<ScoringContext, ApiError> {
        let projects: HashMap<Uuid, Project> = self
            .project_repo
            .list(user_id, true, None, None)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let area_ids: Vec<Uuid> = tasks
            .iter()
            .filter_map(|t| projects.get(&t.project_id).and_then(|p| p.area_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let areas: HashMap<Uuid, Area> = if area_ids.is_empty() {
            HashMap::new()
        } else {
            self.area_repo
                .get_many(user_id, &area_ids)
                .await?
                .into_iter()
                .map(|a| (a.id, a))
                .collect()
        };

        let pillar_ids: Vec<Uuid> = areas
            .values()
            .filter_map(|a| a.pillar_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let pillars: HashMap<Uuid, Pillar> = if pillar_ids.is_empty() {
            HashMap::new()
        } else {
            self.pillar_repo
                .get_many(user_id, &pillar_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let dependency_ids: Vec<Uuid> = tasks
            .iter()
            .flat_map(|t| t.dependency_task_ids.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let completed_dependencies = if dependency_ids.is_empty() {
            HashSet::new()
        } else {
            self.task_repo
                .get_many(user_id, &dependency_ids)
                .await?
                .into_iter()
                .filter(|t| t.completed)
                .map(|t| t.id)
                .collect()
        };

        Ok(ScoringContext {
            projects,
            areas,
            pillars,
            completed_dependencies,
        })
    }

    async fn score(&self, user_id: Uuid, tasks: Vec<Task>, today: NaiveDate) -> Result<Vec<TodayTask>, ApiError> {
        let context = self.load_context(user_id, &tasks).await?;
        let mut scored: Vec<(TodayTask, Task)> = tasks
            .into_iter()
            .map(|t| (context.to_today_task(&t, today, &self.weights), t))
            .collect();
        scored.sort_by(|(a, at), (b, bt)| rank(a.score, at, b.score, bt));
        Ok(scored.into_iter().map(|(tt, _)| tt).collect())
    }

    /// Top `top_n` open tasks by score; `0` returns all of them.
    pub async fn priorities(&self, user_id: Uuid, top_n: Option<usize>) -> Result<TodayPriorities, ApiError> {
        let today = Utc::now().date_naive();
        let candidates: Vec<Task> = self
            .task_repo
            .list_incomplete(user_id)
            .await?
            .into_iter()
            .filter(|t| t.status.is_actionable())
            .collect();

        let mut tasks = self.score(user_id, candidates, today).await?;
        let top_n = top_n.unwrap_or(self.default_top_n);
        if top_n > 0 {
            tasks.truncate(top_n);
        }

        tracing::debug!(user_id = %user_id, count = tasks.len(), "Today priorities computed");
        Ok(TodayPriorities { date: today, tasks })
    }

    /// Open tasks due by the end of today or undated, with today's stats.
    pub async fn tasks(&self, user_id: Uuid) -> Result<TodayTaskList, ApiError> {
        let now = Utc::now();
        let today = now.date_naive();
        let day_start = start_of_day(today);
        let day_end = day_start + Duration::days(1);

        let pending: Vec<Task> = self
            .task_repo
            .list_incomplete(user_id)
            .await?
            .into_iter()
            .filter(|t| t.status.is_actionable())
            .filter(|t| t.due_date.map_or(true, |d| d < day_end))
            .collect();
        let pending_count = pending.len();

        let mut tasks = self.score(user_id, pending, today).await?;
        tasks.truncate(TODAY_TASK_LIMIT);

        let completed_today = self
            .task_repo
            .list_completed_since(user_id, day_start)
            .await?
            .len();
        let total_today = pending_count + completed_today;

        Ok(TodayTaskList {
            tasks,
            stats: TodayStats {
                total_today,
                completed_today,
                completion_rate: completion_rate(completed_today, total_today),
            },
            generated_at: now,
        })
    }

    pub async fn toggle_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed: bool,
    ) -> Result<ToggleCompletionResponse, ApiError> {
        let task = self
            .task_service
            .set_completion(user_id, task_id, completed)
            .await?;
        Ok(ToggleCompletionResponse {
            success: true,
            task_id: task.id,
            completed: task.completed,
        })
    }

    pub async fn summary(&self, user_id: Uuid) -> Result<TodaySummary, ApiError> {
        let today = Utc::now().date_naive();
        let completed = self
            .task_repo
            .list_completed_since(user_id, start_of_day(today))
            .await?;

        let mut per_project: HashMap<Uuid, usize> = HashMap::new();
        for task in &completed {
            *per_project.entry(task.project_id).or_default() += 1;
        }

        let top_project = if per_project.is_empty() {
            None
        } else {
            let names: HashMap<Uuid, String> = self
                .project_repo
                .list(user_id, true, None, None)
                .await?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect();
            // Most completions wins; ties go to the alphabetically first name
            per_project
                .iter()
                .filter_map(|(id, count)| names.get(id).map(|name| (*count, name)))
                .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
                .map(|(_, name)| name.clone())
        };

        let pending_high_priority = self
            .task_repo
            .list_incomplete(user_id)
            .await?
            .iter()
            .filter(|t| t.priority == Priority::High)
            .count();

        Ok(TodaySummary {
            date: today,
            completed_count: completed.len(),
            projects_touched: per_project.len(),
            pending_high_priority,
            top_project,
        })
    }
}
