//! In-memory repositories backing the service unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{
    AlignmentRepository, AnalyticsRepository, AreaRepository, InsightRepository,
    JournalRepository, NotificationRepository, PillarRepository, ProjectRepository,
    RecurringTaskRepository, TaskRepository, UserChanges, UserRepository,
};
use crate::auth::rbac::Role;
use crate::error::ApiError;
use crate::models::*;

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// HIERARCHY
// ============================================================================

#[derive(Default)]
pub struct InMemoryPillarRepository {
    pub pillars: Mutex<Vec<Pillar>>,
}

#[async_trait]
impl PillarRepository for InMemoryPillarRepository {
    async fn create(&self, pillar: &Pillar) -> Result<Pillar, ApiError> {
        self.pillars.lock().unwrap().push(pillar.clone());
        Ok(pillar.clone())
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Pillar>, ApiError> {
        Ok(self
            .pillars
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned())
    }

    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Pillar>, ApiError> {
        Ok(self
            .pillars
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list(&self, user_id: Uuid, include_archived: bool) -> Result<Vec<Pillar>, ApiError> {
        Ok(self
            .pillars
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && (include_archived || !p.archived))
            .cloned()
            .collect())
    }

    async fn update(&self, pillar: &Pillar) -> Result<Pillar, ApiError> {
        let mut pillars = self.pillars.lock().unwrap();
        let slot = pillars
            .iter_mut()
            .find(|p| p.id == pillar.id && p.user_id == pillar.user_id)
            .ok_or_else(|| ApiError::not_found("Pillar not found"))?;
        *slot = pillar.clone();
        Ok(pillar.clone())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut pillars = self.pillars.lock().unwrap();
        let before = pillars.len();
        pillars.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(pillars.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryAreaRepository {
    pub areas: Mutex<Vec<Area>>,
}

#[async_trait]
impl AreaRepository for InMemoryAreaRepository {
    async fn create(&self, area: &Area) -> Result<Area, ApiError> {
        self.areas.lock().unwrap().push(area.clone());
        Ok(area.clone())
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Area>, ApiError> {
        Ok(self
            .areas
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Area>, ApiError> {
        Ok(self
            .areas
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id && ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        user_id: Uuid,
        include_archived: bool,
        pillar_id: Option<Uuid>,
    ) -> Result<Vec<Area>, ApiError> {
        Ok(self
            .areas
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id && (include_archived || !a.archived))
            .filter(|a| pillar_id.map_or(true, |pid| a.pillar_id == Some(pid)))
            .cloned()
            .collect())
    }

    async fn update(&self, area: &Area) -> Result<Area, ApiError> {
        let mut areas = self.areas.lock().unwrap();
        let slot = areas
            .iter_mut()
            .find(|a| a.id == area.id && a.user_id == area.user_id)
            .ok_or_else(|| ApiError::not_found("Area not found"))?;
        *slot = area.clone();
        Ok(area.clone())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut areas = self.areas.lock().unwrap();
        let before = areas.len();
        areas.retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(areas.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    pub projects: Mutex<Vec<Project>>,
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project, ApiError> {
        self.projects.lock().unwrap().push(project.clone());
        Ok(project.clone())
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Project>, ApiError> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        include_archived: bool,
        area_id: Option<Uuid>,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, ApiError> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && (include_archived || !p.archived))
            .filter(|p| area_id.map_or(true, |aid| p.area_id == Some(aid)))
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    async fn update(&self, project: &Project) -> Result<Project, ApiError> {
        let mut projects = self.projects.lock().unwrap();
        let slot = projects
            .iter_mut()
            .find(|p| p.id == project.id && p.user_id == project.user_id)
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
        *slot = project.clone();
        Ok(project.clone())
    }

    async fn set_completion_percentage(
        &self,
        user_id: Uuid,
        id: Uuid,
        percentage: f64,
    ) -> Result<(), ApiError> {
        if let Some(p) = self
            .projects
            .lock()
            .unwrap()
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
        {
            p.completion_percentage = percentage;
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut projects = self.projects.lock().unwrap();
        let before = projects.len();
        projects.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(projects.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryTaskRepository {
    pub tasks: Mutex<Vec<Task>>,
}

impl InMemoryTaskRepository {
    fn select(&self, pred: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| pred(t))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> Result<Task, ApiError> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task.clone())
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, ApiError> {
        Ok(self
            .select(|t| t.id == id && t.user_id == user_id)
            .into_iter()
            .next())
    }

    async fn get_many(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Task>, ApiError> {
        Ok(self.select(|t| t.user_id == user_id && ids.contains(&t.id)))
    }

    async fn list(&self, user_id: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        let tasks = self.select(|t| {
            t.user_id == user_id
                && filter.project_id.map_or(true, |p| t.project_id == p)
                && filter.completed.map_or(true, |c| t.completed == c)
                && filter.status.map_or(true, |s| t.status == s)
                && filter.priority.map_or(true, |p| t.priority == p)
        });
        Ok(tasks
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.map_or(usize::MAX, |l| l.max(0) as usize))
            .collect())
    }

    async fn list_by_projects(
        &self,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> Result<Vec<Task>, ApiError> {
        Ok(self.select(|t| t.user_id == user_id && project_ids.contains(&t.project_id)))
    }

    async fn list_subtasks(&self, user_id: Uuid, parent_id: Uuid) -> Result<Vec<Task>, ApiError> {
        Ok(self.select(|t| t.user_id == user_id && t.parent_task_id == Some(parent_id)))
    }

    async fn list_incomplete(&self, user_id: Uuid) -> Result<Vec<Task>, ApiError> {
        let mut tasks = self.select(|t| t.user_id == user_id && !t.completed);
        tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date));
        Ok(tasks)
    }

    async fn list_completed_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Task>, ApiError> {
        Ok(self.select(|t| {
            t.user_id == user_id && t.completed && t.completed_at.map_or(false, |c| c >= since)
        }))
    }

    async fn list_due_before(&self, before: DateTime<Utc>) -> Result<Vec<Task>, ApiError> {
        let mut tasks = self.select(|t| !t.completed && t.due_date.is_some_and(|d| d <= before));
        tasks.sort_by_key(|t| t.due_date);
        Ok(tasks)
    }

    async fn search(&self, user_id: Uuid, query: &str, limit: i64) -> Result<Vec<Task>, ApiError> {
        let mut tasks = self.select(|t| {
            t.user_id == user_id && (contains_ci(&t.name, query) || contains_ci(&t.description, query))
        });
        tasks.truncate(limit.max(0) as usize);
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<Task, ApiError> {
        let mut tasks = self.tasks.lock().unwrap();
        let slot = tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.user_id == task.user_id)
            .ok_or_else(|| ApiError::not_found("Task not found"))?;
        *slot = task.clone();
        Ok(task.clone())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut tasks = self.tasks.lock().unwrap();
        if !tasks.iter().any(|t| t.id == id && t.user_id == user_id) {
            return Ok(false);
        }
        // Mirror ON DELETE CASCADE for subtasks
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                tasks
                    .iter()
                    .filter(|t| t.parent_task_id == Some(parent))
                    .map(|t| t.id),
            );
            i += 1;
        }
        tasks.retain(|t| !doomed.contains(&t.id));
        Ok(true)
    }
}

// ============================================================================
// JOURNAL
// ============================================================================

#[derive(Default)]
pub struct InMemoryJournalRepository {
    pub entries: Mutex<Vec<JournalEntry>>,
}

#[async_trait]
impl JournalRepository for InMemoryJournalRepository {
    async fn create(&self, entry: &JournalEntry) -> Result<JournalEntry, ApiError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry.clone())
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>, ApiError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id && e.user_id == user_id && e.deleted_at.is_none())
            .cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<JournalEntry>, i64), ApiError> {
        let mut matching: Vec<JournalEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.deleted_at.is_none())
            .filter(|e| {
                search.map_or(true, |q| contains_ci(&e.title, q) || contains_ci(&e.content, q))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_trash(&self, user_id: Uuid) -> Result<Vec<JournalEntry>, ApiError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.deleted_at.is_some())
            .cloned()
            .collect())
    }

    async fn update(&self, entry: &JournalEntry) -> Result<JournalEntry, ApiError> {
        let mut entries = self.entries.lock().unwrap();
        let slot = entries
            .iter_mut()
            .find(|e| e.id == entry.id && e.user_id == entry.user_id && e.deleted_at.is_none())
            .ok_or_else(|| ApiError::not_found("Journal entry not found"))?;
        *slot = entry.clone();
        Ok(entry.clone())
    }

    async fn soft_delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut entries = self.entries.lock().unwrap();
        match entries
            .iter_mut()
            .find(|e| e.id == id && e.user_id == user_id && e.deleted_at.is_none())
        {
            Some(e) => {
                e.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn restore(&self, user_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>, ApiError> {
        let mut entries = self.entries.lock().unwrap();
        Ok(entries
            .iter_mut()
            .find(|e| e.id == id && e.user_id == user_id && e.deleted_at.is_some())
            .map(|e| {
                e.deleted_at = None;
                e.clone()
            }))
    }

    async fn delete_permanently(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.id == id && e.user_id == user_id && e.deleted_at.is_some()));
        Ok(entries.len() < before)
    }
}

// ============================================================================
// INSIGHTS
// ============================================================================

#[derive(Default)]
pub struct InMemoryInsightRepository {
    pub insights: Mutex<Vec<Insight>>,
    pub feedback_log: Mutex<Vec<FeedbackLogEntry>>,
}

#[async_trait]
impl InsightRepository for InMemoryInsightRepository {
    async fn upsert(&self, new: &NewInsight) -> Result<Insight, ApiError> {
        let now = Utc::now();
        let insight = Insight {
            id: new.id,
            user_id: new.user_id,
            entity_type: new.entity_type.clone(),
            entity_id: new.entity_id,
            insight_type: new.insight_type.clone(),
            title: new.title.clone(),
            summary: new.summary.clone(),
            detailed_reasoning: new.detailed_reasoning.clone(),
            confidence_score: new.confidence_score,
            impact_score: new.impact_score,
            reasoning_path: new.reasoning_path.clone(),
            expires_at: new.expires_at,
            tags: new.tags.clone(),
            is_active: true,
            is_pinned: false,
            application_count: 0,
            version: 1,
            user_feedback: None,
            feedback_details: None,
            last_accessed_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut insights = self.insights.lock().unwrap();
        match insights.iter_mut().find(|i| i.id == new.id) {
            Some(existing) if existing.user_id != new.user_id => {
                return Err(ApiError::conflict("Insight already exists"));
            }
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = Insight {
                    created_at,
                    ..insight.clone()
                };
            }
            None => insights.push(insight.clone()),
        }
        Ok(insight)
    }

    async fn query(&self, user_id: Uuid, filter: &InsightFilter) -> Result<Vec<Insight>, ApiError> {
        let now = Utc::now();
        let mut insights: Vec<Insight> = self
            .insights
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id)
            .filter(|i| filter.entity_type.as_ref().map_or(true, |t| &i.entity_type == t))
            .filter(|i| filter.entity_id.map_or(true, |id| i.entity_id == Some(id)))
            .filter(|i| filter.insight_type.as_ref().map_or(true, |t| &i.insight_type == t))
            .filter(|i| filter.is_active.map_or(true, |a| i.is_active == a))
            .filter(|i| filter.is_pinned.map_or(true, |p| i.is_pinned == p))
            .filter(|i| filter.min_confidence.map_or(true, |m| i.confidence_score >= m))
            .filter(|i| {
                filter
                    .tags
                    .as_ref()
                    .map_or(true, |tags| tags.iter().any(|t| i.tags.contains(t)))
            })
            .filter(|i| filter.include_expired || i.expires_at.map_or(true, |e| e > now))
            .cloned()
            .collect();
        insights.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        insights.truncate(filter.limit.max(0) as usize);
        Ok(insights)
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Insight>, ApiError> {
        Ok(self
            .insights
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id && i.user_id == user_id)
            .cloned())
    }

    async fn touch_accessed(&self, ids: &[Uuid]) -> Result<(), ApiError> {
        let now = Utc::now();
        for insight in self.insights.lock().unwrap().iter_mut() {
            if ids.contains(&insight.id) {
                insight.last_accessed_at = Some(now);
            }
        }
        Ok(())
    }

    async fn record_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        feedback: InsightFeedback,
        details: Option<&Value>,
    ) -> Result<Option<Insight>, ApiError> {
        let mut insights = self.insights.lock().unwrap();
        Ok(insights
            .iter_mut()
            .find(|i| i.id == id && i.user_id == user_id)
            .map(|i| {
                i.user_feedback = Some(feedback.as_str().to_string());
                i.feedback_details = details.cloned();
                if feedback == InsightFeedback::Accepted {
                    i.application_count += 1;
                }
                i.clone()
            }))
    }

    async fn log_feedback(&self, entry: &FeedbackLogEntry) -> Result<(), ApiError> {
        self.feedback_log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn set_pinned(
        &self,
        user_id: Uuid,
        id: Uuid,
        pinned: bool,
    ) -> Result<Option<Insight>, ApiError> {
        let mut insights = self.insights.lock().unwrap();
        Ok(insights
            .iter_mut()
            .find(|i| i.id == id && i.user_id == user_id)
            .map(|i| {
                i.is_pinned = pinned;
                i.clone()
            }))
    }

    async fn deactivate(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut insights = self.insights.lock().unwrap();
        match insights.iter_mut().find(|i| i.id == id && i.user_id == user_id) {
            Some(i) => {
                i.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_expired(&self) -> Result<u64, ApiError> {
        let now = Utc::now();
        let mut count = 0;
        for insight in self.insights.lock().unwrap().iter_mut() {
            if insight.is_active && insight.expires_at.map_or(false, |e| e < now) {
                insight.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn created_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Insight>, ApiError> {
        Ok(self
            .insights
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && i.created_at >= since)
            .cloned()
            .collect())
    }
}

// ============================================================================
// ANALYTICS
// ============================================================================

#[derive(Default)]
pub struct InMemoryAnalyticsRepository {
    pub preferences: Mutex<HashMap<Uuid, AnalyticsPreferences>>,
    pub events: Mutex<Vec<BehaviorEvent>>,
    pub sessions: Mutex<Vec<AnalyticsSession>>,
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalyticsRepository {
    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<AnalyticsPreferences>, ApiError> {
        Ok(self.preferences.lock().unwrap().get(&user_id).cloned())
    }

    async fn save_preferences(
        &self,
        preferences: &AnalyticsPreferences,
    ) -> Result<AnalyticsPreferences, ApiError> {
        self.preferences
            .lock()
            .unwrap()
            .insert(preferences.user_id, preferences.clone());
        Ok(preferences.clone())
    }

    async fn insert_event(&self, event: &BehaviorEvent) -> Result<(), ApiError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn events_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<BehaviorEvent>, ApiError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == Some(user_id) && e.created_at >= since)
            .cloned()
            .collect())
    }

    async fn find_active_session(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Option<AnalyticsSession>, ApiError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.session_id == session_id && s.is_active)
            .cloned())
    }

    async fn create_session(&self, session: &AnalyticsSession) -> Result<(), ApiError> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn end_session(
        &self,
        id: Uuid,
        exit_page: Option<&str>,
        end_time: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), ApiError> {
        if let Some(s) = self.sessions.lock().unwrap().iter_mut().find(|s| s.id == id) {
            s.exit_page = exit_page.map(str::to_string);
            s.end_time = Some(end_time);
            s.duration_ms = Some(duration_ms);
            s.is_active = false;
        }
        Ok(())
    }

    async fn increment_session_counter(
        &self,
        user_id: Uuid,
        session_id: &str,
        counter: SessionCounter,
    ) -> Result<(), ApiError> {
        for s in self.sessions.lock().unwrap().iter_mut() {
            if s.user_id == user_id && s.session_id == session_id && s.is_active {
                match counter {
                    SessionCounter::PageViews => s.page_views += 1,
                    SessionCounter::AiInteractions => s.ai_interactions += 1,
                    SessionCounter::FeatureUsages => s.feature_usages += 1,
                }
            }
        }
        Ok(())
    }

    async fn sessions_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsSession>, ApiError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.start_time >= since)
            .cloned()
            .collect())
    }

    async fn anonymize_events(&self, user_id: Uuid, before: DateTime<Utc>) -> Result<u64, ApiError> {
        let mut count = 0;
        for e in self.events.lock().unwrap().iter_mut() {
            if e.user_id == Some(user_id) && e.created_at < before && !e.is_anonymized {
                e.user_id = None;
                e.session_id = None;
                e.user_agent = None;
                e.page_url = None;
                e.referrer_url = None;
                e.is_anonymized = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_user_data(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.user_id != Some(user_id));
        self.sessions.lock().unwrap().retain(|s| s.user_id != user_id);
        self.preferences.lock().unwrap().remove(&user_id);
        Ok((before - events.len()) as u64)
    }
}

// ============================================================================
// ALIGNMENT
// ============================================================================

#[derive(Default)]
pub struct InMemoryAlignmentRepository {
    pub scores: Mutex<Vec<AlignmentScore>>,
    pub goals: Mutex<HashMap<Uuid, i32>>,
}

#[async_trait]
impl AlignmentRepository for InMemoryAlignmentRepository {
    async fn record(&self, score: &AlignmentScore) -> Result<Option<AlignmentScore>, ApiError> {
        let mut scores = self.scores.lock().unwrap();
        if scores.iter().any(|s| s.task_id == score.task_id) {
            return Ok(None);
        }
        scores.push(score.clone());
        Ok(Some(score.clone()))
    }

    async fn sum_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, ApiError> {
        Ok(self
            .scores
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.created_at >= since)
            .map(|s| s.points_earned as i64)
            .sum())
    }

    async fn get_monthly_goal(&self, user_id: Uuid) -> Result<Option<i32>, ApiError> {
        Ok(self.goals.lock().unwrap().get(&user_id).copied())
    }

    async fn set_monthly_goal(&self, user_id: Uuid, goal: i32) -> Result<(), ApiError> {
        self.goals.lock().unwrap().insert(user_id, goal);
        Ok(())
    }
}

// ============================================================================
// RECURRING TASKS
// ============================================================================

#[derive(Default)]
pub struct InMemoryRecurringTaskRepository {
    pub recurring: Mutex<Vec<RecurringTask>>,
    pub instances: Mutex<Vec<RecurringTaskInstance>>,
}

#[async_trait]
impl RecurringTaskRepository for InMemoryRecurringTaskRepository {
    async fn create(&self, task: &RecurringTask) -> Result<RecurringTask, ApiError> {
        self.recurring.lock().unwrap().push(task.clone());
        Ok(task.clone())
    }

    async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<RecurringTask>, ApiError> {
        Ok(self
            .recurring
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: Uuid, active_only: bool) -> Result<Vec<RecurringTask>, ApiError> {
        Ok(self
            .recurring
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && (!active_only || r.is_active))
            .cloned()
            .collect())
    }

    async fn list_all_active(&self) -> Result<Vec<RecurringTask>, ApiError> {
        Ok(self
            .recurring
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn update(&self, task: &RecurringTask) -> Result<RecurringTask, ApiError> {
        let mut recurring = self.recurring.lock().unwrap();
        let slot = recurring
            .iter_mut()
            .find(|r| r.id == task.id && r.user_id == task.user_id)
            .ok_or_else(|| ApiError::not_found("Recurring task not found"))?;
        *slot = task.clone();
        Ok(task.clone())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut recurring = self.recurring.lock().unwrap();
        let before = recurring.len();
        recurring.retain(|r| !(r.id == id && r.user_id == user_id));
        let removed = recurring.len() < before;
        if removed {
            self.instances
                .lock()
                .unwrap()
                .retain(|i| i.recurring_task_id != id);
        }
        Ok(removed)
    }

    async fn mark_generated(&self, id: Uuid, date: NaiveDate) -> Result<(), ApiError> {
        if let Some(r) = self.recurring.lock().unwrap().iter_mut().find(|r| r.id == id) {
            r.last_generated_date = r.last_generated_date.max(Some(date));
        }
        Ok(())
    }

    async fn record_instance(&self, instance: &RecurringTaskInstance) -> Result<bool, ApiError> {
        let mut instances = self.instances.lock().unwrap();
        if instances.iter().any(|i| {
            i.recurring_task_id == instance.recurring_task_id
                && i.scheduled_date == instance.scheduled_date
        }) {
            return Ok(false);
        }
        instances.push(instance.clone());
        Ok(true)
    }

    async fn has_instance(&self, recurring_task_id: Uuid, date: NaiveDate) -> Result<bool, ApiError> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .any(|i| i.recurring_task_id == recurring_task_id && i.scheduled_date == date))
    }

    async fn count_instances(&self, recurring_task_id: Uuid) -> Result<i64, ApiError> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.recurring_task_id == recurring_task_id)
            .count() as i64)
    }

    async fn list_instances(
        &self,
        user_id: Uuid,
        recurring_task_id: Uuid,
    ) -> Result<Vec<RecurringTaskInstance>, ApiError> {
        let mut found: Vec<RecurringTaskInstance> = self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && i.recurring_task_id == recurring_task_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date));
        Ok(found)
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    pub preferences: Mutex<HashMap<Uuid, NotificationPreferences>>,
    pub notifications: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationPreferences>, ApiError> {
        Ok(self.preferences.lock().unwrap().get(&user_id).cloned())
    }

    async fn save_preferences(
        &self,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences, ApiError> {
        self.preferences
            .lock()
            .unwrap()
            .insert(preferences.user_id, preferences.clone());
        Ok(preferences.clone())
    }

    async fn create(&self, notification: &Notification) -> Result<Notification, ApiError> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(notification.clone())
    }

    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, ApiError> {
        let mut found: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool, ApiError> {
        let mut notifications = self.notifications.lock().unwrap();
        match notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = true;
                n.read_at.get_or_insert(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, ApiError> {
        let mut count = 0;
        for n in self.notifications.lock().unwrap().iter_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                n.read_at = Some(at);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let mut notifications = self.notifications.lock().unwrap();
        let before = notifications.len();
        notifications.retain(|n| !(n.id == id && n.user_id == user_id));
        Ok(notifications.len() < before)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let mut notifications = self.notifications.lock().unwrap();
        let before = notifications.len();
        notifications.retain(|n| n.user_id != user_id);
        Ok((before - notifications.len()) as u64)
    }

    async fn exists_for_task(
        &self,
        task_id: Uuid,
        kind: NotificationType,
        since: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        Ok(self.notifications.lock().unwrap().iter().any(|n| {
            n.task_id == Some(task_id) && n.notification_type == kind && n.created_at >= since
        }))
    }
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    pub users: Mutex<Vec<User>>,
    pub roles: Mutex<HashMap<Uuid, Vec<Role>>>,
    pub profiles: Mutex<HashMap<Uuid, UserProfile>>,
    pub sessions: Mutex<Vec<AuthSession>>,
}

fn default_profile(user_id: Uuid) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        user_id,
        timezone: "UTC".to_string(),
        monthly_alignment_goal: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, ApiError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(ApiError::conflict("Email already registered"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            username: username.map(str::to_string),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        self.profiles
            .lock()
            .unwrap()
            .insert(user.id, default_profile(user.id));
        Ok(user)
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges<'_>) -> Result<User, ApiError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if let Some(v) = changes.username {
            user.username = Some(v.to_string());
        }
        if let Some(v) = changes.first_name {
            user.first_name = Some(v.to_string());
        }
        if let Some(v) = changes.last_name {
            user.last_name = Some(v.to_string());
        }
        Ok(user.clone())
    }

    async fn update_last_login(&self, user_id: Uuid) -> Result<(), ApiError> {
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.id == user_id) {
            u.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.users.lock().unwrap().retain(|u| u.id != user_id);
        self.sessions.lock().unwrap().retain(|s| s.user_id != user_id);
        self.profiles.lock().unwrap().remove(&user_id);
        self.roles.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, ApiError> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_user_role(
        &self,
        user_id: Uuid,
        role: Role,
        _assigned_by: Option<Uuid>,
    ) -> Result<(), ApiError> {
        let mut roles = self.roles.lock().unwrap();
        let entry = roles.entry(user_id).or_default();
        if !entry.contains(&role) {
            entry.push(role);
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ApiError> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn ensure_profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| default_profile(user_id))
            .clone())
    }

    async fn update_timezone(&self, user_id: Uuid, timezone: &str) -> Result<UserProfile, ApiError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id)
            .or_insert_with(|| default_profile(user_id));
        profile.timezone = timezone.to_string();
        Ok(profile.clone())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<AuthSession, ApiError> {
        let session = AuthSession {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            user_agent: user_agent.map(str::to_string),
            expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, ApiError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn find_session_by_id(&self, id: Uuid) -> Result<Option<AuthSession>, ApiError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn revoke_session(&self, id: Uuid) -> Result<(), ApiError> {
        if let Some(s) = self.sessions.lock().unwrap().iter_mut().find(|s| s.id == id) {
            s.revoked_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn sample_pillar(user_id: Uuid, name: &str) -> Pillar {
    let now = Utc::now();
    Pillar {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        description: String::new(),
        color: DEFAULT_PILLAR_COLOR.to_string(),
        icon: DEFAULT_PILLAR_ICON.to_string(),
        time_allocation_percentage: 0.0,
        archived: false,
        sort_order: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_area(user_id: Uuid, pillar_id: Option<Uuid>, name: &str) -> Area {
    let now = Utc::now();
    Area {
        id: Uuid::new_v4(),
        user_id,
        pillar_id,
        name: name.to_string(),
        description: String::new(),
        color: DEFAULT_AREA_COLOR.to_string(),
        icon: DEFAULT_AREA_ICON.to_string(),
        importance: 3,
        archived: false,
        sort_order: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_project(user_id: Uuid, area_id: Option<Uuid>, name: &str) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        user_id,
        area_id,
        name: name.to_string(),
        description: String::new(),
        status: ProjectStatus::NotStarted,
        priority: Priority::Medium,
        importance: 3,
        color: DEFAULT_PROJECT_COLOR.to_string(),
        icon: DEFAULT_PROJECT_ICON.to_string(),
        deadline: None,
        archived: false,
        completion_percentage: 0.0,
        sort_order: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_task(user_id: Uuid, project_id: Uuid, name: &str) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        user_id,
        project_id,
        parent_task_id: None,
        name: name.to_string(),
        description: String::new(),
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        kanban_column: KanbanColumn::Todo,
        due_date: None,
        due_time: None,
        estimated_duration: None,
        completed: false,
        completed_at: None,
        dependency_task_ids: Vec::new(),
        sort_order: 0,
        created_at: now,
        updated_at: now,
    }
}
