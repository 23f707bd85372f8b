//! Behavior analytics
//!
//! Events and sessions are only recorded when the user's preferences allow
//! it. Aggregations are computed in memory over the raw rows of the
//! requested window.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        ActionType, AnalyticsDashboard, AnalyticsPreferences, AnalyticsSession, BehaviorEvent,
        DailyUsageStat, EndSessionRequest, EngagementMetrics, FeatureUsageStat,
        PreferencesUpdate, SessionResponse, StartSessionRequest, TopFeature, TrackEventRequest,
        TrackEventResponse,
    },
    repositories::AnalyticsRepository,
    utils::validation::sanitize_text,
};

pub const MAX_ANALYTICS_DAYS: i64 = 365;
pub const TOP_FEATURE_LIMIT: usize = 10;
const MAX_FEATURE_NAME_LEN: usize = 100;

pub fn engagement_metrics(sessions: &[AnalyticsSession], days: i64) -> EngagementMetrics {
    if sessions.is_empty() {
        return EngagementMetrics::default();
    }

    let total_sessions = sessions.len();
    let total_time_spent_ms: i64 = sessions.iter().filter_map(|s| s.duration_ms).sum();
    let bounced = sessions.iter().filter(|s| s.page_views <= 1).count();
    let active_days: HashSet<NaiveDate> =
        sessions.iter().map(|s| s.start_time.date_naive()).collect();

    EngagementMetrics {
        total_sessions,
        total_time_spent_ms,
        average_session_duration_ms: total_time_spent_ms as f64 / total_sessions as f64,
        total_page_views: sessions.iter().map(|s| s.page_views as i64).sum(),
        total_ai_interactions: sessions.iter().map(|s| s.ai_interactions as i64).sum(),
        bounce_rate: bounced as f64 / total_sessions as f64,
        return_user_rate: if days > 0 {
            active_days.len() as f64 / days as f64
        } else {
            0.0
        },
    }
}

/// Per `ai_feature_type:feature_name`, most used first.
pub fn feature_usage(events: &[BehaviorEvent]) -> Vec<FeatureUsageStat> {
    #[derive(Default)]
    struct Acc<'a> {
        sessions: HashSet<&'a str>,
        time_ms: i64,
        interactions: usize,
        successes: usize,
        last_used: Option<DateTime<Utc>>,
    }

    let mut grouped: BTreeMap<(&str, &str), Acc> = BTreeMap::new();
    for event in events {
        let Some(feature_type) = event.ai_feature_type.as_deref() else {
            continue;
        };
        let acc = grouped
            .entry((feature_type, event.feature_name.as_str()))
            .or_default();
        if let Some(session) = event.session_id.as_deref() {
            acc.sessions.insert(session);
        }
        acc.time_ms += event.duration_ms.unwrap_or(0);
        acc.interactions += 1;
        if event.success {
            acc.successes += 1;
        }
        acc.last_used = acc.last_used.max(Some(event.created_at));
    }

    let mut stats: Vec<FeatureUsageStat> = grouped
        .into_iter()
        .map(|((feature_type, feature_name), acc)| FeatureUsageStat {
            feature_type: feature_type.to_string(),
            feature_name: feature_name.to_string(),
            total_sessions: acc.sessions.len(),
            total_time_spent_ms: acc.time_ms,
            average_session_duration_ms: acc.time_ms as f64 / acc.interactions as f64,
            total_interactions: acc.interactions,
            success_rate: acc.successes as f64 / acc.interactions as f64,
            last_used: acc.last_used,
        })
        .collect();
    // Stable sort keeps key order among equal counts
    stats.sort_by(|a, b| b.total_interactions.cmp(&a.total_interactions));
    stats
}

fn day_row(days: &mut BTreeMap<NaiveDate, DailyUsageStat>, date: NaiveDate) -> &mut DailyUsageStat {
    days.entry(date).or_insert_with(|| DailyUsageStat {
        date,
        sessions: 0,
        total_time_spent_ms: 0,
        page_views: 0,
        ai_interactions: 0,
    })
}

/// One row per UTC date that saw a session or an event, oldest first.
pub fn daily_stats(sessions: &[AnalyticsSession], events: &[BehaviorEvent]) -> Vec<DailyUsageStat> {
    let mut days = BTreeMap::new();

    for session in sessions {
        let row = day_row(&mut days, session.start_time.date_naive());
        row.sessions += 1;
        row.total_time_spent_ms += session.duration_ms.unwrap_or(0);
    }
    for event in events {
        let date = event.created_at.date_naive();
        match ActionType::parse(&event.action_type) {
            Some(ActionType::PageView) => day_row(&mut days, date).page_views += 1,
            Some(ActionType::AiInteraction) => day_row(&mut days, date).ai_interactions += 1,
            _ => {}
        }
    }

    days.into_values().collect()
}

pub fn top_features(events: &[BehaviorEvent]) -> Vec<TopFeature> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for event in events {
        *counts
            .entry((event.feature_name.as_str(), event.action_type.as_str()))
            .or_insert(0) += 1;
    }

    let mut ranked: Vec<TopFeature> = counts
        .into_iter()
        .map(|((feature_name, action_type), usage_count)| TopFeature {
            feature_name: feature_name.to_string(),
            action_type: action_type.to_string(),
            usage_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.feature_name.cmp(&b.feature_name))
            .then_with(|| a.action_type.cmp(&b.action_type))
    });
    ranked.truncate(TOP_FEATURE_LIMIT);
    ranked
}

fn validate_preferences(prefs: &AnalyticsPreferences) -> Result<(), ApiError> {
    if prefs.data_retention_days < 1 {
        return Err(ApiError::validation("data_retention_days must be positive"));
    }
    if prefs.anonymize_after_days < 1 || prefs.anonymize_after_days > prefs.data_retention_days {
        return Err(ApiError::validation(
            "anonymize_after_days must be between 1 and data_retention_days",
        ));
    }
    Ok(())
}

pub struct AnalyticsService {
    analytics_repo: Arc<dyn AnalyticsRepository>,
    default_days: i64,
}

impl AnalyticsService {
    pub fn new(analytics_repo: Arc<dyn AnalyticsRepository>, default_days: i64) -> Self {
        Self {
            analytics_repo,
            default_days,
        }
    }

    fn window(&self, days: Option<i64>) -> Result<(i64, DateTime<Utc>), ApiError> {
        let days = days.unwrap_or(self.default_days);
        if !(1..=MAX_ANALYTICS_DAYS).contains(&days) {
            return Err(ApiError::validation(format!(
                "days must be between 1 and {}",
                MAX_ANALYTICS_DAYS
            )));
        }
        Ok((days, Utc::now() - Duration::days(days)))
    }

    async fn effective_preferences(&self, user_id: Uuid) -> Result<AnalyticsPreferences, ApiError> {
        Ok(self
            .analytics_repo
            .get_preferences(user_id)
            .await?
            .unwrap_or_else(|| AnalyticsPreferences::defaults_for(user_id)))
    }

    /// A user who never saved preferences has consented to every action.
    async fn consents_to(&self, user_id: Uuid, action: ActionType) -> Result<bool, ApiError> {
        Ok(self
            .analytics_repo
            .get_preferences(user_id)
            .await?
            .map_or(true, |prefs| prefs.allows(action)))
    }

    // ========================================================================
    // EVENTS & SESSIONS
    // ========================================================================

    pub async fn track_event(
        &self,
        user_id: Uuid,
        request: TrackEventRequest,
    ) -> Result<TrackEventResponse, ApiError> {
        let feature_name = sanitize_text(&request.feature_name);
        if feature_name.is_empty() || feature_name.chars().count() > MAX_FEATURE_NAME_LEN {
            return Err(ApiError::validation(format!(
                "feature_name must be 1-{} characters",
                MAX_FEATURE_NAME_LEN
            )));
        }

        if !self.consents_to(user_id, request.action_type).await? {
            tracing::debug!(user_id = %user_id, action = %request.action_type, "Event blocked by analytics preferences");
            return Ok(TrackEventResponse {
                success: false,
                event_id: None,
                message: Some("Event not tracked due to user preferences".to_string()),
            });
        }

        let event = BehaviorEvent {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            session_id: request.session_id.clone(),
            action_type: request.action_type.as_str().to_string(),
            feature_name,
            ai_feature_type: request.ai_feature_type,
            event_data: request.event_data,
            duration_ms: request.duration_ms,
            success: request.success,
            error_message: request.error_message,
            page_url: request.page_url,
            referrer_url: request.referrer_url,
            user_agent: request.user_agent,
            is_anonymized: false,
            client_timestamp: request.client_timestamp,
            created_at: Utc::now(),
        };
        self.analytics_repo.insert_event(&event).await?;

        if let (Some(session_id), Some(counter)) =
            (request.session_id.as_deref(), request.action_type.session_counter())
        {
            // Counter failures never lose the event
            if let Err(e) = self
                .analytics_repo
                .increment_session_counter(user_id, session_id, counter)
                .await
            {
                tracing::warn!(user_id = %user_id, session_id, error = %e, "Failed to update session counter");
            }
        }

        Ok(TrackEventResponse {
            success: true,
            event_id: Some(event.id),
            message: None,
        })
    }

    pub async fn start_session(
        &self,
        user_id: Uuid,
        request: StartSessionRequest,
    ) -> Result<SessionResponse, ApiError> {
        let session_id = request.session_id.trim().to_string();
        if session_id.is_empty() {
            return Err(ApiError::validation("session_id is required"));
        }

        if self
            .analytics_repo
            .find_active_session(user_id, &session_id)
            .await?
            .is_some()
        {
            return Ok(SessionResponse {
                success: true,
                session_id,
                message: Some("Session already active".to_string()),
                duration_ms: None,
            });
        }

        let session = AnalyticsSession {
            id: Uuid::new_v4(),
            user_id,
            session_id: session_id.clone(),
            entry_page: request.entry_page,
            exit_page: None,
            user_agent: request.user_agent,
            device_type: request.device_type,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            page_views: 0,
            ai_interactions: 0,
            feature_usages: 0,
            is_active: true,
        };
        self.analytics_repo.create_session(&session).await?;
        tracing::debug!(user_id = %user_id, session_id = %session_id, "Analytics session started");

        Ok(SessionResponse {
            success: true,
            session_id,
            message: None,
            duration_ms: None,
        })
    }

    pub async fn end_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        request: EndSessionRequest,
    ) -> Result<SessionResponse, ApiError> {
        let session = self
            .analytics_repo
            .find_active_session(user_id, session_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Session not found"))?;

        let end_time = Utc::now();
        let duration_ms = (end_time - session.start_time).num_milliseconds().max(0);
        self.analytics_repo
            .end_session(session.id, request.exit_page.as_deref(), end_time, duration_ms)
            .await?;

        Ok(SessionResponse {
            success: true,
            session_id: session.session_id,
            message: None,
            duration_ms: Some(duration_ms),
        })
    }

    // ========================================================================
    // PREFERENCES
    // ========================================================================

    /// Stored preferences, saving the defaults on first access.
    pub async fn preferences(&self, user_id: Uuid) -> Result<AnalyticsPreferences, ApiError> {
        match self.analytics_repo.get_preferences(user_id).await? {
            Some(prefs) => Ok(prefs),
            None => {
                self.analytics_repo
                    .save_preferences(&AnalyticsPreferences::defaults_for(user_id))
                    .await
            }
        }
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> Result<AnalyticsPreferences, ApiError> {
        let mut prefs = self.effective_preferences(user_id).await?;
        if update.is_empty() {
            return Ok(prefs);
        }
        prefs.apply(&update);
        validate_preferences(&prefs)?;
        prefs.updated_at = Utc::now();

        let saved = self.analytics_repo.save_preferences(&prefs).await?;
        tracing::info!(user_id = %user_id, consent = saved.analytics_consent, "Analytics preferences updated");
        Ok(saved)
    }

    // ========================================================================
    // AGGREGATIONS
    // ========================================================================

    pub async fn engagement(&self, user_id: Uuid, days: Option<i64>) -> Result<EngagementMetrics, ApiError> {
        let (days, since) = self.window(days)?;
        let sessions = self.analytics_repo.sessions_since(user_id, since).await?;
        Ok(engagement_metrics(&sessions, days))
    }

    pub async fn feature_usage(&self, user_id: Uuid, days: Option<i64>) -> Result<Vec<FeatureUsageStat>, ApiError> {
        let (_, since) = self.window(days)?;
        let events = self.analytics_repo.events_since(user_id, since).await?;
        Ok(feature_usage(&events))
    }

    pub async fn daily_stats(&self, user_id: Uuid, days: Option<i64>) -> Result<Vec<DailyUsageStat>, ApiError> {
        let (_, since) = self.window(days)?;
        let (sessions, events) = tokio::try_join!(
            self.analytics_repo.sessions_since(user_id, since),
            self.analytics_repo.events_since(user_id, since),
        )?;
        Ok(daily_stats(&sessions, &events))
    }

    pub async fn top_features(&self, user_id: Uuid, days: Option<i64>) -> Result<Vec<TopFeature>, ApiError> {
        let (_, since) = self.window(days)?;
        let events = self.analytics_repo.events_since(user_id, since).await?;
        Ok(top_features(&events))
    }

    /// All four aggregations over one fetch of the window.
    pub async fn dashboard(&self, user_id: Uuid, days: Option<i64>) -> Result<AnalyticsDashboard, ApiError> {
        let (days, since) = self.window(days)?;
        let (sessions, events) = tokio::try_join!(
            self.analytics_repo.sessions_since(user_id, since),
            self.analytics_repo.events_since(user_id, since),
        )?;

        Ok(AnalyticsDashboard {
            user_engagement: engagement_metrics(&sessions, days),
            ai_feature_usage: feature_usage(&events),
            daily_stats: daily_stats(&sessions, &events),
            top_features: top_features(&events),
            period_days: days,
            generated_at: Utc::now(),
        })
    }

    // ========================================================================
    // PRIVACY
    // ========================================================================

    /// Strips identifying fields from every event recorded so far.
    pub async fn anonymize(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let count = self
            .analytics_repo
            .anonymize_events(user_id, Utc::now())
            .await?;
        tracing::info!(user_id = %user_id, events = count, "Analytics events anonymized");
        Ok(count)
    }

    pub async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let count = self.analytics_repo.delete_user_data(user_id).await?;
        tracing::info!(user_id = %user_id, events = count, "Analytics data deleted");
        Ok(count)
    }
}
