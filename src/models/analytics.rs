use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of user action captured by behavior analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PageView,
    AiInteraction,
    FeatureUsage,
    Navigation,
    Search,
    Click,
    Error,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::PageView => "page_view",
            ActionType::AiInteraction => "ai_interaction",
            ActionType::FeatureUsage => "feature_usage",
            ActionType::Navigation => "navigation",
            ActionType::Search => "search",
            ActionType::Click => "click",
            ActionType::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page_view" => Some(ActionType::PageView),
            "ai_interaction" => Some(ActionType::AiInteraction),
            "feature_usage" => Some(ActionType::FeatureUsage),
            "navigation" => Some(ActionType::Navigation),
            "search" => Some(ActionType::Search),
            "click" => Some(ActionType::Click),
            "error" => Some(ActionType::Error),
            _ => None,
        }
    }

    /// Session counter bumped by this action, if any.
    pub fn session_counter(&self) -> Option<SessionCounter> {
        match self {
            ActionType::PageView => Some(SessionCounter::PageViews),
            ActionType::AiInteraction => Some(SessionCounter::AiInteractions),
            ActionType::FeatureUsage => Some(SessionCounter::FeatureUsages),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCounter {
    PageViews,
    AiInteractions,
    FeatureUsages,
}

impl SessionCounter {
    pub fn column(&self) -> &'static str {
        match self {
            SessionCounter::PageViews => "page_views",
            SessionCounter::AiInteractions => "ai_interactions",
            SessionCounter::FeatureUsages => "feature_usages",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BehaviorEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub action_type: String,
    pub feature_name: String,
    pub ai_feature_type: Option<String>,
    pub event_data: Value,
    pub duration_ms: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub user_agent: Option<String>,
    pub is_anonymized: bool,
    pub client_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackEventRequest {
    pub session_id: Option<String>,
    pub action_type: ActionType,
    pub feature_name: String,
    pub ai_feature_type: Option<String>,
    #[serde(default)]
    pub event_data: Value,
    pub duration_ms: Option<i64>,
    #[serde(default = "default_true")]
    pub success: bool,
    pub error_message: Option<String>,
    pub page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub user_agent: Option<String>,
    pub client_timestamp: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackEventResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalyticsSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub entry_page: Option<String>,
    pub exit_page: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub page_views: i32,
    pub ai_interactions: i32,
    pub feature_usages: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartSessionRequest {
    pub session_id: String,
    pub entry_page: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndSessionRequest {
    pub exit_page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalyticsPreferences {
    pub user_id: Uuid,
    pub analytics_consent: bool,
    pub ai_behavior_tracking: bool,
    pub performance_tracking: bool,
    pub error_reporting: bool,
    pub data_retention_days: i32,
    pub anonymize_after_days: i32,
    pub track_ai_insights_usage: bool,
    pub track_ai_actions_usage: bool,
    pub track_goal_planner_usage: bool,
    pub track_navigation_patterns: bool,
    pub track_search_queries: bool,
    pub share_anonymous_stats: bool,
    pub updated_at: DateTime<Utc>,
}

impl AnalyticsPreferences {
    /// Preferences assumed for users who never saved any.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            analytics_consent: true,
            ai_behavior_tracking: true,
            performance_tracking: true,
            error_reporting: true,
            data_retention_days: 365,
            anonymize_after_days: 90,
            track_ai_insights_usage: true,
            track_ai_actions_usage: true,
            track_goal_planner_usage: true,
            track_navigation_patterns: true,
            track_search_queries: false,
            share_anonymous_stats: true,
            updated_at: Utc::now(),
        }
    }

    /// Whether an action of this type may be recorded.
    pub fn allows(&self, action: ActionType) -> bool {
        if !self.analytics_consent {
            return false;
        }
        match action {
            ActionType::AiInteraction => self.ai_behavior_tracking,
            ActionType::Search => self.track_search_queries,
            ActionType::Navigation => self.track_navigation_patterns,
            _ => true,
        }
    }

    pub fn apply(&mut self, update: &PreferencesUpdate) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { self.$field = v; })*
            };
        }
        merge!(
            analytics_consent,
            ai_behavior_tracking,
            performance_tracking,
            error_reporting,
            data_retention_days,
            anonymize_after_days,
            track_ai_insights_usage,
            track_ai_actions_usage,
            track_goal_planner_usage,
            track_navigation_patterns,
            track_search_queries,
            share_anonymous_stats
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub analytics_consent: Option<bool>,
    pub ai_behavior_tracking: Option<bool>,
    pub performance_tracking: Option<bool>,
    pub error_reporting: Option<bool>,
    pub data_retention_days: Option<i32>,
    pub anonymize_after_days: Option<i32>,
    pub track_ai_insights_usage: Option<bool>,
    pub track_ai_actions_usage: Option<bool>,
    pub track_goal_planner_usage: Option<bool>,
    pub track_navigation_patterns: Option<bool>,
    pub track_search_queries: Option<bool>,
    pub share_anonymous_stats: Option<bool>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.analytics_consent.is_none()
            && self.ai_behavior_tracking.is_none()
            && self.performance_tracking.is_none()
            && self.error_reporting.is_none()
            && self.data_retention_days.is_none()
            && self.anonymize_after_days.is_none()
            && self.track_ai_insights_usage.is_none()
            && self.track_ai_actions_usage.is_none()
            && self.track_goal_planner_usage.is_none()
            && self.track_navigation_patterns.is_none()
            && self.track_search_queries.is_none()
            && self.share_anonymous_stats.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EngagementMetrics {
    pub total_sessions: usize,
    pub total_time_spent_ms: i64,
    pub average_session_duration_ms: f64,
    pub total_page_views: i64,
    pub total_ai_interactions: i64,
    pub bounce_rate: f64,
    pub return_user_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureUsageStat {
    pub feature_type: String,
    pub feature_name: String,
    pub total_sessions: usize,
    pub total_time_spent_ms: i64,
    pub average_session_duration_ms: f64,
    pub total_interactions: usize,
    pub success_rate: f64,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyUsageStat {
    pub date: NaiveDate,
    pub sessions: usize,
    pub total_time_spent_ms: i64,
    pub page_views: usize,
    pub ai_interactions: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopFeature {
    pub feature_name: String,
    pub action_type: String,
    pub usage_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsDashboard {
    pub user_engagement: EngagementMetrics,
    pub ai_feature_usage: Vec<FeatureUsageStat>,
    pub daily_stats: Vec<DailyUsageStat>,
    pub top_features: Vec<TopFeature>,
    pub period_days: i64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}
