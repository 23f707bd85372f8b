use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Entity type used for insights that are not tied to a specific entity
pub const GLOBAL_ENTITY_TYPE: &str = "global";

/// Insight type of the meta-insights produced by relationship analysis
pub const PATTERN_RECOGNITION: &str = "pattern_recognition";

/// Delivery priority handed to subscribers alongside an insight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for InsightPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightPriority::Low => write!(f, "low"),
            InsightPriority::Medium => write!(f, "medium"),
            InsightPriority::High => write!(f, "high"),
            InsightPriority::Critical => write!(f, "critical"),
        }
    }
}

/// User reaction to an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightFeedback {
    Accepted,
    Rejected,
    Modified,
    Ignored,
}

impl InsightFeedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightFeedback::Accepted => "accepted",
            InsightFeedback::Rejected => "rejected",
            InsightFeedback::Modified => "modified",
            InsightFeedback::Ignored => "ignored",
        }
    }
}

/// Stored insight
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Insight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub insight_type: String,
    pub title: String,
    pub summary: String,
    pub detailed_reasoning: Value,
    pub confidence_score: f64,
    pub impact_score: Option<f64>,
    pub reasoning_path: Value,
    pub expires_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_pinned: bool,
    pub application_count: i32,
    pub version: i32,
    pub user_feedback: Option<String>,
    pub feedback_details: Option<Value>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Insight {
    /// Cache key: `user:entity_type:entity_id`, with `global` for entity-less insights.
    pub fn cache_key(&self) -> String {
        cache_key(self.user_id, &self.entity_type, self.entity_id)
    }
}

pub fn cache_key(user_id: Uuid, entity_type: &str, entity_id: Option<Uuid>) -> String {
    match entity_id {
        Some(id) => format!("{}:{}:{}", user_id, entity_type, id),
        None => format!("{}:{}:{}", user_id, entity_type, GLOBAL_ENTITY_TYPE),
    }
}

/// Insight as produced by an analyzer, before storage
#[derive(Debug, Clone, Deserialize)]
pub struct InsightCreate {
    /// Reusing an id replaces the stored insight
    pub id: Option<Uuid>,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub insight_type: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "empty_object")]
    pub detailed_reasoning: Value,
    pub confidence_score: f64,
    pub impact_score: Option<f64>,
    #[serde(default = "empty_array")]
    pub reasoning_path: Value,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: InsightPriority,
    #[serde(default = "default_notify")]
    pub notify_subscribers: bool,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

fn default_notify() -> bool {
    true
}

/// Row written by the repository on store
#[derive(Debug, Clone)]
pub struct NewInsight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub insight_type: String,
    pub title: String,
    pub summary: String,
    pub detailed_reasoning: Value,
    pub confidence_score: f64,
    pub impact_score: Option<f64>,
    pub reasoning_path: Value,
    pub expires_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Filters for `get_insights`
#[derive(Debug, Clone)]
pub struct InsightFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub insight_type: Option<String>,
    pub is_active: Option<bool>,
    pub is_pinned: Option<bool>,
    pub min_confidence: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub include_expired: bool,
    pub limit: i64,
}

impl Default for InsightFilter {
    fn default() -> Self {
        Self {
            entity_type: None,
            entity_id: None,
            insight_type: None,
            is_active: None,
            is_pinned: None,
            min_confidence: None,
            tags: None,
            include_expired: false,
            limit: 50,
        }
    }
}

/// Query string form of [`InsightFilter`]; `tags` is comma separated
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightListQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub insight_type: Option<String>,
    pub is_active: Option<bool>,
    pub is_pinned: Option<bool>,
    pub min_confidence: Option<f64>,
    pub tags: Option<String>,
    #[serde(default)]
    pub include_expired: bool,
    pub limit: Option<i64>,
}

impl From<InsightListQuery> for InsightFilter {
    fn from(q: InsightListQuery) -> Self {
        let tags = q.tags.map(|raw| {
            raw.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        });
        Self {
            entity_type: q.entity_type,
            entity_id: q.entity_id,
            insight_type: q.insight_type,
            is_active: q.is_active,
            is_pinned: q.is_pinned,
            min_confidence: q.min_confidence,
            tags: tags.filter(|t| !t.is_empty()),
            include_expired: q.include_expired,
            limit: q.limit.unwrap_or(50),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: InsightFeedback,
    /// Free-form details; `text` and `improvement` keys are copied to the feedback log
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinRequest {
    #[serde(default = "default_pinned")]
    pub pinned: bool,
}

fn default_pinned() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default = "default_stat_days")]
    pub days: i64,
}

fn default_stat_days() -> i64 {
    30
}

/// Entry in the insight feedback log
#[derive(Debug, Clone)]
pub struct FeedbackLogEntry {
    pub user_id: Uuid,
    pub insight_id: Uuid,
    pub feedback_type: String,
    pub feedback_text: Option<String>,
    pub suggested_improvement: Option<String>,
}

/// Subscriber filter. `min_confidence` is a lower bound, `tags` needs a
/// non-empty intersection, every other key must equal the insight field of
/// the same name when the insight has one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub min_confidence: Option<f64>,
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl SubscriptionFilter {
    pub fn matches(&self, insight: &Insight) -> bool {
        if let Some(min) = self.min_confidence {
            if insight.confidence_score < min {
                return false;
            }
        }

        if let Some(tags) = &self.tags {
            if !tags.iter().any(|t| insight.tags.contains(t)) {
                return false;
            }
        }

        if self.fields.is_empty() {
            return true;
        }

        let serialized = match serde_json::to_value(insight) {
            Ok(Value::Object(map)) => map,
            _ => return false,
        };
        self.fields.iter().all(|(key, expected)| match serialized.get(key) {
            Some(actual) => actual == expected,
            None => true,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceTrendPoint {
    pub week: String,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InsightStatistics {
    pub total_insights: usize,
    pub avg_confidence: f64,
    pub feedback_rate: f64,
    pub acceptance_rate: f64,
    pub insights_by_type: BTreeMap<String, usize>,
    pub confidence_trend: Vec<ConfidenceTrendPoint>,
}

/// Pattern found by relationship analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightPattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub entity_type: String,
    pub description: String,
    pub recommendation: String,
}
