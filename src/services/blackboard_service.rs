//! Blackboard insight service
//!
//! Producers post insights to a shared store; subscribers are notified
//! asynchronously. Stored insights are written through to Postgres and kept
//! in a per-entity cache. Notification and relationship analysis run on a
//! single background worker that drains one FIFO queue, and a second task
//! periodically deactivates expired insights.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        cache_key, ConfidenceTrendPoint, FeedbackLogEntry, Insight, InsightCreate,
        InsightFeedback, InsightFilter, InsightPattern, InsightPriority, InsightStatistics,
        NewInsight, SubscriptionFilter, GLOBAL_ENTITY_TYPE, PATTERN_RECOGNITION,
    },
    repositories::InsightRepository,
};

pub const MAX_INSIGHT_LIMIT: i64 = 200;
/// Insights examined by relationship analysis.
pub const ANALYSIS_WINDOW: i64 = 20;
/// Fewer recent insights than this are not analysed.
pub const MIN_INSIGHTS_FOR_ANALYSIS: usize = 3;
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;
pub const TREND_WEEKS: usize = 4;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Receives insights posted to the blackboard.
#[async_trait]
pub trait InsightSubscriber: Send + Sync {
    async fn on_insight(&self, insight: &Insight, priority: InsightPriority) -> Result<(), ApiError>;
}

/// Writes every delivered insight to the log.
pub struct LoggingSubscriber;

#[async_trait]
impl InsightSubscriber for LoggingSubscriber {
    async fn on_insight(&self, insight: &Insight, priority: InsightPriority) -> Result<(), ApiError> {
        tracing::info!(
            user_id = %insight.user_id,
            insight_id = %insight.id,
            insight_type = %insight.insight_type,
            priority = %priority,
            "Insight posted"
        );
        Ok(())
    }
}

struct Subscription {
    filter: SubscriptionFilter,
    subscriber: Arc<dyn InsightSubscriber>,
}

enum BlackboardJob {
    NotifySubscribers {
        insight: Insight,
        priority: InsightPriority,
    },
    AnalyzeRelationships {
        user_id: Uuid,
    },
}

/// Tags derived from the insight's shape.
pub fn generate_tags(insight: &InsightCreate) -> Vec<String> {
    let mut tags = vec![insight.entity_type.clone(), insight.insight_type.clone()];
    if insight.confidence_score > 0.8 {
        tags.push("high_confidence".to_string());
    }
    if insight.impact_score.is_some_and(|i| i > 0.8) {
        tags.push("high_impact".to_string());
    }
    if insight
        .expires_at
        .is_some_and(|e| e < Utc::now() + Duration::hours(6))
    {
        tags.push("urgent".to_string());
    }
    tags
}

/// Entity types with repeatedly low confidence.
pub fn detect_patterns(insights: &[Insight]) -> Vec<InsightPattern> {
    let mut by_entity: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for insight in insights {
        by_entity
            .entry(insight.entity_type.as_str())
            .or_default()
            .push(insight.confidence_score);
    }

    by_entity
        .into_iter()
        .filter(|(_, scores)| {
            scores.len() >= 3
                && scores.iter().sum::<f64>() / (scores.len() as f64) < LOW_CONFIDENCE_THRESHOLD
        })
        .map(|(entity_type, _)| InsightPattern {
            pattern_type: "low_confidence_pattern".to_string(),
            entity_type: entity_type.to_string(),
            description: format!("Consistently low confidence scores for {} insights", entity_type),
            recommendation: format!("Review and refine {} analysis approach", entity_type),
        })
        .collect()
}

/// Weekly (`%Y-W%U`) mean confidence, last four weeks.
pub fn confidence_trend(insights: &[Insight]) -> Vec<ConfidenceTrendPoint> {
    let mut weekly: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for insight in insights {
        weekly
            .entry(insight.created_at.format("%Y-W%U").to_string())
            .or_default()
            .push(insight.confidence_score);
    }
    let points: Vec<ConfidenceTrendPoint> = weekly
        .into_iter()
        .map(|(week, scores)| ConfidenceTrendPoint {
            week,
            avg_confidence: round3(scores.iter().sum::<f64>() / scores.len() as f64),
        })
        .collect();
    let skip = points.len().saturating_sub(TREND_WEEKS);
    points.into_iter().skip(skip).collect()
}

fn validate_create(insight: &InsightCreate) -> Result<(), ApiError> {
    if insight.entity_type.trim().is_empty() {
        return Err(ApiError::validation("entity_type is required"));
    }
    if insight.insight_type.trim().is_empty() {
        return Err(ApiError::validation("insight_type is required"));
    }
    if insight.title.trim().is_empty() {
        return Err(ApiError::validation("title is required"));
    }
    if !(0.0..=1.0).contains(&insight.confidence_score) {
        return Err(ApiError::validation("confidence_score must be between 0 and 1"));
    }
    if insight
        .impact_score
        .is_some_and(|i| !(0.0..=1.0).contains(&i))
    {
        return Err(ApiError::validation("impact_score must be between 0 and 1"));
    }
    Ok(())
}

/// State shared between the service handle and its background tasks.
struct Blackboard {
    insight_repo: Arc<dyn InsightRepository>,
    cache: RwLock<HashMap<String, HashMap<Uuid, Insight>>>,
    subscribers: RwLock<HashMap<String, Subscription>>,
    queue: mpsc::UnboundedSender<BlackboardJob>,
}

impl Blackboard {
    fn enqueue(&self, job: BlackboardJob) {
        if self.queue.send(job).is_err() {
            tracing::warn!("Blackboard queue is closed; job dropped");
        }
    }

    async fn store(
        &self,
        user_id: Uuid,
        insight: InsightCreate,
        analyze: bool,
    ) -> Result<Insight, ApiError> {
        validate_create(&insight)?;

        let new = NewInsight {
            id: insight.id.unwrap_or_else(Uuid::new_v4),
            user_id,
            tags: generate_tags(&insight),
            entity_type: insight.entity_type,
            entity_id: insight.entity_id,
            insight_type: insight.insight_type,
            title: insight.title,
            summary: insight.summary,
            detailed_reasoning: insight.detailed_reasoning,
            confidence_score: insight.confidence_score,
            impact_score: insight.impact_score,
            reasoning_path: insight.reasoning_path,
            expires_at: insight.expires_at,
        };
        let stored = self.insight_repo.upsert(&new).await?;

        {
            // An upsert may move the insight to another entity key
            let prefix = format!("{}:", user_id);
            let mut cache = self.cache.write().await;
            for (_, entries) in cache.iter_mut().filter(|(key, _)| key.starts_with(&prefix)) {
                entries.remove(&stored.id);
            }
            cache.retain(|_, entries| !entries.is_empty());
            cache
                .entry(stored.cache_key())
                .or_default()
                .insert(stored.id, stored.clone());
        }

        if insight.notify_subscribers {
            self.enqueue(BlackboardJob::NotifySubscribers {
                insight: stored.clone(),
                priority: insight.priority,
            });
        }
        if analyze {
            self.enqueue(BlackboardJob::AnalyzeRelationships { user_id });
        }

        tracing::info!(user_id = %user_id, insight_id = %stored.id, "Insight stored");
        Ok(stored)
    }

    async fn invalidate_user(&self, user_id: Uuid) {
        let prefix = format!("{}:", user_id);
        self.cache.write().await.retain(|key, _| !key.starts_with(&prefix));
    }

    async fn process(&self, job: BlackboardJob) {
        match job {
            BlackboardJob::NotifySubscribers { insight, priority } => {
                self.notify(&insight, priority).await
            }
            BlackboardJob::AnalyzeRelationships { user_id } => {
                if let Err(e) = self.analyze(user_id).await {
                    tracing::error!(user_id = %user_id, error = %e, "Relationship analysis failed");
                }
            }
        }
    }

    async fn notify(&self, insight: &Insight, priority: InsightPriority) {
        let matching: Vec<(String, Arc<dyn InsightSubscriber>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.filter.matches(insight))
            .map(|(id, s)| (id.clone(), s.subscriber.clone()))
            .collect();

        for (subscriber_id, subscriber) in matching {
            if let Err(e) = subscriber.on_insight(insight, priority).await {
                tracing::error!(
                    subscriber_id = %subscriber_id,
                    insight_id = %insight.id,
                    error = %e,
                    "Subscriber callback failed"
                );
            }
        }
    }

    async fn analyze(&self, user_id: Uuid) -> Result<(), ApiError> {
        let recent = self
            .insight_repo
            .query(
                user_id,
                &InsightFilter {
                    is_active: Some(true),
                    limit: ANALYSIS_WINDOW,
                    ..Default::default()
                },
            )
            .await?;
        if recent.len() < MIN_INSIGHTS_FOR_ANALYSIS {
            return Ok(());
        }

        let patterns = detect_patterns(&recent);
        if patterns.is_empty() {
            return Ok(());
        }

        let recommendations: Vec<String> = patterns
            .iter()
            .take(3)
            .map(|p| format!("Consider: {}", p.recommendation))
            .collect();
        let meta = InsightCreate {
            id: None,
            entity_type: GLOBAL_ENTITY_TYPE.to_string(),
            entity_id: None,
            insight_type: PATTERN_RECOGNITION.to_string(),
            title: "Pattern Detected in Recent Insights".to_string(),
            summary: format!("Detected {} patterns in your recent insights", patterns.len()),
            detailed_reasoning: json!({
                "patterns": patterns,
                "recommendations": recommendations,
            }),
            confidence_score: 0.75,
            impact_score: Some(0.6),
            reasoning_path: json!([{
                "level": "global",
                "reasoning": "Analysis of insight relationships and patterns",
                "confidence": 0.75,
            }]),
            expires_at: None,
            priority: InsightPriority::Medium,
            notify_subscribers: false,
        };

        self.store(user_id, meta, false).await?;
        tracing::info!(user_id = %user_id, patterns = patterns.len(), "Insight patterns detected");
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, ApiError> {
        let deactivated = self.insight_repo.deactivate_expired().await?;
        self.cache.write().await.clear();
        tracing::info!(deactivated, "Expired insights cleaned up");
        Ok(deactivated)
    }
}

pub struct BlackboardService {
    shared: Arc<Blackboard>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<BlackboardJob>>>,
    handles: StdMutex<Vec<JoinHandle<()>>>,
}

impl BlackboardService {
    pub fn new(insight_repo: Arc<dyn InsightRepository>) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Blackboard {
                insight_repo,
                cache: RwLock::new(HashMap::new()),
                subscribers: RwLock::new(HashMap::new()),
                queue,
            }),
            receiver: Mutex::new(Some(receiver)),
            handles: StdMutex::new(Vec::new()),
        }
    }

    /// Spawn the queue worker and the expiry cleanup loop. Calling it again
    /// is a no-op.
    pub async fn start(&self, cleanup_interval: std::time::Duration) {
        let Some(mut receiver) = self.receiver.lock().await.take() else {
            tracing::warn!("Blackboard background processing already started");
            return;
        };

        let worker_state = self.shared.clone();
        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                worker_state.process(job).await;
            }
            tracing::debug!("Blackboard worker stopped");
        });

        let cleanup_state = self.shared.clone();
        let cleanup = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_interval);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = cleanup_state.cleanup_expired().await {
                    tracing::error!(error = %e, "Insight cleanup failed");
                }
            }
        });

        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handles.push(worker);
        handles.push(cleanup);
        tracing::info!(
            cleanup_interval_seconds = cleanup_interval.as_secs(),
            "Blackboard background processing started"
        );
    }

    // ========================================================================
    // INSIGHTS
    // ========================================================================

    pub async fn store_insight(&self, user_id: Uuid, insight: InsightCreate) -> Result<Insight, ApiError> {
        // Meta-insights are never fed back into analysis
        let analyze = insight.insight_type != PATTERN_RECOGNITION;
        self.shared.store(user_id, insight, analyze).await
    }

    /// Newest first; stamps `last_accessed_at` on everything returned.
    pub async fn get_insights(&self, user_id: Uuid, filter: &InsightFilter) -> Result<Vec<Insight>, ApiError> {
        if filter.limit < 1 || filter.limit > MAX_INSIGHT_LIMIT {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {}",
                MAX_INSIGHT_LIMIT
            )));
        }
        let insights = self.shared.insight_repo.query(user_id, filter).await?;
        if !insights.is_empty() {
            let ids: Vec<Uuid> = insights.iter().map(|i| i.id).collect();
            self.shared.insight_repo.touch_accessed(&ids).await?;
        }
        Ok(insights)
    }

    /// Reads through to storage and stamps `last_accessed_at`.
    pub async fn get_insight(&self, user_id: Uuid, id: Uuid) -> Result<Insight, ApiError> {
        let mut insight = self
            .shared
            .insight_repo
            .get_by_id(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Insight not found"))?;
        self.shared.insight_repo.touch_accessed(&[id]).await?;
        insight.last_accessed_at = Some(Utc::now());
        Ok(insight)
    }

    /// Cached insights for one entity, `None` entity meaning global.
    pub async fn cached_for_entity(
        &self,
        user_id: Uuid,
        entity_type: &str,
        entity_id: Option<Uuid>,
    ) -> Vec<Insight> {
        self.shared
            .cache
            .read()
            .await
            .get(&cache_key(user_id, entity_type, entity_id))
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn update_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        feedback: InsightFeedback,
        details: Option<serde_json::Value>,
    ) -> Result<Insight, ApiError> {
        let updated = self
            .shared
            .insight_repo
            .record_feedback(user_id, id, feedback, details.as_ref())
            .await?
            .ok_or_else(|| ApiError::not_found("Insight not found"))?;

        let detail = |key: &str| {
            details
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        self.shared
            .insight_repo
            .log_feedback(&FeedbackLogEntry {
                user_id,
                insight_id: id,
                feedback_type: format!("insight_{}", feedback.as_str()),
                feedback_text: detail("text"),
                suggested_improvement: detail("improvement"),
            })
            .await?;

        self.shared.invalidate_user(user_id).await;
        tracing::info!(user_id = %user_id, insight_id = %id, feedback = feedback.as_str(), "Insight feedback recorded");
        Ok(updated)
    }

    pub async fn pin(&self, user_id: Uuid, id: Uuid, pinned: bool) -> Result<Insight, ApiError> {
        let updated = self
            .shared
            .insight_repo
            .set_pinned(user_id, id, pinned)
            .await?
            .ok_or_else(|| ApiError::not_found("Insight not found"))?;
        self.shared.invalidate_user(user_id).await;
        Ok(updated)
    }

    pub async fn deactivate(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.shared.insight_repo.deactivate(user_id, id).await? {
            return Err(ApiError::not_found("Insight not found"));
        }
        self.shared.invalidate_user(user_id).await;
        Ok(())
    }

    pub async fn statistics(&self, user_id: Uuid, days: i64) -> Result<InsightStatistics, ApiError> {
        if !(1..=365).contains(&days) {
            return Err(ApiError::validation("days must be between 1 and 365"));
        }
        let insights = self
            .shared
            .insight_repo
            .created_since(user_id, Utc::now() - Duration::days(days))
            .await?;
        if insights.is_empty() {
            return Ok(InsightStatistics::default());
        }

        let total = insights.len();
        let avg_confidence = insights.iter().map(|i| i.confidence_score).sum::<f64>() / total as f64;
        let with_feedback = insights.iter().filter(|i| i.user_feedback.is_some()).count();
        let accepted = insights
            .iter()
            .filter(|i| i.user_feedback.as_deref() == Some(InsightFeedback::Accepted.as_str()))
            .count();

        let mut insights_by_type = BTreeMap::new();
        for insight in &insights {
            *insights_by_type.entry(insight.insight_type.clone()).or_insert(0) += 1;
        }

        Ok(InsightStatistics {
            total_insights: total,
            avg_confidence: round3(avg_confidence),
            feedback_rate: round3(with_feedback as f64 / total as f64),
            acceptance_rate: if with_feedback == 0 {
                0.0
            } else {
                round3(accepted as f64 / with_feedback as f64)
            },
            insights_by_type,
            confidence_trend: confidence_trend(&insights),
        })
    }

    // ========================================================================
    // SUBSCRIPTIONS
    // ========================================================================

    pub async fn subscribe(
        &self,
        subscriber_id: impl Into<String>,
        filter: SubscriptionFilter,
        subscriber: Arc<dyn InsightSubscriber>,
    ) {
        let subscriber_id = subscriber_id.into();
        tracing::info!(subscriber_id = %subscriber_id, "Blackboard subscriber registered");
        self.shared.subscribers.write().await.insert(
            subscriber_id,
            Subscription {
                filter,
                subscriber,
            },
        );
    }

    pub async fn unsubscribe(&self, subscriber_id: &str) -> bool {
        self.shared
            .subscribers
            .write()
            .await
            .remove(subscriber_id)
            .is_some()
    }

    pub async fn cleanup_expired(&self) -> Result<u64, ApiError> {
        self.shared.cleanup_expired().await
    }

    /// Run queued jobs inline. Only meaningful before `start`.
    #[cfg(test)]
    async fn drain_queue(&self) -> usize {
        let mut processed = 0;
        loop {
            let job = {
                let mut guard = self.receiver.lock().await;
                match guard.as_mut().map(|r| r.try_recv()) {
                    Some(Ok(job)) => job,
                    _ => break,
                }
            };
            self.shared.process(job).await;
            processed += 1;
        }
        processed
    }
}

impl Drop for BlackboardService {
    fn drop(&mut self) {
        let handles = self
            .handles
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryInsightRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSubscriber {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl InsightSubscriber for CountingSubscriber {
        async fn on_insight(&self, _: &Insight, _: InsightPriority) -> Result<(), ApiError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSubscriber;

    #[async_trait]
    impl InsightSubscriber for FailingSubscriber {
        async fn on_insight(&self, _: &Insight, _: InsightPriority) -> Result<(), ApiError> {
            Err(ApiError::internal("boom"))
        }
    }

    fn service() -> (BlackboardService, Arc<InMemoryInsightRepository>) {
        let repo = Arc::new(InMemoryInsightRepository::default());
        (BlackboardService::new(repo.clone()), repo)
    }

    fn insight(entity_type: &str, confidence: f64) -> InsightCreate {
        InsightCreate {
            id: None,
            entity_type: entity_type.to_string(),
            entity_id: None,
            insight_type: "productivity".to_string(),
            title: "Focus drifts after lunch".to_string(),
            summary: String::new(),
            detailed_reasoning: json!({}),
            confidence_score: confidence,
            impact_score: None,
            reasoning_path: json!([]),
            expires_at: None,
            priority: InsightPriority::Medium,
            notify_subscribers: true,
        }
    }

    #[test]
    fn test_generate_tags() {
        let mut i = insight("task", 0.9);
        i.impact_score = Some(0.95);
        i.expires_at = Some(Utc::now() + Duration::hours(1));
        assert_eq!(
            generate_tags(&i),
            vec!["task", "productivity", "high_confidence", "high_impact", "urgent"]
        );
        assert_eq!(generate_tags(&insight("task", 0.8)), vec!["task", "productivity"]);
    }

    #[tokio::test]
    async fn test_store_validates_scores() {
        let (service, _) = service();
        let err = service
            .store_insight(Uuid::new_v4(), insight("task", 1.5))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_store_caches_and_notifies_matching_subscribers() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let all = Arc::new(CountingSubscriber::default());
        let picky = Arc::new(CountingSubscriber::default());
        service.subscribe("failing", SubscriptionFilter::default(), Arc::new(FailingSubscriber)).await;
        service.subscribe("all", SubscriptionFilter::default(), all.clone()).await;
        service
            .subscribe(
                "picky",
                SubscriptionFilter {
                    min_confidence: Some(0.9),
                    ..Default::default()
                },
                picky.clone(),
            )
            .await;

        let stored = service.store_insight(user, insight("task", 0.7)).await.unwrap();
        assert_eq!(service.cached_for_entity(user, "task", None).await.len(), 1);

        // One notify job plus one analysis job
        assert_eq!(service.drain_queue().await, 2);
        assert_eq!(all.seen.load(Ordering::SeqCst), 1);
        assert_eq!(picky.seen.load(Ordering::SeqCst), 0);

        assert!(service.unsubscribe("all").await);
        assert!(!service.unsubscribe("all").await);

        let fetched = service.get_insight(user, stored.id).await.unwrap();
        assert_eq!(fetched.id, stored.id);
    }

    #[tokio::test]
    async fn test_relationship_analysis_creates_one_meta_insight() {
        let (service, repo) = service();
        let user = Uuid::new_v4();
        for _ in 0..3 {
            service.store_insight(user, insight("area", 0.4)).await.unwrap();
        }
        service.drain_queue().await;

        let metas: Vec<Insight> = repo
            .insights
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.insight_type == PATTERN_RECOGNITION)
            .cloned()
            .collect();
        assert!(!metas.is_empty());
        assert_eq!(metas[0].entity_type, GLOBAL_ENTITY_TYPE);
        assert_eq!(metas[0].confidence_score, 0.75);

        // Meta-insights do not enqueue further analysis
        let before = repo.insights.lock().unwrap().len();
        assert_eq!(service.drain_queue().await, 0);
        assert_eq!(repo.insights.lock().unwrap().len(), before);
    }

    #[test]
    fn test_detect_patterns_thresholds() {
        let user = Uuid::new_v4();
        let make = |entity: &str, confidence: f64| Insight {
            id: Uuid::new_v4(),
            user_id: user,
            entity_type: entity.to_string(),
            entity_id: None,
            insight_type: "x".into(),
            title: "t".into(),
            summary: String::new(),
            detailed_reasoning: json!({}),
            confidence_score: confidence,
            impact_score: None,
            reasoning_path: json!([]),
            expires_at: None,
            tags: vec![],
            is_active: true,
            is_pinned: false,
            application_count: 0,
            version: 1,
            user_feedback: None,
            feedback_details: None,
            last_accessed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let low = vec![make("task", 0.5), make("task", 0.5), make("task", 0.6)];
        assert_eq!(detect_patterns(&low).len(), 1);

        let two = vec![make("task", 0.1), make("task", 0.1), make("project", 0.1)];
        assert!(detect_patterns(&two).is_empty());
    }

    #[tokio::test]
    async fn test_feedback_pin_and_statistics() {
        let (service, repo) = service();
        let user = Uuid::new_v4();
        let a = service.store_insight(user, insight("task", 0.9)).await.unwrap();
        service.store_insight(user, insight("task", 0.5)).await.unwrap();

        let updated = service
            .update_feedback(
                user,
                a.id,
                InsightFeedback::Accepted,
                Some(json!({"text": "spot on"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.application_count, 1);
        assert!(service.cached_for_entity(user, "task", None).await.is_empty());
        {
            let log = repo.feedback_log.lock().unwrap();
            assert_eq!(log[0].feedback_type, "insight_accepted");
            assert_eq!(log[0].feedback_text.as_deref(), Some("spot on"));
        }

        let pinned = service.pin(user, a.id, true).await.unwrap();
        assert!(pinned.is_pinned);

        let stats = service.statistics(user, 30).await.unwrap();
        assert_eq!(stats.total_insights, 2);
        assert_eq!(stats.avg_confidence, 0.7);
        assert_eq!(stats.feedback_rate, 0.5);
        assert_eq!(stats.acceptance_rate, 1.0);
        assert_eq!(stats.insights_by_type.get("productivity"), Some(&2));
        assert_eq!(stats.confidence_trend.len(), 1);

        service.deactivate(user, a.id).await.unwrap();
        let active = service
            .get_insights(
                user,
                &InsightFilter {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].last_accessed_at.is_none());
        assert!(repo
            .insights
            .lock()
            .unwrap()
            .iter()
            .any(|i| i.last_accessed_at.is_some()));
    }

    #[tokio::test]
    async fn test_other_users_insight_not_found() {
        let (service, _) = service();
        let stored = service
            .store_insight(Uuid::new_v4(), insight("task", 0.5))
            .await
            .unwrap();
        let err = service.get_insight(Uuid::new_v4(), stored.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_start_runs_worker() {
        let (service, _) = service();
        let counter = Arc::new(CountingSubscriber::default());
        service.subscribe("c", SubscriptionFilter::default(), counter.clone()).await;
        service.start(std::time::Duration::from_secs(3600)).await;

        service
            .store_insight(Uuid::new_v4(), insight("task", 0.9))
            .await
            .unwrap();

        for _ in 0..50 {
            if counter.seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_moves_insight_between_cache_keys() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut first = insight("task", 0.5);
        first.id = Some(id);
        first.title = "old".to_string();
        service.store_insight(user, first).await.unwrap();

        let mut second = insight("project", 0.5);
        second.id = Some(id);
        second.title = "new".to_string();
        service.store_insight(user, second).await.unwrap();

        assert!(service.cached_for_entity(user, "task", None).await.is_empty());
        let moved = service.cached_for_entity(user, "project", None).await;
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].title, "new");

        let fetched = service.get_insight(user, id).await.unwrap();
        assert_eq!(fetched.title, "new");
        assert_eq!(fetched.entity_type, "project");
        assert!(fetched.last_accessed_at.is_some());
    }

    #[tokio::test]
    async fn test_expired_insights_hidden_then_cleaned_up() {
        let (service, repo) = service();
        let user = Uuid::new_v4();
        let mut expired = insight("task", 0.5);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        let stored = service.store_insight(user, expired).await.unwrap();
        service.store_insight(user, insight("task", 0.5)).await.unwrap();

        let visible = service.get_insights(user, &InsightFilter::default()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert!(visible.iter().all(|i| i.id != stored.id));

        let everything = service
            .get_insights(
                user,
                &InsightFilter {
                    include_expired: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);

        assert_eq!(service.cached_for_entity(user, "task", None).await.len(), 2);
        assert_eq!(service.cleanup_expired().await.unwrap(), 1);
        assert!(service.cached_for_entity(user, "task", None).await.is_empty());

        let row = repo
            .insights
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == stored.id)
            .cloned()
            .unwrap();
        assert!(!row.is_active);

        // Nothing left to expire
        assert_eq!(service.cleanup_expired().await.unwrap(), 0);
    }
}
