use crate::{
    database::DatabasePool,
    error::ApiError,
    models::{AnalyticsPreferences, AnalyticsSession, BehaviorEvent, SessionCounter},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, user_id, session_id, action_type, feature_name, ai_feature_type, \
    event_data, duration_ms, success, error_message, page_url, referrer_url, user_agent, \
    is_anonymized, client_timestamp, created_at";

const SESSION_COLUMNS: &str = "id, user_id, session_id, entry_page, exit_page, user_agent, device_type, \
    start_time, end_time, duration_ms, page_views, ai_interactions, feature_usages, is_active";

const PREFERENCE_COLUMNS: &str = "user_id, analytics_consent, ai_behavior_tracking, performance_tracking, \
    error_reporting, data_retention_days, anonymize_after_days, track_ai_insights_usage, \
    track_ai_actions_usage, track_goal_planner_usage, track_navigation_patterns, \
    track_search_queries, share_anonymous_stats, updated_at";

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn get_preferences(&self, user_id: Uuid)
        -> Result<Option<AnalyticsPreferences>, ApiError>;
    async fn save_preferences(
        &self,
        preferences: &AnalyticsPreferences,
    ) -> Result<AnalyticsPreferences, ApiError>;

    async fn insert_event(&self, event: &BehaviorEvent) -> Result<(), ApiError>;
    async fn events_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<BehaviorEvent>, ApiError>;

    async fn find_active_session(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Option<AnalyticsSession>, ApiError>;
    async fn create_session(&self, session: &AnalyticsSession) -> Result<(), ApiError>;
    async fn end_session(
        &self,
        id: Uuid,
        exit_page: Option<&str>,
        end_time: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), ApiError>;
    /// Bumps a counter on the user's active session with this client id.
    async fn increment_session_counter(
        &self,
        user_id: Uuid,
        session_id: &str,
        counter: SessionCounter,
    ) -> Result<(), ApiError>;
    async fn sessions_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsSession>, ApiError>;

    /// Strips identifying fields from events older than `before`; returns the count.
    async fn anonymize_events(&self, user_id: Uuid, before: DateTime<Utc>) -> Result<u64, ApiError>;
    /// Removes every event, session and preference row of the user; returns the event count.
    async fn delete_user_data(&self, user_id: Uuid) -> Result<u64, ApiError>;
}

pub struct SqlxAnalyticsRepository {
    pool: DatabasePool,
}

impl SqlxAnalyticsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsRepository for SqlxAnalyticsRepository {
    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<AnalyticsPreferences>, ApiError> {
        let sql = format!(
            "SELECT {} FROM user_analytics_preferences WHERE user_id = $1",
            PREFERENCE_COLUMNS
        );
        let prefs = sqlx::query_as::<_, AnalyticsPreferences>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(prefs)
    }

    async fn save_preferences(
        &self,
        p: &AnalyticsPreferences,
    ) -> Result<AnalyticsPreferences, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO user_analytics_preferences (user_id, analytics_consent, ai_behavior_tracking,
                performance_tracking, error_reporting, data_retention_days, anonymize_after_days,
                track_ai_insights_usage, track_ai_actions_usage, track_goal_planner_usage,
                track_navigation_patterns, track_search_queries, share_anonymous_stats, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                analytics_consent = EXCLUDED.analytics_consent,
                ai_behavior_tracking = EXCLUDED.ai_behavior_tracking,
                performance_tracking = EXCLUDED.performance_tracking,
                error_reporting = EXCLUDED.error_reporting,
                data_retention_days = EXCLUDED.data_retention_days,
                anonymize_after_days = EXCLUDED.anonymize_after_days,
                track_ai_insights_usage = EXCLUDED.track_ai_insights_usage,
                track_ai_actions_usage = EXCLUDED.track_ai_actions_usage,
                track_goal_planner_usage = EXCLUDED.track_goal_planner_usage,
                track_navigation_patterns = EXCLUDED.track_navigation_patterns,
                track_search_queries = EXCLUDED.track_search_queries,
                share_anonymous_stats = EXCLUDED.share_anonymous_stats,
                updated_at = NOW()
            RETURNING {}
            "#,
            PREFERENCE_COLUMNS
        );
        let prefs = sqlx::query_as::<_, AnalyticsPreferences>(&sql)
            .bind(p.user_id)
            .bind(p.analytics_consent)
            .bind(p.ai_behavior_tracking)
            .bind(p.performance_tracking)
            .bind(p.error_reporting)
            .bind(p.data_retention_days)
            .bind(p.anonymize_after_days)
            .bind(p.track_ai_insights_usage)
            .bind(p.track_ai_actions_usage)
            .bind(p.track_goal_planner_usage)
            .bind(p.track_navigation_patterns)
            .bind(p.track_search_queries)
            .bind(p.share_anonymous_stats)
            .fetch_one(&self.pool)
            .await?;

        Ok(prefs)
    }

    async fn insert_event(&self, e: &BehaviorEvent) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO user_behavior_events (id, user_id, session_id, action_type, feature_name,
                ai_feature_type, event_data, duration_ms, success, error_message, page_url,
                referrer_url, user_agent, is_anonymized, client_timestamp, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(e.id)
        .bind(e.user_id)
        .bind(&e.session_id)
        .bind(&e.action_type)
        .bind(&e.feature_name)
        .bind(&e.ai_feature_type)
        .bind(&e.event_data)
        .bind(e.duration_ms)
        .bind(e.success)
        .bind(&e.error_message)
        .bind(&e.page_url)
        .bind(&e.referrer_url)
        .bind(&e.user_agent)
        .bind(e.is_anonymized)
        .bind(e.client_timestamp)
        .bind(e.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn events_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<BehaviorEvent>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_behavior_events
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at ASC
            "#,
            EVENT_COLUMNS
        );
        let events = sqlx::query_as::<_, BehaviorEvent>(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    async fn find_active_session(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Option<AnalyticsSession>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_analytics_sessions
            WHERE user_id = $1 AND session_id = $2 AND is_active = TRUE
            ORDER BY start_time DESC
            LIMIT 1
            "#,
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AnalyticsSession>(&sql)
            .bind(user_id)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn create_session(&self, s: &AnalyticsSession) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO user_analytics_sessions (id, user_id, session_id, entry_page, user_agent,
                device_type, start_time, page_views, ai_interactions, feature_usages, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, 0, TRUE)
            "#,
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(&s.session_id)
        .bind(&s.entry_page)
        .bind(&s.user_agent)
        .bind(&s.device_type)
        .bind(s.start_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn end_session(
        &self,
        id: Uuid,
        exit_page: Option<&str>,
        end_time: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE user_analytics_sessions
            SET exit_page = $2, end_time = $3, duration_ms = $4, is_active = FALSE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(exit_page)
        .bind(end_time)
        .bind(duration_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_session_counter(
        &self,
        user_id: Uuid,
        session_id: &str,
        counter: SessionCounter,
    ) -> Result<(), ApiError> {
        // Column name comes from a closed enum, never from input
        let sql = format!(
            "UPDATE user_analytics_sessions SET {col} = {col} + 1 \
             WHERE user_id = $1 AND session_id = $2 AND is_active = TRUE",
            col = counter.column()
        );
        sqlx::query(&sql)
            .bind(user_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn sessions_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsSession>, ApiError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_analytics_sessions
            WHERE user_id = $1 AND start_time >= $2
            ORDER BY start_time ASC
            "#,
            SESSION_COLUMNS
        );
        let sessions = sqlx::query_as::<_, AnalyticsSession>(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    async fn anonymize_events(&self, user_id: Uuid, before: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE user_behavior_events
            SET user_id = NULL, session_id = NULL, user_agent = NULL, page_url = NULL,
                referrer_url = NULL, is_anonymized = TRUE
            WHERE user_id = $1 AND created_at < $2 AND is_anonymized = FALSE
            "#,
        )
        .bind(user_id)
        .bind(before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_user_data(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let mut tx = self.pool.begin().await?;

        let events = sqlx::query("DELETE FROM user_behavior_events WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM user_analytics_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM user_analytics_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(events.rows_affected())
    }
}
