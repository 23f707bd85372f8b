use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{
        AnalyticsDashboard, AnalyticsPreferences, AnalyticsQuery, DailyUsageStat,
        EndSessionRequest, EngagementMetrics, FeatureUsageStat, PreferencesUpdate,
        SessionResponse, StartSessionRequest, TopFeature, TrackEventRequest, TrackEventResponse,
    },
    AppState,
};

/// Events blocked by the user's preferences answer `success: false`.
pub async fn track_event(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<TrackEventRequest>,
) -> Result<Json<TrackEventResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.track_event(user_id, payload).await?))
}

pub async fn start_session(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.start_session(user_id, payload).await?))
}

pub async fn end_session(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(session_id): Path<String>,
    Json(payload): Json<EndSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    let response = app_state
        .analytics_service
        .end_session(user_id, &session_id, payload)
        .await?;
    Ok(Json(response))
}

pub async fn get_preferences(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<AnalyticsPreferences>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.preferences(user_id).await?))
}

pub async fn update_preferences(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<PreferencesUpdate>,
) -> Result<Json<AnalyticsPreferences>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.update_preferences(user_id, payload).await?))
}

pub async fn get_dashboard(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsDashboard>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.dashboard(user_id, query.days).await?))
}

pub async fn get_engagement(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<EngagementMetrics>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.engagement(user_id, query.days).await?))
}

pub async fn get_feature_usage(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Vec<FeatureUsageStat>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.feature_usage(user_id, query.days).await?))
}

pub async fn get_daily_stats(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Vec<DailyUsageStat>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.daily_stats(user_id, query.days).await?))
}

pub async fn get_top_features(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Vec<TopFeature>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.analytics_service.top_features(user_id, query.days).await?))
}

pub async fn anonymize_data(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    let count = app_state.analytics_service.anonymize(user_id).await?;
    Ok(Json(json!({ "success": true, "anonymized_events": count })))
}

/// Removes events, sessions and preferences.
pub async fn delete_data(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    let count = app_state.analytics_service.delete_all(user_id).await?;
    Ok(Json(json!({ "success": true, "deleted_events": count })))
}
