use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{
        FeedbackRequest, Insight, InsightCreate, InsightFilter, InsightListQuery,
        InsightStatistics, PinRequest, StatisticsQuery,
    },
    AppState,
};

pub async fn list_insights(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<InsightListQuery>,
) -> Result<Json<Vec<Insight>>, ApiError> {
    let user_id = user.require_user_id()?;
    let filter = InsightFilter::from(query);
    Ok(Json(app_state.blackboard_service.get_insights(user_id, &filter).await?))
}

/// Stores an insight and queues subscriber notification and analysis.
pub async fn create_insight(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<InsightCreate>,
) -> Result<Json<Insight>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.blackboard_service.store_insight(user_id, payload).await?))
}

pub async fn get_statistics(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<InsightStatistics>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.blackboard_service.statistics(user_id, query.days).await?))
}

pub async fn get_insight(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Insight>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.blackboard_service.get_insight(user_id, id).await?))
}

pub async fn submit_feedback(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<Insight>, ApiError> {
    let user_id = user.require_user_id()?;
    let insight = app_state
        .blackboard_service
        .update_feedback(user_id, id, payload.feedback, payload.details)
        .await?;
    Ok(Json(insight))
}

pub async fn pin_insight(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PinRequest>,
) -> Result<Json<Insight>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.blackboard_service.pin(user_id, id, payload.pinned).await?))
}

pub async fn deactivate_insight(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.blackboard_service.deactivate(user_id, id).await?;
    Ok(Json(json!({ "message": "Insight deactivated" })))
}
