use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{
        GenerateInstancesQuery, GenerationSummary, RecurringTask, RecurringTaskCreate,
        RecurringTaskListQuery, RecurringTaskUpdate, Task,
    },
    AppState,
};

pub async fn list_recurring_tasks(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<RecurringTaskListQuery>,
) -> Result<Json<Vec<RecurringTask>>, ApiError> {
    let user_id = user.require_user_id()?;
    let templates = app_state
        .recurring_task_service
        .list(user_id, query.active_only)
        .await?;
    Ok(Json(templates))
}

pub async fn create_recurring_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<RecurringTaskCreate>,
) -> Result<Json<RecurringTask>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.recurring_task_service.create(user_id, payload).await?))
}

pub async fn get_recurring_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecurringTask>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.recurring_task_service.get(user_id, id).await?))
}

pub async fn update_recurring_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecurringTaskUpdate>,
) -> Result<Json<RecurringTask>, ApiError> {
    let user_id = user.require_user_id()?;
    let updated = app_state
        .recurring_task_service
        .update(user_id, id, payload)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_recurring_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.recurring_task_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Recurring task deleted successfully" })))
}

/// Defaults to today (UTC) when no `date` is given.
pub async fn generate_instances(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<GenerateInstancesQuery>,
) -> Result<Json<GenerationSummary>, ApiError> {
    let user_id = user.require_user_id()?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = app_state
        .recurring_task_service
        .generate_instances(user_id, date)
        .await?;
    Ok(Json(summary))
}

pub async fn list_instances(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.recurring_task_service.instances(user_id, id).await?))
}
