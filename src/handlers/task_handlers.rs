use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{Task, TaskCreate, TaskFilter, TaskSearchQuery, TaskUpdate},
    AppState,
};

pub async fn create_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<TaskCreate>,
) -> Result<Json<Task>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.task_service.create(user_id, payload).await?))
}

pub async fn list_tasks(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.task_service.list(user_id, &filter).await?))
}

pub async fn search_tasks(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<TaskSearchQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = user.require_user_id()?;
    let tasks = app_state
        .task_service
        .search(user_id, &query.q, query.limit)
        .await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.task_service.get(user_id, id).await?))
}

pub async fn get_subtasks(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.task_service.subtasks(user_id, id).await?))
}

/// Completing a task here also records its alignment points.
pub async fn update_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskUpdate>,
) -> Result<Json<Task>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.task_service.update(user_id, id, payload).await?))
}

pub async fn delete_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.task_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}
