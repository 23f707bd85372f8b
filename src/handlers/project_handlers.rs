use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{KanbanBoard, Project, ProjectCreate, ProjectListQuery, ProjectUpdate, ProjectWithTasks},
    AppState,
};

pub async fn create_project(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<ProjectCreate>,
) -> Result<Json<Project>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.project_service.create(user_id, payload).await?))
}

pub async fn list_projects(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<Vec<ProjectWithTasks>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.project_service.list(user_id, &query).await?))
}

pub async fn get_project(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithTasks>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.project_service.get(user_id, id).await?))
}

pub async fn update_project(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdate>,
) -> Result<Json<Project>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.project_service.update(user_id, id, payload).await?))
}

/// Removes the project together with its tasks.
pub async fn delete_project(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.project_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

pub async fn get_kanban_board(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<KanbanBoard>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.project_service.kanban(user_id, id).await?))
}
