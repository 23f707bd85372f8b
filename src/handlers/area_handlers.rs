use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{Area, AreaCreate, AreaListQuery, AreaUpdate, AreaWithProjects},
    AppState,
};

pub async fn create_area(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<AreaCreate>,
) -> Result<Json<Area>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.area_service.create(user_id, payload).await?))
}

pub async fn list_areas(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AreaListQuery>,
) -> Result<Json<Vec<AreaWithProjects>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.area_service.list(user_id, &query).await?))
}

pub async fn get_area(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaWithProjects>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.area_service.get(user_id, id).await?))
}

pub async fn update_area(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AreaUpdate>,
) -> Result<Json<Area>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.area_service.update(user_id, id, payload).await?))
}

pub async fn delete_area(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.area_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Area deleted successfully" })))
}
