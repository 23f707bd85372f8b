use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{Pillar, PillarCreate, PillarListQuery, PillarUpdate, PillarWithAreas},
    AppState,
};

pub async fn create_pillar(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<PillarCreate>,
) -> Result<Json<Pillar>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.pillar_service.create(user_id, payload).await?))
}

pub async fn list_pillars(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<PillarListQuery>,
) -> Result<Json<Vec<PillarWithAreas>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.pillar_service.list(user_id, &query).await?))
}

pub async fn get_pillar(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<PillarWithAreas>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.pillar_service.get(user_id, id).await?))
}

pub async fn update_pillar(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PillarUpdate>,
) -> Result<Json<Pillar>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.pillar_service.update(user_id, id, payload).await?))
}

/// Areas of a deleted pillar stay, unlinked.
pub async fn delete_pillar(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.pillar_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Pillar deleted successfully" })))
}
