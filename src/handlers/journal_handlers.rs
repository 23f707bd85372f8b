use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{JournalEntry, JournalEntryCreate, JournalEntryUpdate, JournalListQuery, JournalListResponse},
    AppState,
};

pub async fn create_entry(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<JournalEntryCreate>,
) -> Result<Json<JournalEntry>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.journal_service.create(user_id, payload).await?))
}

pub async fn list_entries(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<JournalListQuery>,
) -> Result<Json<JournalListResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.journal_service.list(user_id, &query).await?))
}

pub async fn get_entry(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntry>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.journal_service.get(user_id, id).await?))
}

pub async fn update_entry(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JournalEntryUpdate>,
) -> Result<Json<JournalEntry>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.journal_service.update(user_id, id, payload).await?))
}

/// Soft delete; the entry moves to the trash.
pub async fn delete_entry(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.journal_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Journal entry moved to trash" })))
}

pub async fn list_trash(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.journal_service.trash(user_id).await?))
}

pub async fn restore_entry(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntry>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.journal_service.restore(user_id, id).await?))
}

pub async fn delete_entry_permanently(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.journal_service.delete_permanently(user_id, id).await?;
    Ok(Json(json!({ "message": "Journal entry permanently deleted" })))
}
