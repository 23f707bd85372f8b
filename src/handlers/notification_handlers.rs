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
        Notification, NotificationListQuery, NotificationPreferences,
        NotificationPreferencesUpdate,
    },
    AppState,
};

pub async fn get_preferences(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.notification_service.preferences(user_id).await?))
}

pub async fn update_preferences(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<NotificationPreferencesUpdate>,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let user_id = user.require_user_id()?;
    let preferences = app_state
        .notification_service
        .update_preferences(user_id, payload)
        .await?;
    Ok(Json(preferences))
}

pub async fn list_notifications(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.notification_service.list(user_id, &query).await?))
}

pub async fn mark_read(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.notification_service.mark_read(user_id, id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

pub async fn mark_all_read(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    let count = app_state.notification_service.mark_all_read(user_id).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn delete_notification(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    app_state.notification_service.delete(user_id, id).await?;
    Ok(Json(json!({ "message": "Notification deleted successfully" })))
}

pub async fn clear_all(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.require_user_id()?;
    let count = app_state.notification_service.clear_all(user_id).await?;
    Ok(Json(json!({ "count": count })))
}

/// Always delivered, whatever the preferences say.
pub async fn send_test(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Notification>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.notification_service.send_test(user_id).await?))
}
