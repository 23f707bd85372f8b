use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{Dashboard, Hierarchy},
    AppState,
};

pub async fn get_dashboard(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Dashboard>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.dashboard_service.dashboard(user_id).await?))
}

pub async fn get_hierarchy(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Hierarchy>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.dashboard_service.hierarchy(user_id).await?))
}
