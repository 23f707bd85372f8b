use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{
        TodayPriorities, TodayQuery, TodaySummary, TodayTaskList, ToggleCompletionQuery,
        ToggleCompletionResponse,
    },
    AppState,
};

/// Top scored tasks for today; `top_n=0` returns every candidate.
pub async fn get_today(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<TodayPriorities>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.today_service.priorities(user_id, query.top_n).await?))
}

pub async fn get_today_tasks(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<TodayTaskList>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.today_service.tasks(user_id).await?))
}

pub async fn toggle_today_task(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<ToggleCompletionQuery>,
) -> Result<Json<ToggleCompletionResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    let response = app_state
        .today_service
        .toggle_completion(user_id, id, query.completed)
        .await?;
    Ok(Json(response))
}

pub async fn get_today_summary(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<TodaySummary>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.today_service.summary(user_id).await?))
}
