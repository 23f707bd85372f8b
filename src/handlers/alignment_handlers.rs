use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::{
    auth::context::UserContext,
    error::ApiError,
    models::{AlignmentDashboard, MonthlyGoalRequest, MonthlyGoalResponse, ScoreResponse},
    AppState,
};

pub async fn get_alignment_dashboard(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<AlignmentDashboard>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(app_state.alignment_service.dashboard(user_id).await?))
}

/// Points earned over the last seven days.
pub async fn get_weekly_score(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    let score = app_state.alignment_service.rolling_weekly_score(user_id).await?;
    Ok(Json(ScoreResponse { score }))
}

pub async fn get_monthly_score(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    let score = app_state.alignment_service.monthly_score(user_id).await?;
    Ok(Json(ScoreResponse { score }))
}

pub async fn get_monthly_goal(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<MonthlyGoalResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    let monthly_goal = app_state.alignment_service.get_monthly_goal(user_id).await?;
    Ok(Json(MonthlyGoalResponse { monthly_goal }))
}

pub async fn set_monthly_goal(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(payload): Json<MonthlyGoalRequest>,
) -> Result<Json<MonthlyGoalResponse>, ApiError> {
    let user_id = user.require_user_id()?;
    let goal = app_state
        .alignment_service
        .set_monthly_goal(user_id, payload.goal)
        .await?;
    Ok(Json(MonthlyGoalResponse {
        monthly_goal: Some(goal),
    }))
}
