use axum::{
    extract::{Extension, State},
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::{context::UserContext, rbac::Permission},
    error::ApiError,
    require_permission,
    services::metrics_service::PerformanceReport,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct MetricsSummary {
    pub uptime_seconds: u64,
    pub memory_usage: MemoryUsage,
    pub cpu_usage_percent: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub requests_per_second: f64,
    pub endpoints_tracked: usize,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// Headline numbers for the admin dashboard
pub async fn get_metrics(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<MetricsSummary>, ApiError> {
    require_permission!(user, &Permission::ViewMetrics);

    let report = app_state.metrics_service.generate_report();
    let system = report.system;
    let overall = report.overall;

    Ok(Json(MetricsSummary {
        uptime_seconds: system.uptime_seconds,
        memory_usage: MemoryUsage {
            total_bytes: system.total_memory_bytes,
            used_bytes: system.memory_usage_bytes,
            free_bytes: system.total_memory_bytes.saturating_sub(system.memory_usage_bytes),
        },
        cpu_usage_percent: system.cpu_usage_percent,
        total_requests: overall.total_requests,
        failed_requests: overall.failed_requests,
        average_response_time_ms: overall.average_response_time_ms,
        requests_per_second: overall.requests_per_second,
        endpoints_tracked: report.endpoints.len(),
    }))
}

pub async fn get_performance_report(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<PerformanceReport>, ApiError> {
    require_permission!(user, &Permission::ViewMetrics);
    Ok(Json(app_state.metrics_service.generate_report()))
}

pub async fn clear_metrics(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    require_permission!(user, &Permission::ManageMetrics);

    app_state.metrics_service.clear_metrics();
    tracing::info!(user_id = ?user.user_id, "Metrics cleared");
    Ok(Json(json!({
        "message": "All metrics cleared successfully"
    })))
}
