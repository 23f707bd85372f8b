use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Router,
};

use crate::{handlers, middleware, AppState};

/// Every `/api` route with the middleware stack applied.
pub fn create_router(app_state: AppState) -> Router {
    // Public routes (health + credentials exchange)
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/health/simple", get(handlers::health_check_simple))
        .route("/api/health/ready", get(handlers::readiness_check))
        .route("/api/health/live", get(handlers::liveness_check))
        .route("/api/auth/register", post(handlers::auth_handlers::register))
        .route("/api/auth/login", post(handlers::auth_handlers::login));

    // Protected routes (API key, bearer token or session cookie)
    let protected_routes = Router::new()
        // Auth
        .route("/api/auth/logout", post(handlers::auth_handlers::logout))
        .route("/api/auth/me", get(handlers::auth_handlers::get_me))
        .route("/api/auth/profile", patch(handlers::auth_handlers::update_profile))
        .route(
            "/api/auth/account",
            delete(handlers::auth_handlers::delete_account),
        )
        // Pillars
        .route(
            "/api/pillars",
            get(handlers::pillar_handlers::list_pillars).post(handlers::pillar_handlers::create_pillar),
        )
        .route(
            "/api/pillars/:id",
            get(handlers::pillar_handlers::get_pillar)
                .put(handlers::pillar_handlers::update_pillar)
                .delete(handlers::pillar_handlers::delete_pillar),
        )
        // Areas
        .route(
            "/api/areas",
            get(handlers::area_handlers::list_areas).post(handlers::area_handlers::create_area),
        )
        .route(
            "/api/areas/:id",
            get(handlers::area_handlers::get_area)
                .put(handlers::area_handlers::update_area)
                .delete(handlers::area_handlers::delete_area),
        )
        // Projects
        .route(
            "/api/projects",
            get(handlers::project_handlers::list_projects)
                .post(handlers::project_handlers::create_project),
        )
        .route(
            "/api/projects/:id",
            get(handlers::project_handlers::get_project)
                .put(handlers::project_handlers::update_project)
                .delete(handlers::project_handlers::delete_project),
        )
        .route(
            "/api/projects/:id/kanban",
            get(handlers::project_handlers::get_kanban_board),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(handlers::task_handlers::list_tasks).post(handlers::task_handlers::create_task),
        )
        .route("/api/tasks/search", get(handlers::task_handlers::search_tasks))
        .route(
            "/api/tasks/:id",
            get(handlers::task_handlers::get_task)
                .put(handlers::task_handlers::update_task)
                .delete(handlers::task_handlers::delete_task),
        )
        .route("/api/tasks/:id/subtasks", get(handlers::task_handlers::get_subtasks))
        // Recurring tasks
        .route(
            "/api/recurring-tasks",
            get(handlers::recurring_task_handlers::list_recurring_tasks)
                .post(handlers::recurring_task_handlers::create_recurring_task),
        )
        .route(
            "/api/recurring-tasks/generate-instances",
            post(handlers::recurring_task_handlers::generate_instances),
        )
        .route(
            "/api/recurring-tasks/:id",
            get(handlers::recurring_task_handlers::get_recurring_task)
                .put(handlers::recurring_task_handlers::update_recurring_task)
                .delete(handlers::recurring_task_handlers::delete_recurring_task),
        )
        .route(
            "/api/recurring-tasks/:id/instances",
            get(handlers::recurring_task_handlers::list_instances),
        )
        // Journal
        .route(
            "/api/journal",
            get(handlers::journal_handlers::list_entries)
                .post(handlers::journal_handlers::create_entry),
        )
        .route("/api/journal/trash", get(handlers::journal_handlers::list_trash))
        .route(
            "/api/journal/:id",
            get(handlers::journal_handlers::get_entry)
                .put(handlers::journal_handlers::update_entry)
                .delete(handlers::journal_handlers::delete_entry),
        )
        .route(
            "/api/journal/:id/restore",
            post(handlers::journal_handlers::restore_entry),
        )
        .route(
            "/api/journal/:id/permanent",
            delete(handlers::journal_handlers::delete_entry_permanently),
        )
        // Today
        .route("/api/today", get(handlers::today_handlers::get_today))
        .route("/api/today/tasks", get(handlers::today_handlers::get_today_tasks))
        .route(
            "/api/today/tasks/:id",
            patch(handlers::today_handlers::toggle_today_task),
        )
        .route("/api/today/summary", get(handlers::today_handlers::get_today_summary))
        // Dashboard
        .route("/api/dashboard", get(handlers::dashboard_handlers::get_dashboard))
        .route("/api/hierarchy", get(handlers::dashboard_handlers::get_hierarchy))
        // Alignment
        .route(
            "/api/alignment/dashboard",
            get(handlers::alignment_handlers::get_alignment_dashboard),
        )
        .route(
            "/api/alignment/weekly-score",
            get(handlers::alignment_handlers::get_weekly_score),
        )
        .route(
            "/api/alignment/monthly-score",
            get(handlers::alignment_handlers::get_monthly_score),
        )
        .route(
            "/api/alignment/monthly-goal",
            get(handlers::alignment_handlers::get_monthly_goal)
                .post(handlers::alignment_handlers::set_monthly_goal),
        )
        // Insights
        .route(
            "/api/insights",
            get(handlers::insight_handlers::list_insights)
                .post(handlers::insight_handlers::create_insight),
        )
        .route(
            "/api/insights/statistics",
            get(handlers::insight_handlers::get_statistics),
        )
        .route(
            "/api/insights/:id",
            get(handlers::insight_handlers::get_insight)
                .delete(handlers::insight_handlers::deactivate_insight),
        )
        .route(
            "/api/insights/:id/feedback",
            post(handlers::insight_handlers::submit_feedback),
        )
        .route("/api/insights/:id/pin", post(handlers::insight_handlers::pin_insight))
        // Analytics
        .route("/api/analytics/track", post(handlers::analytics_handlers::track_event))
        .route(
            "/api/analytics/sessions",
            post(handlers::analytics_handlers::start_session),
        )
        .route(
            "/api/analytics/sessions/:session_id/end",
            post(handlers::analytics_handlers::end_session),
        )
        .route(
            "/api/analytics/preferences",
            get(handlers::analytics_handlers::get_preferences)
                .put(handlers::analytics_handlers::update_preferences),
        )
        .route("/api/analytics/dashboard", get(handlers::analytics_handlers::get_dashboard))
        .route(
            "/api/analytics/engagement",
            get(handlers::analytics_handlers::get_engagement),
        )
        .route(
            "/api/analytics/feature-usage",
            get(handlers::analytics_handlers::get_feature_usage),
        )
        .route(
            "/api/analytics/daily-stats",
            get(handlers::analytics_handlers::get_daily_stats),
        )
        .route(
            "/api/analytics/top-features",
            get(handlers::analytics_handlers::get_top_features),
        )
        .route(
            "/api/analytics/anonymize",
            post(handlers::analytics_handlers::anonymize_data),
        )
        .route(
            "/api/analytics/data",
            delete(handlers::analytics_handlers::delete_data),
        )
        // Notifications
        .route(
            "/api/notifications",
            get(handlers::notification_handlers::list_notifications),
        )
        .route(
            "/api/notifications/preferences",
            get(handlers::notification_handlers::get_preferences)
                .put(handlers::notification_handlers::update_preferences),
        )
        .route(
            "/api/notifications/mark-all-read",
            post(handlers::notification_handlers::mark_all_read),
        )
        .route(
            "/api/notifications/clear-all",
            delete(handlers::notification_handlers::clear_all),
        )
        .route("/api/notifications/test", post(handlers::notification_handlers::send_test))
        .route(
            "/api/notifications/:id",
            delete(handlers::notification_handlers::delete_notification),
        )
        .route(
            "/api/notifications/:id/read",
            post(handlers::notification_handlers::mark_read),
        )
        // GraphQL
        .route("/api/graphql", post(handlers::graphql_handlers::graphql_handler))
        // Metrics (admin)
        .route("/api/metrics", get(handlers::metrics_handlers::get_metrics))
        .route(
            "/api/metrics/report",
            get(handlers::metrics_handlers::get_performance_report),
        )
        .route("/api/metrics/clear", post(handlers::metrics_handlers::clear_metrics))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::auth::auth_middleware,
        ));

    let cors_layer = middleware::create_cors_layer(&app_state.config.cors_allow_origins);
    let metrics = app_state.metrics_service.clone();
    let rate_limiter = app_state
        .config
        .rate_limit_enabled
        .then(|| app_state.ip_rate_limiter.clone());

    let mut app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
        .layer(from_fn_with_state(metrics, middleware::performance_middleware));

    if let Some(limiter) = rate_limiter {
        app = app.layer(from_fn_with_state(
            limiter,
            middleware::ip_rate_limit_middleware,
        ));
    }

    app.layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_logging_middleware))
        .layer(middleware::create_logging_layer())
        .layer(cors_layer)
}
