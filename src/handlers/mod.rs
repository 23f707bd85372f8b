pub mod alignment_handlers;
pub mod analytics_handlers;
pub mod area_handlers;
pub mod auth_handlers;
pub mod dashboard_handlers;
pub mod graphql_handlers;
pub mod health_handlers;
pub mod insight_handlers;
pub mod journal_handlers;
pub mod metrics_handlers;
pub mod notification_handlers;
pub mod pillar_handlers;
pub mod project_handlers;
pub mod recurring_task_handlers;
pub mod task_handlers;
pub mod today_handlers;

pub use health_handlers::{health_check, health_check_simple, liveness_check, readiness_check};
