pub mod alignment_service;
pub mod analytics_service;
pub mod area_service;
pub mod auth_service;
pub mod blackboard_service;
pub mod dashboard_service;
pub mod journal_service;
pub mod metrics_service;
pub mod notification_service;
pub mod pillar_service;
pub mod project_service;
pub mod recurring_task_service;
pub mod scheduler;
pub mod scoring;
pub mod task_service;
pub mod today_service;

// Re-export commonly used types
pub use alignment_service::AlignmentService;
pub use analytics_service::AnalyticsService;
pub use area_service::AreaService;
pub use auth_service::AuthService;
pub use blackboard_service::{BlackboardService, InsightSubscriber, LoggingSubscriber};
pub use dashboard_service::DashboardService;
pub use journal_service::JournalService;
pub use metrics_service::MetricsService;
pub use notification_service::NotificationService;
pub use pillar_service::PillarService;
pub use project_service::ProjectService;
pub use recurring_task_service::RecurringTaskService;
pub use scheduler::Scheduler;
pub use task_service::TaskService;
pub use today_service::TodayService;
