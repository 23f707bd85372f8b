pub mod alignment_repo;
pub mod analytics_repo;
pub mod area_repo;
pub mod insight_repo;
pub mod journal_repo;
#[cfg(test)]
pub(crate) mod memory;
pub mod notification_repo;
pub mod pillar_repo;
pub mod project_repo;
pub mod recurring_repo;
pub mod task_repo;
pub mod user_repo;

pub use alignment_repo::{AlignmentRepository, SqlxAlignmentRepository};
pub use analytics_repo::{AnalyticsRepository, SqlxAnalyticsRepository};
pub use area_repo::{AreaRepository, SqlxAreaRepository};
pub use insight_repo::{InsightRepository, SqlxInsightRepository};
pub use journal_repo::{JournalRepository, SqlxJournalRepository};
pub use notification_repo::{NotificationRepository, SqlxNotificationRepository};
pub use pillar_repo::{PillarRepository, SqlxPillarRepository};
pub use project_repo::{ProjectRepository, SqlxProjectRepository};
pub use recurring_repo::{RecurringTaskRepository, SqlxRecurringTaskRepository};
pub use task_repo::{SqlxTaskRepository, TaskRepository};
pub use user_repo::{SqlxUserRepository, UserChanges, UserRepository};

/// `%term%` for ILIKE with the LIKE wildcards in `term` escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
