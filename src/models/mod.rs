pub mod alignment;
pub mod analytics;
pub mod area;
pub mod dashboard;
pub mod insight;
pub mod journal;
pub mod notification;
pub mod pillar;
pub mod project;
pub mod recurring;
pub mod task;
pub mod today;
pub mod user;

// Re-export commonly used types
pub use alignment::*;
pub use analytics::*;
pub use area::*;
pub use dashboard::*;
pub use insight::*;
pub use journal::*;
pub use notification::*;
pub use pillar::*;
pub use project::*;
pub use recurring::*;
pub use task::*;
pub use today::*;
pub use user::*;
