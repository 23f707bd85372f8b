use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskDue,
    TaskOverdue,
    TaskReminder,
    ProjectDeadline,
    RecurringTask,
    Achievement,
    UnblockedTask,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskDue => "task_due",
            NotificationType::TaskOverdue => "task_overdue",
            NotificationType::TaskReminder => "task_reminder",
            NotificationType::ProjectDeadline => "project_deadline",
            NotificationType::RecurringTask => "recurring_task",
            NotificationType::Achievement => "achievement",
            NotificationType::UnblockedTask => "unblocked_task",
            NotificationType::System => "system",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NotificationType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "task_due" => NotificationType::TaskDue,
            "task_overdue" => NotificationType::TaskOverdue,
            "task_reminder" => NotificationType::TaskReminder,
            "project_deadline" => NotificationType::ProjectDeadline,
            "recurring_task" => NotificationType::RecurringTask,
            "achievement" => NotificationType::Achievement,
            "unblocked_task" => NotificationType::UnblockedTask,
            _ => NotificationType::System,
        }
    }
}

/// In-app notification shown in the notification center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub task_id: Option<Uuid>,
    pub task_name: Option<String>,
    pub project_name: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub task_id: Option<Uuid>,
    pub task_name: Option<String>,
    pub project_name: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            notification_type: NotificationType::from(row.notification_type.as_str()),
            title: row.title,
            message: row.message,
            task_id: row.task_id,
            task_name: row.task_name,
            project_name: row.project_name,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

/// Task context attached to task-related notifications
#[derive(Debug, Clone, Default)]
pub struct NotificationContext {
    pub task_id: Option<Uuid>,
    pub task_name: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub email_notifications: bool,
    pub browser_notifications: bool,
    pub task_due_notifications: bool,
    pub task_overdue_notifications: bool,
    pub task_reminder_notifications: bool,
    pub project_deadline_notifications: bool,
    pub recurring_task_notifications: bool,
    pub achievement_notifications: bool,
    pub unblocked_task_notifications: bool,
    /// Minutes before the due time that a "due soon" reminder fires
    pub reminder_advance_time: i32,
    /// `HH:MM`, both ends set or neither
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreferences {
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            email_notifications: true,
            browser_notifications: true,
            task_due_notifications: true,
            task_overdue_notifications: true,
            task_reminder_notifications: true,
            project_deadline_notifications: true,
            recurring_task_notifications: true,
            achievement_notifications: true,
            unblocked_task_notifications: true,
            reminder_advance_time: 30,
            quiet_hours_start: None,
            quiet_hours_end: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether a notification of this type should be delivered in-app.
    pub fn allows(&self, kind: NotificationType) -> bool {
        if !self.browser_notifications {
            return false;
        }
        match kind {
            NotificationType::TaskDue => self.task_due_notifications,
            NotificationType::TaskOverdue => self.task_overdue_notifications,
            NotificationType::TaskReminder => self.task_reminder_notifications,
            NotificationType::ProjectDeadline => self.project_deadline_notifications,
            NotificationType::RecurringTask => self.recurring_task_notifications,
            NotificationType::Achievement => self.achievement_notifications,
            NotificationType::UnblockedTask => self.unblocked_task_notifications,
            NotificationType::System => true,
        }
    }

    /// Quiet hours may wrap midnight (`22:00`-`07:00`). The end is exclusive.
    pub fn in_quiet_hours(&self, time: NaiveTime) -> bool {
        let (Some(start), Some(end)) = (
            self.quiet_hours_start.as_deref().and_then(parse_hhmm),
            self.quiet_hours_end.as_deref().and_then(parse_hhmm),
        ) else {
            return false;
        };
        if start <= end {
            start <= time && time < end
        } else {
            time >= start || time < end
        }
    }

    pub fn apply(&mut self, update: &NotificationPreferencesUpdate) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { self.$field = v; })*
            };
        }
        merge!(
            email_notifications,
            browser_notifications,
            task_due_notifications,
            task_overdue_notifications,
            task_reminder_notifications,
            project_deadline_notifications,
            recurring_task_notifications,
            achievement_notifications,
            unblocked_task_notifications,
            reminder_advance_time
        );
    }
}

pub(crate) fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Partial update. An empty string clears a quiet-hours bound.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPreferencesUpdate {
    pub email_notifications: Option<bool>,
    pub browser_notifications: Option<bool>,
    pub task_due_notifications: Option<bool>,
    pub task_overdue_notifications: Option<bool>,
    pub task_reminder_notifications: Option<bool>,
    pub project_deadline_notifications: Option<bool>,
    pub recurring_task_notifications: Option<bool>,
    pub achievement_notifications: Option<bool>,
    pub unblocked_task_notifications: Option<bool>,
    pub reminder_advance_time: Option<i32>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_notification_limit")]
    pub limit: i64,
}

impl Default for NotificationListQuery {
    fn default() -> Self {
        Self {
            unread_only: false,
            limit: default_notification_limit(),
        }
    }
}

fn default_notification_limit() -> i64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_quiet_hours_wrap_midnight() {
        let mut prefs = NotificationPreferences::defaults_for(Uuid::new_v4());
        assert!(!prefs.in_quiet_hours(at(3, 0)));

        prefs.quiet_hours_start = Some("22:00".into());
        prefs.quiet_hours_end = Some("07:00".into());
        assert!(prefs.in_quiet_hours(at(23, 30)));
        assert!(prefs.in_quiet_hours(at(6, 59)));
        assert!(!prefs.in_quiet_hours(at(7, 0)));
        assert!(!prefs.in_quiet_hours(at(12, 0)));

        prefs.quiet_hours_start = Some("12:00".into());
        prefs.quiet_hours_end = Some("13:00".into());
        assert!(prefs.in_quiet_hours(at(12, 30)));
        assert!(!prefs.in_quiet_hours(at(23, 30)));
    }

    #[test]
    fn test_allows_respects_channel_and_type() {
        let mut prefs = NotificationPreferences::defaults_for(Uuid::new_v4());
        assert!(prefs.allows(NotificationType::UnblockedTask));

        prefs.apply(&NotificationPreferencesUpdate {
            unblocked_task_notifications: Some(false),
            ..Default::default()
        });
        assert!(!prefs.allows(NotificationType::UnblockedTask));
        assert!(prefs.allows(NotificationType::TaskDue));

        prefs.browser_notifications = false;
        assert!(!prefs.allows(NotificationType::System));
    }

    #[test]
    fn test_notification_type_wire_name() {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            notification_type: NotificationType::UnblockedTask,
            title: "t".into(),
            message: "m".into(),
            task_id: None,
            task_name: None,
            project_name: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "unblocked_task");
        assert_eq!(json["is_read"], false);
    }
}
