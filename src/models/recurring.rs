use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Monthly => "monthly",
            RecurrenceType::Custom => "custom",
        }
    }
}

impl From<&str> for RecurrenceType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "weekly" => RecurrenceType::Weekly,
            "monthly" => RecurrenceType::Monthly,
            "custom" => RecurrenceType::Custom,
            _ => RecurrenceType::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl RecurrenceWeekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceWeekday::Monday => "monday",
            RecurrenceWeekday::Tuesday => "tuesday",
            RecurrenceWeekday::Wednesday => "wednesday",
            RecurrenceWeekday::Thursday => "thursday",
            RecurrenceWeekday::Friday => "friday",
            RecurrenceWeekday::Saturday => "saturday",
            RecurrenceWeekday::Sunday => "sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monday" => Some(RecurrenceWeekday::Monday),
            "tuesday" => Some(RecurrenceWeekday::Tuesday),
            "wednesday" => Some(RecurrenceWeekday::Wednesday),
            "thursday" => Some(RecurrenceWeekday::Thursday),
            "friday" => Some(RecurrenceWeekday::Friday),
            "saturday" => Some(RecurrenceWeekday::Saturday),
            "sunday" => Some(RecurrenceWeekday::Sunday),
            _ => None,
        }
    }
}

impl From<Weekday> for RecurrenceWeekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => RecurrenceWeekday::Monday,
            Weekday::Tue => RecurrenceWeekday::Tuesday,
            Weekday::Wed => RecurrenceWeekday::Wednesday,
            Weekday::Thu => RecurrenceWeekday::Thursday,
            Weekday::Fri => RecurrenceWeekday::Friday,
            Weekday::Sat => RecurrenceWeekday::Saturday,
            Weekday::Sun => RecurrenceWeekday::Sunday,
        }
    }
}

fn default_interval() -> i32 {
    1
}

/// When a recurring task produces instances.
///
/// - `daily`: every `interval` days from the start date
/// - `weekly`: on `weekdays` (default: the start date's weekday) every
///   `interval` weeks
/// - `monthly`: on `month_day` (default: the start date's day, clamped to
///   the month's last day) every `interval` months
/// - `custom`: every `interval` days, restricted to `weekdays` when given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub recurrence_type: RecurrenceType,
    #[serde(default = "default_interval")]
    pub interval: i32,
    #[serde(default)]
    pub weekdays: Vec<RecurrenceWeekday>,
    pub month_day: Option<i32>,
    pub end_date: Option<NaiveDate>,
    pub max_instances: Option<i32>,
}

impl RecurrencePattern {
    /// Whether the pattern produces an instance on `date` for a series that
    /// began on `start`. Ignores `max_instances`, which depends on history.
    pub fn occurs_on(&self, start: NaiveDate, date: NaiveDate) -> bool {
        if date < start || self.end_date.is_some_and(|end| date > end) {
            return false;
        }
        let interval = i64::from(self.interval.max(1));
        let days = (date - start).num_days();

        match self.recurrence_type {
            RecurrenceType::Daily => days % interval == 0,
            RecurrenceType::Weekly => {
                let on_weekday = if self.weekdays.is_empty() {
                    date.weekday() == start.weekday()
                } else {
                    self.weekdays.contains(&date.weekday().into())
                };
                let weeks = (week_start(date) - week_start(start)).num_days() / 7;
                on_weekday && weeks % interval == 0
            }
            RecurrenceType::Monthly => {
                let target = self
                    .month_day
                    .and_then(|d| u32::try_from(d).ok())
                    .unwrap_or_else(|| start.day());
                let months = i64::from(date.year() * 12 + date.month0() as i32)
                    - i64::from(start.year() * 12 + start.month0() as i32);
                date.day() == target.min(days_in_month(date)) && months % interval == 0
            }
            RecurrenceType::Custom => {
                days % interval == 0
                    && (self.weekdays.is_empty()
                        || self.weekdays.contains(&date.weekday().into()))
            }
        }
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Template that generates ordinary tasks on a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub category: Option<String>,
    pub estimated_duration: Option<i32>,
    pub due_time: Option<String>,
    pub recurrence_pattern: RecurrencePattern,
    pub start_date: NaiveDate,
    pub is_active: bool,
    pub last_generated_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row representation for RecurringTask
#[derive(Debug, Clone, FromRow)]
pub struct RecurringTaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub priority: String,
    pub category: Option<String>,
    pub estimated_duration: Option<i32>,
    pub due_time: Option<String>,
    pub recurrence_type: String,
    pub recurrence_interval: i32,
    pub weekdays: Vec<String>,
    pub month_day: Option<i32>,
    pub end_date: Option<NaiveDate>,
    pub max_instances: Option<i32>,
    pub start_date: NaiveDate,
    pub is_active: bool,
    pub last_generated_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RecurringTaskRow> for RecurringTask {
    fn from(row: RecurringTaskRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            project_id: row.project_id,
            name: row.name,
            description: row.description,
            priority: Priority::from(row.priority.as_str()),
            category: row.category,
            estimated_duration: row.estimated_duration,
            due_time: row.due_time,
            recurrence_pattern: RecurrencePattern {
                recurrence_type: RecurrenceType::from(row.recurrence_type.as_str()),
                interval: row.recurrence_interval,
                weekdays: row
                    .weekdays
                    .iter()
                    .filter_map(|d| RecurrenceWeekday::parse(d))
                    .collect(),
                month_day: row.month_day,
                end_date: row.end_date,
                max_instances: row.max_instances,
            },
            start_date: row.start_date,
            is_active: row.is_active,
            last_generated_date: row.last_generated_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurringTaskCreate {
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub category: Option<String>,
    pub estimated_duration: Option<i32>,
    pub due_time: Option<String>,
    pub recurrence_pattern: RecurrencePattern,
    /// Defaults to today (UTC)
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurringTaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub estimated_duration: Option<i32>,
    pub due_time: Option<String>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub is_active: Option<bool>,
}

/// Link between a recurring task and the task it produced for one date.
/// The link outlives the task so a deleted instance is not regenerated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecurringTaskInstance {
    pub id: Uuid,
    pub recurring_task_id: Uuid,
    pub task_id: Option<Uuid>,
    pub user_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurringTaskListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateInstancesQuery {
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub date: NaiveDate,
    pub generated: usize,
    pub task_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pattern(recurrence_type: RecurrenceType) -> RecurrencePattern {
        RecurrencePattern {
            recurrence_type,
            interval: 1,
            weekdays: Vec::new(),
            month_day: None,
            end_date: None,
            max_instances: None,
        }
    }

    #[test]
    fn test_daily_interval_and_bounds() {
        let start = date(2025, 3, 1);
        let mut every_other = pattern(RecurrenceType::Daily);
        every_other.interval = 2;
        every_other.end_date = Some(date(2025, 3, 5));

        assert!(every_other.occurs_on(start, date(2025, 3, 1)));
        assert!(!every_other.occurs_on(start, date(2025, 3, 2)));
        assert!(every_other.occurs_on(start, date(2025, 3, 5)));
        assert!(!every_other.occurs_on(start, date(2025, 3, 7)));
        assert!(!every_other.occurs_on(start, date(2025, 2, 27)));
    }

    #[test]
    fn test_weekly_on_named_days() {
        // 2025-03-03 is a Monday
        let start = date(2025, 3, 3);
        let mut p = pattern(RecurrenceType::Weekly);
        p.weekdays = vec![RecurrenceWeekday::Monday, RecurrenceWeekday::Thursday];

        assert!(p.occurs_on(start, date(2025, 3, 6)));
        assert!(!p.occurs_on(start, date(2025, 3, 7)));

        p.interval = 2;
        assert!(!p.occurs_on(start, date(2025, 3, 10)));
        assert!(p.occurs_on(start, date(2025, 3, 17)));
    }

    #[test]
    fn test_weekly_defaults_to_start_weekday() {
        let start = date(2025, 3, 5);
        let p = pattern(RecurrenceType::Weekly);
        assert!(p.occurs_on(start, date(2025, 3, 12)));
        assert!(!p.occurs_on(start, date(2025, 3, 13)));
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let start = date(2025, 1, 31);
        let mut p = pattern(RecurrenceType::Monthly);
        p.month_day = Some(31);

        assert!(p.occurs_on(start, date(2025, 2, 28)));
        assert!(!p.occurs_on(start, date(2025, 3, 30)));
        assert!(p.occurs_on(start, date(2025, 3, 31)));

        p.interval = 3;
        assert!(!p.occurs_on(start, date(2025, 2, 28)));
        assert!(p.occurs_on(start, date(2025, 4, 30)));
    }

    #[test]
    fn test_custom_every_n_days_on_weekdays() {
        let start = date(2025, 3, 3);
        let mut p = pattern(RecurrenceType::Custom);
        p.interval = 3;
        assert!(p.occurs_on(start, date(2025, 3, 9)));

        p.weekdays = vec![RecurrenceWeekday::Monday];
        // Day 6 is a Sunday, day 21 a Monday
        assert!(!p.occurs_on(start, date(2025, 3, 9)));
        assert!(p.occurs_on(start, date(2025, 3, 24)));
    }

    #[test]
    fn test_pattern_wire_format() {
        let p: RecurrencePattern = serde_json::from_value(serde_json::json!({
            "type": "weekly",
            "weekdays": ["monday", "friday"]
        }))
        .unwrap();
        assert_eq!(p.interval, 1);
        assert_eq!(p.weekdays.len(), 2);

        let bad = serde_json::from_value::<RecurrencePattern>(serde_json::json!({
            "type": "fortnightly"
        }));
        assert!(bad.is_err());
    }
}
