use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, async_graphql::SimpleObject)]
pub struct JournalEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
    pub energy_level: Option<String>,
    pub tags: Vec<String>,
    /// Set when the entry is in the trash
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalEntryCreate {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub mood: Option<String>,
    pub energy_level: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalEntryUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<String>,
    pub energy_level: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalListQuery {
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for JournalListQuery {
    fn default() -> Self {
        Self {
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalListResponse {
    pub entries: Vec<JournalEntry>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}
