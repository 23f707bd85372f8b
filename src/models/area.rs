use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::project::Project;

pub const DEFAULT_AREA_COLOR: &str = "#10B981";
pub const DEFAULT_AREA_ICON: &str = "Circle";

/// Focus area, optionally attached to a pillar
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, async_graphql::SimpleObject)]
pub struct Area {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pillar_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    /// 1 (low) to 5 (critical)
    pub importance: i32,
    pub archived: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating an area
#[derive(Debug, Clone, Deserialize)]
pub struct AreaCreate {
    pub pillar_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(default = "default_importance")]
    pub importance: i32,
    #[serde(default)]
    pub sort_order: i32,
}

pub(crate) fn default_importance() -> i32 {
    3
}

/// Request payload for updating an area
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaUpdate {
    pub pillar_id: Option<Uuid>,
    /// Set to true to detach the area from its pillar
    #[serde(default)]
    pub clear_pillar: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub importance: Option<i32>,
    pub archived: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Area with its project count and, on request, the projects themselves
#[derive(Debug, Clone, Serialize)]
pub struct AreaWithProjects {
    #[serde(flatten)]
    pub area: Area,
    pub project_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaListQuery {
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default)]
    pub include_projects: bool,
    pub pillar_id: Option<Uuid>,
}
