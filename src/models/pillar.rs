use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::area::Area;

pub const DEFAULT_PILLAR_COLOR: &str = "#3B82F6";
pub const DEFAULT_PILLAR_ICON: &str = "Target";

/// Top-level life domain grouping areas
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, async_graphql::SimpleObject)]
pub struct Pillar {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub time_allocation_percentage: f64,
    pub archived: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a pillar
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PillarCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub time_allocation_percentage: f64,
    #[serde(default)]
    pub sort_order: i32,
}

/// Request payload for updating a pillar
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PillarUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub time_allocation_percentage: Option<f64>,
    pub archived: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Pillar with its area count and, on request, the areas themselves
#[derive(Debug, Clone, Serialize)]
pub struct PillarWithAreas {
    #[serde(flatten)]
    pub pillar: Pillar,
    pub area_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<Area>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PillarListQuery {
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default)]
    pub include_areas: bool,
}
