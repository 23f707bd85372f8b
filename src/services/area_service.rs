use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        Area, AreaCreate, AreaListQuery, AreaUpdate, AreaWithProjects, Project, DEFAULT_AREA_COLOR,
        DEFAULT_AREA_ICON,
    },
    repositories::{AreaRepository, PillarRepository, ProjectRepository},
    utils::validation::{validate_color, validate_description, validate_importance, validate_name},
};

pub struct AreaService {
    area_repo: Arc<dyn AreaRepository>,
    pillar_repo: Arc<dyn PillarRepository>,
    project_repo: Arc<dyn ProjectRepository>,
}

impl AreaService {
    pub fn new(
        area_repo: Arc<dyn AreaRepository>,
        pillar_repo: Arc<dyn PillarRepository>,
        project_repo: Arc<dyn ProjectRepository>,
    ) -> Self {
        Self {
            area_repo,
            pillar_repo,
            project_repo,
        }
    }

    async fn ensure_pillar(&self, user_id: Uuid, pillar_id: Uuid) -> Result<(), ApiError> {
        match self.pillar_repo.get_by_id(user_id, pillar_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("Pillar not found")),
        }
    }

    pub async fn create(&self, user_id: Uuid, payload: AreaCreate) -> Result<Area, ApiError> {
        if let Some(pillar_id) = payload.pillar_id {
            self.ensure_pillar(user_id, pillar_id).await?;
        }

        let now = Utc::now();
        let area = Area {
            id: Uuid::new_v4(),
            user_id,
            pillar_id: payload.pillar_id,
            name: validate_name("Area name", &payload.name)?,
            description: validate_description(&payload.description)?,
            color: match payload.color.as_deref() {
                Some(c) => validate_color(c)?,
                None => DEFAULT_AREA_COLOR.to_string(),
            },
            icon: payload
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AREA_ICON.to_string()),
            importance: validate_importance(payload.importance)?,
            archived: false,
            sort_order: payload.sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = self.area_repo.create(&area).await?;
        tracing::info!(user_id = %user_id, area_id = %created.id, "Area created");
        Ok(created)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: &AreaListQuery,
    ) -> Result<Vec<AreaWithProjects>, ApiError> {
        let areas = self
            .area_repo
            .list(user_id, query.include_archived, query.pillar_id)
            .await?;
        let projects = self
            .project_repo
            .list(user_id, query.include_archived, None, None)
            .await?;

        let mut by_area: HashMap<Uuid, Vec<Project>> = HashMap::new();
        for project in projects {
            if let Some(area_id) = project.area_id {
                by_area.entry(area_id).or_default().push(project);
            }
        }

        Ok(areas
            .into_iter()
            .map(|area| {
                let projects = by_area.remove(&area.id).unwrap_or_default();
                AreaWithProjects {
                    project_count: projects.len(),
                    projects: query.include_projects.then_some(projects),
                    area,
                }
            })
            .collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<AreaWithProjects, ApiError> {
        let area = self.require(user_id, id).await?;
        let projects = self.project_repo.list(user_id, false, Some(id), None).await?;
        Ok(AreaWithProjects {
            area,
            project_count: projects.len(),
            projects: Some(projects),
        })
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, payload: AreaUpdate) -> Result<Area, ApiError> {
        let mut area = self.require(user_id, id).await?;

        if payload.clear_pillar {
            area.pillar_id = None;
        } else if let Some(pillar_id) = payload.pillar_id {
            self.ensure_pillar(user_id, pillar_id).await?;
            area.pillar_id = Some(pillar_id);
        }
        if let Some(name) = payload.name.as_deref() {
            area.name = validate_name("Area name", name)?;
        }
        if let Some(description) = payload.description.as_deref() {
            area.description = validate_description(description)?;
        }
        if let Some(color) = payload.color.as_deref() {
            area.color = validate_color(color)?;
        }
        if let Some(icon) = payload.icon.filter(|i| !i.trim().is_empty()) {
            area.icon = icon;
        }
        if let Some(importance) = payload.importance {
            area.importance = validate_importance(importance)?;
        }
        if let Some(archived) = payload.archived {
            area.archived = archived;
        }
        if let Some(sort_order) = payload.sort_order {
            area.sort_order = sort_order;
        }
        area.updated_at = Utc::now();

        self.area_repo.update(&area).await
    }

    /// Projects in the area are kept and unlinked.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.area_repo.delete(user_id, id).await? {
            return Err(ApiError::not_found("Area not found"));
        }
        tracing::info!(user_id = %user_id, area_id = %id, "Area deleted");
        Ok(())
    }

    async fn require(&self, user_id: Uuid, id: Uuid) -> Result<Area, ApiError> {
        self.area_repo
            .get_by_id(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Area not found"))
    }
}
