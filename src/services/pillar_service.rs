use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        Area, Pillar, PillarCreate, PillarListQuery, PillarUpdate, PillarWithAreas,
        DEFAULT_PILLAR_COLOR, DEFAULT_PILLAR_ICON,
    },
    repositories::{AreaRepository, PillarRepository},
    utils::validation::{validate_color, validate_description, validate_name, validate_percentage},
};

pub struct PillarService {
    pillar_repo: Arc<dyn PillarRepository>,
    area_repo: Arc<dyn AreaRepository>,
}

impl PillarService {
    pub fn new(pillar_repo: Arc<dyn PillarRepository>, area_repo: Arc<dyn AreaRepository>) -> Self {
        Self {
            pillar_repo,
            area_repo,
        }
    }

    pub async fn create(&self, user_id: Uuid, payload: PillarCreate) -> Result<Pillar, ApiError> {
        let now = Utc::now();
        let pillar = Pillar {
            id: Uuid::new_v4(),
            user_id,
            name: validate_name("Pillar name", &payload.name)?,
            description: validate_description(&payload.description)?,
            color: match payload.color.as_deref() {
                Some(c) => validate_color(c)?,
                None => DEFAULT_PILLAR_COLOR.to_string(),
            },
            icon: payload
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PILLAR_ICON.to_string()),
            time_allocation_percentage: validate_percentage(
                "Time allocation",
                payload.time_allocation_percentage,
            )?,
            archived: false,
            sort_order: payload.sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = self.pillar_repo.create(&pillar).await?;
        tracing::info!(user_id = %user_id, pillar_id = %created.id, "Pillar created");
        Ok(created)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: &PillarListQuery,
    ) -> Result<Vec<PillarWithAreas>, ApiError> {
        let pillars = self.pillar_repo.list(user_id, query.include_archived).await?;
        let areas = self
            .area_repo
            .list(user_id, query.include_archived, None)
            .await?;

        let mut by_pillar: HashMap<Uuid, Vec<Area>> = HashMap::new();
        for area in areas {
            if let Some(pillar_id) = area.pillar_id {
                by_pillar.entry(pillar_id).or_default().push(area);
            }
        }

        Ok(pillars
            .into_iter()
            .map(|pillar| {
                let areas = by_pillar.remove(&pillar.id).unwrap_or_default();
                PillarWithAreas {
                    area_count: areas.len(),
                    areas: query.include_areas.then_some(areas),
                    pillar,
                }
            })
            .collect())
    }

    /// A single pillar with its active areas.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<PillarWithAreas, ApiError> {
        let pillar = self.require(user_id, id).await?;
        let areas = self.area_repo.list(user_id, false, Some(id)).await?;
        Ok(PillarWithAreas {
            pillar,
            area_count: areas.len(),
            areas: Some(areas),
        })
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        payload: PillarUpdate,
    ) -> Result<Pillar, ApiError> {
        let mut pillar = self.require(user_id, id).await?;

        if let Some(name) = payload.name.as_deref() {
            pillar.name = validate_name("Pillar name", name)?;
        }
        if let Some(description) = payload.description.as_deref() {
            pillar.description = validate_description(description)?;
        }
        if let Some(color) = payload.color.as_deref() {
            pillar.color = validate_color(color)?;
        }
        if let Some(icon) = payload.icon.filter(|i| !i.trim().is_empty()) {
            pillar.icon = icon;
        }
        if let Some(pct) = payload.time_allocation_percentage {
            pillar.time_allocation_percentage = validate_percentage("Time allocation", pct)?;
        }
        if let Some(archived) = payload.archived {
            pillar.archived = archived;
        }
        if let Some(sort_order) = payload.sort_order {
            pillar.sort_order = sort_order;
        }
        pillar.updated_at = Utc::now();

        self.pillar_repo.update(&pillar).await
    }

    /// Areas under the pillar are kept and unlinked.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.pillar_repo.delete(user_id, id).await? {
            return Err(ApiError::not_found("Pillar not found"));
        }
        tracing::info!(user_id = %user_id, pillar_id = %id, "Pillar deleted");
        Ok(())
    }

    async fn require(&self, user_id: Uuid, id: Uuid) -> Result<Pillar, ApiError> {
        self.pillar_repo
            .get_by_id(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Pillar not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::{
        sample_area, InMemoryAreaRepository, InMemoryPillarRepository,
    };

    fn service() -> (PillarService, Arc<InMemoryAreaRepository>) {
        let areas = Arc::new(InMemoryAreaRepository::default());
        (
            PillarService::new(Arc::new(InMemoryPillarRepository::default()), areas.clone()),
            areas,
        )
    }

    fn create_payload(name: &str) -> PillarCreate {
        PillarCreate {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_sanitizes() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let pillar = service
            .create(
                user,
                PillarCreate {
                    name: "  <b>Health</b>  ".to_string(),
                    color: Some("#abcdef".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(pillar.name, "Health");
        assert_eq!(pillar.color, "#ABCDEF");
        assert_eq!(pillar.icon, DEFAULT_PILLAR_ICON);
        assert!(!pillar.archived);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (service, _) = service();
        let user = Uuid::new_v4();

        let err = service.create(user, create_payload("   ")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = service
            .create(
                user,
                PillarCreate {
                    name: "Work".into(),
                    time_allocation_percentage: 120.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_counts_areas_and_hides_archived() {
        let (service, areas) = service();
        let user = Uuid::new_v4();
        let health = service.create(user, create_payload("Health")).await.unwrap();
        let old = service.create(user, create_payload("Old")).await.unwrap();
        service
            .update(
                user,
                old.id,
                PillarUpdate {
                    archived: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        areas
            .areas
            .lock()
            .unwrap()
            .push(sample_area(user, Some(health.id), "Fitness"));

        let listed = service.list(user, &PillarListQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].area_count, 1);
        assert!(listed[0].areas.is_none());

        let with_areas = service
            .list(
                user,
                &PillarListQuery {
                    include_archived: true,
                    include_areas: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(with_areas.len(), 2);
    }

    #[tokio::test]
    async fn test_other_users_pillar_is_not_found() {
        let (service, _) = service();
        let pillar = service
            .create(Uuid::new_v4(), create_payload("Mine"))
            .await
            .unwrap();

        let err = service.get(Uuid::new_v4(), pillar.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        let err = service.delete(Uuid::new_v4(), pillar.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
