use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use super::{current_user, services, to_graphql_error};
use crate::error::ApiError;
use crate::models::{
    Area, AreaListQuery, Dashboard, JournalEntry, JournalListQuery, Pillar, PillarListQuery,
    Project, ProjectListQuery, Task, TaskFilter, User,
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> Result<User> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        let me = services(ctx)?
            .auth
            .me(user_id)
            .await
            .map_err(to_graphql_error)?;
        Ok(me.user)
    }

    /// Pillars whose archived flag equals `archived`.
    async fn pillars(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = false)] archived: bool,
    ) -> Result<Vec<Pillar>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        let query = PillarListQuery {
            include_archived: archived,
            include_areas: false,
        };
        let pillars = services(ctx)?
            .pillars
            .list(user_id, &query)
            .await
            .map_err(to_graphql_error)?;
        Ok(pillars
            .into_iter()
            .map(|p| p.pillar)
            .filter(|p| p.archived == archived)
            .collect())
    }

    async fn areas(&self, ctx: &Context<'_>, pillar_id: Option<Uuid>) -> Result<Vec<Area>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        let query = AreaListQuery {
            pillar_id,
            ..Default::default()
        };
        let areas = services(ctx)?
            .areas
            .list(user_id, &query)
            .await
            .map_err(to_graphql_error)?;
        Ok(areas.into_iter().map(|a| a.area).collect())
    }

    async fn projects(&self, ctx: &Context<'_>, area_id: Option<Uuid>) -> Result<Vec<Project>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        let query = ProjectListQuery {
            area_id,
            ..Default::default()
        };
        let projects = services(ctx)?
            .projects
            .list(user_id, &query)
            .await
            .map_err(to_graphql_error)?;
        Ok(projects.into_iter().map(|p| p.project).collect())
    }

    async fn tasks(
        &self,
        ctx: &Context<'_>,
        project_id: Option<Uuid>,
        completed: Option<bool>,
    ) -> Result<Vec<Task>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        let filter = TaskFilter {
            project_id,
            completed,
            ..Default::default()
        };
        services(ctx)?
            .tasks
            .list(user_id, &filter)
            .await
            .map_err(to_graphql_error)
    }

    async fn task(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Task>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        match services(ctx)?.tasks.get(user_id, id).await {
            Ok(task) => Ok(Some(task)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(to_graphql_error(e)),
        }
    }

    async fn project(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Project>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        services(ctx)?
            .projects
            .find(user_id, id)
            .await
            .map_err(to_graphql_error)
    }

    /// Newest first, trashed entries excluded.
    async fn journal_entries(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] limit: i64,
        #[graphql(default = 0)] offset: i64,
    ) -> Result<Vec<JournalEntry>> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        let query = JournalListQuery {
            search: None,
            limit,
            offset,
        };
        let page = services(ctx)?
            .journal
            .list(user_id, &query)
            .await
            .map_err(to_graphql_error)?;
        Ok(page.entries)
    }

    async fn dashboard(&self, ctx: &Context<'_>) -> Result<Dashboard> {
        let user_id = current_user(ctx).map_err(to_graphql_error)?;
        services(ctx)?
            .dashboard
            .dashboard(user_id)
            .await
            .map_err(to_graphql_error)
    }
}
