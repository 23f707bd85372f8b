//! GraphQL surface over the same services as the REST handlers.
//!
//! Queries fail with a GraphQL error; mutations never do and report
//! `success: false` with a message instead.

mod mutation;
mod query;
pub mod types;

use async_graphql::{Context, EmptySubscription, Schema};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::context::UserContext;
use crate::error::ApiError;
use crate::services::{
    AuthService, DashboardService, JournalService, PillarService, AreaService, ProjectService,
    TaskService,
};

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type AurumSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Services reachable from resolvers
#[derive(Clone)]
pub struct GraphqlServices {
    pub auth: Arc<AuthService>,
    pub pillars: Arc<PillarService>,
    pub areas: Arc<AreaService>,
    pub projects: Arc<ProjectService>,
    pub tasks: Arc<TaskService>,
    pub journal: Arc<JournalService>,
    pub dashboard: Arc<DashboardService>,
}

pub fn build_schema(services: GraphqlServices) -> AurumSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(services)
        .finish()
}

fn services<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a GraphqlServices> {
    ctx.data::<GraphqlServices>()
}

/// The caller attached per request by the HTTP handler.
fn current_user(ctx: &Context<'_>) -> Result<Uuid, ApiError> {
    ctx.data_opt::<UserContext>()
        .ok_or_else(|| ApiError::authentication("Authentication required"))?
        .require_user_id()
}

fn to_graphql_error(err: ApiError) -> async_graphql::Error {
    async_graphql::Error::new(err.public_message())
}
