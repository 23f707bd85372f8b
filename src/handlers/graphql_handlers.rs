use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::{auth::context::UserContext, AppState};

/// Executes a GraphQL request as the authenticated caller.
pub async fn graphql_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let response = app_state.graphql_schema.execute(request.data(user)).await;
    if response.is_err() {
        tracing::debug!(errors = ?response.errors, "GraphQL request returned errors");
    }
    Json(response)
}
