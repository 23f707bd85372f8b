use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use super::types::{
    CreateJournalEntryInput, CreateProjectInput, CreateTaskInput, JournalMutationResponse,
    ProjectMutationResponse, TaskMutationResponse, UpdateProjectInput, UpdateTaskInput,
};
use super::{current_user, services, GraphqlServices};
use crate::error::ApiError;

/// `(success, message, payload)` for a service result.
fn outcome<T>(result: Result<T, ApiError>, ok_message: &str) -> (bool, String, Option<T>) {
    match result {
        Ok(value) => (true, ok_message.to_string(), Some(value)),
        Err(e) => {
            tracing::debug!(error = %e, "GraphQL mutation failed");
            (false, e.public_message(), None)
        }
    }
}

fn task_response(result: Result<crate::models::Task, ApiError>, ok_message: &str) -> TaskMutationResponse {
    let (success, message, task) = outcome(result, ok_message);
    TaskMutationResponse {
        success,
        message,
        task,
    }
}

fn project_response(
    result: Result<crate::models::Project, ApiError>,
    ok_message: &str,
) -> ProjectMutationResponse {
    let (success, message, project) = outcome(result, ok_message);
    ProjectMutationResponse {
        success,
        message,
        project,
    }
}

pub struct MutationRoot;

impl MutationRoot {
    async fn toggle(
        services: &GraphqlServices,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<crate::models::Task, ApiError> {
        let task = services.tasks.get(user_id, id).await?;
        services.tasks.set_completion(user_id, id, !task.completed).await
    }
}

#[Object]
impl MutationRoot {
    async fn create_task(&self, ctx: &Context<'_>, input: CreateTaskInput) -> Result<TaskMutationResponse> {
        let services = services(ctx)?;
        let result = match current_user(ctx) {
            Ok(user_id) => services.tasks.create(user_id, input.into()).await,
            Err(e) => Err(e),
        };
        Ok(task_response(result, "Task created successfully"))
    }

    async fn update_task(&self, ctx: &Context<'_>, input: UpdateTaskInput) -> Result<TaskMutationResponse> {
        let services = services(ctx)?;
        let id = input.id;
        let result = match current_user(ctx) {
            Ok(user_id) => services.tasks.update(user_id, id, input.into()).await,
            Err(e) => Err(e),
        };
        Ok(task_response(result, "Task updated successfully"))
    }

    async fn delete_task(&self, ctx: &Context<'_>, id: Uuid) -> Result<TaskMutationResponse> {
        let services = services(ctx)?;
        let result = match current_user(ctx) {
            Ok(user_id) => services.tasks.delete(user_id, id).await,
            Err(e) => Err(e),
        };
        let (success, message, _) = outcome(result, "Task deleted successfully");
        Ok(TaskMutationResponse {
            success,
            message,
            task: None,
        })
    }

    /// Flips completion; completing records alignment points.
    async fn toggle_task_completion(&self, ctx: &Context<'_>, id: Uuid) -> Result<TaskMutationResponse> {
        let services = services(ctx)?;
        let result = match current_user(ctx) {
            Ok(user_id) => Self::toggle(services, user_id, id).await,
            Err(e) => Err(e),
        };
        let message = match &result {
            Ok(task) if task.completed => "Task completed successfully",
            _ => "Task reopened successfully",
        };
        Ok(task_response(result, message))
    }

    async fn create_project(&self, ctx: &Context<'_>, input: CreateProjectInput) -> Result<ProjectMutationResponse> {
        let services = services(ctx)?;
        let result = match current_user(ctx) {
            Ok(user_id) => services.projects.create(user_id, input.into()).await,
            Err(e) => Err(e),
        };
        Ok(project_response(result, "Project created successfully"))
    }

    async fn update_project(&self, ctx: &Context<'_>, input: UpdateProjectInput) -> Result<ProjectMutationResponse> {
        let services = services(ctx)?;
        let id = input.id;
        let result = match current_user(ctx) {
            Ok(user_id) => services.projects.update(user_id, id, input.into()).await,
            Err(e) => Err(e),
        };
        Ok(project_response(result, "Project updated successfully"))
    }

    async fn create_journal_entry(
        &self,
        ctx: &Context<'_>,
        input: CreateJournalEntryInput,
    ) -> Result<JournalMutationResponse> {
        let services = services(ctx)?;
        let result = match current_user(ctx) {
            Ok(user_id) => services.journal.create(user_id, input.into()).await,
            Err(e) => Err(e),
        };
        let (success, message, entry) = outcome(result, "Journal entry created successfully");
        Ok(JournalMutationResponse {
            success,
            message,
            entry,
        })
    }
}
