use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Conflict error: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unknown error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ApiError {
    /// Create a new validation error
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new not found error
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new internal error
    pub fn internal<T: Into<String>>(msg: T) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a new authentication error
    pub fn authentication<T: Into<String>>(msg: T) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a new authorization error
    pub fn authorization<T: Into<String>>(msg: T) -> Self {
        Self::Authorization(msg.into())
    }

    /// Create a new rate limit error
    pub fn rate_limit<T: Into<String>>(msg: T) -> Self {
        Self::RateLimit(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        Self::Conflict(msg.into())
    }

    /// HTTP status this error renders with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(err) if is_unique_violation(err) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to hand back to a client. Internal details of
    /// database, configuration and serialization failures stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Database(err) if is_unique_violation(err) => {
                "Resource already exists".to_string()
            }
            ApiError::Database(_) => "Database error".to_string(),
            ApiError::Config(_) => "Configuration error".to_string(),
            ApiError::Serialization(_) => "Serialization error".to_string(),
            ApiError::Migration(_) => "Database migration error".to_string(),
            ApiError::Anyhow(_) => "Internal server error".to_string(),
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Configuration(msg)
            | ApiError::Authentication(msg)
            | ApiError::Authorization(msg)
            | ApiError::RateLimit(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Database(err) if is_unique_violation(err) => "CONFLICT_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Config(_) | ApiError::Configuration(_) => "CONFIG_ERROR",
            ApiError::Serialization(_) => "SERIALIZATION_ERROR",
            ApiError::Migration(_) => "MIGRATION_ERROR",
            ApiError::Authentication(_) => "AUTHENTICATION_ERROR",
            ApiError::Authorization(_) => "AUTHORIZATION_ERROR",
            ApiError::RateLimit(_) => "RATE_LIMIT_EXCEEDED",
            ApiError::Conflict(_) => "CONFLICT_ERROR",
            ApiError::Internal(_) | ApiError::Anyhow(_) => "INTERNAL_ERROR",
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status_code();
        let code = self.code();

        match status {
            StatusCode::NOT_FOUND => {
                tracing::info!(error_id = %error_id, error = %self, "resource not found");
            }
            s if s.is_server_error() => {
                tracing::error!(error_id = %error_id, error = %self, code, "request failed");
            }
            _ => {
                tracing::warn!(error_id = %error_id, error = %self, code, "request rejected");
            }
        }

        let body = Json(json!({
            "error": {
                "message": self.public_message(),
                "code": code,
                "error_id": error_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
