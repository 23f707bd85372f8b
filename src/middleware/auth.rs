use crate::auth::context::UserContext;
use crate::auth::session::UserSession;
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use uuid::Uuid;

/// Name of the encrypted cookie holding a [`UserSession`]
pub const SESSION_COOKIE: &str = "session";

/// Header naming the user an API key acts for
pub const ACTING_USER_HEADER: &str = "X-User-ID";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn acting_user(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(ACTING_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// Authenticates the request and attaches a [`UserContext`].
///
/// Checked in order: configured API key, `Authorization: Bearer` token,
/// encrypted session cookie.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let settings = &state.config;

    // 1. API key (service-to-service or CLI)
    if !settings.api_keys.is_empty() {
        let api_key = headers
            .get(settings.api_key_header.as_str())
            .and_then(|value| value.to_str().ok());

        if let Some(key) = api_key {
            if settings.api_keys.iter().any(|k| k == key) {
                let context = UserContext::new_api_key(acting_user(&headers));
                request.extensions_mut().insert(context);
                return Ok(next.run(request).await);
            }
            tracing::warn!("Rejected request with unknown API key");
            return Err(ApiError::authentication("Invalid API key"));
        }
    }

    // 2. Bearer token
    if let Some(token) = bearer_token(&headers) {
        let context = state.auth_service.authenticate_token(token).await?;
        request.extensions_mut().insert(context);
        return Ok(next.run(request).await);
    }

    // 3. Session cookie (browser)
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(session) = serde_json::from_str::<UserSession>(cookie.value()) {
            let context = state.auth_service.validate_session(&session).await?;
            request.extensions_mut().insert(context);
            return Ok(next.run(request).await);
        }
        tracing::debug!("Ignoring malformed session cookie");
    }

    Err(ApiError::authentication("Authentication required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, "Basic Zm9vOmJhcg==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer   ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_acting_user_header() {
        let mut headers = HeaderMap::new();
        let id = Uuid::new_v4();
        headers.insert(ACTING_USER_HEADER, id.to_string().parse().unwrap());
        assert_eq!(acting_user(&headers), Some(id));

        headers.insert(ACTING_USER_HEADER, "not-a-uuid".parse().unwrap());
        assert_eq!(acting_user(&headers), None);
    }
}
