use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use serde_json::{json, Value};

use crate::{
    auth::context::UserContext,
    error::ApiError,
    middleware::auth::SESSION_COOKIE,
    models::{CurrentUser, LoginRequest, LoginResponse, ProfileUpdate, RegisterRequest, User},
    AppState,
};

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn remove_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.auth_service.register(request).await?;
    Ok(Json(user))
}

/// Returns the bearer token and also sets the encrypted session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(PrivateCookieJar, Json<LoginResponse>), ApiError> {
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let (response, session) = state.auth_service.login(request, user_agent).await?;

    let session_str = serde_json::to_string(&session).map_err(ApiError::Serialization)?;
    let jar = jar.add(session_cookie(session_str, state.config.is_production()));

    Ok((jar, Json(response)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<Value>), ApiError> {
    if let Some(session_id) = user.session_id {
        state.auth_service.logout(session_id).await?;
    }
    Ok((
        remove_session_cookie(jar),
        Json(json!({ "message": "Logged out" })),
    ))
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<CurrentUser>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(state.auth_service.me(user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<CurrentUser>, ApiError> {
    let user_id = user.require_user_id()?;
    Ok(Json(state.auth_service.update_profile(user_id, update).await?))
}

/// Deletes the caller's account; owned rows cascade.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<Value>), ApiError> {
    let user_id = user.require_user_id()?;
    state.auth_service.delete_account(user_id).await?;
    Ok((
        remove_session_cookie(jar),
        Json(json!({ "message": "Account deleted successfully" })),
    ))
}
