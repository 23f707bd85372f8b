use crate::auth::context::UserContext;
use crate::auth::rbac::Role;
use crate::auth::session::UserSession;
use crate::config::Settings;
use crate::error::ApiError;
use crate::models::{CurrentUser, LoginRequest, LoginResponse, ProfileUpdate, RegisterRequest, User};
use crate::repositories::{UserChanges, UserRepository};
use crate::utils::crypto::{generate_session_token, hash_password, hash_session_token, verify_password};
use crate::utils::validation::{validate_email, validate_name, validate_password};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const MAX_TIMEZONE_LEN: usize = 64;

/// Blank optional names are stored as absent.
fn optional_name(field: &str, name: Option<&str>) -> Result<Option<String>, ApiError> {
    match name.map(str::trim) {
        None | Some("") => Ok(None),
        Some(n) => validate_name(field, n).map(Some),
    }
}

pub struct AuthService {
    settings: Arc<Settings>,
    user_repo: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(settings: Arc<Settings>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            settings,
            user_repo,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, ApiError> {
        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;

        let username = request
            .username
            .as_deref()
            .map(|u| validate_name("Username", u))
            .transpose()?;
        let first_name = optional_name("First name", request.first_name.as_deref())?;
        let last_name = optional_name("Last name", request.last_name.as_deref())?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("Email already registered"));
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .user_repo
            .create_user(
                &email,
                &password_hash,
                username.as_deref(),
                first_name.as_deref(),
                last_name.as_deref(),
            )
            .await?;

        self.user_repo
            .add_user_role(user.id, Role::Member, None)
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verifies credentials and opens a login session. The returned
    /// [`UserSession`] is what goes into the encrypted cookie.
    pub async fn login(
        &self,
        request: LoginRequest,
        user_agent: Option<&str>,
    ) -> Result<(LoginResponse, UserSession), ApiError> {
        let email = request.email.trim().to_lowercase();
        let user = match self.user_repo.find_by_email(&email).await? {
            Some(u) if u.is_active => u,
            _ => return Err(ApiError::authentication(INVALID_CREDENTIALS)),
        };

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "failed login attempt");
            return Err(ApiError::authentication(INVALID_CREDENTIALS));
        }

        self.user_repo.update_last_login(user.id).await?;
        let roles = self.user_repo.get_user_roles(user.id).await?;

        let token = generate_session_token();
        let expires_at = Utc::now() + Duration::seconds(self.settings.auth_session_expiry_seconds);
        let session = self
            .user_repo
            .create_session(user.id, &hash_session_token(&token), user_agent, expires_at)
            .await?;

        let cookie_session = UserSession {
            user_id: user.id,
            email: user.email.clone(),
            roles,
            expires_at,
            session_id: session.id,
        };

        tracing::info!(user_id = %user.id, session_id = %session.id, "user logged in");

        Ok((
            LoginResponse {
                access_token: token,
                token_type: "bearer",
                expires_at,
                user,
            },
            cookie_session,
        ))
    }

    /// Resolves a bearer token to the identity behind it.
    pub async fn authenticate_token(&self, token: &str) -> Result<UserContext, ApiError> {
        let session = self
            .user_repo
            .find_session_by_token_hash(&hash_session_token(token))
            .await?
            .filter(|s| s.is_active())
            .ok_or_else(|| ApiError::authentication("Invalid or expired token"))?;

        self.context_for(session.user_id, session.id).await
    }

    /// Checks a cookie session against its backing row.
    pub async fn validate_session(&self, cookie: &UserSession) -> Result<UserContext, ApiError> {
        if cookie.is_expired() {
            return Err(ApiError::authentication("Session expired"));
        }

        let session = self
            .user_repo
            .find_session_by_id(cookie.session_id)
            .await?
            .filter(|s| s.is_active() && s.user_id == cookie.user_id)
            .ok_or_else(|| ApiError::authentication("Session expired"))?;

        self.context_for(session.user_id, session.id).await
    }

    async fn context_for(&self, user_id: Uuid, session_id: Uuid) -> Result<UserContext, ApiError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::authentication("Account is not active"))?;
        let roles = self.user_repo.get_user_roles(user.id).await?;

        Ok(UserContext::new_user(user.id, user.email, roles, session_id))
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), ApiError> {
        self.user_repo.revoke_session(session_id).await
    }

    pub async fn me(&self, user_id: Uuid) -> Result<CurrentUser, ApiError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let profile = self.user_repo.get_profile(user_id).await?;
        let roles = self.user_repo.get_user_roles(user_id).await?;

        Ok(CurrentUser {
            user,
            profile,
            roles,
        })
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<CurrentUser, ApiError> {
        let username = update
            .username
            .as_deref()
            .map(|u| validate_name("Username", u))
            .transpose()?;
        let first_name = update
            .first_name
            .as_deref()
            .map(|n| validate_name("First name", n))
            .transpose()?;
        let last_name = update
            .last_name
            .as_deref()
            .map(|n| validate_name("Last name", n))
            .transpose()?;
        let timezone = update
            .timezone
            .as_deref()
            .map(str::trim)
            .map(|tz| {
                if tz.is_empty() || tz.len() > MAX_TIMEZONE_LEN {
                    Err(ApiError::validation("Timezone must be 1-64 characters"))
                } else {
                    Ok(tz)
                }
            })
            .transpose()?;

        self.user_repo
            .update_user(
                user_id,
                UserChanges {
                    username: username.as_deref(),
                    first_name: first_name.as_deref(),
                    last_name: last_name.as_deref(),
                },
            )
            .await?;

        if let Some(timezone) = timezone {
            self.user_repo.update_timezone(user_id, timezone).await?;
        }

        self.me(user_id).await
    }

    /// Deletes the account; owned rows follow through cascading foreign keys.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        self.user_repo.delete_user(user_id).await?;
        tracing::info!(user_id = %user_id, "account deleted");
        Ok(())
    }
}
