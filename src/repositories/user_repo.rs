use crate::auth::rbac::Role;
use crate::database::DatabasePool;
use crate::error::ApiError;
use crate::models::{AuthSession, User, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, username, first_name, last_name, is_active, \
    last_login_at, created_at, updated_at";

const PROFILE_COLUMNS: &str = "user_id, timezone, monthly_alignment_goal, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, token_hash, user_agent, expires_at, revoked_at, created_at";

/// Fields of a user account that may be changed after registration.
#[derive(Debug, Clone, Default)]
pub struct UserChanges<'a> {
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, ApiError>;
    async fn update_user(&self, user_id: Uuid, changes: UserChanges<'_>) -> Result<User, ApiError>;
    async fn update_last_login(&self, user_id: Uuid) -> Result<(), ApiError>;
    async fn delete_user(&self, user_id: Uuid) -> Result<(), ApiError>;

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, ApiError>;
    async fn add_user_role(
        &self,
        user_id: Uuid,
        role: Role,
        assigned_by: Option<Uuid>,
    ) -> Result<(), ApiError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ApiError>;
    /// Creates the profile row if missing and returns it.
    async fn ensure_profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError>;
    async fn update_timezone(&self, user_id: Uuid, timezone: &str) -> Result<UserProfile, ApiError>;

    // Login sessions
    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<AuthSession, ApiError>;
    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, ApiError>;
    async fn find_session_by_id(&self, id: Uuid) -> Result<Option<AuthSession>, ApiError>;
    async fn revoke_session(&self, id: Uuid) -> Result<(), ApiError>;
}

pub struct SqlxUserRepository {
    pool: DatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User, ApiError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash, username, first_name, last_name, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(password_hash)
            .bind(username)
            .bind(first_name)
            .bind(last_name)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges<'_>) -> Result<User, ApiError> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(changes.username)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn update_last_login(&self, user_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>, ApiError> {
        let roles: Vec<String> =
            sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(roles.iter().filter_map(|r| Role::parse(r)).collect())
    }

    async fn add_user_role(
        &self,
        user_id: Uuid,
        role: Role,
        assigned_by: Option<Uuid>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role, assigned_by) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(assigned_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ApiError> {
        let sql = format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn ensure_profile(&self, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO user_profiles (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn update_timezone(&self, user_id: Uuid, timezone: &str) -> Result<UserProfile, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO user_profiles (user_id, timezone) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET timezone = EXCLUDED.timezone, updated_at = NOW()
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(user_id)
            .bind(timezone)
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<AuthSession, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO auth_sessions (id, user_id, token_hash, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AuthSession>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(token_hash)
            .bind(user_agent)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(session)
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, ApiError> {
        let sql = format!(
            "SELECT {} FROM auth_sessions WHERE token_hash = $1",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AuthSession>(&sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn find_session_by_id(&self, id: Uuid) -> Result<Option<AuthSession>, ApiError> {
        let sql = format!("SELECT {} FROM auth_sessions WHERE id = $1", SESSION_COLUMNS);
        let session = sqlx::query_as::<_, AuthSession>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn revoke_session(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE auth_sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
