use crate::auth::rbac::{Permission, Role};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity attached to every authenticated request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserContext {
    /// Acting user. API key callers name one through `X-User-ID`.
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub is_api_key: bool,
    /// `auth_sessions` row behind a bearer token or cookie.
    pub session_id: Option<Uuid>,
}

impl UserContext {
    pub fn new_user(user_id: Uuid, email: String, roles: Vec<Role>, session_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            email: Some(email),
            roles,
            is_api_key: false,
            session_id: Some(session_id),
        }
    }

    /// API keys act with admin rights.
    pub fn new_api_key(acting_user: Option<Uuid>) -> Self {
        Self {
            user_id: acting_user,
            email: None,
            roles: vec![Role::Admin],
            is_api_key: true,
            session_id: None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.roles.iter().any(|r| r.has_permission(permission))
    }

    /// The user whose data the request touches.
    pub fn require_user_id(&self) -> Result<Uuid, ApiError> {
        self.user_id.ok_or_else(|| {
            ApiError::authentication("A user identity is required for this operation")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_context_is_admin() {
        let ctx = UserContext::new_api_key(None);
        assert!(ctx.is_api_key);
        assert!(ctx.has_permission(&Permission::ViewMetrics));
        assert!(matches!(
            ctx.require_user_id(),
            Err(ApiError::Authentication(_))
        ));
    }

    #[test]
    fn test_user_context() {
        let id = Uuid::new_v4();
        let ctx = UserContext::new_user(id, "a@b.co".into(), vec![Role::Member], Uuid::new_v4());
        assert_eq!(ctx.require_user_id().unwrap(), id);
        assert!(!ctx.has_permission(&Permission::ManageMetrics));
    }
}
