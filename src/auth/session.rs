use crate::auth::rbac::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contents of the encrypted `session` cookie. `session_id` is the id of the
/// backing `auth_sessions` row, so a revoked row invalidates the cookie too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
    pub expires_at: DateTime<Utc>,
    pub session_id: Uuid,
}

impl UserSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>) -> UserSession {
        UserSession {
            user_id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            roles: vec![Role::Member],
            expires_at,
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_expiry() {
        assert!(!session(Utc::now() + Duration::hours(1)).is_expired());
        assert!(session(Utc::now() - Duration::seconds(1)).is_expired());
    }

    #[test]
    fn test_cookie_payload_round_trip() {
        let original = session(Utc::now() + Duration::hours(1));
        let json = serde_json::to_string(&original).unwrap();
        let parsed: UserSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, original.session_id);
        assert!(parsed.has_role(Role::Member));
        assert!(!parsed.has_role(Role::Admin));
    }
}
