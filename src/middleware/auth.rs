use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::community::models::Role;
use crate::error::{AppError, AppResult};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Acting user, taken from trusted gateway headers. Token verification
/// happens upstream; this service only consumes the resulting identity.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }

    pub fn require_super_admin(&self) -> AppResult<()> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Super administrator role required".to_string(),
            ))
        }
    }

    /// Residents may only read their own records; admins see everything.
    pub fn can_view_user(&self, user_id: Uuid) -> bool {
        self.is_admin() || self.user_id == user_id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(AppError::Unauthorized)?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthContext { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!(Role::parse("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("resident"), Some(Role::Resident));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn admin_gates() {
        let admin = AuthContext {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_super_admin().is_err());

        let resident = AuthContext {
            user_id: Uuid::new_v4(),
            role: Role::Resident,
        };
        assert!(resident.require_admin().is_err());
        assert!(resident.can_view_user(resident.user_id));
        assert!(!resident.can_view_user(Uuid::new_v4()));
    }
}
