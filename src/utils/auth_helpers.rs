use schoolhouse_core::AppError;
use schoolhouse_models::ids::SchoolId;

use crate::middleware::auth::AuthUser;

/// School for operations that create or list school-owned data.
///
/// Staff always act on their own school and any `school_id` they pass is
/// ignored. System admins have no school and must name one.
pub fn scoped_school_id(
    auth_user: &AuthUser,
    specified_school_id: Option<SchoolId>,
) -> Result<SchoolId, AppError> {
    if let Some(school_id) = auth_user.school_id() {
        return Ok(school_id);
    }

    if auth_user.is_system_admin() {
        return specified_school_id.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "System admin must specify school_id for this operation"
            ))
        });
    }

    Err(AppError::forbidden("Staff member is not assigned to a school"))
}

/// Scope for operations on an existing resource by id.
/// `None` (system admin) means any school; otherwise rows outside the
/// caller's school are treated as missing.
pub fn resource_scope(auth_user: &AuthUser) -> Option<SchoolId> {
    if auth_user.is_system_admin() {
        None
    } else {
        auth_user.school_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use schoolhouse_auth::Claims;
    use uuid::Uuid;

    fn user(role: &str, school_id: Option<Uuid>) -> AuthUser {
        AuthUser(Claims {
            sub: Uuid::new_v4().to_string(),
            email: "x@school.edu".to_string(),
            school_id,
            role: role.to_string(),
            permissions: vec![],
            exp: 9999999999,
            iat: 1,
        })
    }

    #[test]
    fn test_staff_ignore_specified_school() {
        let own = Uuid::new_v4();
        let other = SchoolId::new();
        let admin = user("admin", Some(own));

        let scoped = scoped_school_id(&admin, Some(other)).unwrap();
        assert_eq!(scoped, SchoolId::from(own));
        assert_eq!(resource_scope(&admin), Some(SchoolId::from(own)));
    }

    #[test]
    fn test_system_admin_must_specify_school() {
        let sysadmin = user("system_admin", None);

        let err = scoped_school_id(&sysadmin, None).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let school = SchoolId::new();
        assert_eq!(scoped_school_id(&sysadmin, Some(school)).unwrap(), school);
        assert_eq!(resource_scope(&sysadmin), None);
    }
}
