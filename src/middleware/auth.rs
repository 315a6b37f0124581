use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use schoolhouse_auth::{Claims, verify_token};
use schoolhouse_core::AppError;
use schoolhouse_models::ids::{SchoolId, StaffId};
use schoolhouse_models::staff::StaffRole;

use crate::state::AppState;

/// Extractor that verifies the bearer token and exposes its claims.
/// Claims carry the role, permission list and school scope, so no database
/// lookup happens here.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.permissions.iter().any(|p| p == permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    pub fn is_system_admin(&self) -> bool {
        self.0.role == StaffRole::SystemAdmin.as_str()
    }

    /// The caller's school; `None` for system admins.
    pub fn school_id(&self) -> Option<SchoolId> {
        self.0.school_id.map(SchoolId::from)
    }

    pub fn staff_id(&self) -> Result<StaffId, AppError> {
        self.0
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid staff ID in token"))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn role(&self) -> &str {
        &self.0.role
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that authenticates the caller and then requires a
/// single permission.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = schoolhouse_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !auth_user.has_permission($permission) {
                    tracing::warn!(
                        staff.role = %auth_user.role(),
                        permission = %$permission,
                        "Permission denied"
                    );
                    return Err(schoolhouse_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

use schoolhouse_core::permissions as perm;

require_permission!(RequireSchoolsManage, perm::SCHOOLS_MANAGE);

require_permission!(RequireStaffRead, perm::STAFF_READ);
require_permission!(RequireStaffWrite, perm::STAFF_WRITE);
require_permission!(RequireStudentsRead, perm::STUDENTS_READ);
require_permission!(RequireStudentsWrite, perm::STUDENTS_WRITE);

require_permission!(RequireAcademicYearsRead, perm::ACADEMIC_YEARS_READ);
require_permission!(RequireAcademicYearsWrite, perm::ACADEMIC_YEARS_WRITE);
require_permission!(RequireSchedulingRead, perm::SCHEDULING_READ);
require_permission!(RequireSchedulingWrite, perm::SCHEDULING_WRITE);
require_permission!(RequireGradebookRead, perm::GRADEBOOK_READ);
require_permission!(RequireGradebookWrite, perm::GRADEBOOK_WRITE);
require_permission!(RequireAttendanceRead, perm::ATTENDANCE_READ);
require_permission!(RequireAttendanceWrite, perm::ATTENDANCE_WRITE);
require_permission!(RequireGiftedRead, perm::GIFTED_READ);
require_permission!(RequireGiftedWrite, perm::GIFTED_WRITE);

require_permission!(RequireBehaviorRead, perm::BEHAVIOR_READ);
require_permission!(RequireBehaviorWrite, perm::BEHAVIOR_WRITE);
require_permission!(RequireHealthRead, perm::HEALTH_READ);
require_permission!(RequireHealthWrite, perm::HEALTH_WRITE);
require_permission!(RequireImmunizationsRead, perm::IMMUNIZATIONS_READ);
require_permission!(RequireImmunizationsWrite, perm::IMMUNIZATIONS_WRITE);

require_permission!(RequireFeesRead, perm::FEES_READ);
require_permission!(RequireFeesWrite, perm::FEES_WRITE);
require_permission!(RequireCafeteriaRead, perm::CAFETERIA_READ);
require_permission!(RequireCafeteriaWrite, perm::CAFETERIA_WRITE);

require_permission!(RequireReportsView, perm::REPORTS_VIEW);
