//! Staff accounts.
//!
//! Staff are the only principals that log in. The role decides the
//! permission set (see `schoolhouse_core::permissions`); system admins are
//! the only staff without a school.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{SchoolId, StaffId};
use crate::text_enum::text_enum;

text_enum!(
    /// Staff role.
    StaffRole {
        SystemAdmin => "system_admin",
        Admin => "admin",
        Teacher => "teacher",
        Nurse => "nurse",
        Counselor => "counselor",
        Cashier => "cashier",
    }
);

impl StaffRole {
    #[must_use]
    pub const fn is_system_admin(&self) -> bool {
        matches!(self, StaffRole::SystemAdmin)
    }
}

/// A staff member as returned by the API (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Staff {
    pub id: StaffId,
    pub school_id: Option<SchoolId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: StaffRole,
    /// Subjects this staff member is certified to teach
    pub certifications: Vec<String>,
    /// Maximum number of sections a teacher may carry (1-8)
    pub max_sections: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    /// Case-insensitive certification check.
    #[must_use]
    pub fn is_certified_for(&self, subject: &str) -> bool {
        self.certifications
            .iter()
            .any(|c| c.eq_ignore_ascii_case(subject))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStaffDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    /// Any role except `system_admin`
    pub role: StaffRole,
    pub certifications: Option<Vec<String>>,
    #[validate(range(min = 1, max = 8))]
    pub max_sections: Option<i32>,
    /// Required for system admins, ignored for school staff
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStaffDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub role: Option<StaffRole>,
    pub certifications: Option<Vec<String>>,
    #[validate(range(min = 1, max = 8))]
    pub max_sections: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StaffFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub role: Option<StaffRole>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub is_active: Option<bool>,
    /// Matches first name, last name or email
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(certifications: &[&str]) -> Staff {
        Staff {
            id: StaffId::new(),
            school_id: Some(SchoolId::new()),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            email: "ada@school.edu".to_string(),
            role: StaffRole::Teacher,
            certifications: certifications.iter().map(|s| s.to_string()).collect(),
            max_sections: 5,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_certification_is_case_insensitive() {
        let teacher = staff(&["Math", "physics"]);
        assert!(teacher.is_certified_for("math"));
        assert!(teacher.is_certified_for("Physics"));
        assert!(!teacher.is_certified_for("art"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("nurse".parse::<StaffRole>().unwrap(), StaffRole::Nurse);
        assert!(StaffRole::SystemAdmin.is_system_admin());
        assert!(!StaffRole::Admin.is_system_admin());
        assert!("principal".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_create_staff_validation() {
        let dto = CreateStaffDto {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@school.edu".to_string(),
            password: "short".to_string(),
            role: StaffRole::Teacher,
            certifications: None,
            max_sections: Some(9),
            school_id: None,
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        assert!(errors.field_errors().contains_key("max_sections"));
    }
}
