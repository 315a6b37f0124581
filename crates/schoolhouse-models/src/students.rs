//! Student records, enrollment status and grade promotion.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{SchoolId, StudentId};
use crate::text_enum::text_enum;

/// Highest grade level; students promoted out of it graduate.
pub const FINAL_GRADE: i32 = 12;

text_enum!(
    /// Enrollment status of a student.
    StudentStatus {
        Active => "active",
        Withdrawn => "withdrawn",
        Graduated => "graduated",
    }
);

impl StudentStatus {
    /// `active -> withdrawn | graduated`, `withdrawn -> active`.
    /// `graduated` is terminal.
    #[must_use]
    pub fn can_transition_to(self, next: StudentStatus) -> bool {
        use StudentStatus::*;
        matches!(
            (self, next),
            (Active, Withdrawn) | (Active, Graduated) | (Withdrawn, Active)
        )
    }
}

/// What happens to an active student at year-end promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    NextGrade(i32),
    Graduate,
}

#[must_use]
pub fn promotion_for(grade_level: i32) -> Promotion {
    if grade_level >= FINAL_GRADE {
        Promotion::Graduate
    } else {
        Promotion::NextGrade(grade_level + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub school_id: SchoolId,
    /// School-assigned identifier, unique per school
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// 0 (kindergarten) through 12
    pub grade_level: i32,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 32))]
    pub student_number: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(range(min = 0, max = 12))]
    pub grade_level: i32,
    /// Required for system admins, ignored for school staff
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 32))]
    pub student_number: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(range(min = 0, max = 12))]
    pub grade_level: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeStudentStatusDto {
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub grade_level: Option<i32>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub status: Option<StudentStatus>,
    /// Matches first name, last name or student number
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PromoteStudentsDto {
    /// Required for system admins
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromotionResult {
    pub promoted: u64,
    pub graduated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use StudentStatus::*;
        assert!(Active.can_transition_to(Withdrawn));
        assert!(Active.can_transition_to(Graduated));
        assert!(Withdrawn.can_transition_to(Active));
    }

    #[test]
    fn test_rejected_transitions() {
        use StudentStatus::*;
        assert!(!Graduated.can_transition_to(Active));
        assert!(!Graduated.can_transition_to(Withdrawn));
        assert!(!Withdrawn.can_transition_to(Graduated));
        for status in StudentStatus::ALL {
            assert!(!status.can_transition_to(*status));
        }
    }

    #[test]
    fn test_promotion() {
        assert_eq!(promotion_for(0), Promotion::NextGrade(1));
        assert_eq!(promotion_for(11), Promotion::NextGrade(12));
        assert_eq!(promotion_for(12), Promotion::Graduate);
    }

    #[test]
    fn test_grade_level_bounds() {
        let dto = CreateStudentDto {
            student_number: "S-001".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Lee".to_string(),
            date_of_birth: None,
            grade_level: 13,
            school_id: None,
        };
        assert!(dto.validate().is_err());
        assert!(CreateStudentDto { grade_level: 0, ..dto }.validate().is_ok());
    }
}
