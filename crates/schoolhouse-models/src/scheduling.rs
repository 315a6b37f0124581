//! Rooms, courses, sections and enrollments, plus the report shapes of the
//! schedule analysis endpoints.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{
    AcademicYearId, CourseId, EnrollmentId, RoomId, SchoolId, SectionId, StaffId, StudentId,
};
use crate::text_enum::text_enum;

/// Meeting days are a bitmask over the school week.
pub mod meeting_days {
    pub const MONDAY: i32 = 1;
    pub const TUESDAY: i32 = 2;
    pub const WEDNESDAY: i32 = 4;
    pub const THURSDAY: i32 = 8;
    pub const FRIDAY: i32 = 16;
    pub const ALL_WEEK: i32 = 31;

    const NAMES: [(i32, &str); 5] = [
        (MONDAY, "Mon"),
        (TUESDAY, "Tue"),
        (WEDNESDAY, "Wed"),
        (THURSDAY, "Thu"),
        (FRIDAY, "Fri"),
    ];

    #[must_use]
    pub const fn is_valid(mask: i32) -> bool {
        mask >= 1 && mask <= ALL_WEEK
    }

    #[must_use]
    pub const fn overlaps(a: i32, b: i32) -> bool {
        a & b != 0
    }

    /// `"Mon/Wed/Fri"` style label.
    #[must_use]
    pub fn label(mask: i32) -> String {
        NAMES
            .iter()
            .filter(|(bit, _)| mask & bit != 0)
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join("/")
    }
}

text_enum!(
    RoomType {
        Classroom => "classroom",
        Lab => "lab",
        Gym => "gym",
        Music => "music",
        Art => "art",
        Library => "library",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Room {
    pub id: RoomId,
    pub school_id: SchoolId,
    pub name: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoomDto {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub room_type: RoomType,
    #[validate(range(min = 1))]
    pub capacity: i32,
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateRoomDto {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    pub room_type: Option<RoomType>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub room_type: Option<RoomType>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub min_capacity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub school_id: SchoolId,
    /// Short code, unique per school (e.g. "ALG1")
    pub code: String,
    pub name: String,
    /// Subject a teacher must be certified in
    pub subject: String,
    pub grade_level: Option<i32>,
    pub required_room_type: Option<RoomType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(range(min = 0, max = 12))]
    pub grade_level: Option<i32>,
    pub required_room_type: Option<RoomType>,
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(range(min = 0, max = 12))]
    pub grade_level: Option<i32>,
    pub required_room_type: Option<RoomType>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub grade_level: Option<i32>,
}

/// A scheduled offering of a course.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Section {
    pub id: SectionId,
    pub school_id: SchoolId,
    pub course_id: CourseId,
    pub academic_year_id: AcademicYearId,
    pub teacher_id: Option<StaffId>,
    pub room_id: Option<RoomId>,
    /// Daily period, 1-10
    pub period: i32,
    /// Bitmask, Mon=1 Tue=2 Wed=4 Thu=8 Fri=16
    pub meeting_days: i32,
    pub capacity: i32,
    pub enrolled_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSectionDto {
    pub course_id: CourseId,
    pub academic_year_id: AcademicYearId,
    pub teacher_id: Option<StaffId>,
    pub room_id: Option<RoomId>,
    #[validate(range(min = 1, max = 10))]
    pub period: i32,
    #[validate(range(min = 1, max = 31))]
    pub meeting_days: i32,
    #[validate(range(min = 1))]
    pub capacity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSectionDto {
    pub teacher_id: Option<StaffId>,
    pub room_id: Option<RoomId>,
    #[validate(range(min = 1, max = 10))]
    pub period: Option<i32>,
    #[validate(range(min = 1, max = 31))]
    pub meeting_days: Option<i32>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SectionFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub course_id: Option<CourseId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub teacher_id: Option<StaffId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub room_id: Option<RoomId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub period: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub section_id: SectionId,
    pub student_id: StudentId,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EnrollStudentDto {
    pub student_id: StudentId,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RosterEntry {
    pub student_id: StudentId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: i32,
    pub enrolled_at: DateTime<Utc>,
}

/// Scope of the schedule analysis endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleScopeParams {
    pub academic_year_id: AcademicYearId,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AutoAssignDto {
    pub academic_year_id: AcademicYearId,
    pub school_id: Option<SchoolId>,
    /// Compute the plan without writing it
    #[serde(default)]
    pub dry_run: bool,
}

text_enum!(
    ConflictKind {
        TeacherDoubleBooked => "teacher_double_booked",
        RoomDoubleBooked => "room_double_booked",
        RoomOverCapacity => "room_over_capacity",
        RoomTypeMismatch => "room_type_mismatch",
        TeacherNotCertified => "teacher_not_certified",
        TeacherOverloaded => "teacher_overloaded",
    }
);

text_enum!(
    ConflictSeverity {
        Error => "error",
        Warning => "warning",
    }
);

impl ConflictKind {
    /// Double bookings make the schedule unworkable; the rest are quality
    /// problems.
    #[must_use]
    pub const fn severity(&self) -> ConflictSeverity {
        match self {
            ConflictKind::TeacherDoubleBooked
            | ConflictKind::RoomDoubleBooked
            | ConflictKind::RoomOverCapacity => ConflictSeverity::Error,
            ConflictKind::RoomTypeMismatch
            | ConflictKind::TeacherNotCertified
            | ConflictKind::TeacherOverloaded => ConflictSeverity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScheduleConflict {
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub section_ids: Vec<SectionId>,
    pub teacher_id: Option<StaffId>,
    pub room_id: Option<RoomId>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConflictReport {
    pub academic_year_id: AcademicYearId,
    pub section_count: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Conflict count keyed by kind
    pub by_kind: BTreeMap<String, usize>,
    pub conflicts: Vec<ScheduleConflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleHealth {
    pub academic_year_id: AcademicYearId,
    /// 0-100
    pub score: i32,
    /// Letter grade for the score
    pub grade: String,
    pub section_count: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Percentage of sections without a teacher
    pub unassigned_teacher_pct: f64,
    /// Percentage of sections without a room
    pub unassigned_room_pct: f64,
    /// Average enrolled / capacity across sections, as a percentage
    pub average_fill_rate: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlannedAssignment {
    pub section_id: SectionId,
    pub course_code: String,
    /// Teacher or room picked for the section
    pub resource_id: Uuid,
    pub resource_name: String,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AutoAssignResult {
    pub dry_run: bool,
    pub assigned: usize,
    pub unassigned: usize,
    pub plan: Vec<PlannedAssignment>,
    pub unassigned_sections: Vec<SectionId>,
}

#[cfg(test)]
mod tests {
    use super::meeting_days::*;
    use super::*;

    #[test]
    fn test_meeting_days_overlap() {
        let mwf = MONDAY | WEDNESDAY | FRIDAY;
        let tth = TUESDAY | THURSDAY;
        assert!(!overlaps(mwf, tth));
        assert!(overlaps(mwf, FRIDAY));
        assert!(overlaps(ALL_WEEK, tth));
    }

    #[test]
    fn test_meeting_days_validity_and_label() {
        assert!(is_valid(ALL_WEEK));
        assert!(!is_valid(0));
        assert!(!is_valid(32));
        assert_eq!(label(MONDAY | WEDNESDAY | FRIDAY), "Mon/Wed/Fri");
        assert_eq!(label(ALL_WEEK), "Mon/Tue/Wed/Thu/Fri");
    }

    #[test]
    fn test_conflict_severity() {
        assert_eq!(
            ConflictKind::TeacherDoubleBooked.severity(),
            ConflictSeverity::Error
        );
        assert_eq!(
            ConflictKind::TeacherNotCertified.severity(),
            ConflictSeverity::Warning
        );
    }

    #[test]
    fn test_section_dto_bounds() {
        let dto = CreateSectionDto {
            course_id: CourseId::new(),
            academic_year_id: AcademicYearId::new(),
            teacher_id: None,
            room_id: None,
            period: 11,
            meeting_days: 0,
            capacity: 0,
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("period"));
        assert!(fields.contains_key("meeting_days"));
        assert!(fields.contains_key("capacity"));
    }
}
