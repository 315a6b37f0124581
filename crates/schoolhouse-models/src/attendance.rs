//! Daily attendance by section.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AttendanceRecordId, SchoolId, SectionId, StaffId, StudentId};
use crate::text_enum::text_enum;

/// Absence rate (percent) at or above which a student is chronically absent.
pub const DEFAULT_CHRONIC_THRESHOLD: f64 = 10.0;

text_enum!(
    AttendanceStatus {
        Present => "present",
        Absent => "absent",
        Tardy => "tardy",
        Excused => "excused",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: AttendanceRecordId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub section_id: SectionId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub recorded_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttendanceEntry {
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Marks a whole section for one day. Re-submitting overwrites.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkAttendanceDto {
    pub section_id: SectionId,
    pub date: NaiveDate,
    #[validate(length(min = 1), nested)]
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkAttendanceResult {
    pub recorded: usize,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub section_id: Option<SectionId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub status: Option<AttendanceStatus>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub to: Option<NaiveDate>,
}

/// Per-status counts for one student, as loaded from the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct AttendanceCounts {
    pub present: i64,
    pub absent: i64,
    pub tardy: i64,
    pub excused: i64,
}

impl AttendanceCounts {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.present + self.absent + self.tardy + self.excused
    }

    /// Days that count toward the rates; excused days do not.
    #[must_use]
    pub fn countable(&self) -> i64 {
        self.total() - self.excused
    }

    /// (present + tardy) / (all - excused), as a percentage.
    #[must_use]
    pub fn attendance_rate(&self) -> Option<f64> {
        let countable = self.countable();
        (countable > 0).then(|| round2((self.present + self.tardy) as f64 / countable as f64 * 100.0))
    }

    #[must_use]
    pub fn absence_rate(&self) -> Option<f64> {
        let countable = self.countable();
        (countable > 0).then(|| round2(self.absent as f64 / countable as f64 * 100.0))
    }

    /// Compares the exact ratio, not the rounded `absence_rate`.
    #[must_use]
    pub fn is_chronically_absent(&self, threshold: f64) -> bool {
        let countable = self.countable();
        countable > 0 && self.absent as f64 * 100.0 >= threshold * countable as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    pub student_id: StudentId,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub present: i64,
    pub absent: i64,
    pub tardy: i64,
    pub excused: i64,
    pub total: i64,
    pub attendance_rate: Option<f64>,
    pub absence_rate: Option<f64>,
}

impl AttendanceSummary {
    pub fn new(
        student_id: StudentId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        counts: AttendanceCounts,
    ) -> Self {
        Self {
            student_id,
            from,
            to,
            present: counts.present,
            absent: counts.absent,
            tardy: counts.tardy,
            excused: counts.excused,
            total: counts.total(),
            attendance_rate: counts.attendance_rate(),
            absence_rate: counts.absence_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChronicAbsenceParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub to: Option<NaiveDate>,
    /// Absence rate percentage (default 10)
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub threshold: Option<f64>,
}

/// Attendance counts joined with student identity, one row per student.
#[derive(Debug, Clone, FromRow)]
pub struct StudentAttendanceRow {
    pub student_id: StudentId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: i32,
    #[sqlx(flatten)]
    pub counts: AttendanceCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChronicAbsenceEntry {
    pub student_id: StudentId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: i32,
    pub absent: i64,
    pub countable_days: i64,
    pub absence_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChronicAbsenceReport {
    pub threshold: f64,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub students: Vec<ChronicAbsenceEntry>,
}

/// Filters and sorts (worst first) the students at or above `threshold`.
pub fn chronic_absentees(rows: Vec<StudentAttendanceRow>, threshold: f64) -> Vec<ChronicAbsenceEntry> {
    let mut entries: Vec<ChronicAbsenceEntry> = rows
        .into_iter()
        .filter(|row| row.counts.is_chronically_absent(threshold))
        .filter_map(|row| {
            let rate = row.counts.absence_rate()?;
            Some(ChronicAbsenceEntry {
                student_id: row.student_id,
                student_number: row.student_number,
                first_name: row.first_name,
                last_name: row.last_name,
                grade_level: row.grade_level,
                absent: row.counts.absent,
                countable_days: row.counts.countable(),
                absence_rate: rate,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.absence_rate.total_cmp(&a.absence_rate));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(present: i64, absent: i64, tardy: i64, excused: i64) -> AttendanceCounts {
        AttendanceCounts {
            present,
            absent,
            tardy,
            excused,
        }
    }

    #[test]
    fn test_rates_exclude_excused_days() {
        let c = counts(15, 2, 1, 2);
        assert_eq!(c.total(), 20);
        assert_eq!(c.countable(), 18);
        // (15 + 1) / 18
        assert_eq!(c.attendance_rate(), Some(88.89));
        assert_eq!(c.absence_rate(), Some(11.11));
    }

    #[test]
    fn test_no_countable_days() {
        let c = counts(0, 0, 0, 3);
        assert_eq!(c.attendance_rate(), None);
        assert!(!c.is_chronically_absent(0.0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let c = counts(9, 1, 0, 0);
        assert!(c.is_chronically_absent(10.0));
        assert!(!c.is_chronically_absent(10.5));
    }

    #[test]
    fn test_threshold_ignores_display_rounding() {
        // 9.996% shows as 10.0 but is below the threshold.
        let c = counts(22501, 2499, 0, 0);
        assert_eq!(c.absence_rate(), Some(10.0));
        assert!(!c.is_chronically_absent(10.0));
        assert!(c.is_chronically_absent(9.99));
    }

    #[test]
    fn test_chronic_absentees_sorted() {
        let row = |absent, present| StudentAttendanceRow {
            student_id: StudentId::new(),
            student_number: format!("S{}", absent),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            grade_level: 5,
            counts: counts(present, absent, 0, 0),
        };
        let entries = chronic_absentees(vec![row(1, 19), row(4, 16), row(2, 8)], DEFAULT_CHRONIC_THRESHOLD);
        let rates: Vec<f64> = entries.iter().map(|e| e.absence_rate).collect();
        assert_eq!(rates, vec![20.0, 20.0]);
        assert_eq!(entries.len(), 2);
    }
}
