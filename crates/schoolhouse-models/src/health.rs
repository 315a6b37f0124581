//! Health office: student health profiles and nurse visits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{HealthProfileId, NurseVisitId, SchoolId, StaffId, StudentId};
use crate::text_enum::text_enum;

text_enum!(
    VisitDisposition {
        ReturnedToClass => "returned_to_class",
        SentHome => "sent_home",
        EmergencyServices => "emergency_services",
        ParentPickup => "parent_pickup",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HealthProfile {
    pub id: HealthProfileId,
    pub student_id: StudentId,
    pub allergies: Vec<String>,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Replaces the whole profile.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertHealthProfileDto {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[validate(length(max = 200))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 32))]
    pub emergency_contact_phone: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NurseVisit {
    pub id: NurseVisitId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub staff_id: Option<StaffId>,
    pub arrived_at: DateTime<Utc>,
    pub departed_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub treatment: Option<String>,
    pub disposition: VisitDisposition,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateNurseVisitDto {
    pub student_id: StudentId,
    /// Defaults to now
    pub arrived_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub treatment: Option<String>,
    pub disposition: VisitDisposition,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NurseVisitFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub disposition: Option<VisitDisposition>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyReportParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    /// Defaults to today (UTC)
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispositionCount {
    pub disposition: VisitDisposition,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyVisitReport {
    pub date: NaiveDate,
    pub total_visits: i64,
    pub unique_students: i64,
    /// Every disposition, zero counts included
    pub by_disposition: Vec<DispositionCount>,
}

impl DailyVisitReport {
    pub fn new(date: NaiveDate, visits: &[(StudentId, VisitDisposition)]) -> Self {
        let by_disposition = VisitDisposition::ALL
            .iter()
            .map(|d| DispositionCount {
                disposition: *d,
                count: visits.iter().filter(|(_, v)| v == d).count() as i64,
            })
            .collect();
        let mut students: Vec<StudentId> = visits.iter().map(|(s, _)| *s).collect();
        students.sort();
        students.dedup();

        Self {
            date,
            total_visits: visits.len() as i64,
            unique_students: students.len() as i64,
            by_disposition,
        }
    }
}
