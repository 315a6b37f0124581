//! Gifted and talented program tracking.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{EvaluationId, GiftedRecordId, SchoolId, StudentId};
use crate::text_enum::text_enum;

/// Default look-ahead for the upcoming review list.
pub const DEFAULT_REVIEW_WINDOW_DAYS: i64 = 30;

text_enum!(
    GiftedStatus {
        Referred => "referred",
        Screening => "screening",
        Evaluated => "evaluated",
        Eligible => "eligible",
        Ineligible => "ineligible",
        Enrolled => "enrolled",
        Exited => "exited",
    }
);

impl GiftedStatus {
    /// `referred -> screening -> evaluated -> eligible | ineligible`,
    /// `eligible -> enrolled -> exited`.
    #[must_use]
    pub fn can_transition_to(self, next: GiftedStatus) -> bool {
        use GiftedStatus::*;
        matches!(
            (self, next),
            (Referred, Screening)
                | (Screening, Evaluated)
                | (Evaluated, Eligible)
                | (Evaluated, Ineligible)
                | (Eligible, Enrolled)
                | (Enrolled, Exited)
        )
    }
}

text_enum!(
    GiftedArea {
        Intellectual => "intellectual",
        Academic => "academic",
        Creative => "creative",
        Leadership => "leadership",
        Arts => "arts",
    }
);

/// Enrolled students are reviewed once a year.
#[must_use]
pub fn annual_review_date(from: NaiveDate) -> NaiveDate {
    from.checked_add_months(Months::new(12)).unwrap_or(from)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GiftedRecord {
    pub id: GiftedRecordId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub referral_source: String,
    pub referred_on: NaiveDate,
    pub areas: Vec<GiftedArea>,
    pub status: GiftedStatus,
    pub eligibility_date: Option<NaiveDate>,
    pub next_review_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GiftedEvaluation {
    pub id: EvaluationId,
    pub record_id: GiftedRecordId,
    pub instrument: String,
    pub score: f64,
    pub percentile: i32,
    pub evaluated_on: NaiveDate,
    pub evaluator: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GiftedRecordDetail {
    pub record: GiftedRecord,
    pub evaluations: Vec<GiftedEvaluation>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGiftedRecordDto {
    pub student_id: StudentId,
    /// Who referred the student (teacher, parent, screening...)
    #[validate(length(min = 1, max = 100))]
    pub referral_source: String,
    /// Defaults to today
    pub referred_on: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub areas: Vec<GiftedArea>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateGiftedRecordDto {
    #[validate(length(min = 1, max = 100))]
    pub referral_source: Option<String>,
    #[validate(length(min = 1))]
    pub areas: Option<Vec<GiftedArea>>,
    pub next_review_date: Option<NaiveDate>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeGiftedStatusDto {
    pub status: GiftedStatus,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEvaluationDto {
    #[validate(length(min = 1, max = 200))]
    pub instrument: String,
    pub score: f64,
    #[validate(range(min = 1, max = 99))]
    pub percentile: i32,
    pub evaluated_on: NaiveDate,
    #[validate(length(max = 200))]
    pub evaluator: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GiftedFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub status: Option<GiftedStatus>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpcomingReviewParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    /// Look-ahead in days (default 30)
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GiftedSummary {
    pub total: i64,
    pub referred: i64,
    pub screening: i64,
    pub evaluated: i64,
    pub eligible: i64,
    pub ineligible: i64,
    pub enrolled: i64,
    pub exited: i64,
}

impl GiftedSummary {
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (GiftedStatus, i64)>,
    {
        let mut summary = Self::default();
        for (status, count) in counts {
            summary.total += count;
            let slot = match status {
                GiftedStatus::Referred => &mut summary.referred,
                GiftedStatus::Screening => &mut summary.screening,
                GiftedStatus::Evaluated => &mut summary.evaluated,
                GiftedStatus::Eligible => &mut summary.eligible,
                GiftedStatus::Ineligible => &mut summary.ineligible,
                GiftedStatus::Enrolled => &mut summary.enrolled,
                GiftedStatus::Exited => &mut summary.exited,
            };
            *slot += count;
        }
        summary
    }
}
