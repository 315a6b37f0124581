//! Academic years.
//!
//! Each school has at most one current year. Sections and fee types hang off
//! a year.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AcademicYearId, SchoolId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AcademicYear {
    pub id: AcademicYearId,
    pub school_id: SchoolId,
    /// e.g. "2025-2026"
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Academic year with the number of scheduled sections.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AcademicYearWithStats {
    pub id: AcademicYearId,
    pub school_id: SchoolId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub section_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAcademicYearDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Required for system admins, ignored for school staff
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAcademicYearDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AcademicYearFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub is_current: Option<bool>,
}

/// Start must fall strictly before end.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if start >= end {
        return Err("Start date must be before end date");
    }
    Ok(())
}
