//! Behavior incidents and the consequences attached to them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{IncidentActionId, IncidentId, SchoolId, StaffId, StudentId};
use crate::text_enum::text_enum;

text_enum!(
    IncidentSeverity {
        Minor => "minor",
        Moderate => "moderate",
        Major => "major",
        Severe => "severe",
    }
);

impl IncidentSeverity {
    /// Behavior points charged for an incident of this severity.
    #[must_use]
    pub const fn points(&self) -> i64 {
        match self {
            IncidentSeverity::Minor => 1,
            IncidentSeverity::Moderate => 3,
            IncidentSeverity::Major => 5,
            IncidentSeverity::Severe => 10,
        }
    }
}

text_enum!(
    IncidentStatus {
        Reported => "reported",
        UnderReview => "under_review",
        Resolved => "resolved",
        Dismissed => "dismissed",
    }
);

impl IncidentStatus {
    #[must_use]
    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, next),
            (Reported, UnderReview)
                | (Reported, Dismissed)
                | (UnderReview, Resolved)
                | (UnderReview, Dismissed)
        )
    }

    /// Closed incidents can no longer be edited.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Dismissed)
    }
}

text_enum!(
    ActionType {
        Warning => "warning",
        Detention => "detention",
        ParentContact => "parent_contact",
        Suspension => "suspension",
        Referral => "referral",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BehaviorIncident {
    pub id: IncidentId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub reported_by: Option<StaffId>,
    pub incident_date: NaiveDate,
    pub location: String,
    pub category: String,
    pub severity: IncidentSeverity,
    pub description: String,
    pub status: IncidentStatus,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IncidentAction {
    pub id: IncidentActionId,
    pub incident_id: IncidentId,
    pub action_type: ActionType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub assigned_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncidentDetail {
    pub incident: BehaviorIncident,
    pub actions: Vec<IncidentAction>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateIncidentDto {
    pub student_id: StudentId,
    pub incident_date: NaiveDate,
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub severity: IncidentSeverity,
    #[validate(length(min = 1, max = 4000))]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateIncidentDto {
    pub incident_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 100))]
    pub location: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub severity: Option<IncidentSeverity>,
    #[validate(length(min = 1, max = 4000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeIncidentStatusDto {
    pub status: IncidentStatus,
    #[validate(length(max = 4000))]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateIncidentActionDto {
    pub action_type: ActionType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncidentFilterParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub student_id: Option<StudentId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub status: Option<IncidentStatus>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub severity: Option<IncidentSeverity>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BehaviorSummary {
    pub student_id: StudentId,
    pub total: i64,
    pub minor: i64,
    pub moderate: i64,
    pub major: i64,
    pub severe: i64,
    pub points: i64,
}

impl BehaviorSummary {
    /// Tallies incidents by severity. Dismissed incidents are not counted.
    pub fn from_incidents<I>(student_id: StudentId, incidents: I) -> Self
    where
        I: IntoIterator<Item = (IncidentSeverity, IncidentStatus)>,
    {
        let mut summary = Self {
            student_id,
            ..Default::default()
        };
        for (severity, status) in incidents {
            if status == IncidentStatus::Dismissed {
                continue;
            }
            summary.total += 1;
            summary.points += severity.points();
            match severity {
                IncidentSeverity::Minor => summary.minor += 1,
                IncidentSeverity::Moderate => summary.moderate += 1,
                IncidentSeverity::Major => summary.major += 1,
                IncidentSeverity::Severe => summary.severe += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_workflow() {
        use IncidentStatus::*;
        assert!(Reported.can_transition_to(UnderReview));
        assert!(Reported.can_transition_to(Dismissed));
        assert!(UnderReview.can_transition_to(Resolved));
        assert!(!Reported.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(UnderReview));
        assert!(!Dismissed.can_transition_to(Reported));
        assert!(Resolved.is_closed() && Dismissed.is_closed());
        assert!(!UnderReview.is_closed());
    }

    #[test]
    fn test_summary_points() {
        use IncidentSeverity::*;
        let student_id = StudentId::new();
        let summary = BehaviorSummary::from_incidents(
            student_id,
            vec![
                (Minor, IncidentStatus::Reported),
                (Minor, IncidentStatus::Resolved),
                (Major, IncidentStatus::UnderReview),
                (Severe, IncidentStatus::Dismissed),
            ],
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.minor, 2);
        assert_eq!(summary.major, 1);
        assert_eq!(summary.severe, 0);
        assert_eq!(summary.points, 1 + 1 + 5);
    }
}
