//! Immunization requirements, administered doses, exemptions and compliance.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{ExemptionId, ImmunizationRecordId, RequirementId, SchoolId, StudentId};
use crate::text_enum::text_enum;

text_enum!(
    ExemptionType {
        Medical => "medical",
        Religious => "religious",
        Personal => "personal",
    }
);

text_enum!(
    ComplianceStatus {
        Compliant => "compliant",
        Exempt => "exempt",
        NonCompliant => "non_compliant",
    }
);

impl ComplianceStatus {
    const fn rank(&self) -> u8 {
        match self {
            ComplianceStatus::Compliant => 0,
            ComplianceStatus::Exempt => 1,
            ComplianceStatus::NonCompliant => 2,
        }
    }

    #[must_use]
    pub fn worst(self, other: ComplianceStatus) -> ComplianceStatus {
        if other.rank() > self.rank() { other } else { self }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImmunizationRequirement {
    pub id: RequirementId,
    pub school_id: SchoolId,
    /// Short vaccine code, e.g. "MMR"
    pub vaccine_code: String,
    pub vaccine_name: String,
    pub doses_required: i32,
    /// Grades the requirement applies to; empty means all grades
    pub grade_levels: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImmunizationRequirement {
    #[must_use]
    pub fn applies_to_grade(&self, grade_level: i32) -> bool {
        self.grade_levels.is_empty() || self.grade_levels.contains(&grade_level)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRequirementDto {
    #[validate(length(min = 1, max = 20))]
    pub vaccine_code: String,
    #[validate(length(min = 1, max = 200))]
    pub vaccine_name: String,
    #[validate(range(min = 1, max = 10))]
    pub doses_required: i32,
    #[serde(default)]
    pub grade_levels: Vec<i32>,
    pub school_id: Option<SchoolId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateRequirementDto {
    #[validate(length(min = 1, max = 200))]
    pub vaccine_name: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub doses_required: Option<i32>,
    pub grade_levels: Option<Vec<i32>>,
}

/// Every grade level must be 0-12.
pub fn validate_grade_levels(levels: &[i32]) -> Result<(), String> {
    match levels.iter().find(|g| !(0..=12).contains(*g)) {
        Some(bad) => Err(format!("Invalid grade level {}", bad)),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImmunizationRecord {
    pub id: ImmunizationRecordId,
    pub student_id: StudentId,
    pub vaccine_code: String,
    pub dose_number: i32,
    pub administered_on: NaiveDate,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateImmunizationRecordDto {
    #[validate(length(min = 1, max = 20))]
    pub vaccine_code: String,
    #[validate(range(min = 1))]
    pub dose_number: i32,
    pub administered_on: NaiveDate,
    #[validate(length(max = 200))]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImmunizationExemption {
    pub id: ExemptionId,
    pub student_id: StudentId,
    pub vaccine_code: String,
    pub exemption_type: ExemptionType,
    pub reason: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl ImmunizationExemption {
    #[must_use]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.expires_on.is_none_or(|expires| expires >= today)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateExemptionDto {
    #[validate(length(min = 1, max = 20))]
    pub vaccine_code: String,
    pub exemption_type: ExemptionType,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VaccineCompliance {
    pub vaccine_code: String,
    pub vaccine_name: String,
    pub doses_required: i32,
    pub doses_received: i32,
    pub status: ComplianceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentCompliance {
    pub student_id: StudentId,
    pub grade_level: i32,
    pub overall_status: ComplianceStatus,
    pub vaccines: Vec<VaccineCompliance>,
}

impl StudentCompliance {
    /// Vaccine codes still missing doses.
    pub fn missing(&self) -> Vec<String> {
        self.vaccines
            .iter()
            .filter(|v| v.status == ComplianceStatus::NonCompliant)
            .map(|v| v.vaccine_code.clone())
            .collect()
    }
}

/// Evaluates one student against the school's requirements.
///
/// Doses are counted by distinct dose number per vaccine code. An active
/// exemption for a vaccine wins over missing doses.
pub fn evaluate_compliance(
    student_id: StudentId,
    grade_level: i32,
    requirements: &[ImmunizationRequirement],
    records: &[ImmunizationRecord],
    exemptions: &[ImmunizationExemption],
    today: NaiveDate,
) -> StudentCompliance {
    let mut doses: HashMap<&str, HashSet<i32>> = HashMap::new();
    for record in records.iter().filter(|r| r.student_id == student_id) {
        doses
            .entry(record.vaccine_code.as_str())
            .or_default()
            .insert(record.dose_number);
    }

    let exempt: HashSet<&str> = exemptions
        .iter()
        .filter(|e| e.student_id == student_id && e.is_active(today))
        .map(|e| e.vaccine_code.as_str())
        .collect();

    let vaccines: Vec<VaccineCompliance> = requirements
        .iter()
        .filter(|req| req.applies_to_grade(grade_level))
        .map(|req| {
            let received = doses
                .get(req.vaccine_code.as_str())
                .map_or(0, |set| set.len() as i32);
            let status = if received >= req.doses_required {
                ComplianceStatus::Compliant
            } else if exempt.contains(req.vaccine_code.as_str()) {
                ComplianceStatus::Exempt
            } else {
                ComplianceStatus::NonCompliant
            };
            VaccineCompliance {
                vaccine_code: req.vaccine_code.clone(),
                vaccine_name: req.vaccine_name.clone(),
                doses_required: req.doses_required,
                doses_received: received,
                status,
            }
        })
        .collect();

    let overall_status = vaccines
        .iter()
        .fold(ComplianceStatus::Compliant, |acc, v| acc.worst(v.status));

    StudentCompliance {
        student_id,
        grade_level,
        overall_status,
        vaccines,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NonCompliantStudent {
    pub student_id: StudentId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: i32,
    pub missing_vaccines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComplianceReport {
    pub school_id: SchoolId,
    pub total_students: usize,
    pub compliant: usize,
    pub exempt: usize,
    pub non_compliant: usize,
    /// (compliant + exempt) / total, as a percentage
    pub compliance_rate: f64,
    pub non_compliant_students: Vec<NonCompliantStudent>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ComplianceReportParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub grade_level: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    fn requirement(code: &str, doses: i32, grades: Vec<i32>) -> ImmunizationRequirement {
        ImmunizationRequirement {
            id: RequirementId::new(),
            school_id: SchoolId::new(),
            vaccine_code: code.to_string(),
            vaccine_name: code.to_string(),
            doses_required: doses,
            grade_levels: grades,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dose(student_id: StudentId, code: &str, n: i32) -> ImmunizationRecord {
        ImmunizationRecord {
            id: ImmunizationRecordId::new(),
            student_id,
            vaccine_code: code.to_string(),
            dose_number: n,
            administered_on: today(),
            provider: None,
            created_at: Utc::now(),
        }
    }

    fn exemption(student_id: StudentId, code: &str, expires_on: Option<NaiveDate>) -> ImmunizationExemption {
        ImmunizationExemption {
            id: ExemptionId::new(),
            student_id,
            vaccine_code: code.to_string(),
            exemption_type: ExemptionType::Medical,
            reason: None,
            expires_on,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compliant_with_all_doses() {
        let s = StudentId::new();
        let reqs = vec![requirement("MMR", 2, vec![])];
        let records = vec![dose(s, "MMR", 1), dose(s, "MMR", 2)];
        let result = evaluate_compliance(s, 3, &reqs, &records, &[], today());
        assert_eq!(result.overall_status, ComplianceStatus::Compliant);
        assert_eq!(result.vaccines[0].doses_received, 2);
    }

    #[test]
    fn test_duplicate_dose_numbers_count_once() {
        let s = StudentId::new();
        let reqs = vec![requirement("DTAP", 2, vec![])];
        let records = vec![dose(s, "DTAP", 1), dose(s, "DTAP", 1)];
        let result = evaluate_compliance(s, 3, &reqs, &records, &[], today());
        assert_eq!(result.overall_status, ComplianceStatus::NonCompliant);
        assert_eq!(result.missing(), vec!["DTAP".to_string()]);
    }

    #[test]
    fn test_active_exemption() {
        let s = StudentId::new();
        let reqs = vec![requirement("MMR", 2, vec![]), requirement("VAR", 1, vec![])];
        let records = vec![dose(s, "VAR", 1)];
        let exemptions = vec![exemption(s, "MMR", None)];
        let result = evaluate_compliance(s, 1, &reqs, &records, &exemptions, today());
        assert_eq!(result.overall_status, ComplianceStatus::Exempt);
    }

    #[test]
    fn test_expired_exemption_does_not_count() {
        let s = StudentId::new();
        let reqs = vec![requirement("MMR", 2, vec![])];
        let expired = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        let exemptions = vec![exemption(s, "MMR", Some(expired))];
        let result = evaluate_compliance(s, 1, &reqs, &[], &exemptions, today());
        assert_eq!(result.overall_status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn test_grade_scoped_requirement() {
        let s = StudentId::new();
        let reqs = vec![requirement("TDAP", 1, vec![7, 12])];
        let result = evaluate_compliance(s, 4, &reqs, &[], &[], today());
        assert!(result.vaccines.is_empty());
        assert_eq!(result.overall_status, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_worst_status() {
        use ComplianceStatus::*;
        assert_eq!(Compliant.worst(Exempt), Exempt);
        assert_eq!(NonCompliant.worst(Exempt), NonCompliant);
        assert_eq!(Exempt.worst(Compliant), Exempt);
    }

    #[test]
    fn test_validate_grade_levels() {
        assert!(validate_grade_levels(&[0, 6, 12]).is_ok());
        assert!(validate_grade_levels(&[13]).is_err());
    }
}
