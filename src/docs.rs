use schoolhouse_core::{ErrorResponse, PaginationMeta};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::academic_years::model::{AcademicYear, AcademicYearWithStats};
use crate::modules::attendance::model::{AttendanceRecord, AttendanceStatus, AttendanceSummary};
use crate::modules::auth::model::{LoginRequest, LoginResponse, RefreshTokenRequest, TokenResponse};
use crate::modules::behavior::model::{BehaviorIncident, IncidentSeverity, IncidentStatus};
use crate::modules::cafeteria::model::{MealAccount, MealEligibility, MealTransaction, MealType};
use crate::modules::fees::model::{FeeStatus, FeeType, PaymentMethod, StudentFee};
use crate::modules::gifted::model::{GiftedArea, GiftedRecord, GiftedStatus};
use crate::modules::gradebook::model::{Assignment, GradeCategory, Score};
use crate::modules::health_office::model::{HealthProfile, NurseVisit};
use crate::modules::immunizations::model::{ComplianceStatus, ImmunizationRequirement};
use crate::modules::scheduling::model::{Course, Room, RoomType, Section};
use crate::modules::schools::model::School;
use crate::modules::staff::model::{Staff, StaffRole};
use crate::modules::students::model::{Student, StudentStatus};
use crate::router::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::router::health_check,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::me,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::get_schools,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::delete_school,
        crate::modules::staff::controller::create_staff,
        crate::modules::staff::controller::get_staff_list,
        crate::modules::staff::controller::get_staff,
        crate::modules::staff::controller::update_staff,
        crate::modules::staff::controller::deactivate_staff,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::change_student_status,
        crate::modules::students::controller::delete_student,
        crate::modules::students::controller::promote_students,
        crate::modules::academic_years::controller::create_academic_year,
        crate::modules::academic_years::controller::get_academic_years,
        crate::modules::academic_years::controller::get_current_academic_year,
        crate::modules::academic_years::controller::get_academic_year,
        crate::modules::academic_years::controller::update_academic_year,
        crate::modules::academic_years::controller::delete_academic_year,
        crate::modules::academic_years::controller::activate_academic_year,
        crate::modules::scheduling::controller::create_room,
        crate::modules::scheduling::controller::get_rooms,
        crate::modules::scheduling::controller::get_room,
        crate::modules::scheduling::controller::update_room,
        crate::modules::scheduling::controller::delete_room,
        crate::modules::scheduling::controller::create_course,
        crate::modules::scheduling::controller::get_courses,
        crate::modules::scheduling::controller::get_course,
        crate::modules::scheduling::controller::update_course,
        crate::modules::scheduling::controller::delete_course,
        crate::modules::scheduling::controller::create_section,
        crate::modules::scheduling::controller::get_sections,
        crate::modules::scheduling::controller::get_section,
        crate::modules::scheduling::controller::update_section,
        crate::modules::scheduling::controller::delete_section,
        crate::modules::scheduling::controller::enroll_student,
        crate::modules::scheduling::controller::get_roster,
        crate::modules::scheduling::controller::drop_student,
        crate::modules::scheduling::controller::get_conflicts,
        crate::modules::scheduling::controller::get_health,
        crate::modules::scheduling::controller::assign_teachers,
        crate::modules::scheduling::controller::assign_rooms,
        crate::modules::gradebook::controller::create_category,
        crate::modules::gradebook::controller::get_categories,
        crate::modules::gradebook::controller::update_category,
        crate::modules::gradebook::controller::delete_category,
        crate::modules::gradebook::controller::create_assignment,
        crate::modules::gradebook::controller::get_assignments,
        crate::modules::gradebook::controller::get_assignment,
        crate::modules::gradebook::controller::update_assignment,
        crate::modules::gradebook::controller::delete_assignment,
        crate::modules::gradebook::controller::record_scores,
        crate::modules::gradebook::controller::get_scores,
        crate::modules::gradebook::controller::get_student_grade,
        crate::modules::gradebook::controller::get_section_report,
        crate::modules::attendance::controller::record_attendance,
        crate::modules::attendance::controller::get_records,
        crate::modules::attendance::controller::delete_record,
        crate::modules::attendance::controller::get_student_summary,
        crate::modules::attendance::controller::chronic_absence_report,
        crate::modules::behavior::controller::create_incident,
        crate::modules::behavior::controller::get_incidents,
        crate::modules::behavior::controller::get_incident,
        crate::modules::behavior::controller::update_incident,
        crate::modules::behavior::controller::change_incident_status,
        crate::modules::behavior::controller::delete_incident,
        crate::modules::behavior::controller::add_action,
        crate::modules::behavior::controller::get_student_summary,
        crate::modules::health_office::controller::get_profile,
        crate::modules::health_office::controller::upsert_profile,
        crate::modules::health_office::controller::create_visit,
        crate::modules::health_office::controller::get_visits,
        crate::modules::health_office::controller::get_visit,
        crate::modules::health_office::controller::daily_report,
        crate::modules::immunizations::controller::create_requirement,
        crate::modules::immunizations::controller::get_requirements,
        crate::modules::immunizations::controller::get_requirement,
        crate::modules::immunizations::controller::update_requirement,
        crate::modules::immunizations::controller::delete_requirement,
        crate::modules::immunizations::controller::create_record,
        crate::modules::immunizations::controller::get_records,
        crate::modules::immunizations::controller::delete_record,
        crate::modules::immunizations::controller::create_exemption,
        crate::modules::immunizations::controller::get_exemptions,
        crate::modules::immunizations::controller::delete_exemption,
        crate::modules::immunizations::controller::get_student_compliance,
        crate::modules::immunizations::controller::compliance_report,
        crate::modules::fees::controller::create_fee_type,
        crate::modules::fees::controller::get_fee_types,
        crate::modules::fees::controller::get_fee_type,
        crate::modules::fees::controller::update_fee_type,
        crate::modules::fees::controller::delete_fee_type,
        crate::modules::fees::controller::assess_fee,
        crate::modules::fees::controller::record_payment,
        crate::modules::fees::controller::get_payments,
        crate::modules::fees::controller::waive_fee,
        crate::modules::fees::controller::get_statement,
        crate::modules::fees::controller::overdue_report,
        crate::modules::gifted::controller::create_record,
        crate::modules::gifted::controller::get_records,
        crate::modules::gifted::controller::get_record,
        crate::modules::gifted::controller::update_record,
        crate::modules::gifted::controller::change_status,
        crate::modules::gifted::controller::add_evaluation,
        crate::modules::gifted::controller::upcoming_reviews,
        crate::modules::gifted::controller::summary,
        crate::modules::cafeteria::controller::open_account,
        crate::modules::cafeteria::controller::get_accounts,
        crate::modules::cafeteria::controller::get_account,
        crate::modules::cafeteria::controller::get_student_account,
        crate::modules::cafeteria::controller::update_account,
        crate::modules::cafeteria::controller::deposit,
        crate::modules::cafeteria::controller::purchase,
        crate::modules::cafeteria::controller::get_transactions,
        crate::modules::cafeteria::controller::low_balance_report,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            HealthResponse,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            TokenResponse,
            School,
            Staff,
            StaffRole,
            Student,
            StudentStatus,
            AcademicYear,
            AcademicYearWithStats,
            Room,
            RoomType,
            Course,
            Section,
            GradeCategory,
            Assignment,
            Score,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceSummary,
            BehaviorIncident,
            IncidentSeverity,
            IncidentStatus,
            HealthProfile,
            NurseVisit,
            ImmunizationRequirement,
            ComplianceStatus,
            FeeType,
            StudentFee,
            FeeStatus,
            PaymentMethod,
            GiftedRecord,
            GiftedStatus,
            GiftedArea,
            MealAccount,
            MealTransaction,
            MealEligibility,
            MealType,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Authentication", description = "Login and token refresh"),
        (name = "Schools", description = "School tenants, managed by system admins"),
        (name = "Staff", description = "Staff accounts and roles"),
        (name = "Students", description = "Student records, status changes and promotion"),
        (name = "Academic Years", description = "Academic years and the current-year switch"),
        (name = "Scheduling", description = "Rooms, courses, sections, enrollment and schedule analysis"),
        (name = "Gradebook", description = "Grade categories, assignments, scores and grades"),
        (name = "Attendance", description = "Daily attendance and chronic absence"),
        (name = "Behavior", description = "Behavior incidents and disciplinary actions"),
        (name = "Health Office", description = "Health profiles and nurse visits"),
        (name = "Immunizations", description = "Immunization requirements and compliance"),
        (name = "Fees", description = "Student fees, payments and waivers"),
        (name = "Gifted", description = "Gifted and talented program tracking"),
        (name = "Cafeteria", description = "Meal accounts and point of sale")
    ),
    info(
        title = "Schoolhouse API",
        version = "0.1.0",
        description = "Student information system for K-12 schools, built with Rust, Axum and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
