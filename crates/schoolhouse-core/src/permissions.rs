//! Permission names and the fixed role → permission table.
//!
//! Permissions are embedded in access tokens at login, so changing this
//! table takes effect on the next login.

// =============================================================================
// Schools
// =============================================================================

/// Create, update and delete schools (system admins only)
pub const SCHOOLS_MANAGE: &str = "schools:manage";

// =============================================================================
// Staff & students
// =============================================================================

pub const STAFF_READ: &str = "staff:read";
pub const STAFF_WRITE: &str = "staff:write";
pub const STUDENTS_READ: &str = "students:read";
pub const STUDENTS_WRITE: &str = "students:write";

// =============================================================================
// Academics
// =============================================================================

pub const ACADEMIC_YEARS_READ: &str = "academic_years:read";
pub const ACADEMIC_YEARS_WRITE: &str = "academic_years:write";
pub const SCHEDULING_READ: &str = "scheduling:read";
pub const SCHEDULING_WRITE: &str = "scheduling:write";
pub const GRADEBOOK_READ: &str = "gradebook:read";
pub const GRADEBOOK_WRITE: &str = "gradebook:write";
pub const ATTENDANCE_READ: &str = "attendance:read";
pub const ATTENDANCE_WRITE: &str = "attendance:write";
pub const GIFTED_READ: &str = "gifted:read";
pub const GIFTED_WRITE: &str = "gifted:write";

// =============================================================================
// Student services
// =============================================================================

pub const BEHAVIOR_READ: &str = "behavior:read";
pub const BEHAVIOR_WRITE: &str = "behavior:write";
pub const HEALTH_READ: &str = "health:read";
pub const HEALTH_WRITE: &str = "health:write";
pub const IMMUNIZATIONS_READ: &str = "immunizations:read";
pub const IMMUNIZATIONS_WRITE: &str = "immunizations:write";

// =============================================================================
// Finance
// =============================================================================

pub const FEES_READ: &str = "fees:read";
pub const FEES_WRITE: &str = "fees:write";
pub const CAFETERIA_READ: &str = "cafeteria:read";
pub const CAFETERIA_WRITE: &str = "cafeteria:write";

// =============================================================================
// Reports
// =============================================================================

/// Cross-student reports (chronic absence, compliance, overdue fees...)
pub const REPORTS_VIEW: &str = "reports:view";

const SCHOOL_ADMIN: &[&str] = &[
    STAFF_READ,
    STAFF_WRITE,
    STUDENTS_READ,
    STUDENTS_WRITE,
    ACADEMIC_YEARS_READ,
    ACADEMIC_YEARS_WRITE,
    SCHEDULING_READ,
    SCHEDULING_WRITE,
    GRADEBOOK_READ,
    GRADEBOOK_WRITE,
    ATTENDANCE_READ,
    ATTENDANCE_WRITE,
    GIFTED_READ,
    GIFTED_WRITE,
    BEHAVIOR_READ,
    BEHAVIOR_WRITE,
    HEALTH_READ,
    HEALTH_WRITE,
    IMMUNIZATIONS_READ,
    IMMUNIZATIONS_WRITE,
    FEES_READ,
    FEES_WRITE,
    CAFETERIA_READ,
    CAFETERIA_WRITE,
    REPORTS_VIEW,
];

const TEACHER: &[&str] = &[
    STUDENTS_READ,
    ACADEMIC_YEARS_READ,
    SCHEDULING_READ,
    GRADEBOOK_READ,
    GRADEBOOK_WRITE,
    ATTENDANCE_READ,
    ATTENDANCE_WRITE,
    BEHAVIOR_READ,
    BEHAVIOR_WRITE,
    GIFTED_READ,
];

const NURSE: &[&str] = &[
    STUDENTS_READ,
    ATTENDANCE_READ,
    HEALTH_READ,
    HEALTH_WRITE,
    IMMUNIZATIONS_READ,
    IMMUNIZATIONS_WRITE,
    REPORTS_VIEW,
];

const COUNSELOR: &[&str] = &[
    STUDENTS_READ,
    STUDENTS_WRITE,
    ACADEMIC_YEARS_READ,
    SCHEDULING_READ,
    SCHEDULING_WRITE,
    GRADEBOOK_READ,
    ATTENDANCE_READ,
    BEHAVIOR_READ,
    BEHAVIOR_WRITE,
    GIFTED_READ,
    GIFTED_WRITE,
    REPORTS_VIEW,
];

const CASHIER: &[&str] = &[
    STUDENTS_READ,
    FEES_READ,
    FEES_WRITE,
    CAFETERIA_READ,
    CAFETERIA_WRITE,
];

/// Permissions granted to a role name. Unknown roles get nothing.
pub fn permissions_for_role(role: &str) -> Vec<&'static str> {
    match role {
        "system_admin" => {
            let mut all = vec![SCHOOLS_MANAGE];
            all.extend_from_slice(SCHOOL_ADMIN);
            all
        }
        "admin" => SCHOOL_ADMIN.to_vec(),
        "teacher" => TEACHER.to_vec(),
        "nurse" => NURSE.to_vec(),
        "counselor" => COUNSELOR.to_vec(),
        "cashier" => CASHIER.to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_system_admin_manages_schools() {
        assert!(permissions_for_role("system_admin").contains(&SCHOOLS_MANAGE));
        for role in ["admin", "teacher", "nurse", "counselor", "cashier"] {
            assert!(!permissions_for_role(role).contains(&SCHOOLS_MANAGE));
        }
    }

    #[test]
    fn test_teacher_cannot_touch_health_or_money() {
        let perms = permissions_for_role("teacher");
        assert!(perms.contains(&GRADEBOOK_WRITE));
        assert!(!perms.contains(&HEALTH_READ));
        assert!(!perms.contains(&FEES_READ));
    }

    #[test]
    fn test_nurse_scope() {
        let perms = permissions_for_role("nurse");
        assert!(perms.contains(&HEALTH_WRITE));
        assert!(perms.contains(&IMMUNIZATIONS_WRITE));
        assert!(!perms.contains(&BEHAVIOR_WRITE));
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        assert!(permissions_for_role("janitor").is_empty());
    }
}
