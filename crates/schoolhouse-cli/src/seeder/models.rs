//! Seed configuration and the rows generated from it.

use chrono::NaiveDate;
use schoolhouse_models::StaffRole;
use schoolhouse_models::ids::SchoolId;
use schoolhouse_models::scheduling::RoomType;

pub type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Password given to every seeded staff account.
pub const SEED_PASSWORD: &str = "password123";

pub struct SchoolSeed {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

pub struct StaffSeed {
    pub school_id: SchoolId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: StaffRole,
    pub certifications: Vec<String>,
    pub max_sections: i32,
}

pub struct StudentSeed {
    pub school_id: SchoolId,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub grade_level: i32,
}

pub struct RoomSeed {
    pub name: String,
    pub room_type: RoomType,
    pub capacity: i32,
}

pub struct CourseSeed {
    pub code: String,
    pub name: String,
    pub subject: &'static str,
    pub grade_level: Option<i32>,
    pub required_room_type: Option<RoomType>,
}

/// Staff accounts created for each school.
#[derive(Clone)]
pub struct StaffPerSchool {
    pub admins: usize,
    pub teachers: usize,
    pub nurses: usize,
    pub counselors: usize,
    pub cashiers: usize,
}

impl Default for StaffPerSchool {
    fn default() -> Self {
        Self {
            admins: 1,
            teachers: 12,
            nurses: 1,
            counselors: 1,
            cashiers: 1,
        }
    }
}

impl StaffPerSchool {
    pub fn total(&self) -> usize {
        self.admins + self.teachers + self.nurses + self.counselors + self.cashiers
    }

    pub fn roles(&self) -> Vec<(StaffRole, usize)> {
        vec![
            (StaffRole::Admin, self.admins),
            (StaffRole::Teacher, self.teachers),
            (StaffRole::Nurse, self.nurses),
            (StaffRole::Counselor, self.counselors),
            (StaffRole::Cashier, self.cashiers),
        ]
    }
}

#[derive(Clone)]
pub struct SeedConfig {
    pub num_schools: usize,
    pub staff_per_school: StaffPerSchool,
    pub grade_levels: Vec<i32>,
    pub students_per_grade: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            num_schools: 1,
            staff_per_school: StaffPerSchool::default(),
            grade_levels: (9..=12).collect(),
            students_per_grade: 40,
        }
    }
}

impl SeedConfig {
    pub fn new(num_schools: usize) -> Self {
        Self {
            num_schools,
            ..Default::default()
        }
    }

    pub fn with_staff(mut self, staff: StaffPerSchool) -> Self {
        self.staff_per_school = staff;
        self
    }

    pub fn with_students(mut self, grade_levels: Vec<i32>, students_per_grade: usize) -> Self {
        self.grade_levels = grade_levels;
        self.students_per_grade = students_per_grade;
        self
    }

    pub fn total_students_per_school(&self) -> usize {
        self.grade_levels.len() * self.students_per_grade
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SeedConfig::new(2);
        assert_eq!(config.num_schools, 2);
        assert_eq!(config.total_students_per_school(), 160);
        assert_eq!(config.staff_per_school.total(), 16);
    }

    #[test]
    fn test_builder() {
        let config = SeedConfig::new(1)
            .with_staff(StaffPerSchool {
                admins: 2,
                teachers: 3,
                nurses: 0,
                counselors: 0,
                cashiers: 1,
            })
            .with_students(vec![0, 1, 2], 10);
        assert_eq!(config.total_students_per_school(), 30);
        assert_eq!(config.staff_per_school.total(), 6);
    }
}
