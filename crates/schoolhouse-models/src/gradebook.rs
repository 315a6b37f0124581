//! Gradebook: weighted categories, assignments, scores and grade math.
//!
//! A section's category weights do not have to sum to 100. The final
//! percentage is the weighted mean of category percentages, taken only over
//! categories that contain scored work. Excused scores and missing scores
//! do not count.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{AssignmentId, GradeCategoryId, ScoreId, SectionId, StudentId};
use crate::text_enum::text_enum;

text_enum!(
    LetterGrade {
        A => "A",
        B => "B",
        C => "C",
        D => "D",
        F => "F",
    }
);

impl LetterGrade {
    #[must_use]
    pub fn from_percentage(pct: f64) -> Self {
        match pct {
            p if p >= 90.0 => LetterGrade::A,
            p if p >= 80.0 => LetterGrade::B,
            p if p >= 70.0 => LetterGrade::C,
            p if p >= 60.0 => LetterGrade::D,
            _ => LetterGrade::F,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GradeCategory {
    pub id: GradeCategoryId,
    pub section_id: SectionId,
    pub name: String,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGradeCategoryDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(exclusive_min = 0.0, max = 100.0))]
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateGradeCategoryDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(exclusive_min = 0.0, max = 100.0))]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Assignment {
    pub id: AssignmentId,
    pub section_id: SectionId,
    pub category_id: GradeCategoryId,
    pub title: String,
    pub max_points: f64,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentDto {
    pub category_id: GradeCategoryId,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(exclusive_min = 0.0))]
    pub max_points: f64,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAssignmentDto {
    pub category_id: Option<GradeCategoryId>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub max_points: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Score {
    pub id: ScoreId,
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub points: Option<f64>,
    pub excused: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ScoreEntry {
    pub student_id: StudentId,
    /// Required unless `excused`
    #[validate(range(min = 0.0))]
    pub points: Option<f64>,
    #[serde(default)]
    pub excused: bool,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkScoresDto {
    #[validate(length(min = 1), nested)]
    pub scores: Vec<ScoreEntry>,
}

/// Checks a score entry against the assignment's maximum.
pub fn validate_score(entry: &ScoreEntry, max_points: f64) -> Result<(), String> {
    match entry.points {
        None if !entry.excused => Err(format!(
            "Score for student {} needs points unless excused",
            entry.student_id
        )),
        Some(p) if p < 0.0 || p > max_points => Err(format!(
            "Score {} for student {} is outside 0..={}",
            p, entry.student_id, max_points
        )),
        _ => Ok(()),
    }
}

/// Category weight as used by the grade calculation.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryWeight {
    pub category_id: GradeCategoryId,
    pub name: String,
    pub weight: f64,
}

/// One recorded score joined with its assignment.
#[derive(Debug, Clone, FromRow)]
pub struct ScoredWork {
    pub student_id: StudentId,
    pub category_id: GradeCategoryId,
    pub points: Option<f64>,
    pub max_points: f64,
    pub excused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryBreakdown {
    pub category_id: GradeCategoryId,
    pub name: String,
    pub weight: f64,
    pub earned: f64,
    pub possible: f64,
    /// `None` when the category has no scored work yet
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentGrade {
    pub student_id: StudentId,
    /// `None` when nothing has been scored
    pub percentage: Option<f64>,
    pub letter: Option<LetterGrade>,
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SectionGradeReport {
    pub section_id: SectionId,
    pub class_average: Option<f64>,
    pub students: Vec<StudentGrade>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes one student's grade from the section's categories and the
/// student's scores.
pub fn compute_grade(
    student_id: StudentId,
    categories: &[CategoryWeight],
    work: &[ScoredWork],
) -> StudentGrade {
    let mut totals: HashMap<GradeCategoryId, (f64, f64)> = HashMap::new();
    for item in work.iter().filter(|w| w.student_id == student_id && !w.excused) {
        if let Some(points) = item.points {
            let entry = totals.entry(item.category_id).or_insert((0.0, 0.0));
            entry.0 += points;
            entry.1 += item.max_points;
        }
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let breakdown = categories
        .iter()
        .map(|category| {
            let (earned, possible) = totals
                .get(&category.category_id)
                .copied()
                .unwrap_or((0.0, 0.0));
            let percentage = (possible > 0.0).then(|| earned / possible * 100.0);
            if let Some(pct) = percentage {
                weighted_sum += pct * category.weight;
                weight_total += category.weight;
            }
            CategoryBreakdown {
                category_id: category.category_id,
                name: category.name.clone(),
                weight: category.weight,
                earned,
                possible,
                percentage: percentage.map(round2),
            }
        })
        .collect();

    let percentage = (weight_total > 0.0).then(|| round2(weighted_sum / weight_total));

    StudentGrade {
        student_id,
        percentage,
        letter: percentage.map(LetterGrade::from_percentage),
        categories: breakdown,
    }
}

/// Mean of the graded students' percentages.
pub fn class_average(grades: &[StudentGrade]) -> Option<f64> {
    let graded: Vec<f64> = grades.iter().filter_map(|g| g.percentage).collect();
    if graded.is_empty() {
        return None;
    }
    Some(round2(graded.iter().sum::<f64>() / graded.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(weight: f64) -> CategoryWeight {
        CategoryWeight {
            category_id: GradeCategoryId::new(),
            name: format!("w{}", weight),
            weight,
        }
    }

    fn work(
        student_id: StudentId,
        category: &CategoryWeight,
        points: Option<f64>,
        max: f64,
    ) -> ScoredWork {
        ScoredWork {
            student_id,
            category_id: category.category_id,
            points,
            max_points: max,
            excused: false,
        }
    }

    #[test]
    fn test_letter_boundaries() {
        assert_eq!(LetterGrade::from_percentage(90.0), LetterGrade::A);
        assert_eq!(LetterGrade::from_percentage(89.99), LetterGrade::B);
        assert_eq!(LetterGrade::from_percentage(80.0), LetterGrade::B);
        assert_eq!(LetterGrade::from_percentage(70.0), LetterGrade::C);
        assert_eq!(LetterGrade::from_percentage(60.0), LetterGrade::D);
        assert_eq!(LetterGrade::from_percentage(59.9), LetterGrade::F);
    }

    #[test]
    fn test_weighted_grade() {
        let student = StudentId::new();
        let tests = category(60.0);
        let homework = category(40.0);
        let items = vec![
            work(student, &tests, Some(80.0), 100.0),
            work(student, &homework, Some(18.0), 20.0),
            work(student, &homework, Some(20.0), 20.0),
        ];

        let grade = compute_grade(student, &[tests, homework], &items);
        // tests 80%, homework 95% -> 0.6 * 80 + 0.4 * 95 = 86
        assert_eq!(grade.percentage, Some(86.0));
        assert_eq!(grade.letter, Some(LetterGrade::B));
    }

    #[test]
    fn test_empty_category_is_renormalised() {
        let student = StudentId::new();
        let tests = category(70.0);
        let projects = category(30.0);
        let items = vec![work(student, &tests, Some(45.0), 50.0)];

        let grade = compute_grade(student, &[tests, projects], &items);
        assert_eq!(grade.percentage, Some(90.0));
        assert_eq!(grade.categories[1].percentage, None);
    }

    #[test]
    fn test_excused_and_other_students_are_ignored() {
        let student = StudentId::new();
        let other = StudentId::new();
        let tests = category(100.0);
        let mut excused = work(student, &tests, Some(0.0), 100.0);
        excused.excused = true;
        let items = vec![
            excused,
            work(student, &tests, Some(70.0), 100.0),
            work(other, &tests, Some(10.0), 100.0),
        ];

        let grade = compute_grade(student, &[tests], &items);
        assert_eq!(grade.percentage, Some(70.0));
    }

    #[test]
    fn test_no_scored_work() {
        let student = StudentId::new();
        let grade = compute_grade(student, &[category(100.0)], &[]);
        assert_eq!(grade.percentage, None);
        assert_eq!(grade.letter, None);
        assert_eq!(class_average(&[grade]), None);
    }

    #[test]
    fn test_class_average_skips_ungraded() {
        let grades = vec![
            StudentGrade {
                student_id: StudentId::new(),
                percentage: Some(90.0),
                letter: Some(LetterGrade::A),
                categories: vec![],
            },
            StudentGrade {
                student_id: StudentId::new(),
                percentage: Some(75.0),
                letter: Some(LetterGrade::C),
                categories: vec![],
            },
            StudentGrade {
                student_id: StudentId::new(),
                percentage: None,
                letter: None,
                categories: vec![],
            },
        ];
        assert_eq!(class_average(&grades), Some(82.5));
    }

    #[test]
    fn test_validate_score() {
        let entry = ScoreEntry {
            student_id: StudentId::new(),
            points: Some(11.0),
            excused: false,
            comment: None,
        };
        assert!(validate_score(&entry, 10.0).is_err());
        assert!(validate_score(&entry, 11.0).is_ok());

        let missing = ScoreEntry {
            points: None,
            ..entry.clone()
        };
        assert!(validate_score(&missing, 10.0).is_err());

        let excused = ScoreEntry {
            points: None,
            excused: true,
            ..entry
        };
        assert!(validate_score(&excused, 10.0).is_ok());
    }
}
