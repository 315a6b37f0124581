//! Fake students spread evenly over the configured grade levels.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use rayon::prelude::*;
use schoolhouse_models::ids::{SchoolId, StudentId};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{SeedResult, StudentSeed};

/// A plausible birth date for a student in `grade_level` (kindergarten is 0).
fn birth_date_for_grade(grade_level: i32, today: NaiveDate, rng: &mut impl Rng) -> NaiveDate {
    let age = 5 + grade_level;
    let base = NaiveDate::from_ymd_opt(today.year() - age, 9, 1).unwrap_or(today);
    base - Duration::days(rng.gen_range(0..365))
}

pub fn generate_students(
    school_ids: &[SchoolId],
    grade_levels: &[i32],
    per_grade: usize,
) -> Vec<StudentSeed> {
    let today = Utc::now().date_naive();

    school_ids
        .par_iter()
        .flat_map(|&school_id| {
            let mut rng = rand::thread_rng();
            let mut students = Vec::with_capacity(grade_levels.len() * per_grade);
            let mut sequence = 1;

            for &grade_level in grade_levels {
                for _ in 0..per_grade {
                    students.push(StudentSeed {
                        school_id,
                        student_number: format!("S{:06}", sequence),
                        first_name: FirstName().fake(),
                        last_name: LastName().fake(),
                        date_of_birth: birth_date_for_grade(grade_level, today, &mut rng),
                        grade_level,
                    });
                    sequence += 1;
                }
            }
            students
        })
        .collect()
}

pub async fn seed_students(
    db: &PgPool,
    school_ids: &[SchoolId],
    grade_levels: &[i32],
    per_grade: usize,
) -> SeedResult<Vec<StudentId>> {
    let start_time = Instant::now();
    let total = school_ids.len() * grade_levels.len() * per_grade;
    println!(
        "🎒 Seeding {} students ({} grades x {} per grade per school)...",
        total,
        grade_levels.len(),
        per_grade
    );

    let students = generate_students(school_ids, grade_levels, per_grade);
    let mut tx = db.begin().await?;

    let mut ids = Vec::with_capacity(students.len());
    for (i, chunk) in students.chunks(1000).enumerate() {
        ids.extend(insert_students_chunk(&mut tx, chunk).await?);
        if total > 5000 && (i + 1) % 5 == 0 {
            println!("   … {} / {}", ids.len(), total);
        }
    }
    tx.commit().await?;

    println!("   ✓ Inserted {} students in {:?}", ids.len(), start_time.elapsed());
    Ok(ids)
}

async fn insert_students_chunk(
    tx: &mut Transaction<'_, Postgres>,
    students: &[StudentSeed],
) -> SeedResult<Vec<StudentId>> {
    if students.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO students (school_id, student_number, first_name, last_name, date_of_birth, grade_level) VALUES ",
    );
    for i in 0..students.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 6;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6
        ));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, StudentId>(&query);
    for student in students {
        q = q
            .bind(student.school_id)
            .bind(&student.student_number)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(student.date_of_birth)
            .bind(student.grade_level);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}
