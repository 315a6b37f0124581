//! Bulk fake-data generation for local development and load testing.
//!
//! Rows are generated in parallel with rayon and written with multi-row
//! `INSERT`s inside one transaction per table.

pub mod catalog;
pub mod models;
pub mod schools;
pub mod staff;
pub mod students;

pub use models::{SEED_PASSWORD, SeedConfig, SeedResult, StaffPerSchool};

use schoolhouse_core::hash_password;
use sqlx::PgPool;
use std::time::Instant;

/// Classrooms per school on top of the special-purpose rooms.
const CLASSROOMS_PER_SCHOOL: usize = 12;

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> SeedResult<()> {
    let start_time = Instant::now();
    println!("🌱 Seeding database...\n");

    let password_hash =
        hash_password(SEED_PASSWORD).map_err(|e| format!("Failed to hash password: {}", e))?;

    let school_ids = schools::seed_schools(db, config.num_schools).await?;
    catalog::seed_catalog(db, &school_ids, &config.grade_levels, CLASSROOMS_PER_SCHOOL).await?;
    let staff_ids =
        staff::seed_staff(db, &school_ids, &config.staff_per_school, &password_hash).await?;
    let student_ids = students::seed_students(
        db,
        &school_ids,
        &config.grade_levels,
        config.students_per_grade,
    )
    .await?;

    println!("\n✅ Seeding complete in {:?}", start_time.elapsed());
    println!("   Schools:  {}", school_ids.len());
    println!("   Staff:    {}", staff_ids.len());
    println!("   Students: {}", student_ids.len());
    println!("   Staff password: {}", SEED_PASSWORD);
    Ok(())
}

/// Removes all school data. System admins are kept.
pub async fn clear_all(db: &PgPool) -> SeedResult<()> {
    let start_time = Instant::now();
    println!("🧹 Clearing seeded data...\n");

    schools::clear_schools(db).await?;

    println!("\n✅ Cleared in {:?}", start_time.elapsed());
    Ok(())
}
