//! Fake staff accounts per school, with certifications for teachers.

use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use schoolhouse_models::StaffRole;
use schoolhouse_models::ids::{SchoolId, StaffId};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{SeedResult, StaffPerSchool, StaffSeed};

pub const SUBJECTS: &[&str] = &[
    "Mathematics",
    "English",
    "Science",
    "History",
    "Art",
    "Music",
    "Physical Education",
    "Computer Science",
];

pub fn generate_staff(
    school_ids: &[SchoolId],
    per_school: &StaffPerSchool,
) -> Vec<StaffSeed> {
    let roles = per_school.roles();

    school_ids
        .par_iter()
        .enumerate()
        .flat_map(|(school_idx, &school_id)| {
            let mut rng = rand::thread_rng();
            let mut staff = Vec::with_capacity(per_school.total());

            for &(role, count) in &roles {
                for idx in 0..count {
                    let first_name: String = FirstName().fake();
                    let last_name: String = LastName().fake();

                    let certifications = if role == StaffRole::Teacher {
                        // Cycle the primary subject so every subject has a teacher.
                        let mut certs = vec![SUBJECTS[idx % SUBJECTS.len()].to_string()];
                        if let Some(extra) = SUBJECTS.choose(&mut rng)
                            && !certs.iter().any(|c| c == extra)
                        {
                            certs.push(extra.to_string());
                        }
                        certs
                    } else {
                        Vec::new()
                    };

                    staff.push(StaffSeed {
                        school_id,
                        email: format!(
                            "{}.{}+{}{}@example.edu",
                            first_name.to_lowercase(),
                            last_name.to_lowercase(),
                            role,
                            school_idx * 1000 + idx
                        ),
                        first_name,
                        last_name,
                        role,
                        certifications,
                        max_sections: rng.gen_range(4..=6),
                    });
                }
            }
            staff
        })
        .collect()
}

pub async fn seed_staff(
    db: &PgPool,
    school_ids: &[SchoolId],
    per_school: &StaffPerSchool,
    password_hash: &str,
) -> SeedResult<Vec<StaffId>> {
    let start_time = Instant::now();
    println!(
        "👥 Seeding {} staff accounts ({} per school)...",
        school_ids.len() * per_school.total(),
        per_school.total()
    );

    let staff = generate_staff(school_ids, per_school);
    let mut tx = db.begin().await?;

    let mut ids = Vec::with_capacity(staff.len());
    // 8 params per row
    for chunk in staff.chunks(800) {
        ids.extend(insert_staff_chunk(&mut tx, chunk, password_hash).await?);
    }
    tx.commit().await?;

    println!("   ✓ Inserted {} staff in {:?}", ids.len(), start_time.elapsed());
    Ok(ids)
}

async fn insert_staff_chunk(
    tx: &mut Transaction<'_, Postgres>,
    staff: &[StaffSeed],
    password_hash: &str,
) -> SeedResult<Vec<StaffId>> {
    if staff.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO staff (school_id, first_name, last_name, email, password, role, certifications, max_sections) VALUES ",
    );
    for i in 0..staff.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 8;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6,
            p + 7,
            p + 8
        ));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, StaffId>(&query);
    for member in staff {
        q = q
            .bind(member.school_id)
            .bind(&member.first_name)
            .bind(&member.last_name)
            .bind(&member.email)
            .bind(password_hash)
            .bind(member.role)
            .bind(&member.certifications)
            .bind(member.max_sections);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}
