//! Fake schools, each with a current academic year.

use chrono::{Datelike, NaiveDate, Utc};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::phone_number::en::PhoneNumber;
use rayon::prelude::*;
use schoolhouse_models::ids::SchoolId;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{SchoolSeed, SeedResult};

const SCHOOL_KINDS: &[&str] = &["High School", "Academy", "Preparatory School", "Secondary School"];

pub fn generate_schools(count: usize) -> Vec<SchoolSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let state: String = StateAbbr().fake();
            let zip: String = ZipCode().fake();
            let kind = SCHOOL_KINDS[idx % SCHOOL_KINDS.len()];

            // The index keeps names unique when two schools share a city.
            SchoolSeed {
                name: format!("{} {} #{}", city, kind, idx + 1),
                address: format!("{} {}, {}, {} {}", building, street, city, state, zip),
                phone: PhoneNumber().fake(),
                email: format!("office{}@{}.example.edu", idx + 1, city.to_lowercase().replace(' ', "")),
            }
        })
        .collect()
}

/// Start and end of the school year containing `today` (August to June).
pub fn current_school_year(today: NaiveDate) -> (String, NaiveDate, NaiveDate) {
    let start_year = if today.month() >= 8 {
        today.year()
    } else {
        today.year() - 1
    };
    let start = NaiveDate::from_ymd_opt(start_year, 8, 15).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(start_year + 1, 6, 15).unwrap_or(today);
    (format!("{}-{}", start_year, start_year + 1), start, end)
}

pub async fn seed_schools(db: &PgPool, count: usize) -> SeedResult<Vec<SchoolId>> {
    let start_time = Instant::now();
    println!("📚 Seeding {} schools...", count);

    let schools = generate_schools(count);
    let mut tx = db.begin().await?;

    let mut school_ids = Vec::with_capacity(schools.len());
    for chunk in schools.chunks(500) {
        school_ids.extend(insert_schools_chunk(&mut tx, chunk).await?);
    }

    let (name, start, end) = current_school_year(Utc::now().date_naive());
    sqlx::query(
        "INSERT INTO academic_years (school_id, name, start_date, end_date, is_current)
         SELECT id, $2, $3, $4, TRUE FROM UNNEST($1::uuid[]) AS id",
    )
    .bind(&school_ids)
    .bind(&name)
    .bind(start)
    .bind(end)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} schools with academic year {} in {:?}",
        school_ids.len(),
        name,
        start_time.elapsed()
    );
    Ok(school_ids)
}

async fn insert_schools_chunk(
    tx: &mut Transaction<'_, Postgres>,
    schools: &[SchoolSeed],
) -> SeedResult<Vec<SchoolId>> {
    if schools.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("INSERT INTO schools (name, address, phone, email) VALUES ");
    for i in 0..schools.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 4;
        query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, SchoolId>(&query);
    for school in schools {
        q = q
            .bind(&school.name)
            .bind(&school.address)
            .bind(&school.phone)
            .bind(&school.email);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

/// Deletes every school; the foreign keys cascade to all school data and
/// school staff. System admins have no school and survive.
pub async fn clear_schools(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing schools...");

    let deleted = sqlx::query("DELETE FROM schools")
        .execute(db)
        .await?
        .rows_affected();

    println!("   ✓ Deleted {} schools in {:?}", deleted, start_time.elapsed());
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_schools_unique_names() {
        let schools = generate_schools(8);
        let mut names: Vec<&str> = schools.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_current_school_year() {
        let autumn = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let (name, start, end) = current_school_year(autumn);
        assert_eq!(name, "2025-2026");
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 6, 15).unwrap());

        let spring = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(current_school_year(spring).0, "2025-2026");
    }
}
