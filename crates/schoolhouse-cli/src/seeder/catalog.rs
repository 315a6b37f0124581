//! Rooms and a course catalog for every school.

use schoolhouse_models::ids::SchoolId;
use schoolhouse_models::scheduling::RoomType;
use sqlx::PgPool;
use std::time::Instant;

use super::models::{CourseSeed, RoomSeed, SeedResult};

pub fn room_templates(classrooms: usize) -> Vec<RoomSeed> {
    let mut rooms: Vec<RoomSeed> = (1..=classrooms)
        .map(|n| RoomSeed {
            name: format!("Room {}", 100 + n),
            room_type: RoomType::Classroom,
            capacity: 30,
        })
        .collect();

    rooms.extend([
        RoomSeed {
            name: "Science Lab A".to_string(),
            room_type: RoomType::Lab,
            capacity: 24,
        },
        RoomSeed {
            name: "Science Lab B".to_string(),
            room_type: RoomType::Lab,
            capacity: 24,
        },
        RoomSeed {
            name: "Gymnasium".to_string(),
            room_type: RoomType::Gym,
            capacity: 60,
        },
        RoomSeed {
            name: "Band Room".to_string(),
            room_type: RoomType::Music,
            capacity: 40,
        },
        RoomSeed {
            name: "Art Studio".to_string(),
            room_type: RoomType::Art,
            capacity: 25,
        },
        RoomSeed {
            name: "Library".to_string(),
            room_type: RoomType::Library,
            capacity: 50,
        },
    ]);
    rooms
}

/// One course per subject and grade; some subjects need a special room.
pub fn course_templates(grade_levels: &[i32]) -> Vec<CourseSeed> {
    const SUBJECTS: &[(&str, &str, Option<RoomType>)] = &[
        ("MATH", "Mathematics", None),
        ("ENG", "English", None),
        ("SCI", "Science", Some(RoomType::Lab)),
        ("HIST", "History", None),
        ("PE", "Physical Education", Some(RoomType::Gym)),
        ("ART", "Art", Some(RoomType::Art)),
        ("MUS", "Music", Some(RoomType::Music)),
        ("CS", "Computer Science", None),
    ];

    grade_levels
        .iter()
        .flat_map(|&grade| {
            SUBJECTS.iter().map(move |&(prefix, subject, room_type)| CourseSeed {
                code: format!("{}-{:02}", prefix, grade),
                name: format!("{} {}", subject, grade_label(grade)),
                subject,
                grade_level: Some(grade),
                required_room_type: room_type,
            })
        })
        .collect()
}

fn grade_label(grade: i32) -> String {
    if grade == 0 {
        "K".to_string()
    } else {
        format!("Grade {}", grade)
    }
}

pub async fn seed_catalog(
    db: &PgPool,
    school_ids: &[SchoolId],
    grade_levels: &[i32],
    classrooms: usize,
) -> SeedResult<()> {
    let start_time = Instant::now();
    let rooms = room_templates(classrooms);
    let courses = course_templates(grade_levels);
    println!(
        "🏫 Seeding {} rooms and {} courses per school...",
        rooms.len(),
        courses.len()
    );

    // Column arrays for UNNEST; each template set is cross-joined with every school.
    let room_names: Vec<&str> = rooms.iter().map(|r| r.name.as_str()).collect();
    let room_types: Vec<RoomType> = rooms.iter().map(|r| r.room_type).collect();
    let capacities: Vec<i32> = rooms.iter().map(|r| r.capacity).collect();

    let codes: Vec<&str> = courses.iter().map(|c| c.code.as_str()).collect();
    let names: Vec<&str> = courses.iter().map(|c| c.name.as_str()).collect();
    let subjects: Vec<&str> = courses.iter().map(|c| c.subject).collect();
    let grades: Vec<Option<i32>> = courses.iter().map(|c| c.grade_level).collect();
    let required: Vec<Option<&str>> = courses
        .iter()
        .map(|c| c.required_room_type.map(|t| t.as_str()))
        .collect();

    let mut tx = db.begin().await?;

    let room_count = sqlx::query(
        "INSERT INTO rooms (school_id, name, room_type, capacity)
         SELECT s.id, r.name, r.room_type, r.capacity
         FROM UNNEST($1::uuid[]) AS s(id)
         CROSS JOIN UNNEST($2::text[], $3::text[], $4::int[]) AS r(name, room_type, capacity)",
    )
    .bind(school_ids)
    .bind(&room_names)
    .bind(&room_types)
    .bind(&capacities)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let course_count = sqlx::query(
        "INSERT INTO courses (school_id, code, name, subject, grade_level, required_room_type)
         SELECT s.id, c.code, c.name, c.subject, c.grade_level, c.required_room_type
         FROM UNNEST($1::uuid[]) AS s(id)
         CROSS JOIN UNNEST($2::text[], $3::text[], $4::text[], $5::int[], $6::text[])
             AS c(code, name, subject, grade_level, required_room_type)",
    )
    .bind(school_ids)
    .bind(&codes)
    .bind(&names)
    .bind(&subjects)
    .bind(&grades)
    .bind(&required)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} rooms and {} courses in {:?}",
        room_count,
        course_count,
        start_time.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_templates_include_special_rooms() {
        let rooms = room_templates(4);
        assert_eq!(rooms.len(), 10);
        for room_type in [RoomType::Lab, RoomType::Gym, RoomType::Music, RoomType::Art] {
            assert!(rooms.iter().any(|r| r.room_type == room_type));
        }
    }

    #[test]
    fn test_course_codes_unique() {
        let courses = course_templates(&[0, 9, 10]);
        assert_eq!(courses.len(), 24);
        let mut codes: Vec<&str> = courses.iter().map(|c| c.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 24);
        assert!(courses.iter().any(|c| c.name == "Art K"));
    }
}
