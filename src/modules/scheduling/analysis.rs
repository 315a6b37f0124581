//! Schedule conflict detection and the health score.
//!
//! Works on an in-memory snapshot of one academic year; the service loads
//! the snapshot and caches the results.

use std::collections::{BTreeMap, HashMap};

use schoolhouse_models::ids::{AcademicYearId, RoomId, SectionId, StaffId};
use schoolhouse_models::scheduling::meeting_days;
use sqlx::FromRow;

use super::model::{
    ConflictKind, ConflictReport, ConflictSeverity, RoomType, ScheduleConflict, ScheduleHealth,
};

/// A section joined with the course fields the analysis needs.
#[derive(Debug, Clone, FromRow)]
pub struct SectionSlot {
    pub id: SectionId,
    pub course_code: String,
    pub subject: String,
    pub required_room_type: Option<RoomType>,
    pub teacher_id: Option<StaffId>,
    pub room_id: Option<RoomId>,
    pub period: i32,
    pub meeting_days: i32,
    pub capacity: i32,
    pub enrolled_count: i64,
}

impl SectionSlot {
    pub fn clashes_with(&self, period: i32, days: i32) -> bool {
        self.period == period && meeting_days::overlaps(self.meeting_days, days)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TeacherInfo {
    pub id: StaffId,
    pub name: String,
    pub certifications: Vec<String>,
    pub max_sections: i32,
    pub is_active: bool,
}

impl TeacherInfo {
    pub fn is_certified_for(&self, subject: &str) -> bool {
        self.certifications
            .iter()
            .any(|c| c.eq_ignore_ascii_case(subject))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RoomInfo {
    pub id: RoomId,
    pub name: String,
    pub room_type: RoomType,
    pub capacity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleSnapshot {
    pub sections: Vec<SectionSlot>,
    pub teachers: Vec<TeacherInfo>,
    pub rooms: Vec<RoomInfo>,
}

const ERROR_PENALTY: i32 = 10;
const WARNING_PENALTY: i32 = 3;

fn conflict(
    kind: ConflictKind,
    section_ids: Vec<SectionId>,
    teacher_id: Option<StaffId>,
    room_id: Option<RoomId>,
    message: String,
) -> ScheduleConflict {
    ScheduleConflict {
        kind,
        severity: kind.severity(),
        section_ids,
        teacher_id,
        room_id,
        message,
    }
}

/// Pairs of sections sharing a resource in the same period on at least one
/// common day.
fn double_bookings<K, F>(sections: &[SectionSlot], key: F) -> Vec<(K, SectionId, SectionId)>
where
    K: Copy + Ord,
    F: Fn(&SectionSlot) -> Option<K>,
{
    let mut by_resource: BTreeMap<K, Vec<&SectionSlot>> = BTreeMap::new();
    for section in sections {
        if let Some(k) = key(section) {
            by_resource.entry(k).or_default().push(section);
        }
    }

    let mut pairs = Vec::new();
    for (resource, group) in by_resource {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a.clashes_with(b.period, b.meeting_days) {
                    pairs.push((resource, a.id, b.id));
                }
            }
        }
    }
    pairs
}

pub fn detect_conflicts(snapshot: &ScheduleSnapshot) -> Vec<ScheduleConflict> {
    let teachers: HashMap<StaffId, &TeacherInfo> =
        snapshot.teachers.iter().map(|t| (t.id, t)).collect();
    let rooms: HashMap<RoomId, &RoomInfo> = snapshot.rooms.iter().map(|r| (r.id, r)).collect();
    let codes: HashMap<SectionId, &str> = snapshot
        .sections
        .iter()
        .map(|s| (s.id, s.course_code.as_str()))
        .collect();
    let code = |id: &SectionId| codes.get(id).copied().unwrap_or("?");

    let mut conflicts = Vec::new();

    for (teacher_id, a, b) in double_bookings(&snapshot.sections, |s| s.teacher_id) {
        let name = teachers.get(&teacher_id).map_or("Teacher", |t| t.name.as_str());
        conflicts.push(conflict(
            ConflictKind::TeacherDoubleBooked,
            vec![a, b],
            Some(teacher_id),
            None,
            format!("{} teaches {} and {} at the same time", name, code(&a), code(&b)),
        ));
    }

    for (room_id, a, b) in double_bookings(&snapshot.sections, |s| s.room_id) {
        let name = rooms.get(&room_id).map_or("Room", |r| r.name.as_str());
        conflicts.push(conflict(
            ConflictKind::RoomDoubleBooked,
            vec![a, b],
            None,
            Some(room_id),
            format!("{} hosts {} and {} at the same time", name, code(&a), code(&b)),
        ));
    }

    for section in &snapshot.sections {
        if let Some(room) = section.room_id.and_then(|id| rooms.get(&id)) {
            if room.capacity < section.capacity {
                conflicts.push(conflict(
                    ConflictKind::RoomOverCapacity,
                    vec![section.id],
                    None,
                    Some(room.id),
                    format!(
                        "{} seats {} but {} allows {} students",
                        room.name, room.capacity, section.course_code, section.capacity
                    ),
                ));
            }

            if let Some(required) = section.required_room_type
                && required != room.room_type
            {
                conflicts.push(conflict(
                    ConflictKind::RoomTypeMismatch,
                    vec![section.id],
                    None,
                    Some(room.id),
                    format!(
                        "{} needs a {} room but is in {} ({})",
                        section.course_code, required, room.name, room.room_type
                    ),
                ));
            }
        }

        if let Some(teacher) = section.teacher_id.and_then(|id| teachers.get(&id))
            && !teacher.is_certified_for(&section.subject)
        {
            conflicts.push(conflict(
                ConflictKind::TeacherNotCertified,
                vec![section.id],
                Some(teacher.id),
                None,
                format!(
                    "{} is not certified in {} for {}",
                    teacher.name, section.subject, section.course_code
                ),
            ));
        }
    }

    let mut loads: BTreeMap<StaffId, Vec<SectionId>> = BTreeMap::new();
    for section in &snapshot.sections {
        if let Some(teacher_id) = section.teacher_id {
            loads.entry(teacher_id).or_default().push(section.id);
        }
    }
    for (teacher_id, section_ids) in loads {
        let Some(teacher) = teachers.get(&teacher_id) else {
            continue;
        };
        if section_ids.len() > teacher.max_sections as usize {
            let count = section_ids.len();
            conflicts.push(conflict(
                ConflictKind::TeacherOverloaded,
                section_ids,
                Some(teacher_id),
                None,
                format!(
                    "{} teaches {} sections, above the limit of {}",
                    teacher.name, count, teacher.max_sections
                ),
            ));
        }
    }

    conflicts
}

pub fn conflict_report(
    academic_year_id: AcademicYearId,
    snapshot: &ScheduleSnapshot,
) -> ConflictReport {
    let conflicts = detect_conflicts(snapshot);

    let mut by_kind = BTreeMap::new();
    for c in &conflicts {
        *by_kind.entry(c.kind.as_str().to_string()).or_insert(0) += 1;
    }
    let errors = conflicts
        .iter()
        .filter(|c| c.severity == ConflictSeverity::Error)
        .count();

    ConflictReport {
        academic_year_id,
        section_count: snapshot.sections.len(),
        errors,
        warnings: conflicts.len() - errors,
        by_kind,
        conflicts,
    }
}

pub fn health_grade(score: i32) -> &'static str {
    match score {
        90.. => "A",
        80..=89 => "B",
        70..=79 => "C",
        60..=69 => "D",
        _ => "F",
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score starts at 100 and loses 10 per error and 3 per warning, clamped to
/// 0..=100. Unassigned shares and fill rate are reported alongside and drive
/// the recommendations.
pub fn schedule_health(report: &ConflictReport, snapshot: &ScheduleSnapshot) -> ScheduleHealth {
    let penalty = report.errors as i32 * ERROR_PENALTY + report.warnings as i32 * WARNING_PENALTY;
    let score = (100 - penalty).clamp(0, 100);

    let total = snapshot.sections.len();
    let no_teacher = snapshot
        .sections
        .iter()
        .filter(|s| s.teacher_id.is_none())
        .count();
    let no_room = snapshot
        .sections
        .iter()
        .filter(|s| s.room_id.is_none())
        .count();

    let average_fill_rate = if total == 0 {
        0.0
    } else {
        let sum: f64 = snapshot
            .sections
            .iter()
            .map(|s| s.enrolled_count as f64 / s.capacity.max(1) as f64)
            .sum();
        round2(sum * 100.0 / total as f64)
    };

    let mut recommendations = Vec::new();
    if report.errors > 0 {
        recommendations.push(format!(
            "Resolve {} double bookings or capacity errors before publishing the schedule",
            report.errors
        ));
    }
    if report
        .by_kind
        .contains_key(ConflictKind::TeacherOverloaded.as_str())
    {
        recommendations.push("Rebalance sections away from overloaded teachers".to_string());
    }
    if report
        .by_kind
        .contains_key(ConflictKind::TeacherNotCertified.as_str())
    {
        recommendations.push("Reassign sections taught outside certification".to_string());
    }
    if no_teacher > 0 {
        recommendations.push(format!(
            "{} sections have no teacher; run teacher assignment",
            no_teacher
        ));
    }
    if no_room > 0 {
        recommendations.push(format!(
            "{} sections have no room; run room assignment",
            no_room
        ));
    }
    if total > 0 && average_fill_rate < 50.0 {
        recommendations.push(format!(
            "Average fill rate is {:.1}%; consider merging under-enrolled sections",
            average_fill_rate
        ));
    }

    ScheduleHealth {
        academic_year_id: report.academic_year_id,
        score,
        grade: health_grade(score).to_string(),
        section_count: total,
        errors: report.errors,
        warnings: report.warnings,
        unassigned_teacher_pct: percentage(no_teacher, total),
        unassigned_room_pct: percentage(no_room, total),
        average_fill_rate,
        recommendations,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use schoolhouse_models::scheduling::meeting_days::{ALL_WEEK, MONDAY, TUESDAY};

    pub fn section(code: &str, subject: &str, period: i32, days: i32) -> SectionSlot {
        SectionSlot {
            id: SectionId::new(),
            course_code: code.to_string(),
            subject: subject.to_string(),
            required_room_type: None,
            teacher_id: None,
            room_id: None,
            period,
            meeting_days: days,
            capacity: 25,
            enrolled_count: 20,
        }
    }

    pub fn teacher(name: &str, certs: &[&str], max_sections: i32) -> TeacherInfo {
        TeacherInfo {
            id: StaffId::new(),
            name: name.to_string(),
            certifications: certs.iter().map(|c| c.to_string()).collect(),
            max_sections,
            is_active: true,
        }
    }

    pub fn room(name: &str, room_type: RoomType, capacity: i32) -> RoomInfo {
        RoomInfo {
            id: RoomId::new(),
            name: name.to_string(),
            room_type,
            capacity,
        }
    }

    #[test]
    fn test_teacher_double_booking_needs_shared_day() {
        let t = teacher("Ms. Lovelace", &["math"], 5);
        let mut a = section("ALG1", "math", 2, MONDAY);
        let mut b = section("GEO", "math", 2, TUESDAY);
        let mut c = section("CALC", "math", 2, ALL_WEEK);
        a.teacher_id = Some(t.id);
        b.teacher_id = Some(t.id);
        c.teacher_id = Some(t.id);

        let snapshot = ScheduleSnapshot {
            sections: vec![a.clone(), b.clone(), c.clone()],
            teachers: vec![t],
            rooms: vec![],
        };
        let conflicts = detect_conflicts(&snapshot);
        let doubles: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::TeacherDoubleBooked)
            .collect();

        // a/c and b/c clash; a/b meet on different days
        assert_eq!(doubles.len(), 2);
        assert!(doubles.iter().all(|d| d.section_ids.contains(&c.id)));
    }

    #[test]
    fn test_room_problems() {
        let lab = room("Lab 1", RoomType::Lab, 20);
        let mut chem = section("CHEM", "science", 3, ALL_WEEK);
        chem.room_id = Some(lab.id);
        chem.capacity = 24;
        let mut art = section("ART1", "art", 3, MONDAY);
        art.room_id = Some(lab.id);
        art.capacity = 15;
        art.required_room_type = Some(RoomType::Art);

        let snapshot = ScheduleSnapshot {
            sections: vec![chem, art],
            teachers: vec![],
            rooms: vec![lab],
        };
        let report = conflict_report(AcademicYearId::new(), &snapshot);

        assert_eq!(report.by_kind.get("room_double_booked"), Some(&1));
        assert_eq!(report.by_kind.get("room_over_capacity"), Some(&1));
        assert_eq!(report.by_kind.get("room_type_mismatch"), Some(&1));
        assert_eq!(report.errors, 2);
        assert_eq!(report.warnings, 1);
    }

    #[test]
    fn test_certification_and_overload() {
        let t = teacher("Mr. Turing", &["cs"], 1);
        let mut a = section("CS1", "cs", 1, ALL_WEEK);
        let mut b = section("HIST", "history", 2, ALL_WEEK);
        a.teacher_id = Some(t.id);
        b.teacher_id = Some(t.id);

        let snapshot = ScheduleSnapshot {
            sections: vec![a, b],
            teachers: vec![t],
            rooms: vec![],
        };
        let report = conflict_report(AcademicYearId::new(), &snapshot);

        assert_eq!(report.by_kind.get("teacher_not_certified"), Some(&1));
        let overload = report
            .conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::TeacherOverloaded)
            .unwrap();
        assert_eq!(overload.section_ids.len(), 2);
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn test_health_score_and_grade() {
        let t = teacher("Ms. Noether", &["math"], 5);
        let mut a = section("ALG1", "math", 1, ALL_WEEK);
        let mut b = section("ALG2", "math", 1, ALL_WEEK);
        a.teacher_id = Some(t.id);
        b.teacher_id = Some(t.id);
        b.enrolled_count = 5;

        let snapshot = ScheduleSnapshot {
            sections: vec![a, b],
            teachers: vec![t],
            rooms: vec![],
        };
        let report = conflict_report(AcademicYearId::new(), &snapshot);
        let health = schedule_health(&report, &snapshot);

        assert_eq!(health.score, 90);
        assert_eq!(health.grade, "A");
        assert_eq!(health.unassigned_teacher_pct, 0.0);
        assert_eq!(health.unassigned_room_pct, 100.0);
        assert_eq!(health.average_fill_rate, 50.0);
        assert!(health.recommendations.iter().any(|r| r.contains("no room")));
    }

    #[test]
    fn test_score_is_clamped() {
        let report = ConflictReport {
            academic_year_id: AcademicYearId::new(),
            section_count: 0,
            errors: 20,
            warnings: 0,
            by_kind: BTreeMap::new(),
            conflicts: vec![],
        };
        let health = schedule_health(&report, &ScheduleSnapshot::default());
        assert_eq!(health.score, 0);
        assert_eq!(health.grade, "F");
        assert_eq!(health.average_fill_rate, 0.0);
    }

    #[test]
    fn test_empty_schedule_is_healthy() {
        let snapshot = ScheduleSnapshot::default();
        let report = conflict_report(AcademicYearId::new(), &snapshot);
        let health = schedule_health(&report, &snapshot);
        assert_eq!(health.score, 100);
        assert!(health.recommendations.is_empty());
    }
}
