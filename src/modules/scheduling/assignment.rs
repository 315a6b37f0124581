//! Greedy planners for the auto-assign endpoints.
//!
//! Both planners only touch sections that have no teacher (or room) yet,
//! and treat already-planned assignments as booked when checking later
//! sections.

use std::collections::HashMap;

use schoolhouse_models::ids::{RoomId, StaffId};

use super::analysis::{RoomInfo, ScheduleSnapshot, SectionSlot, TeacherInfo};
use super::model::{AutoAssignResult, PlannedAssignment};

const CERTIFIED_BONUS: i32 = 50;
const LOAD_HEADROOM_WEIGHT: i32 = 5;

fn unassigned_by_size<'a, F>(sections: &'a [SectionSlot], is_open: F) -> Vec<&'a SectionSlot>
where
    F: Fn(&SectionSlot) -> bool,
{
    let mut open: Vec<&SectionSlot> = sections.iter().filter(|s| is_open(s)).collect();
    open.sort_by(|a, b| {
        b.capacity
            .cmp(&a.capacity)
            .then_with(|| a.course_code.cmp(&b.course_code))
    });
    open
}

fn finish(dry_run: bool, plan: Vec<PlannedAssignment>, open: &[&SectionSlot]) -> AutoAssignResult {
    let unassigned_sections: Vec<_> = open
        .iter()
        .filter(|s| !plan.iter().any(|p| p.section_id == s.id))
        .map(|s| s.id)
        .collect();

    AutoAssignResult {
        dry_run,
        assigned: plan.len(),
        unassigned: unassigned_sections.len(),
        plan,
        unassigned_sections,
    }
}

/// Picks a teacher for every section without one.
///
/// A candidate must be active, under their section limit and free in the slot.
/// Certified teachers score higher, then teachers with more headroom.
pub fn plan_teacher_assignments(snapshot: &ScheduleSnapshot, dry_run: bool) -> AutoAssignResult {
    let mut booked: HashMap<StaffId, Vec<(i32, i32)>> = HashMap::new();
    for section in &snapshot.sections {
        if let Some(teacher_id) = section.teacher_id {
            booked
                .entry(teacher_id)
                .or_default()
                .push((section.period, section.meeting_days));
        }
    }

    let open = unassigned_by_size(&snapshot.sections, |s| s.teacher_id.is_none());
    let mut plan = Vec::new();

    for section in &open {
        let best = snapshot
            .teachers
            .iter()
            .filter(|teacher| teacher.is_active)
            .filter_map(|teacher| {
                let slots = booked.get(&teacher.id).map_or(&[][..], Vec::as_slice);
                let remaining = teacher.max_sections - slots.len() as i32;
                let clash = slots
                    .iter()
                    .any(|&(period, days)| section.clashes_with(period, days));
                if remaining <= 0 || clash {
                    return None;
                }
                let certified = if teacher.is_certified_for(&section.subject) {
                    CERTIFIED_BONUS
                } else {
                    0
                };
                Some((certified + remaining * LOAD_HEADROOM_WEIGHT, teacher))
            })
            .max_by(|(sa, ta): &(i32, &TeacherInfo), (sb, tb)| {
                sa.cmp(sb).then_with(|| tb.name.cmp(&ta.name))
            });

        if let Some((score, teacher)) = best {
            booked
                .entry(teacher.id)
                .or_default()
                .push((section.period, section.meeting_days));
            plan.push(PlannedAssignment {
                section_id: section.id,
                course_code: section.course_code.clone(),
                resource_id: teacher.id.into_inner(),
                resource_name: teacher.name.clone(),
                score,
            });
        }
    }

    finish(dry_run, plan, &open)
}

/// Picks a room for every section without one.
///
/// A candidate must match the course's room type when it has one, seat the
/// whole section and be free in the slot. The tightest fit wins.
pub fn plan_room_assignments(snapshot: &ScheduleSnapshot, dry_run: bool) -> AutoAssignResult {
    let mut booked: HashMap<RoomId, Vec<(i32, i32)>> = HashMap::new();
    for section in &snapshot.sections {
        if let Some(room_id) = section.room_id {
            booked
                .entry(room_id)
                .or_default()
                .push((section.period, section.meeting_days));
        }
    }

    let open = unassigned_by_size(&snapshot.sections, |s| s.room_id.is_none());
    let mut plan = Vec::new();

    for section in &open {
        let best = snapshot
            .rooms
            .iter()
            .filter(|room| {
                section
                    .required_room_type
                    .is_none_or(|required| required == room.room_type)
            })
            .filter(|room| room.capacity >= section.capacity)
            .filter(|room| {
                booked.get(&room.id).is_none_or(|slots| {
                    !slots
                        .iter()
                        .any(|&(period, days)| section.clashes_with(period, days))
                })
            })
            .min_by(|a: &&RoomInfo, b| {
                a.capacity
                    .cmp(&b.capacity)
                    .then_with(|| a.name.cmp(&b.name))
            });

        if let Some(room) = best {
            booked
                .entry(room.id)
                .or_default()
                .push((section.period, section.meeting_days));
            let surplus = room.capacity - section.capacity;
            plan.push(PlannedAssignment {
                section_id: section.id,
                course_code: section.course_code.clone(),
                resource_id: room.id.into_inner(),
                resource_name: room.name.clone(),
                score: (100 - surplus).max(0),
            });
        }
    }

    finish(dry_run, plan, &open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::scheduling::analysis::tests::{room, section, teacher};
    use crate::modules::scheduling::model::RoomType;
    use schoolhouse_models::scheduling::meeting_days::{ALL_WEEK, MONDAY, TUESDAY};

    #[test]
    fn test_prefers_certified_teacher() {
        let math = teacher("Ms. Hopper", &["math"], 3);
        let art = teacher("Mr. Ross", &["art"], 5);
        let alg = section("ALG1", "math", 1, ALL_WEEK);

        let snapshot = ScheduleSnapshot {
            sections: vec![alg.clone()],
            teachers: vec![math.clone(), art],
            rooms: vec![],
        };
        let result = plan_teacher_assignments(&snapshot, true);

        assert_eq!(result.assigned, 1);
        assert_eq!(result.plan[0].resource_id, math.id.into_inner());
        assert_eq!(result.plan[0].score, 50 + 3 * 5);
        assert!(result.dry_run);
    }

    #[test]
    fn test_teacher_is_not_double_booked_by_plan() {
        let only = teacher("Ms. Hopper", &["math"], 5);
        let a = section("ALG1", "math", 1, MONDAY);
        let b = section("ALG2", "math", 1, MONDAY);
        let c = section("GEO", "math", 1, TUESDAY);

        let snapshot = ScheduleSnapshot {
            sections: vec![a, b, c],
            teachers: vec![only],
            rooms: vec![],
        };
        let result = plan_teacher_assignments(&snapshot, false);

        assert_eq!(result.assigned, 2);
        assert_eq!(result.unassigned, 1);
        assert_eq!(result.unassigned_sections.len(), 1);
    }

    #[test]
    fn test_teacher_load_limit() {
        let t = teacher("Mr. Knuth", &["cs"], 1);
        let mut taught = section("CS1", "cs", 1, ALL_WEEK);
        taught.teacher_id = Some(t.id);
        let open = section("CS2", "cs", 2, ALL_WEEK);

        let snapshot = ScheduleSnapshot {
            sections: vec![taught, open],
            teachers: vec![t],
            rooms: vec![],
        };
        let result = plan_teacher_assignments(&snapshot, true);
        assert_eq!(result.assigned, 0);
        assert_eq!(result.unassigned, 1);
    }

    #[test]
    fn test_inactive_teacher_is_skipped() {
        let mut retired = teacher("Mr. Chips", &["latin"], 5);
        retired.is_active = false;
        let latin = section("LAT1", "latin", 1, ALL_WEEK);

        let snapshot = ScheduleSnapshot {
            sections: vec![latin],
            teachers: vec![retired],
            rooms: vec![],
        };
        assert_eq!(plan_teacher_assignments(&snapshot, true).assigned, 0);
    }

    #[test]
    fn test_room_tightest_fit_and_type() {
        let big = room("Auditorium", RoomType::Classroom, 80);
        let snug = room("101", RoomType::Classroom, 26);
        let small = room("102", RoomType::Classroom, 10);
        let lab = room("Lab", RoomType::Lab, 30);

        let lecture = section("HIST", "history", 1, ALL_WEEK);
        let mut chem = section("CHEM", "science", 1, ALL_WEEK);
        chem.required_room_type = Some(RoomType::Lab);

        let snapshot = ScheduleSnapshot {
            sections: vec![lecture.clone(), chem.clone()],
            teachers: vec![],
            rooms: vec![big, snug.clone(), small, lab.clone()],
        };
        let result = plan_room_assignments(&snapshot, true);

        assert_eq!(result.assigned, 2);
        let pick = |id| {
            result
                .plan
                .iter()
                .find(|p| p.section_id == id)
                .map(|p| p.resource_id)
        };
        assert_eq!(pick(lecture.id), Some(snug.id.into_inner()));
        assert_eq!(pick(chem.id), Some(lab.id.into_inner()));
        assert_eq!(result.plan.iter().find(|p| p.section_id == lecture.id).unwrap().score, 99);
    }

    #[test]
    fn test_room_busy_slot_is_skipped() {
        let only = room("101", RoomType::Classroom, 30);
        let mut held = section("ENG", "english", 4, ALL_WEEK);
        held.room_id = Some(only.id);
        let open = section("SPAN", "spanish", 4, MONDAY);

        let snapshot = ScheduleSnapshot {
            sections: vec![held, open.clone()],
            teachers: vec![],
            rooms: vec![only],
        };
        let result = plan_room_assignments(&snapshot, true);
        assert_eq!(result.unassigned_sections, vec![open.id]);
    }
}
