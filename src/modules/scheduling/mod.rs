//! Rooms, courses, sections and enrollments, plus schedule conflict
//! analysis and the greedy teacher/room auto-assignment.

pub mod analysis;
pub mod assignment;
pub mod controller;
pub mod model;
pub mod router;
pub mod service;
