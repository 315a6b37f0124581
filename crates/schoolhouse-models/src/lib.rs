//! # Schoolhouse Models
//!
//! Entities, request DTOs and report shapes for every Schoolhouse module,
//! together with the pure business rules that do not need a database:
//! grade math, attendance rates, immunization compliance, fee status,
//! meal pricing and the status workflows.
//!
//! Identifiers are strongly typed (see [`ids`]) and status columns map to
//! enums generated by the crate-internal `text_enum!` macro.

mod text_enum;

pub mod academic_years;
pub mod attendance;
pub mod auth;
pub mod behavior;
pub mod cafeteria;
pub mod common;
pub mod fees;
pub mod gifted;
pub mod gradebook;
pub mod health;
pub mod ids;
pub mod immunizations;
pub mod scheduling;
pub mod schools;
pub mod staff;
pub mod students;

pub use common::{DateRangeParams, SchoolScopeParams, first_duplicate};
pub use staff::{Staff, StaffRole};
pub use students::{Student, StudentStatus};
