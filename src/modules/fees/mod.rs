//! Fee types, assessments, payments, waivers and statements.
//!
//! Amounts are integer cents. A student fee copies the fee type's amount and
//! due date when it is assessed, so later edits to the type do not rewrite
//! what a family already owes.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
