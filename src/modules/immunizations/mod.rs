//! Immunization requirements, dose records, exemptions and compliance
//! reporting.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
