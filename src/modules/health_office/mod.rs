//! Health office: per-student health profiles, nurse visits and the daily
//! visit report.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
