//! Daily attendance: bulk marking, summaries and the chronic-absence report.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
