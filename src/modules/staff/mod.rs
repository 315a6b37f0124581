//! Staff accounts within a school.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
