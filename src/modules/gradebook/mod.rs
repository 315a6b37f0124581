//! Grade categories, assignments, scores and weighted grade reports.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
