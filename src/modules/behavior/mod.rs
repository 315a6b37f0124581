//! Behavior incidents, their review workflow and attached consequences.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
