//! Academic years; at most one per school is current.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
