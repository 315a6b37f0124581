//! Schools are tenants; only system admins manage them.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
