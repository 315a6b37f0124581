//! Staff login and token refresh.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
