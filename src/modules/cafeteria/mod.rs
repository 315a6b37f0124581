//! Cafeteria meal accounts: deposits, point-of-sale purchases and
//! low-balance reporting.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
