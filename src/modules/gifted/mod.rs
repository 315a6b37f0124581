//! Gifted and talented program: referrals, status workflow, evaluations
//! and annual reviews.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
