//! Shared helpers for handlers.
//!
//! - [`auth_helpers`]: resolving the school a request is scoped to

pub mod auth_helpers;
