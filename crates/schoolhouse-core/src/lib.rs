//! # Schoolhouse Core
//!
//! Foundational types shared by every Schoolhouse crate:
//!
//! - [`errors`]: [`AppError`] and the `{ success: false, error }` envelope
//! - [`pagination`]: query parameters and paginated responses
//! - [`password`]: bcrypt hashing for staff accounts
//! - [`permissions`]: permission names and the role table
//! - [`serde`]: query-string deserialization helpers

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod serde;

pub use errors::{AppError, ErrorResponse};
pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
