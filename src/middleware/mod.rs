//! Request extractors and middleware.
//!
//! - [`auth`]: bearer token extraction and permission extractors
//! - [`rate_limit`]: per-client token buckets in front of `/api`
//!
//! # Authorization
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] verifies the token and exposes its claims
//! 3. A `RequireX` extractor checks that the claims grant the permission
//! 4. Handlers scope the query to the caller's school via
//!    [`crate::utils::auth_helpers`]
//!
//! ```ignore
//! use crate::middleware::auth::RequireStudentsWrite;
//!
//! async fn create_student(
//!     RequireStudentsWrite(auth_user): RequireStudentsWrite,
//! ) -> impl IntoResponse {
//!     // only runs when the token carries "students:write"
//! }
//! ```

pub mod auth;
pub mod rate_limit;
