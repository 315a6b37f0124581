//! # Schoolhouse Auth
//!
//! JWT claims and token helpers for staff sessions.
//!
//! - **Access token** ([`Claims`]): carries the staff id, school scope, role
//!   and the permission list so handlers authorize without a database hit.
//! - **Refresh token** ([`RefreshTokenClaims`]): long-lived, exchanged for a
//!   fresh access token.

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
