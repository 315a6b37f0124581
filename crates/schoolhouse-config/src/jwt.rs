use std::env;

use crate::env_or;

/// JWT signing configuration.
///
/// - `JWT_SECRET`: HMAC secret
/// - `JWT_ACCESS_EXPIRY`: access token lifetime in seconds (default 1 hour)
/// - `JWT_REFRESH_EXPIRY`: refresh token lifetime in seconds (default 7 days)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            access_token_expiry: env_or("JWT_ACCESS_EXPIRY", 3600),
            refresh_token_expiry: env_or("JWT_REFRESH_EXPIRY", 604800),
        }
    }
}
