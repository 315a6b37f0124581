//! Rate limiting configuration.
//!
//! Token-bucket limits per client, with a stricter bucket for the login and
//! refresh endpoints:
//!
//! - `RATE_LIMIT_GENERAL_PER_SECOND` (default 20)
//! - `RATE_LIMIT_GENERAL_BURST_SIZE` (default 60)
//! - `RATE_LIMIT_AUTH_PER_SECOND` (default 1)
//! - `RATE_LIMIT_AUTH_BURST_SIZE` (default 5)

use std::num::NonZeroU32;

use governor::Quota;

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Tokens replenished per second for general endpoints
    pub general_per_second: u32,
    /// Bucket size for general endpoints
    pub general_burst_size: u32,
    /// Tokens replenished per second for auth endpoints
    pub auth_per_second: u32,
    /// Bucket size for auth endpoints
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general_per_second: 20,
            general_burst_size: 60,
            auth_per_second: 1,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            general_per_second: env_or("RATE_LIMIT_GENERAL_PER_SECOND", defaults.general_per_second),
            general_burst_size: env_or("RATE_LIMIT_GENERAL_BURST_SIZE", defaults.general_burst_size),
            auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    #[must_use]
    pub fn general_quota(&self) -> Quota {
        quota(self.general_per_second, self.general_burst_size)
    }

    #[must_use]
    pub fn auth_quota(&self) -> Quota {
        quota(self.auth_per_second, self.auth_burst_size)
    }
}

/// Zero values are bumped to 1; a zero-rate bucket would reject everything.
fn quota(per_second: u32, burst: u32) -> Quota {
    let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(rate).allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.general_per_second, 20);
        assert_eq!(config.auth_burst_size, 5);
    }

    #[test]
    fn test_auth_quota_burst() {
        let config = RateLimitConfig::default();
        assert_eq!(config.auth_quota().burst_size().get(), 5);
        assert_eq!(config.general_quota().burst_size().get(), 60);
    }

    #[test]
    fn test_zero_values_do_not_panic() {
        let config = RateLimitConfig {
            general_per_second: 0,
            general_burst_size: 0,
            auth_per_second: 0,
            auth_burst_size: 0,
        };
        assert_eq!(config.general_quota().burst_size().get(), 1);
    }
}
