//! Per-client rate limiting backed by `governor` keyed limiters.
//!
//! Clients are keyed by the first `X-Forwarded-For` address, then
//! `X-Real-IP`, then the socket peer address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, RateLimiter,
    clock::{Clock, DefaultClock},
};
use schoolhouse_config::RateLimitConfig;
use schoolhouse_core::AppError;
use tracing::warn;

use crate::state::AppState;

pub struct RateLimiters {
    general: DefaultKeyedRateLimiter<IpAddr>,
    auth: DefaultKeyedRateLimiter<IpAddr>,
}

impl fmt::Debug for RateLimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiters")
            .field("general_keys", &self.general.len())
            .field("auth_keys", &self.auth.len())
            .finish()
    }
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            general: RateLimiter::keyed(config.general_quota()),
            auth: RateLimiter::keyed(config.auth_quota()),
        }
    }

    /// Drops buckets that have fully refilled.
    pub fn retain_recent(&self) {
        self.general.retain_recent();
        self.auth.retain_recent();
    }
}

fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn check(limiter: &DefaultKeyedRateLimiter<IpAddr>, req: &Request) -> Result<(), Response> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(req.headers(), peer);

    limiter.check_key(&ip).map_err(|not_until| {
        let wait = not_until.wait_time_from(DefaultClock::default().now());
        warn!(client.ip = %ip, path = %req.uri().path(), "Rate limit exceeded");

        let mut response = AppError::new(
            StatusCode::TOO_MANY_REQUESTS,
            anyhow::anyhow!("Too many requests, please retry later"),
        )
        .into_response();
        if let Ok(value) = HeaderValue::from_str(&wait.as_secs().max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    })
}

pub async fn general_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match check(&state.rate_limiters.general, &req) {
        Ok(()) => next.run(req).await,
        Err(response) => response,
    }
}

pub async fn auth_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match check(&state.rate_limiters.auth, &req) {
        Ok(()) => next.run(req).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());

        let ip = client_ip(&headers, None);
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "192.0.2.10:5555".parse().unwrap();
        let ip = client_ip(&HeaderMap::new(), Some(peer));
        assert_eq!(ip, peer.ip());
    }

    #[test]
    fn test_client_ip_defaults_to_localhost() {
        assert_eq!(
            client_ip(&HeaderMap::new(), None),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn test_auth_limiter_exhausts_burst() {
        let config = RateLimitConfig {
            auth_per_second: 1,
            auth_burst_size: 2,
            ..RateLimitConfig::default()
        };
        let limiters = RateLimiters::new(&config);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));

        assert!(limiters.auth.check_key(&ip).is_ok());
        assert!(limiters.auth.check_key(&ip).is_ok());
        assert!(limiters.auth.check_key(&ip).is_err());

        let other = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 4));
        assert!(limiters.auth.check_key(&other).is_ok());
    }
}
