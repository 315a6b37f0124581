//! Cache keys and invalidation helpers.
//!
//! Keys are relative to the configured prefix; [`RedisCache`] adds it.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::RedisCache;

/// Schedule analysis results, per school and academic year.
pub mod scheduling {
    use super::*;

    pub fn health(school_id: Uuid, academic_year_id: Uuid) -> String {
        format!("schedule:{}:{}:health", school_id, academic_year_id)
    }

    pub fn conflicts(school_id: Uuid, academic_year_id: Uuid) -> String {
        format!("schedule:{}:{}:conflicts", school_id, academic_year_id)
    }

    pub fn school_pattern(school_id: Uuid) -> String {
        format!("schedule:{}:*", school_id)
    }
}

/// Immunization compliance reports, per school and filter set.
pub mod immunizations {
    use super::*;

    pub fn compliance_report(school_id: Uuid, filters_hash: &str) -> String {
        format!("immunizations:{}:report:{}", school_id, filters_hash)
    }

    pub fn school_pattern(school_id: Uuid) -> String {
        format!("immunizations:{}:*", school_id)
    }
}

/// Short, stable key component for a set of filters: the first 16 hex
/// digits of the SHA-256 of their JSON form.
pub fn hash_filters<T: Serialize>(filters: &T) -> String {
    let json = serde_json::to_vec(filters).unwrap_or_default();
    let digest = Sha256::digest(&json);
    hex::encode(&digest[..8])
}

/// Invalidation after writes. Failures are logged, never returned: a stale
/// entry expires with its TTL.
pub mod invalidate {
    use super::*;

    /// Call after any write to sections, rooms, courses, enrollments or staff.
    pub async fn schedule(cache: Option<&RedisCache>, school_id: Uuid) {
        let Some(cache) = cache else { return };

        if let Err(e) = cache
            .invalidate_pattern(&scheduling::school_pattern(school_id))
            .await
        {
            warn!(error = %e, school_id = %school_id, "Failed to invalidate schedule caches");
        }
    }

    /// Call after writes to requirements, records, exemptions or students.
    pub async fn compliance(cache: Option<&RedisCache>, school_id: Uuid) {
        let Some(cache) = cache else { return };

        if let Err(e) = cache
            .invalidate_pattern(&immunizations::school_pattern(school_id))
            .await
        {
            warn!(error = %e, school_id = %school_id, "Failed to invalidate compliance caches");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_keys_share_school_pattern() {
        let school = Uuid::nil();
        let year = Uuid::from_u128(7);
        let health = scheduling::health(school, year);
        assert!(health.starts_with("schedule:00000000-0000-0000-0000-000000000000:"));
        assert!(health.ends_with(":health"));
        assert_eq!(
            scheduling::school_pattern(school).trim_end_matches('*'),
            format!("schedule:{}:", school)
        );
    }

    #[test]
    fn test_hash_filters() {
        let a = hash_filters(&("grade", 5));
        let b = hash_filters(&("grade", 5));
        let c = hash_filters(&("grade", 6));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn test_invalidate_without_cache_is_noop() {
        invalidate::schedule(None, Uuid::nil()).await;
        invalidate::compliance(None, Uuid::nil()).await;
    }
}
