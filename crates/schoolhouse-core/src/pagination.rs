//! Pagination for list endpoints.
//!
//! Lists accept `limit` plus either `offset` or `page` (page wins when both
//! are present) and answer with a [`Paginated`] body:
//!
//! ```json
//! {
//!   "data": [...],
//!   "meta": { "total": 42, "limit": 10, "offset": 20, "has_more": true }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query strings send empty values as `""`; treat those as absent.
fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Metadata about a paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Total number of items across all pages
    pub total: i64,
    /// Maximum items per page (the limit that was applied)
    pub limit: i64,
    /// Number of items skipped (offset-based requests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Current page number (page-based requests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Whether there are more items after this page
    pub has_more: bool,
}

impl PaginationMeta {
    /// Builds the metadata for a page fetched with `params` out of `total` rows.
    #[must_use]
    pub fn new(total: i64, params: &PaginationParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();
        let page = params.page();

        Self {
            total,
            limit,
            offset: if page.is_some() { None } else { Some(offset) },
            page,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// Query parameters for pagination.
///
/// - `limit` is clamped to `[1, 100]` (default 10)
/// - `offset` is clamped to a minimum of 0
/// - `page` is 1-indexed and clamped to a minimum of 1
#[derive(Debug, Clone, Hash, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Maximum number of items to return (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0, ignored if `page` is set)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub offset: Option<i64>,
    /// Page number (1-indexed)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
}

impl PaginationParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        match self.page {
            Some(page) => (page.max(1) - 1).saturating_mul(self.limit()),
            None => self.offset.unwrap_or(0).max(0),
        }
    }

    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.page.map(|p| p.max(1))
    }
}

/// A page of `T` plus its metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Paginated<T: ToSchema> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T: ToSchema> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(total, params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<i64>, offset: Option<i64>, page: Option<i64>) -> PaginationParams {
        PaginationParams {
            limit,
            offset,
            page,
        }
    }

    #[test]
    fn test_defaults() {
        let p = PaginationParams::default();
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.page(), None);
    }

    #[test]
    fn test_limit_is_clamped() {
        for (input, expected) in [(Some(0), 1), (Some(-3), 1), (Some(50), 50), (Some(101), 100)] {
            assert_eq!(params(input, None, None).limit(), expected);
        }
    }

    #[test]
    fn test_negative_offset_is_zero() {
        assert_eq!(params(None, Some(-5), None).offset(), 0);
    }

    #[test]
    fn test_page_takes_precedence_over_offset() {
        let p = params(Some(20), Some(7), Some(3));
        assert_eq!(p.offset(), 40);
        assert_eq!(p.page(), Some(3));
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let p = params(Some(10), None, Some(0));
        assert_eq!(p.offset(), 0);
        assert_eq!(p.page(), Some(1));
    }

    #[test]
    fn test_meta_has_more() {
        let meta = PaginationMeta::new(25, &params(Some(10), Some(10), None));
        assert!(meta.has_more);
        assert_eq!(meta.offset, Some(10));

        let meta = PaginationMeta::new(25, &params(Some(10), Some(20), None));
        assert!(!meta.has_more);
    }

    #[test]
    fn test_meta_page_based_omits_offset() {
        let meta = PaginationMeta::new(5, &params(None, None, Some(1)));
        assert_eq!(meta.offset, None);
        assert_eq!(meta.page, Some(1));

        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("offset"));
    }

    #[test]
    fn test_deserialize_empty_strings() {
        let p: PaginationParams = serde_json::from_str(r#"{"limit":"","offset":""}"#).unwrap();
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 0);

        let p: PaginationParams = serde_json::from_str(r#"{"limit":"30","page":"2"}"#).unwrap();
        assert_eq!(p.limit(), 30);
        assert_eq!(p.offset(), 30);
    }

    #[test]
    fn test_huge_offset_and_page_saturate() {
        let p = params(Some(10), Some(i64::MAX), None);
        assert_eq!(p.offset(), i64::MAX);
        let meta = PaginationMeta::new(0, &p);
        assert!(!meta.has_more);

        let p = params(Some(100), None, Some(i64::MAX));
        assert_eq!(p.offset(), i64::MAX);
        assert!(!PaginationMeta::new(5, &p).has_more);
    }
}
