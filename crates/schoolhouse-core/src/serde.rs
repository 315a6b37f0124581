//! Serde helpers for query-string inputs.
//!
//! Browsers and form builders send cleared filters as `?student_id=`. These
//! helpers read an empty value as absent instead of failing the whole query.

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Parses any `FromStr` type (ids, enums, numbers), empty meaning `None`.
pub fn deserialize_optional_from_str<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// `YYYY-MM-DD`, empty meaning `None`.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Filter {
        #[serde(default, deserialize_with = "deserialize_optional_from_str")]
        id: Option<Uuid>,
        #[serde(default, deserialize_with = "deserialize_optional_from_str")]
        grade: Option<i32>,
        #[serde(default, deserialize_with = "deserialize_optional_date")]
        from: Option<NaiveDate>,
    }

    #[test]
    fn test_empty_strings_are_none() {
        let f: Filter = serde_json::from_str(r#"{"id":"","grade":"","from":""}"#).unwrap();
        assert!(f.id.is_none());
        assert!(f.grade.is_none());
        assert!(f.from.is_none());
    }

    #[test]
    fn test_values_parse() {
        let id = Uuid::new_v4();
        let f: Filter = serde_json::from_str(&format!(
            r#"{{"id":"{}","grade":"7","from":"2025-09-02"}}"#,
            id
        ))
        .unwrap();
        assert_eq!(f.id, Some(id));
        assert_eq!(f.grade, Some(7));
        assert_eq!(f.from, NaiveDate::from_ymd_opt(2025, 9, 2));
    }

    #[test]
    fn test_missing_fields_default() {
        let f: Filter = serde_json::from_str("{}").unwrap();
        assert!(f.id.is_none());
        assert!(f.from.is_none());
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(serde_json::from_str::<Filter>(r#"{"from":"09/02/2025"}"#).is_err());
        assert!(serde_json::from_str::<Filter>(r#"{"grade":"seven"}"#).is_err());
    }
}
