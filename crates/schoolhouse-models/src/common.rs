//! Query parameters and helpers shared by several modules.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::ids::SchoolId;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SchoolScopeParams {
    /// Required for system admins, ignored for school staff
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_from_str")]
    pub school_id: Option<SchoolId>,
}

/// Inclusive date window.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeParams {
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "schoolhouse_core::serde::deserialize_optional_date")]
    pub to: Option<NaiveDate>,
}

impl DateRangeParams {
    /// `from` after `to` is the only invalid combination.
    pub fn validate(&self) -> Result<(), &'static str> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err("'from' must not be after 'to'"),
            _ => Ok(()),
        }
    }
}

/// First value that appears more than once, e.g. a student listed twice in
/// one bulk payload.
pub fn first_duplicate<T: Copy + Eq + Hash>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut seen = HashSet::new();
    values.into_iter().find(|value| !seen.insert(*value))
}
