//! Filter predicate builder.
//!
//! A [`FilterConfig`] holds optional equality constraints; its [`Predicate`]
//! is their logical AND, with absent constraints always satisfied.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::record::{DiscountBin, OrderRecord};

/// Value that means "no filter" in user-facing option lists.
pub const ALL: &str = "All";

/// Optional equality filters applied before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub segment: Option<String>,
    pub category: Option<String>,
    #[serde(with = "bin_label", default)]
    pub discount_bin: Option<DiscountBin>,
}

impl FilterConfig {
    /// Build from loosely-typed options. `None`, blank and `"All"` mean no
    /// filter; an unrecognised bin label is an error.
    pub fn from_options(
        segment: Option<&str>,
        category: Option<&str>,
        discount_bin: Option<&str>,
    ) -> Result<Self> {
        let discount_bin = constraint(discount_bin)
            .map(str::parse::<DiscountBin>)
            .transpose()?;
        Ok(Self {
            segment: constraint(segment).map(str::to_string),
            category: constraint(category).map(str::to_string),
            discount_bin,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.segment.is_none() && self.category.is_none() && self.discount_bin.is_none()
    }

    pub fn predicate(&self) -> Predicate {
        Predicate {
            filters: self.clone(),
        }
    }
}

fn constraint(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

/// Reusable subset selector over canonical records.
#[derive(Debug, Clone)]
pub struct Predicate {
    filters: FilterConfig,
}

impl Predicate {
    pub fn matches(&self, record: &OrderRecord) -> bool {
        let f = &self.filters;
        f.segment.as_ref().is_none_or(|s| record.segment == *s)
            && f.category.as_ref().is_none_or(|c| record.category == *c)
            && f.discount_bin.is_none_or(|b| record.discount_bin == b)
    }

    /// Select the matching records, in input order.
    pub fn apply<'a>(&self, records: &[&'a OrderRecord]) -> Vec<&'a OrderRecord> {
        records.iter().copied().filter(|r| self.matches(r)).collect()
    }
}

// ---------------------------------------------------------------------------
// Available options
// ---------------------------------------------------------------------------

/// Distinct values a user can filter on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub segments: Vec<String>,
    pub categories: Vec<String>,
    pub discount_bins: Vec<DiscountBin>,
}

impl FilterOptions {
    /// Sorted distinct segments and categories, and the bins present in
    /// declared order.
    pub fn from_records(records: &[OrderRecord]) -> Self {
        let segments: BTreeSet<&str> = records.iter().map(|r| r.segment.as_str()).collect();
        let categories: BTreeSet<&str> = records.iter().map(|r| r.category.as_str()).collect();
        let bins: BTreeSet<DiscountBin> = records.iter().map(|r| r.discount_bin).collect();

        Self {
            segments: segments.into_iter().map(str::to_string).collect(),
            categories: categories.into_iter().map(str::to_string).collect(),
            discount_bins: bins.into_iter().collect(),
        }
    }
}

/// Serde adapter so configs carry bins as their labels.
mod bin_label {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{DiscountBin, constraint};

    pub fn serialize<S: Serializer>(bin: &Option<DiscountBin>, s: S) -> Result<S::Ok, S::Error> {
        match bin {
            Some(bin) => s.serialize_some(bin.label()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DiscountBin>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        constraint(raw.as_deref())
            .map(str::parse::<DiscountBin>)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
