//! Raw and canonical order records, plus the derived ordinal types.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use super::error::PipelineError;

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One row of the input dataset, exactly as read.
///
/// Every column is an optional string: typing and validation happen in the
/// normalizer, so a bad cell excludes one row instead of failing the load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrderRow {
    #[serde(rename = "Order ID", default)]
    pub order_id: Option<String>,
    #[serde(rename = "Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "Ship Date")]
    pub ship_date: Option<String>,
    #[serde(rename = "Segment")]
    pub segment: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Ship Mode")]
    pub ship_mode: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "Sales")]
    pub sales: Option<String>,
    #[serde(rename = "Profit")]
    pub profit: Option<String>,
    #[serde(rename = "Discount")]
    pub discount: Option<String>,
}

/// CSV headers that must be present for a dataset to load.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Order Date",
    "Ship Date",
    "Segment",
    "Category",
    "Ship Mode",
    "State",
    "Sales",
    "Profit",
    "Discount",
];

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

/// A typed order record with all derived fields populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_id: Option<String>,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub segment: String,
    pub category: String,
    pub ship_mode: String,
    pub state: String,
    pub sales: f64,
    pub profit: f64,
    pub discount: f64,
    /// Two-letter code, or `None` when `state` has no known mapping.
    pub state_code: Option<&'static str>,
    pub discount_bin: DiscountBin,
    pub is_loss: bool,
}

impl OrderRecord {
    /// Calendar month of the order date.
    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.order_date)
    }
}

impl From<&OrderRecord> for RawOrderRow {
    fn from(record: &OrderRecord) -> Self {
        Self {
            order_id: record.order_id.clone(),
            order_date: Some(record.order_date.format("%Y-%m-%d").to_string()),
            ship_date: Some(record.ship_date.format("%Y-%m-%d").to_string()),
            segment: Some(record.segment.clone()),
            category: Some(record.category.clone()),
            ship_mode: Some(record.ship_mode.clone()),
            state: Some(record.state.clone()),
            sales: Some(record.sales.to_string()),
            profit: Some(record.profit.to_string()),
            discount: Some(record.discount.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Discount bins
// ---------------------------------------------------------------------------

/// Ordinal bucket of a discount fraction.
///
/// Declaration order is the chart order; the derived `Ord` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscountBin {
    /// Exactly 0.
    Zero,
    /// (0, 0.1]
    UpTo10,
    /// (0.1, 0.2]
    UpTo20,
    /// (0.2, 0.4]
    UpTo40,
    /// (0.4, 0.8]
    UpTo80,
    /// (0.8, 1]
    Over80,
}

impl DiscountBin {
    pub const ALL: [DiscountBin; 6] = [
        Self::Zero,
        Self::UpTo10,
        Self::UpTo20,
        Self::UpTo40,
        Self::UpTo80,
        Self::Over80,
    ];

    /// Bin a discount fraction. Returns `None` outside `[0, 1]` (or NaN).
    pub fn from_discount(d: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&d) {
            return None;
        }
        let bin = if d == 0.0 {
            Self::Zero
        } else if d <= 0.1 {
            Self::UpTo10
        } else if d <= 0.2 {
            Self::UpTo20
        } else if d <= 0.4 {
            Self::UpTo40
        } else if d <= 0.8 {
            Self::UpTo80
        } else {
            Self::Over80
        };
        Some(bin)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Zero => "0%",
            Self::UpTo10 => "0–10%",
            Self::UpTo20 => "10–20%",
            Self::UpTo40 => "20–40%",
            Self::UpTo80 => "40–80%",
            Self::Over80 => ">80%",
        }
    }
}

impl fmt::Display for DiscountBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DiscountBin {
    type Err = PipelineError;

    /// Accepts the canonical en-dash labels and their ASCII-hyphen spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(['–', '—'], "-");
        match normalized.as_str() {
            "0%" => Ok(Self::Zero),
            "0-10%" => Ok(Self::UpTo10),
            "10-20%" => Ok(Self::UpTo20),
            "20-40%" => Ok(Self::UpTo40),
            "40-80%" => Ok(Self::UpTo80),
            ">80%" => Ok(Self::Over80),
            _ => Err(PipelineError::UnknownDiscountBin(s.to_string())),
        }
    }
}

impl Serialize for DiscountBin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Month buckets
// ---------------------------------------------------------------------------

/// Calendar year and month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
