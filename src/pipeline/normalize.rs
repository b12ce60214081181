//! Record normalizer: raw rows in, canonical records out.
//!
//! Rows missing a required date or numeric field are excluded and counted.
//! A discount outside `[0, 1]` aborts the load: it means the source data is
//! corrupt, and binning it anyway would misclassify financial figures.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error};

use super::error::{MalformedReason, MalformedRecord, PipelineError, Result};
use super::record::{DiscountBin, OrderRecord, RawOrderRow};
use super::states::state_code;

/// Maximum number of offending rows kept for display.
pub const MAX_SAMPLES: usize = 5;

const UNKNOWN: &str = "Unknown";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Rows excluded during normalization: a count plus a few samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExclusionSummary {
    pub count: usize,
    pub samples: Vec<MalformedRecord>,
}

impl ExclusionSummary {
    fn record(&mut self, malformed: MalformedRecord) {
        debug!(row = malformed.row, reason = %malformed.reason, "excluding malformed row");
        self.count += 1;
        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(malformed);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// User-facing summary line, or `None` when nothing was excluded.
    pub fn message(&self) -> Option<String> {
        match self.count {
            0 => None,
            1 => Some("1 row excluded due to malformed data".to_string()),
            n => Some(format!("{n} rows excluded due to malformed data")),
        }
    }
}

/// Output of a normalization pass.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<OrderRecord>,
    pub exclusions: ExclusionSummary,
}

// ---------------------------------------------------------------------------
// Incremental normalizer
// ---------------------------------------------------------------------------

/// Row-by-row normalizer that keeps the 1-based row counter.
///
/// The CSV loader drives this directly so rows the reader cannot even
/// deserialize are numbered consistently with the rest.
#[derive(Debug, Default)]
pub struct Normalizer {
    row: usize,
    out: Normalized,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the next row. Errors only on a discount domain violation.
    pub fn push(&mut self, raw: &RawOrderRow) -> Result<()> {
        self.row += 1;
        match normalize_row(self.row, raw)? {
            Ok(record) => self.out.records.push(record),
            Err(reason) => self.out.exclusions.record(MalformedRecord {
                row: self.row,
                reason,
            }),
        }
        Ok(())
    }

    /// Count the next row as excluded without inspecting it.
    pub fn exclude(&mut self, reason: MalformedReason) {
        self.row += 1;
        self.out.exclusions.record(MalformedRecord {
            row: self.row,
            reason,
        });
    }

    pub fn finish(self) -> Normalized {
        self.out
    }
}

/// Normalize a whole batch of raw rows, preserving input order.
pub fn normalize(rows: &[RawOrderRow]) -> Result<Normalized> {
    let mut normalizer = Normalizer::new();
    for raw in rows {
        normalizer.push(raw)?;
    }
    Ok(normalizer.finish())
}

// ---------------------------------------------------------------------------
// Single row
// ---------------------------------------------------------------------------

/// Per-field outcome: the typed value, or the reason the row is malformed.
type FieldResult<T> = std::result::Result<T, MalformedReason>;

fn normalize_row(row: usize, raw: &RawOrderRow) -> Result<FieldResult<OrderRecord>> {
    // Domain check first so a corrupt discount is never masked by another
    // missing field on the same row.
    let discount = match parse_discount(raw.discount.as_deref()) {
        Ok(d) => d,
        Err(reason) => return Ok(Err(reason)),
    };
    let Some(discount_bin) = DiscountBin::from_discount(discount) else {
        error!(row, value = discount, "discount outside [0, 1]");
        return Err(PipelineError::InvalidDiscountDomain {
            row,
            value: discount,
        });
    };

    Ok(build_record(raw, discount, discount_bin))
}

fn build_record(
    raw: &RawOrderRow,
    discount: f64,
    discount_bin: DiscountBin,
) -> FieldResult<OrderRecord> {
    let order_date = parse_date("Order Date", raw.order_date.as_deref())?;
    let ship_date = parse_date("Ship Date", raw.ship_date.as_deref())?;
    let sales = parse_number("Sales", raw.sales.as_deref())?;
    let profit = parse_number("Profit", raw.profit.as_deref())?;

    let state = raw.state.as_deref().unwrap_or_default().trim().to_string();

    Ok(OrderRecord {
        order_id: present(raw.order_id.as_deref()).map(str::to_string),
        order_date,
        ship_date,
        segment: text_or_unknown(raw.segment.as_deref()),
        category: text_or_unknown(raw.category.as_deref()),
        ship_mode: text_or_unknown(raw.ship_mode.as_deref()),
        state_code: state_code(&state),
        state,
        sales,
        profit,
        discount,
        discount_bin,
        is_loss: profit < 0.0,
    })
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Trimmed, non-empty cell content.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text_or_unknown(value: Option<&str>) -> String {
    present(value).unwrap_or(UNKNOWN).to_string()
}

fn parse_number(field: &'static str, value: Option<&str>) -> FieldResult<f64> {
    let text = present(value).ok_or(MalformedReason::Missing { field })?;
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| MalformedReason::Unparseable {
            field,
            value: text.to_string(),
        })
}

/// Like [`parse_number`], but infinities pass through so the caller's domain
/// check rejects them. NaN has no domain position and stays malformed.
fn parse_discount(value: Option<&str>) -> FieldResult<f64> {
    let field = "Discount";
    let text = present(value).ok_or(MalformedReason::Missing { field })?;
    text.parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
        .ok_or_else(|| MalformedReason::Unparseable {
            field,
            value: text.to_string(),
        })
}

fn parse_date(field: &'static str, value: Option<&str>) -> FieldResult<NaiveDate> {
    let text = present(value).ok_or(MalformedReason::Missing { field })?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .ok_or_else(|| MalformedReason::Unparseable {
            field,
            value: text.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
