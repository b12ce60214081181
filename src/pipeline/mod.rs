//! Profitability analytics pipeline.
//!
//! Raw rows are normalized once into an immutable [`Dataset`]; everything
//! downstream (filters, aggregation, drilldowns, KPIs) is a pure function
//! over borrowed views of it:
//!
//! ```text
//! raw rows -> normalize -> Dataset -> Predicate -> aggregate / drilldown / kpi
//! ```

pub mod aggregate;
pub mod drilldown;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod normalize;
pub mod record;
pub mod states;

pub use aggregate::{Dimension, GroupKey, Measure, Metric, Reduction};
pub use error::{MalformedRecord, PipelineError};
pub use filter::{FilterConfig, Predicate};
pub use normalize::ExclusionSummary;
pub use record::{DiscountBin, OrderRecord, RawOrderRow};

use normalize::Normalized;

/// One run's batch of canonical records, held read-only.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<OrderRecord>,
    exclusions: ExclusionSummary,
}

impl Dataset {
    /// Normalize raw rows into a dataset.
    pub fn from_raw(rows: &[RawOrderRow]) -> error::Result<Self> {
        normalize::normalize(rows).map(Self::from_normalized)
    }

    pub(crate) fn from_normalized(normalized: Normalized) -> Self {
        Self {
            records: normalized.records,
            exclusions: normalized.exclusions,
        }
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn exclusions(&self) -> &ExclusionSummary {
        &self.exclusions
    }

    /// Borrowed view of every record.
    pub fn all(&self) -> Vec<&OrderRecord> {
        self.records.iter().collect()
    }

    /// Borrowed view of the records matching `predicate`.
    pub fn select(&self, predicate: &Predicate) -> Vec<&OrderRecord> {
        self.records.iter().filter(|r| predicate.matches(r)).collect()
    }
}
