//! Aggregation engine: grouped sum / mean / count over canonical records.
//!
//! Groups are keyed by a [`GroupKey`] whose parts carry their own ordering
//! (text alphabetically, discount bins in declared order, months
//! chronologically), and results are emitted in key order. Groups with no
//! records never appear.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::PipelineError;
use super::record::{DiscountBin, OrderRecord, YearMonth};

// ---------------------------------------------------------------------------
// Dimensions and keys
// ---------------------------------------------------------------------------

/// A categorical field records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Segment,
    Category,
    ShipMode,
    State,
    StateCode,
    DiscountBin,
    YearMonth,
}

impl Dimension {
    pub fn name(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Category => "category",
            Self::ShipMode => "ship_mode",
            Self::State => "state",
            Self::StateCode => "state_code",
            Self::DiscountBin => "discount_bin",
            Self::YearMonth => "year_month",
        }
    }

    /// Geographic dimensions skip records whose state is unmapped.
    pub fn is_geographic(self) -> bool {
        matches!(self, Self::State | Self::StateCode)
    }

    /// The record's value for this dimension, or `None` if the record does
    /// not participate in grouping by it.
    pub fn key_part(self, record: &OrderRecord) -> Option<KeyPart> {
        let part = match self {
            Self::Segment => KeyPart::Text(record.segment.clone()),
            Self::Category => KeyPart::Text(record.category.clone()),
            Self::ShipMode => KeyPart::Text(record.ship_mode.clone()),
            Self::State => {
                record.state_code?;
                KeyPart::Text(record.state.clone())
            }
            Self::StateCode => KeyPart::Text(record.state_code?.to_string()),
            Self::DiscountBin => KeyPart::Bin(record.discount_bin),
            Self::YearMonth => KeyPart::Month(record.year_month()),
        };
        Some(part)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "segment" => Ok(Self::Segment),
            "category" => Ok(Self::Category),
            "ship_mode" => Ok(Self::ShipMode),
            "state" => Ok(Self::State),
            "state_code" => Ok(Self::StateCode),
            "discount_bin" => Ok(Self::DiscountBin),
            "year_month" | "month" => Ok(Self::YearMonth),
            _ => Err(PipelineError::UnknownDimension(s.to_string())),
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// One component of a group key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Text(String),
    Bin(DiscountBin),
    Month(YearMonth),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bin(bin) => f.write_str(bin.label()),
            Self::Month(month) => write!(f, "{month}"),
        }
    }
}

impl Serialize for KeyPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Tuple of key parts, one per grouping dimension.
///
/// Ordering is lexicographic over the parts, which is what makes grouped
/// output and drilldown tie-breaks deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    /// Key for `record` over `dimensions`, or `None` if any dimension
    /// excludes the record.
    pub fn for_record(record: &OrderRecord, dimensions: &[Dimension]) -> Option<Self> {
        dimensions
            .iter()
            .map(|d| d.key_part(record))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Human-readable label, parts joined by `" / "`.
    pub fn label(&self) -> String {
        self.0
            .iter()
            .map(KeyPart::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

// ---------------------------------------------------------------------------
// Metrics and reductions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sales,
    Profit,
    Discount,
    /// 1.0 for a loss-making order, else 0.0. Its mean is the loss rate.
    LossFlag,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Profit => "profit",
            Self::Discount => "discount",
            Self::LossFlag => "loss",
        }
    }

    pub fn value(self, record: &OrderRecord) -> f64 {
        match self {
            Self::Sales => record.sales,
            Self::Profit => record.profit,
            Self::Discount => record.discount,
            Self::LossFlag => {
                if record.is_loss {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl FromStr for Metric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" => Ok(Self::Sales),
            "profit" => Ok(Self::Profit),
            "discount" => Ok(Self::Discount),
            "loss" | "is_loss" | "loss_flag" => Ok(Self::LossFlag),
            _ => Err(PipelineError::UnknownMetric(s.to_string())),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
    Count,
}

impl Reduction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
        }
    }

    /// Reduce a non-empty group's running sum and count.
    fn finish(self, sum: f64, count: usize) -> f64 {
        match self {
            Self::Sum => sum,
            Self::Mean => sum / count as f64,
            Self::Count => count as f64,
        }
    }
}

impl FromStr for Reduction {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "count" => Ok(Self::Count),
            _ => Err(PipelineError::UnknownReduction(s.to_string())),
        }
    }
}

/// A metric paired with its reduction, e.g. `profit_sum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    pub metric: Metric,
    pub reduction: Reduction,
}

impl Measure {
    pub const fn new(metric: Metric, reduction: Reduction) -> Self {
        Self { metric, reduction }
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.metric.name(), self.reduction.name())
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A group's reduced value: one scalar, or several named scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Named(BTreeMap<String, f64>),
}

impl MetricValue {
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Named(_) => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match self {
            Self::Scalar(_) => None,
            Self::Named(values) => values.get(name).copied(),
        }
    }

    fn map(&mut self, f: impl Fn(f64) -> f64) {
        match self {
            Self::Scalar(v) => *v = f(*v),
            Self::Named(values) => values.values_mut().for_each(|v| *v = f(*v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub value: MetricValue,
}

/// Ordered `(group_key, value)` pairs plus what produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub dimensions: Vec<Dimension>,
    pub measures: Vec<Measure>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of the group whose label matches, e.g. `"Furniture"`.
    pub fn get(&self, label: &str) -> Option<&MetricValue> {
        self.rows
            .iter()
            .find(|row| row.key.label() == label)
            .map(|row| &row.value)
    }

    /// Re-sort ascending by value (first measure for named values). Stable,
    /// so equal values keep key order.
    pub fn sorted_by_value(mut self) -> Self {
        let first = self.measures.first().map(Measure::name);
        let sort_value = |value: &MetricValue| match value {
            MetricValue::Scalar(v) => *v,
            MetricValue::Named(values) => first
                .as_ref()
                .and_then(|name| values.get(name))
                .copied()
                .unwrap_or(0.0),
        };
        self.rows
            .sort_by(|a, b| sort_value(&a.value).total_cmp(&sort_value(&b.value)));
        self
    }

    /// Multiply every value by `factor` (e.g. loss rate to percent).
    pub fn scaled(mut self, factor: f64) -> Self {
        for row in &mut self.rows {
            row.value.map(|v| v * factor);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Accumulator {
    count: usize,
    sums: Vec<f64>,
}

fn accumulate(
    records: &[&OrderRecord],
    dimensions: &[Dimension],
    measures: &[Measure],
) -> BTreeMap<GroupKey, Accumulator> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for record in records {
        let Some(key) = GroupKey::for_record(record, dimensions) else {
            continue;
        };
        let acc = groups.entry(key).or_insert_with(|| Accumulator {
            count: 0,
            sums: vec![0.0; measures.len()],
        });
        acc.count += 1;
        for (sum, measure) in acc.sums.iter_mut().zip(measures) {
            *sum += measure.metric.value(record);
        }
    }
    groups
}

/// Group `records` by `dimensions` and reduce one metric per group.
pub fn aggregate(
    records: &[&OrderRecord],
    dimensions: &[Dimension],
    metric: Metric,
    reduction: Reduction,
) -> AggregateResult {
    let measure = Measure::new(metric, reduction);
    let rows = accumulate(records, dimensions, &[measure])
        .into_iter()
        .map(|(key, acc)| AggregateRow {
            key,
            value: MetricValue::Scalar(reduction.finish(acc.sums[0], acc.count)),
        })
        .collect();

    AggregateResult {
        dimensions: dimensions.to_vec(),
        measures: vec![measure],
        rows,
    }
}

/// Group `records` by `dimensions` and reduce several measures per group,
/// yielding named values such as `{profit_sum, sales_sum}`.
pub fn aggregate_many(
    records: &[&OrderRecord],
    dimensions: &[Dimension],
    measures: &[Measure],
) -> AggregateResult {
    let rows = accumulate(records, dimensions, measures)
        .into_iter()
        .map(|(key, acc)| {
            let values = measures
                .iter()
                .zip(&acc.sums)
                .map(|(m, sum)| (m.name(), m.reduction.finish(*sum, acc.count)))
                .collect();
            AggregateRow {
                key,
                value: MetricValue::Named(values),
            }
        })
        .collect();

    AggregateResult {
        dimensions: dimensions.to_vec(),
        measures: measures.to_vec(),
        rows,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
