//! Ranking and drilldown builder.
//!
//! Restricts records to a subset of interest (loss-making orders), groups
//! them by a tuple of dimensions and ranks the groups by total profit,
//! most negative first.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::aggregate::{Dimension, GroupKey, KeyPart};
use super::error::{PipelineError, Result};
use super::record::OrderRecord;

pub const DEFAULT_TOP_K: usize = 10;

/// Decimal places kept in drilldown and pivot output.
const PRECISION: i32 = 2;

fn round(value: f64) -> f64 {
    let scale = 10f64.powi(PRECISION);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Grouping request
// ---------------------------------------------------------------------------

/// Which dimensions to group by and how many groups to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrilldownSpec {
    pub dimensions: Vec<Dimension>,
    pub top_k: usize,
}

impl Default for DrilldownSpec {
    fn default() -> Self {
        Self {
            dimensions: vec![Dimension::Segment, Dimension::Category, Dimension::ShipMode],
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl DrilldownSpec {
    pub fn validate(&self) -> Result<()> {
        let n = self.dimensions.len();
        if !(2..=3).contains(&n) {
            return Err(PipelineError::InvalidDrilldown(format!(
                "expected 2 or 3 dimensions, got {n}"
            )));
        }
        let distinct: BTreeSet<&str> = self.dimensions.iter().map(|d| d.name()).collect();
        if distinct.len() != n {
            return Err(PipelineError::InvalidDrilldown(
                "dimensions must be distinct".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidDrilldown(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ranked table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrilldownRow {
    pub key: GroupKey,
    pub loss_order_count: usize,
    pub avg_loss: f64,
    pub total_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrilldownTable {
    pub dimensions: Vec<Dimension>,
    pub top_k: usize,
    /// Number of groups before truncation.
    pub total_groups: usize,
    pub rows: Vec<DrilldownRow>,
}

/// Rank groups of the `subset` records by total profit, ascending.
///
/// Ties on the unrounded total are broken by group key order, so the kept
/// top-K is reproducible. Values are rounded only after truncation.
pub fn build_drilldown(
    records: &[&OrderRecord],
    subset: impl Fn(&OrderRecord) -> bool,
    spec: &DrilldownSpec,
) -> Result<DrilldownTable> {
    spec.validate()?;

    let mut groups: BTreeMap<GroupKey, (usize, f64)> = BTreeMap::new();
    for record in records.iter().copied().filter(|r| subset(r)) {
        let Some(key) = GroupKey::for_record(record, &spec.dimensions) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.profit;
    }

    let total_groups = groups.len();
    let mut ranked: Vec<(GroupKey, usize, f64)> = groups
        .into_iter()
        .map(|(key, (count, sum))| (key, count, sum))
        .collect();
    // BTreeMap iteration already yields key order; a stable sort on the
    // total keeps it for ties.
    ranked.sort_by(|a, b| a.2.total_cmp(&b.2));
    ranked.truncate(spec.top_k);

    let rows = ranked
        .into_iter()
        .map(|(key, count, sum)| DrilldownRow {
            key,
            loss_order_count: count,
            avg_loss: round(sum / count as f64),
            total_loss: round(sum),
        })
        .collect();

    Ok(DrilldownTable {
        dimensions: spec.dimensions.clone(),
        top_k: spec.top_k,
        total_groups,
        rows,
    })
}

/// Drilldown over loss-making orders.
pub fn loss_drilldown(records: &[&OrderRecord], spec: &DrilldownSpec) -> Result<DrilldownTable> {
    build_drilldown(records, |r| r.is_loss, spec)
}

// ---------------------------------------------------------------------------
// Loss heatmap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub key: GroupKey,
    pub cells: Vec<f64>,
}

/// Two-way table of summed losses. Missing combinations are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_dimensions: Vec<Dimension>,
    pub column_dimension: Dimension,
    pub columns: Vec<KeyPart>,
    pub rows: Vec<PivotRow>,
}

/// Sum profit of loss-making orders by `row_dimensions` × `column`.
pub fn loss_heatmap(
    records: &[&OrderRecord],
    row_dimensions: &[Dimension],
    column: Dimension,
) -> PivotTable {
    let mut sums: BTreeMap<GroupKey, BTreeMap<KeyPart, f64>> = BTreeMap::new();
    let mut columns: BTreeSet<KeyPart> = BTreeSet::new();

    for record in records.iter().filter(|r| r.is_loss) {
        let (Some(row_key), Some(col_key)) = (
            GroupKey::for_record(record, row_dimensions),
            column.key_part(record),
        ) else {
            continue;
        };
        columns.insert(col_key.clone());
        *sums.entry(row_key).or_default().entry(col_key).or_insert(0.0) += record.profit;
    }

    let columns: Vec<KeyPart> = columns.into_iter().collect();
    let rows = sums
        .into_iter()
        .map(|(key, cells)| PivotRow {
            cells: columns
                .iter()
                .map(|c| round(cells.get(c).copied().unwrap_or(0.0)))
                .collect(),
            key,
        })
        .collect();

    PivotTable {
        row_dimensions: row_dimensions.to_vec(),
        column_dimension: column,
        columns,
        rows,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use crate::pipeline::record::RawOrderRow;

    fn row(segment: &str, category: &str, ship_mode: &str, profit: &str) -> RawOrderRow {
        RawOrderRow {
            order_date: Some("2017-03-01".to_string()),
            ship_date: Some("2017-03-04".to_string()),
            segment: Some(segment.to_string()),
            category: Some(category.to_string()),
            ship_mode: Some(ship_mode.to_string()),
            state: Some("Ohio".to_string()),
            sales: Some("100".to_string()),
            profit: Some(profit.to_string()),
            discount: Some("0.2".to_string()),
            ..Default::default()
        }
    }

    fn records() -> Vec<OrderRecord> {
        normalize(&[
            row("Consumer", "Furniture", "First Class", "-10"),
            row("Consumer", "Furniture", "First Class", "-20.126"),
            row("Corporate", "Technology", "Same Day", "-100"),
            row("Consumer", "Technology", "Standard Class", "50"),
            row("Home Office", "Furniture", "Second Class", "-5"),
        ])
        .unwrap()
        .records
    }

    #[test]
    fn ranks_largest_losses_first() {
        let records = records();
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let table = loss_drilldown(&refs, &DrilldownSpec::default()).unwrap();

        assert_eq!(table.total_groups, 3);
        let labels: Vec<String> = table.rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Corporate / Technology / Same Day",
                "Consumer / Furniture / First Class",
                "Home Office / Furniture / Second Class",
            ]
        );
        let furniture = &table.rows[1];
        assert_eq!(furniture.loss_order_count, 2);
        assert_eq!(furniture.total_loss, -30.13);
        assert_eq!(furniture.avg_loss, -15.06);
    }

    #[test]
    fn profitable_orders_are_excluded() {
        let records = records();
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let table = loss_drilldown(&refs, &DrilldownSpec::default()).unwrap();
        assert!(table.rows.iter().all(|r| r.total_loss < 0.0));
    }

    #[test]
    fn ties_break_by_key() {
        let records = normalize(&[
            row("Corporate", "Furniture", "Same Day", "-10"),
            row("Consumer", "Technology", "First Class", "-4"),
            row("Consumer", "Technology", "First Class", "-6"),
            row("Consumer", "Furniture", "Same Day", "-10"),
        ])
        .unwrap()
        .records;
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let spec = DrilldownSpec::default();

        let first = loss_drilldown(&refs, &spec).unwrap();
        let labels: Vec<String> = first.rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Consumer / Furniture / Same Day",
                "Consumer / Technology / First Class",
                "Corporate / Furniture / Same Day",
            ]
        );

        let mut reversed = refs.clone();
        reversed.reverse();
        assert_eq!(loss_drilldown(&reversed, &spec).unwrap(), first);
    }

    #[test]
    fn truncates_to_top_k() {
        let records = records();
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let spec = DrilldownSpec {
            top_k: 2,
            ..Default::default()
        };
        let table = loss_drilldown(&refs, &spec).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.total_groups, 3);
    }

    #[test]
    fn empty_subset_gives_empty_table() {
        let table = loss_drilldown(&[], &DrilldownSpec::default()).unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn rejects_bad_specs() {
        let one = DrilldownSpec {
            dimensions: vec![Dimension::Segment],
            top_k: 10,
        };
        assert!(one.validate().is_err());

        let repeated = DrilldownSpec {
            dimensions: vec![Dimension::Segment, Dimension::Segment],
            top_k: 10,
        };
        assert!(repeated.validate().is_err());

        let zero = DrilldownSpec {
            top_k: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn heatmap_fills_missing_cells_with_zero() {
        let records = records();
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let pivot = loss_heatmap(
            &refs,
            &[Dimension::Segment, Dimension::Category],
            Dimension::ShipMode,
        );

        let columns: Vec<String> = pivot.columns.iter().map(|c| c.to_string()).collect();
        assert_eq!(columns, vec!["First Class", "Same Day", "Second Class"]);
        assert_eq!(pivot.rows.len(), 3);
        assert_eq!(pivot.rows[0].key.label(), "Consumer / Furniture");
        assert_eq!(pivot.rows[0].cells, vec![-30.13, 0.0, 0.0]);
        assert_eq!(pivot.rows[1].cells, vec![0.0, -100.0, 0.0]);
    }
}
