//! Headline metrics over a record subset.

use serde::Serialize;

use super::record::OrderRecord;

/// Totals and margin for a subset of orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub total_sales: f64,
    pub total_profit: f64,
    /// Percent of sales kept as profit; 0 when there are no sales.
    pub profit_margin: f64,
}

pub fn summarize(records: &[&OrderRecord]) -> KpiSnapshot {
    let total_sales: f64 = records.iter().map(|r| r.sales).sum();
    let total_profit: f64 = records.iter().map(|r| r.profit).sum();

    let profit_margin = if total_sales == 0.0 {
        0.0
    } else {
        total_profit / total_sales * 100.0
    };

    KpiSnapshot {
        total_sales,
        total_profit,
        profit_margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use crate::pipeline::record::RawOrderRow;

    fn row(sales: &str, profit: &str) -> RawOrderRow {
        RawOrderRow {
            order_date: Some("2016-06-01".to_string()),
            ship_date: Some("2016-06-03".to_string()),
            state: Some("Texas".to_string()),
            sales: Some(sales.to_string()),
            profit: Some(profit.to_string()),
            discount: Some("0".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_subset_has_zero_margin() {
        let kpi = summarize(&[]);
        assert_eq!(kpi, KpiSnapshot::default());
        assert_eq!(kpi.profit_margin, 0.0);
    }

    #[test]
    fn margin_is_profit_over_sales() {
        let records = normalize(&[row("100", "-50"), row("90", "30")]).unwrap().records;
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let kpi = summarize(&refs);
        assert_eq!(kpi.total_sales, 190.0);
        assert_eq!(kpi.total_profit, -20.0);
        assert!((kpi.profit_margin - (-10.526315789473685)).abs() < 1e-9);
    }

    #[test]
    fn zero_sales_with_profit_is_not_nan() {
        let records = normalize(&[row("0", "5")]).unwrap().records;
        let refs: Vec<&OrderRecord> = records.iter().collect();
        let kpi = summarize(&refs);
        assert_eq!(kpi.profit_margin, 0.0);
        assert_eq!(kpi.total_profit, 5.0);
    }
}
