//! Presentation variants over the analytics pipeline.
//!
//! Each variant is a thin consumer: it applies the configured filters once,
//! then assembles a fixed set of named panels from pipeline results. None of
//! them compute anything the pipeline does not already expose, so the CLI,
//! the web dashboard and any JSON consumer all see identical numbers.
//!
//! - **tabbed**: Overview / Discount Impact / Loss Drilldown / Region Map
//! - **summary**: one page: map, monthly trend, category and discount panels
//! - **panels**: multi-panel grid ending with the top-K loss table

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::aggregate::{self, AggregateResult, Dimension, Measure, Metric, Reduction};
use crate::pipeline::drilldown::{self, DrilldownSpec, DrilldownTable, PivotTable};
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::filter::FilterConfig;
use crate::pipeline::kpi::{self, KpiSnapshot};
use crate::pipeline::{Dataset, OrderRecord};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The three interchangeable layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Tabbed,
    Summary,
    Panels,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [Self::Tabbed, Self::Summary, Self::Panels];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tabbed => "tabbed",
            Self::Summary => "summary",
            Self::Panels => "panels",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Tabbed => "Retail Profitability Dashboard",
            Self::Summary => "Profit Summary",
            Self::Panels => "Profitability Panels",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabbed" | "tabs" => Ok(Self::Tabbed),
            "summary" | "one-page" => Ok(Self::Summary),
            "panels" | "grid" => Ok(Self::Panels),
            _ => Err(PipelineError::UnknownView(s.to_string())),
        }
    }
}

/// Whether the loss heatmap and top-K table honour the active filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrilldownScope {
    /// Always the whole dataset.
    #[default]
    Full,
    /// The same filtered subset as every other panel.
    Filtered,
}

impl FromStr for DrilldownScope {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "all" => Ok(Self::Full),
            "filtered" => Ok(Self::Filtered),
            _ => Err(PipelineError::UnknownScope(s.to_string())),
        }
    }
}

impl fmt::Display for DrilldownScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Filtered => f.write_str("filtered"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewConfig {
    pub filters: FilterConfig,
    pub drilldown: DrilldownSpec,
    pub drilldown_scope: DrilldownScope,
}

// ---------------------------------------------------------------------------
// Report structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PanelContent {
    Aggregate(AggregateResult),
    Drilldown(DrilldownTable),
    Pivot(PivotTable),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub id: &'static str,
    pub title: &'static str,
    pub content: PanelContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub panels: Vec<Panel>,
}

/// Everything a renderer needs for one view, as plain serializable data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewReport {
    pub view: ViewKind,
    pub title: &'static str,
    pub filters: FilterConfig,
    pub drilldown_scope: DrilldownScope,
    /// Records in the filtered subset.
    pub record_count: usize,
    pub excluded_rows: usize,
    pub excluded_message: Option<String>,
    pub kpi: KpiSnapshot,
    pub sections: Vec<Section>,
}

impl ViewReport {
    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.sections.iter().flat_map(|s| s.panels.iter())
    }

    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels().find(|p| p.id == id)
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Records each panel draws from.
struct Inputs<'a> {
    filtered: Vec<&'a OrderRecord>,
    drilldown: Vec<&'a OrderRecord>,
    spec: &'a DrilldownSpec,
}

/// Build the named view over `dataset`.
pub fn build_view(kind: ViewKind, dataset: &Dataset, config: &ViewConfig) -> Result<ViewReport> {
    config.drilldown.validate()?;

    let filtered = dataset.select(&config.filters.predicate());
    let drilldown = match config.drilldown_scope {
        DrilldownScope::Full => dataset.all(),
        DrilldownScope::Filtered => filtered.clone(),
    };
    let inputs = Inputs {
        filtered,
        drilldown,
        spec: &config.drilldown,
    };

    let sections = match kind {
        ViewKind::Tabbed => tabbed(&inputs)?,
        ViewKind::Summary => summary(&inputs),
        ViewKind::Panels => panels(&inputs)?,
    };

    debug!(
        view = %kind,
        records = inputs.filtered.len(),
        sections = sections.len(),
        "view built"
    );

    Ok(ViewReport {
        view: kind,
        title: kind.title(),
        filters: config.filters.clone(),
        drilldown_scope: config.drilldown_scope,
        record_count: inputs.filtered.len(),
        excluded_rows: dataset.exclusions().count,
        excluded_message: dataset.exclusions().message(),
        kpi: kpi::summarize(&inputs.filtered),
        sections,
    })
}

fn tabbed(inputs: &Inputs<'_>) -> Result<Vec<Section>> {
    Ok(vec![
        Section {
            id: "overview",
            title: "Overview",
            panels: vec![
                profit_by_category(inputs, true),
                monthly_sales_and_profit(inputs),
            ],
        },
        Section {
            id: "discount_impact",
            title: "Discount Impact",
            panels: vec![avg_profit_by_discount(inputs), loss_rate_by_discount(inputs)],
        },
        Section {
            id: "loss_drilldown",
            title: "Loss Drilldown",
            panels: vec![loss_heatmap(inputs), top_losses(inputs)?],
        },
        Section {
            id: "region_map",
            title: "Region Map",
            panels: vec![profit_by_state(&inputs.drilldown)],
        },
    ])
}

fn summary(inputs: &Inputs<'_>) -> Vec<Section> {
    vec![Section {
        id: "summary",
        title: "One-Page Summary",
        panels: vec![
            profit_by_state(&inputs.filtered),
            monthly_profit(inputs),
            profit_by_category(inputs, false),
            sales_vs_profit_by_category(inputs),
            avg_profit_by_discount(inputs),
        ],
    }]
}

fn panels(inputs: &Inputs<'_>) -> Result<Vec<Section>> {
    Ok(vec![
        Section {
            id: "breakdown",
            title: "Category and Segment",
            panels: vec![profit_by_category(inputs, false), profit_by_segment(inputs)],
        },
        Section {
            id: "discounts",
            title: "Discount Analysis",
            panels: vec![avg_profit_by_discount(inputs), loss_rate_by_discount(inputs)],
        },
        Section {
            id: "trend_and_map",
            title: "Profit Trend and Map",
            panels: vec![monthly_profit(inputs), profit_by_state(&inputs.filtered)],
        },
        Section {
            id: "losses",
            title: "Loss Table",
            panels: vec![top_losses(inputs)?],
        },
    ])
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

fn aggregate_panel(id: &'static str, title: &'static str, result: AggregateResult) -> Panel {
    Panel {
        id,
        title,
        content: PanelContent::Aggregate(result),
    }
}

fn profit_by_category(inputs: &Inputs<'_>, sort_by_value: bool) -> Panel {
    let result = aggregate::aggregate(
        &inputs.filtered,
        &[Dimension::Category],
        Metric::Profit,
        Reduction::Sum,
    );
    let result = if sort_by_value {
        result.sorted_by_value()
    } else {
        result
    };
    aggregate_panel("profit_by_category", "Profit by Product Category", result)
}

fn profit_by_segment(inputs: &Inputs<'_>) -> Panel {
    let result = aggregate::aggregate(
        &inputs.filtered,
        &[Dimension::Segment],
        Metric::Profit,
        Reduction::Sum,
    );
    aggregate_panel("profit_by_segment", "Profit by Segment", result)
}

fn monthly_sales_and_profit(inputs: &Inputs<'_>) -> Panel {
    let result = aggregate::aggregate_many(
        &inputs.filtered,
        &[Dimension::YearMonth],
        &[
            Measure::new(Metric::Sales, Reduction::Sum),
            Measure::new(Metric::Profit, Reduction::Sum),
        ],
    );
    aggregate_panel("monthly_trend", "Monthly Sales Trend", result)
}

fn monthly_profit(inputs: &Inputs<'_>) -> Panel {
    let result = aggregate::aggregate(
        &inputs.filtered,
        &[Dimension::YearMonth],
        Metric::Profit,
        Reduction::Sum,
    );
    aggregate_panel("monthly_profit", "Monthly Profit Trend", result)
}

fn sales_vs_profit_by_category(inputs: &Inputs<'_>) -> Panel {
    let result = aggregate::aggregate_many(
        &inputs.filtered,
        &[Dimension::Category],
        &[
            Measure::new(Metric::Sales, Reduction::Sum),
            Measure::new(Metric::Profit, Reduction::Sum),
        ],
    );
    aggregate_panel("revenue_vs_profit", "Revenue vs Profit by Category", result)
}

fn avg_profit_by_discount(inputs: &Inputs<'_>) -> Panel {
    let result = aggregate::aggregate(
        &inputs.filtered,
        &[Dimension::DiscountBin],
        Metric::Profit,
        Reduction::Mean,
    );
    aggregate_panel(
        "avg_profit_by_discount",
        "Average Profit by Discount Level",
        result,
    )
}

fn loss_rate_by_discount(inputs: &Inputs<'_>) -> Panel {
    let result = aggregate::aggregate(
        &inputs.filtered,
        &[Dimension::DiscountBin],
        Metric::LossFlag,
        Reduction::Mean,
    )
    .scaled(100.0);
    aggregate_panel(
        "loss_rate_by_discount",
        "% Loss-Making Orders by Discount Level",
        result,
    )
}

/// The tabbed region map passes the drilldown records, so it follows the
/// drilldown scope like the other cross-filter panels of that view.
fn profit_by_state(records: &[&OrderRecord]) -> Panel {
    let result = aggregate::aggregate(
        records,
        &[Dimension::StateCode],
        Metric::Profit,
        Reduction::Sum,
    );
    aggregate_panel("profit_by_state", "Profit by U.S. State", result)
}

fn loss_heatmap(inputs: &Inputs<'_>) -> Panel {
    Panel {
        id: "loss_heatmap",
        title: "Loss Heatmap by Segment, Category and Ship Mode",
        content: PanelContent::Pivot(drilldown::loss_heatmap(
            &inputs.drilldown,
            &[Dimension::Segment, Dimension::Category],
            Dimension::ShipMode,
        )),
    }
}

fn top_losses(inputs: &Inputs<'_>) -> Result<Panel> {
    let table = drilldown::loss_drilldown(&inputs.drilldown, inputs.spec)?;
    Ok(Panel {
        id: "top_losses",
        title: "Top Loss-Making Combinations",
        content: PanelContent::Drilldown(table),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RawOrderRow;

    fn row(segment: &str, category: &str, state: &str, profit: &str, discount: &str) -> RawOrderRow {
        RawOrderRow {
            order_date: Some("2017-05-02".to_string()),
            ship_date: Some("2017-05-06".to_string()),
            segment: Some(segment.to_string()),
            category: Some(category.to_string()),
            ship_mode: Some("Standard Class".to_string()),
            state: Some(state.to_string()),
            sales: Some("100".to_string()),
            profit: Some(profit.to_string()),
            discount: Some(discount.to_string()),
            ..Default::default()
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_raw(&[
            row("Consumer", "Furniture", "California", "-40", "0.3"),
            row("Corporate", "Technology", "Texas", "60", "0"),
            row("Consumer", "Office Supplies", "Unknown Territory", "-5", "0.1"),
        ])
        .unwrap()
    }

    #[test]
    fn tabbed_has_four_tabs() {
        let report = build_view(ViewKind::Tabbed, &dataset(), &ViewConfig::default()).unwrap();
        let ids: Vec<&str> = report.sections.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec!["overview", "discount_impact", "loss_drilldown", "region_map"]
        );
        assert_eq!(report.kpi.total_profit, 15.0);
    }

    #[test]
    fn tabbed_category_chart_is_sorted_by_value() {
        let report = build_view(ViewKind::Tabbed, &dataset(), &ViewConfig::default()).unwrap();
        let Some(PanelContent::Aggregate(result)) =
            report.panel("profit_by_category").map(|p| &p.content)
        else {
            panic!("missing category panel");
        };
        let labels: Vec<String> = result.rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(labels, vec!["Furniture", "Office Supplies", "Technology"]);
    }

    #[test]
    fn filters_apply_to_kpis_but_not_full_scope_drilldown() {
        let config = ViewConfig {
            filters: FilterConfig::from_options(Some("Corporate"), None, None).unwrap(),
            ..Default::default()
        };
        let report = build_view(ViewKind::Panels, &dataset(), &config).unwrap();
        assert_eq!(report.record_count, 1);
        assert_eq!(report.kpi.total_profit, 60.0);

        let Some(PanelContent::Drilldown(table)) = report.panel("top_losses").map(|p| &p.content)
        else {
            panic!("missing drilldown panel");
        };
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn filtered_scope_restricts_drilldown() {
        let config = ViewConfig {
            filters: FilterConfig::from_options(Some("Corporate"), None, None).unwrap(),
            drilldown_scope: DrilldownScope::Filtered,
            ..Default::default()
        };
        let report = build_view(ViewKind::Panels, &dataset(), &config).unwrap();
        let Some(PanelContent::Drilldown(table)) = report.panel("top_losses").map(|p| &p.content)
        else {
            panic!("missing drilldown panel");
        };
        assert!(table.rows.is_empty());
    }

    #[test]
    fn summary_is_a_single_page() {
        let report = build_view(ViewKind::Summary, &dataset(), &ViewConfig::default()).unwrap();
        assert_eq!(report.sections.len(), 1);
        assert!(report.panel("revenue_vs_profit").is_some());
        assert!(report.panel("top_losses").is_none());
    }

    #[test]
    fn state_map_excludes_unmapped() {
        let report = build_view(ViewKind::Summary, &dataset(), &ViewConfig::default()).unwrap();
        let Some(PanelContent::Aggregate(result)) =
            report.panel("profit_by_state").map(|p| &p.content)
        else {
            panic!("missing state panel");
        };
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn tabbed_region_map_follows_drilldown_scope() {
        let filters = FilterConfig::from_options(Some("Consumer"), None, None).unwrap();
        let state_count = |scope| {
            let config = ViewConfig {
                filters: filters.clone(),
                drilldown_scope: scope,
                ..ViewConfig::default()
            };
            let report = build_view(ViewKind::Tabbed, &dataset(), &config).unwrap();
            match report.panel("profit_by_state").map(|p| &p.content) {
                Some(PanelContent::Aggregate(result)) => result.len(),
                _ => panic!("missing state panel"),
            }
        };
        assert_eq!(state_count(DrilldownScope::Full), 2);
        assert_eq!(state_count(DrilldownScope::Filtered), 1);

        let config = ViewConfig {
            filters,
            ..ViewConfig::default()
        };
        let summary = build_view(ViewKind::Summary, &dataset(), &config).unwrap();
        let Some(PanelContent::Aggregate(result)) =
            summary.panel("profit_by_state").map(|p| &p.content)
        else {
            panic!("missing state panel");
        };
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn view_names_parse() {
        for kind in ViewKind::ALL {
            assert_eq!(kind.name().parse::<ViewKind>().unwrap(), kind);
        }
        assert!("dashboard".parse::<ViewKind>().is_err());
    }

    #[test]
    fn report_serializes_panel_kinds() {
        let report = build_view(ViewKind::Tabbed, &dataset(), &ViewConfig::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["view"], "tabbed");
        assert_eq!(json["sections"][2]["panels"][0]["content"]["kind"], "pivot");
        assert_eq!(json["sections"][2]["panels"][1]["content"]["kind"], "drilldown");
    }
}
