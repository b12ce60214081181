//! CLI command implementations for profitlens.
//!
//! Provides subcommand handlers for:
//! - `profitlens report`: a full dashboard view (tabbed, summary or panels)
//! - `profitlens kpi`: headline totals and margin
//! - `profitlens aggregate`: one grouped metric
//! - `profitlens drilldown`: ranked loss groups
//! - `profitlens options`: values available to filter on
//! - `profitlens inspect`: dataset load summary
//! - `profitlens config show|init|set|reset`: configuration management

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::config;
use crate::pipeline::aggregate::{self, AggregateResult, Dimension, Measure, Metric, Reduction};
use crate::pipeline::drilldown::{self, DrilldownTable, PivotTable};
use crate::pipeline::filter::{FilterConfig, FilterOptions};
use crate::pipeline::kpi::{self, KpiSnapshot};
use crate::pipeline::{Dataset, loader};
use crate::views::{self, DrilldownScope, PanelContent, ViewConfig, ViewKind, ViewReport};

/// Output format for report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Load the dataset at `path`, with the path in any error message.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    loader::load_csv(path).with_context(|| format!("failed to load dataset {}", path.display()))
}

// ---------------------------------------------------------------------------
// profitlens report
// ---------------------------------------------------------------------------

/// Build and print one of the dashboard views.
pub fn run_report(
    dataset: &Dataset,
    kind: ViewKind,
    view_config: &ViewConfig,
    format: OutputFormat,
) -> Result<()> {
    let report = views::build_view(kind, dataset, view_config)?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Csv => write_report_csv(io::stdout().lock(), &report)?,
        OutputFormat::Table => print_report_table(&report),
    }

    Ok(())
}

fn print_report_table(report: &ViewReport) {
    println!("{}", report.title.bold().cyan());
    println!("{}", "=".repeat(60));
    print_filters(&report.filters);
    if report.drilldown_scope == DrilldownScope::Filtered {
        println!("  {}", "Drilldowns use the filtered subset".dimmed());
    }
    println!();
    print_kpi_block(&report.kpi, report.record_count);
    print_exclusions(report.excluded_message.as_deref());

    for section in &report.sections {
        println!();
        println!("{}", section.title.bold().cyan());
        println!("{}", "-".repeat(60));
        for panel in &section.panels {
            println!();
            println!("  {}", panel.title.bold());
            match &panel.content {
                PanelContent::Aggregate(result) => {
                    print_aggregate_rows(result, percent_panel(panel.id))
                }
                PanelContent::Drilldown(table) => print_drilldown_rows(table),
                PanelContent::Pivot(pivot) => print_pivot_rows(pivot),
            }
        }
    }
}

/// Panels whose values have already been scaled to percentages.
fn percent_panel(id: &str) -> bool {
    id == "loss_rate_by_discount"
}

/// Long-format CSV: one `panel,key,measure,value` row per number.
fn write_report_csv<W: Write>(out: W, report: &ViewReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["panel", "key", "measure", "value"])?;

    for panel in report.panels() {
        match &panel.content {
            PanelContent::Aggregate(result) => {
                for row in &result.rows {
                    let key = row.key.label();
                    for (name, value) in named_values(result, &row.value) {
                        let value = value.to_string();
                        wtr.write_record([panel.id, key.as_str(), name.as_str(), value.as_str()])?;
                    }
                }
            }
            PanelContent::Drilldown(table) => {
                for row in &table.rows {
                    let key = row.key.label();
                    let values = [
                        ("loss_order_count", row.loss_order_count.to_string()),
                        ("avg_loss", row.avg_loss.to_string()),
                        ("total_loss", row.total_loss.to_string()),
                    ];
                    for (measure, value) in &values {
                        wtr.write_record([panel.id, key.as_str(), *measure, value.as_str()])?;
                    }
                }
            }
            PanelContent::Pivot(pivot) => {
                for row in &pivot.rows {
                    let key = row.key.label();
                    for (column, cell) in pivot.columns.iter().zip(&row.cells) {
                        let column = column.to_string();
                        let cell = cell.to_string();
                        wtr.write_record([panel.id, key.as_str(), column.as_str(), cell.as_str()])?;
                    }
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// profitlens kpi
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct KpiOutput<'a> {
    filters: &'a FilterConfig,
    record_count: usize,
    excluded_rows: usize,
    #[serde(flatten)]
    kpi: KpiSnapshot,
}

/// Show total sales, total profit and margin for the filtered subset.
pub fn run_kpi(dataset: &Dataset, filters: &FilterConfig, format: OutputFormat) -> Result<()> {
    let records = dataset.select(&filters.predicate());
    let snapshot = kpi::summarize(&records);

    match format {
        OutputFormat::Json => print_json(&KpiOutput {
            filters,
            record_count: records.len(),
            excluded_rows: dataset.exclusions().count,
            kpi: snapshot,
        })?,
        OutputFormat::Csv => write_kpi_csv(io::stdout().lock(), &snapshot)?,
        OutputFormat::Table => {
            println!("{}", "Key Metrics".bold().cyan());
            println!("{}", "=".repeat(40));
            print_filters(filters);
            println!();
            print_kpi_block(&snapshot, records.len());
            print_exclusions(dataset.exclusions().message().as_deref());
        }
    }

    Ok(())
}

fn write_kpi_csv<W: Write>(out: W, snapshot: &KpiSnapshot) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.serialize(snapshot)?;
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// profitlens aggregate
// ---------------------------------------------------------------------------

/// Group the filtered subset and reduce one metric.
///
/// The mean of the loss flag is reported as a percentage.
pub fn run_aggregate(
    dataset: &Dataset,
    filters: &FilterConfig,
    dimensions: &[Dimension],
    metric: Metric,
    reduction: Reduction,
    format: OutputFormat,
) -> Result<()> {
    let records = dataset.select(&filters.predicate());
    let mut result = aggregate::aggregate(&records, dimensions, metric, reduction);
    let percent = metric == Metric::LossFlag && reduction == Reduction::Mean;
    if percent {
        result = result.scaled(100.0);
    }

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Csv => write_aggregate_csv(io::stdout().lock(), &result)?,
        OutputFormat::Table => {
            let measure = Measure::new(metric, reduction);
            let dims: Vec<&str> = dimensions.iter().map(|d| d.name()).collect();
            println!(
                "{}",
                format!("{} by {}", measure.name(), dims.join(", ")).bold().cyan()
            );
            println!("{}", "=".repeat(60));
            print_filters(filters);
            println!();
            if result.is_empty() {
                println!("  {}", "No matching records.".yellow());
            } else {
                print_aggregate_rows(&result, percent);
            }
            print_exclusions(dataset.exclusions().message().as_deref());
        }
    }

    Ok(())
}

fn write_aggregate_csv<W: Write>(out: W, result: &AggregateResult) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header: Vec<String> = result.dimensions.iter().map(|d| d.name().to_string()).collect();
    header.extend(result.measures.iter().map(Measure::name));
    wtr.write_record(&header)?;

    for row in &result.rows {
        let mut record: Vec<String> = row.key.parts().iter().map(|p| p.to_string()).collect();
        record.extend(
            named_values(result, &row.value)
                .into_iter()
                .map(|(_, v)| v.to_string()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// `(measure name, value)` pairs for a row, in measure order.
fn named_values(result: &AggregateResult, value: &aggregate::MetricValue) -> Vec<(String, f64)> {
    match value.scalar() {
        Some(v) => result
            .measures
            .first()
            .map(|m| vec![(m.name(), v)])
            .unwrap_or_default(),
        None => result
            .measures
            .iter()
            .filter_map(|m| value.get(&m.name()).map(|v| (m.name(), v)))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// profitlens drilldown
// ---------------------------------------------------------------------------

/// Show the top-K loss groups and, for table output, the loss heatmap.
pub fn run_drilldown(dataset: &Dataset, view_config: &ViewConfig, format: OutputFormat) -> Result<()> {
    let records = match view_config.drilldown_scope {
        DrilldownScope::Full => dataset.all(),
        DrilldownScope::Filtered => dataset.select(&view_config.filters.predicate()),
    };
    let table = drilldown::loss_drilldown(&records, &view_config.drilldown)?;

    match format {
        OutputFormat::Json => print_json(&table)?,
        OutputFormat::Csv => write_drilldown_csv(io::stdout().lock(), &table)?,
        OutputFormat::Table => {
            println!("{}", "Top Loss-Making Combinations".bold().cyan());
            println!("{}", "=".repeat(60));
            match view_config.drilldown_scope {
                DrilldownScope::Full => println!("  {}", "Scope: full dataset".dimmed()),
                DrilldownScope::Filtered => print_filters(&view_config.filters),
            }
            println!();
            if table.rows.is_empty() {
                println!("  {}", "No loss-making orders.".green());
            } else {
                print_drilldown_rows(&table);
                if table.total_groups > table.rows.len() {
                    println!(
                        "  {}",
                        format!(
                            "showing {} of {} groups",
                            table.rows.len(),
                            table.total_groups
                        )
                        .dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}

fn write_drilldown_csv<W: Write>(out: W, table: &DrilldownTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = table.dimensions.iter().map(|d| d.name()).collect();
    header.extend(["loss_order_count", "avg_loss", "total_loss"]);
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record: Vec<String> = row.key.parts().iter().map(|p| p.to_string()).collect();
        record.push(row.loss_order_count.to_string());
        record.push(row.avg_loss.to_string());
        record.push(row.total_loss.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// profitlens options
// ---------------------------------------------------------------------------

/// List the values each filter accepts.
pub fn run_options(dataset: &Dataset, format: OutputFormat) -> Result<()> {
    let options = FilterOptions::from_records(dataset.records());

    match format {
        OutputFormat::Json => print_json(&options)?,
        OutputFormat::Csv => write_options_csv(io::stdout().lock(), &options)?,
        OutputFormat::Table => {
            println!("{}", "Filter Options".bold().cyan());
            println!("{}", "=".repeat(40));
            print_option_list("Segment", options.segments.iter().map(String::as_str));
            print_option_list("Category", options.categories.iter().map(String::as_str));
            print_option_list(
                "Discount bin",
                options.discount_bins.iter().map(|b| b.label()),
            );
        }
    }

    Ok(())
}

fn print_option_list<'a>(name: &str, values: impl Iterator<Item = &'a str>) {
    let values: Vec<&str> = std::iter::once("All").chain(values).collect();
    println!("  {:<14} {}", format!("{name}:").bold(), values.join(", "));
}

fn write_options_csv<W: Write>(out: W, options: &FilterOptions) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["filter", "value"])?;
    for segment in &options.segments {
        wtr.write_record(["segment", segment.as_str()])?;
    }
    for category in &options.categories {
        wtr.write_record(["category", category.as_str()])?;
    }
    for bin in &options.discount_bins {
        wtr.write_record(["discount_bin", bin.label()])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// profitlens inspect
// ---------------------------------------------------------------------------

/// Summarize what the loader kept and what it excluded.
pub fn run_inspect(dataset: &Dataset, path: &Path) -> Result<()> {
    let exclusions = dataset.exclusions();
    let records = dataset.records();

    println!("{}", "Dataset Summary".bold().cyan());
    println!("{}", "=".repeat(60));
    println!("  {} {}", "Path:          ".bold(), path.display());
    println!(
        "  {} {}",
        "Records kept:  ".bold(),
        format_number(records.len())
    );
    println!(
        "  {} {}",
        "Rows excluded: ".bold(),
        format_number(exclusions.count)
    );

    let unmapped = records.iter().filter(|r| r.state_code.is_none()).count();
    if unmapped > 0 {
        println!(
            "  {} {} {}",
            "Unmapped state:".bold(),
            format_number(unmapped),
            "(omitted from the state map only)".dimmed()
        );
    }

    if let (Some(first), Some(last)) = (
        records.iter().map(|r| r.order_date).min(),
        records.iter().map(|r| r.order_date).max(),
    ) {
        println!("  {} {first} to {last}", "Order dates:   ".bold());
    }

    if !exclusions.samples.is_empty() {
        println!();
        println!("{}", "Sample excluded rows".bold().cyan());
        for sample in &exclusions.samples {
            println!("  {} {}", "·".dimmed(), sample);
        }
        if exclusions.count > exclusions.samples.len() {
            println!(
                "  {}",
                format!(
                    "... and {} more",
                    exclusions.count - exclusions.samples.len()
                )
                .dimmed()
            );
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// profitlens config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective profitlens Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.profitlens/config.toml");
    print_source(project_exists, ".profitlens.toml");
    println!("  {} PROFITLENS_* environment variables", "·".dimmed());

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.profitlens/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to set default filters and drilldown options.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared table printing
// ---------------------------------------------------------------------------

const KEY_WIDTH: usize = 40;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_filters(filters: &FilterConfig) {
    if filters.is_empty() {
        println!("  {}", "Filters: none".dimmed());
        return;
    }
    let mut active = Vec::new();
    if let Some(segment) = &filters.segment {
        active.push(format!("segment={segment}"));
    }
    if let Some(category) = &filters.category {
        active.push(format!("category={category}"));
    }
    if let Some(bin) = filters.discount_bin {
        active.push(format!("discount_bin={bin}"));
    }
    println!("  {}", format!("Filters: {}", active.join(", ")).dimmed());
}

fn print_kpi_block(snapshot: &KpiSnapshot, record_count: usize) {
    println!("  {} {}", "Orders:       ".bold(), format_number(record_count));
    println!(
        "  {} {}",
        "Total sales:  ".bold(),
        format_money(snapshot.total_sales)
    );
    let profit = format_money(snapshot.total_profit);
    println!(
        "  {} {}",
        "Total profit: ".bold(),
        if snapshot.total_profit < 0.0 {
            profit.red()
        } else {
            profit.green()
        }
    );
    println!(
        "  {} {:.2}%",
        "Profit margin:".bold(),
        snapshot.profit_margin
    );
}

fn print_exclusions(message: Option<&str>) {
    if let Some(message) = message {
        println!();
        println!("  {}", message.yellow());
    }
}

fn print_aggregate_rows(result: &AggregateResult, percent: bool) {
    if result.is_empty() {
        println!("    {}", "(no data)".dimmed());
        return;
    }

    let measures: Vec<&Measure> = result.measures.iter().collect();
    let mut header = format!("    {:<KEY_WIDTH$}", "Group");
    for m in &measures {
        header.push_str(&format!(" {:>14}", m.name()));
    }
    println!("{}", header.bold());

    for (i, row) in result.rows.iter().enumerate() {
        let mut line = format!("    {:<KEY_WIDTH$}", truncate(&row.key.label(), KEY_WIDTH));
        for (measure, (_, value)) in measures.iter().zip(named_values(result, &row.value)) {
            line.push_str(&format!(" {:>14}", format_value(measure, value, percent)));
        }
        print_striped(i, &line);
    }
}

fn print_drilldown_rows(table: &DrilldownTable) {
    if table.rows.is_empty() {
        println!("    {}", "(no loss-making orders)".dimmed());
        return;
    }

    println!(
        "{}",
        format!(
            "    {:<KEY_WIDTH$} {:>8} {:>14} {:>14}",
            "Group", "Orders", "Avg loss", "Total loss"
        )
        .bold()
    );
    for (i, row) in table.rows.iter().enumerate() {
        let line = format!(
            "    {:<KEY_WIDTH$} {:>8} {:>14} {:>14}",
            truncate(&row.key.label(), KEY_WIDTH),
            row.loss_order_count,
            format_money(row.avg_loss),
            format_money(row.total_loss),
        );
        print_striped(i, &line);
    }
}

fn print_pivot_rows(pivot: &PivotTable) {
    if pivot.rows.is_empty() {
        println!("    {}", "(no loss-making orders)".dimmed());
        return;
    }

    let mut header = format!("    {:<32}", "Group");
    for column in &pivot.columns {
        header.push_str(&format!(" {:>14}", truncate(&column.to_string(), 14)));
    }
    println!("{}", header.bold());

    for (i, row) in pivot.rows.iter().enumerate() {
        let mut line = format!("    {:<32}", truncate(&row.key.label(), 32));
        for cell in &row.cells {
            line.push_str(&format!(" {:>14}", format_money(*cell)));
        }
        print_striped(i, &line);
    }
}

fn print_striped(i: usize, line: &str) {
    if i % 2 == 0 {
        println!("{line}");
    } else {
        println!("{}", line.dimmed());
    }
}

/// Render a value according to what it measures.
fn format_value(measure: &Measure, value: f64, percent: bool) -> String {
    match (measure.metric, measure.reduction) {
        (_, Reduction::Count) => format_number(value as usize),
        (Metric::LossFlag, Reduction::Mean) if percent => format!("{value:.1}%"),
        (Metric::LossFlag, Reduction::Mean) | (Metric::Discount, _) => format!("{value:.3}"),
        (Metric::LossFlag, Reduction::Sum) => format_number(value as usize),
        (Metric::Sales | Metric::Profit, _) => format_money(value),
    }
}

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Format a dollar amount to cents, e.g. `-$1,234.57`.
fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as usize;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", format_number(cents / 100), cents % 100)
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RawOrderRow;

    fn dataset() -> Dataset {
        let row = |segment: &str, category: &str, profit: &str, discount: &str| RawOrderRow {
            order_date: Some("2017-05-02".to_string()),
            ship_date: Some("2017-05-06".to_string()),
            segment: Some(segment.to_string()),
            category: Some(category.to_string()),
            ship_mode: Some("First Class".to_string()),
            state: Some("Ohio".to_string()),
            sales: Some("100".to_string()),
            profit: Some(profit.to_string()),
            discount: Some(discount.to_string()),
            ..Default::default()
        };
        Dataset::from_raw(&[
            row("Consumer", "Furniture", "-12.5", "0.3"),
            row("Corporate", "Office Supplies, Misc", "40", "0"),
        ])
        .unwrap()
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(1234.567), "$1,234.57");
        assert_eq!(format_money(-41.9136), "-$41.91");
        assert_eq!(format_money(-0.001), "$0.00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("10–20% / 20–40%", 6), "10–20…");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("table")), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str_opt(Some("unknown")), OutputFormat::Table);
    }

    #[test]
    fn loss_rate_formats_as_percent() {
        let measure = Measure::new(Metric::LossFlag, Reduction::Mean);
        assert_eq!(format_value(&measure, 37.5, true), "37.5%");
        let count = Measure::new(Metric::Profit, Reduction::Count);
        assert_eq!(format_value(&count, 1200.0, false), "1,200");
    }

    #[test]
    fn aggregate_csv_quotes_labels() {
        let dataset = dataset();
        let result = aggregate::aggregate(
            &dataset.all(),
            &[Dimension::Category],
            Metric::Profit,
            Reduction::Sum,
        );
        let out = render(|buf| write_aggregate_csv(buf, &result));
        assert_eq!(
            out,
            "category,profit_sum\nFurniture,-12.5\n\"Office Supplies, Misc\",40\n"
        );
    }

    #[test]
    fn drilldown_csv_has_one_column_per_dimension() {
        let dataset = dataset();
        let table =
            drilldown::loss_drilldown(&dataset.all(), &Default::default()).unwrap();
        let out = render(|buf| write_drilldown_csv(buf, &table));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "segment,category,ship_mode,loss_order_count,avg_loss,total_loss"
        );
        assert_eq!(lines[1], "Consumer,Furniture,First Class,1,-12.5,-12.5");
    }

    #[test]
    fn kpi_csv_has_header() {
        let snapshot = KpiSnapshot {
            total_sales: 200.0,
            total_profit: 27.5,
            profit_margin: 13.75,
        };
        let out = render(|buf| write_kpi_csv(buf, &snapshot));
        assert_eq!(out, "total_sales,total_profit,profit_margin\n200.0,27.5,13.75\n");
    }

    #[test]
    fn report_csv_is_long_format() {
        let dataset = dataset();
        let report =
            views::build_view(ViewKind::Panels, &dataset, &ViewConfig::default()).unwrap();
        let out = render(|buf| write_report_csv(buf, &report));
        assert!(out.starts_with("panel,key,measure,value\n"));
        assert!(out.contains("profit_by_category,Furniture,profit_sum,-12.5\n"));
        assert!(out.contains("top_losses,Consumer / Furniture / First Class,total_loss,-12.5\n"));
    }

    #[test]
    fn options_csv_lists_each_filter() {
        let options = FilterOptions::from_records(dataset().records());
        let out = render(|buf| write_options_csv(buf, &options));
        assert!(out.contains("segment,Corporate\n"));
        assert!(out.contains("discount_bin,20–40%\n"));
    }
}
