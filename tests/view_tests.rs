//! Dashboard views and configuration layering, through the public API.

use std::fs;
use std::path::PathBuf;

use profitlens::config::{self, ProfitlensConfig};
use profitlens::pipeline::{Dataset, FilterConfig, RawOrderRow};
use profitlens::views::{self, DrilldownScope, PanelContent, ViewConfig, ViewKind};

fn row(segment: &str, category: &str, state: &str, month: &str, profit: &str) -> RawOrderRow {
    RawOrderRow {
        order_id: None,
        order_date: Some(format!("2017-{month}-10")),
        ship_date: Some(format!("2017-{month}-14")),
        segment: Some(segment.to_string()),
        category: Some(category.to_string()),
        ship_mode: Some("Standard Class".to_string()),
        state: Some(state.to_string()),
        sales: Some("100".to_string()),
        profit: Some(profit.to_string()),
        discount: Some("0.2".to_string()),
    }
}

fn dataset() -> Dataset {
    let mut bad = row("Consumer", "Furniture", "Ohio", "01", "1");
    bad.sales = Some("n/a".to_string());
    Dataset::from_raw(&[
        row("Consumer", "Furniture", "California", "01", "-30"),
        row("Consumer", "Technology", "Texas", "02", "45"),
        row("Corporate", "Furniture", "Texas", "01", "-12"),
        row("Home Office", "Office Supplies", "Unknown Territory", "03", "8"),
        bad,
    ])
    .unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("profitlens-it-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[test]
fn every_view_shares_the_same_kpis() {
    let dataset = dataset();
    let config = ViewConfig::default();
    let reports: Vec<_> = ViewKind::ALL
        .iter()
        .map(|kind| views::build_view(*kind, &dataset, &config).unwrap())
        .collect();

    for report in &reports {
        assert_eq!(report.kpi, reports[0].kpi);
        assert_eq!(report.record_count, 4);
        assert_eq!(report.excluded_rows, 1);
        assert_eq!(
            report.excluded_message.as_deref(),
            Some("1 row excluded due to malformed data")
        );
    }
    assert_eq!(reports[0].kpi.total_profit, 11.0);
}

#[test]
fn filters_narrow_everything_but_full_scope_drilldown() {
    let dataset = dataset();
    let config = ViewConfig {
        filters: FilterConfig::from_options(Some("Consumer"), None, None).unwrap(),
        ..ViewConfig::default()
    };
    let report = views::build_view(ViewKind::Tabbed, &dataset, &config).unwrap();
    assert_eq!(report.record_count, 2);
    assert_eq!(report.kpi.total_profit, 15.0);

    let Some(PanelContent::Drilldown(table)) = report.panel("top_losses").map(|p| &p.content)
    else {
        panic!("top_losses should be a drilldown table");
    };
    // Corporate's loss survives because the drilldown ignores filters.
    assert_eq!(table.total_groups, 2);

    let filtered = ViewConfig {
        drilldown_scope: DrilldownScope::Filtered,
        ..config
    };
    let report = views::build_view(ViewKind::Tabbed, &dataset, &filtered).unwrap();
    let Some(PanelContent::Drilldown(table)) = report.panel("top_losses").map(|p| &p.content)
    else {
        panic!("top_losses should be a drilldown table");
    };
    assert_eq!(table.total_groups, 1);
}

#[test]
fn state_panel_skips_unmapped_states() {
    let report =
        views::build_view(ViewKind::Summary, &dataset(), &ViewConfig::default()).unwrap();
    let Some(PanelContent::Aggregate(result)) = report.panel("profit_by_state").map(|p| &p.content)
    else {
        panic!("profit_by_state should be an aggregate");
    };
    assert!(result.get("Unknown Territory").is_none());
    assert_eq!(result.len(), 2);
    assert_eq!(result.get("TX").unwrap().scalar(), Some(33.0));
}

#[test]
fn report_serializes_with_tagged_panels() {
    let report =
        views::build_view(ViewKind::Panels, &dataset(), &ViewConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["view"], "panels");
    let first = &json["sections"][0]["panels"][0];
    assert_eq!(first["content"]["kind"], "aggregate");
    assert!(first["content"]["data"]["rows"].is_array());
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn project_layer_overrides_global_per_key() {
    let dir = scratch_dir("layers");
    let global = dir.join("global.toml");
    let project = dir.join("project.toml");
    fs::write(&global, "[drilldown]\ntop_k = 5\nscope = \"filtered\"\n").unwrap();
    fs::write(&project, "[drilldown]\ntop_k = 7\n[filters]\nsegment = \"Consumer\"\n").unwrap();

    let cfg = config::load_layers(&[Some(global), Some(project)]);
    assert_eq!(cfg.drilldown.top_k, 7);
    assert_eq!(cfg.drilldown.scope, DrilldownScope::Filtered);
    assert_eq!(cfg.filters.segment, "Consumer");
    assert_eq!(cfg.filters.category, "All");

    let view = cfg.view_config().unwrap();
    assert_eq!(view.drilldown.top_k, 7);
    let report = views::build_view(ViewKind::Tabbed, &dataset(), &view).unwrap();
    assert_eq!(report.record_count, 2);
}

#[test]
fn env_overrides_win_over_files() {
    let mut cfg = ProfitlensConfig::default();
    config::apply_env_overrides(&mut cfg, |name| match name {
        "PROFITLENS_TOP_K" => Some("3".to_string()),
        "PROFITLENS_DISCOUNT_BIN" => Some("10-20%".to_string()),
        _ => None,
    });
    assert_eq!(cfg.drilldown.top_k, 3);
    let view = cfg.view_config().unwrap();
    assert!(!view.filters.is_empty());
}
