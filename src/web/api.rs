//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content. Query parameters fall back
//! to the loaded configuration; a value that does not parse is a 400.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::config::{self, ProfitlensConfig};
use crate::pipeline::drilldown::{self, DrilldownTable, PivotTable};
use crate::pipeline::filter::{FilterConfig, FilterOptions};
use crate::pipeline::kpi::{self, KpiSnapshot};
use crate::pipeline::Dimension;
use crate::views::{self, DrilldownScope, ViewConfig, ViewKind};

use super::{AppState, HttpResponse, content_type_json, error_response};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct KpiResponse<'a> {
    filters: &'a FilterConfig,
    record_count: usize,
    excluded_rows: usize,
    excluded_message: Option<String>,
    #[serde(flatten)]
    kpi: KpiSnapshot,
}

#[derive(Serialize)]
struct DrilldownResponse {
    scope: DrilldownScope,
    table: DrilldownTable,
    heatmap: PivotTable,
}

#[derive(Serialize)]
struct OptionsResponse {
    all: &'static str,
    #[serde(flatten)]
    options: FilterOptions,
    views: Vec<&'static str>,
}

/// Config API response: the effective config plus its TOML rendering.
#[derive(Serialize)]
struct ConfigResponse {
    config: ProfitlensConfig,
    toml_text: String,
}

/// Config update request: a list of key-value pairs.
#[derive(Deserialize)]
struct ConfigUpdateRequest {
    updates: Vec<ConfigKeyValue>,
}

#[derive(Deserialize)]
struct ConfigKeyValue {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct HealthResponse {
    data_path: String,
    record_count: usize,
    excluded_rows: usize,
    excluded_message: Option<String>,
    unmapped_states: usize,
    config_exists: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn bad_request(message: impl std::fmt::Display) -> HttpResponse {
    error_response(400, &message.to_string())
}

/// Look up a decoded query parameter. Blank values count as absent.
fn query_param(url: &str, key: &str) -> Option<String> {
    url.split_once('?')?.1.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if percent_decode(k) == key {
            Some(percent_decode(v)).filter(|v| !v.trim().is_empty())
        } else {
            None
        }
    })
}

/// Decode `%XX` escapes and `+` in a query component. Malformed escapes are
/// kept verbatim.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Overlay the request's query parameters onto the configured defaults.
fn request_config(state: &AppState, url: &str) -> std::result::Result<ViewConfig, String> {
    let mut cfg = state.config.clone();

    if let Some(segment) = query_param(url, "segment") {
        cfg.filters.segment = segment;
    }
    if let Some(category) = query_param(url, "category") {
        cfg.filters.category = category;
    }
    if let Some(bin) = query_param(url, "discount_bin") {
        cfg.filters.discount_bin = bin;
    }
    if let Some(scope) = query_param(url, "scope") {
        cfg.drilldown.scope = scope.parse::<DrilldownScope>().map_err(|e| e.to_string())?;
    }
    if let Some(top_k) = query_param(url, "top_k") {
        cfg.drilldown.top_k = top_k
            .trim()
            .parse()
            .map_err(|_| format!("top_k must be a positive integer, got '{top_k}'"))?;
    }
    if let Some(dims) = query_param(url, "dims") {
        cfg.drilldown.dimensions = dims.split(',').map(|d| d.trim().to_string()).collect();
    }

    cfg.view_config().map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/view/{kind}`: a full dashboard view.
pub fn get_view(state: &AppState, kind: &str, url: &str) -> Result<HttpResponse> {
    let kind: ViewKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return Ok(bad_request(e)),
    };
    let view_config = match request_config(state, url) {
        Ok(cfg) => cfg,
        Err(e) => return Ok(bad_request(e)),
    };

    let report = views::build_view(kind, &state.dataset, &view_config)?;
    json_response(&report)
}

/// `GET /api/kpi`: totals and margin for the filtered subset.
pub fn get_kpi(state: &AppState, url: &str) -> Result<HttpResponse> {
    let view_config = match request_config(state, url) {
        Ok(cfg) => cfg,
        Err(e) => return Ok(bad_request(e)),
    };

    let records = state.dataset.select(&view_config.filters.predicate());
    let exclusions = state.dataset.exclusions();
    json_response(&KpiResponse {
        filters: &view_config.filters,
        record_count: records.len(),
        excluded_rows: exclusions.count,
        excluded_message: exclusions.message(),
        kpi: kpi::summarize(&records),
    })
}

/// `GET /api/drilldown`: top-K loss groups and the loss heatmap.
pub fn get_drilldown(state: &AppState, url: &str) -> Result<HttpResponse> {
    let view_config = match request_config(state, url) {
        Ok(cfg) => cfg,
        Err(e) => return Ok(bad_request(e)),
    };

    let records = match view_config.drilldown_scope {
        DrilldownScope::Full => state.dataset.all(),
        DrilldownScope::Filtered => state.dataset.select(&view_config.filters.predicate()),
    };
    let table = drilldown::loss_drilldown(&records, &view_config.drilldown)?;
    let heatmap = drilldown::loss_heatmap(
        &records,
        &[Dimension::Segment, Dimension::Category],
        Dimension::ShipMode,
    );

    json_response(&DrilldownResponse {
        scope: view_config.drilldown_scope,
        table,
        heatmap,
    })
}

/// `GET /api/options`: filter values and available views.
pub fn get_options(state: &AppState) -> Result<HttpResponse> {
    json_response(&OptionsResponse {
        all: crate::pipeline::filter::ALL,
        options: FilterOptions::from_records(state.dataset.records()),
        views: ViewKind::ALL.iter().map(|v| v.name()).collect(),
    })
}

/// `GET /api/config`: current effective configuration.
pub fn get_config() -> Result<HttpResponse> {
    let cfg = config::load();
    let toml_text = toml::to_string_pretty(&cfg).context("failed to serialize config")?;

    json_response(&ConfigResponse {
        config: cfg,
        toml_text,
    })
}

/// `PUT /api/config`: update configuration keys.
///
/// Expects JSON body: `{ "updates": [{ "key": "drilldown.top_k", "value": "5" }] }`
pub fn put_config(state: &mut AppState, body: &str) -> Result<HttpResponse> {
    let req: ConfigUpdateRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return Ok(bad_request(format!("invalid config update request: {e}"))),
    };

    let mut errors: Vec<String> = Vec::new();
    let mut applied: Vec<String> = Vec::new();

    for kv in &req.updates {
        match config::set_config_value(&kv.key, &kv.value) {
            Ok(()) => applied.push(format!("{} = {}", kv.key, kv.value)),
            Err(e) => errors.push(format!("{}: {:#}", kv.key, e)),
        }
    }

    if !applied.is_empty() {
        state.config = config::load();
    }

    json_response(&serde_json::json!({
        "applied": applied,
        "errors": errors,
        "success": errors.is_empty(),
    }))
}

/// `POST /api/config/reset`: reset config to defaults.
pub fn post_config_reset(state: &mut AppState) -> Result<HttpResponse> {
    config::reset_config().context("failed to reset config")?;
    state.config = config::load();

    json_response(&serde_json::json!({
        "success": true,
        "message": "Configuration reset to defaults",
    }))
}

/// `GET /api/health`: dataset summary.
pub fn get_health(state: &AppState) -> Result<HttpResponse> {
    let config_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let records = state.dataset.records();
    let exclusions = state.dataset.exclusions();

    json_response(&HealthResponse {
        data_path: state.data_path.display().to_string(),
        record_count: records.len(),
        excluded_rows: exclusions.count,
        excluded_message: exclusions.message(),
        unmapped_states: records.iter().filter(|r| r.state_code.is_none()).count(),
        config_exists,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::tests::{call, state};

    #[test]
    fn query_param_extracts_value() {
        assert_eq!(
            query_param("/api/kpi?segment=Consumer", "segment").as_deref(),
            Some("Consumer")
        );
        assert_eq!(
            query_param("/api/kpi?foo=bar&top_k=14", "top_k").as_deref(),
            Some("14")
        );
    }

    #[test]
    fn query_param_returns_none_for_missing_or_blank() {
        assert_eq!(query_param("/api/kpi", "segment"), None);
        assert_eq!(query_param("/api/kpi?foo=bar", "segment"), None);
        assert_eq!(query_param("/api/kpi?segment=", "segment"), None);
    }

    #[test]
    fn percent_decode_handles_escapes() {
        assert_eq!(percent_decode("Home%20Office"), "Home Office");
        assert_eq!(percent_decode("Office+Supplies"), "Office Supplies");
        assert_eq!(percent_decode("10%E2%80%9320%25"), "10–20%");
        assert_eq!(percent_decode("50%"), "50%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn kpi_honours_filters() {
        let (status, body) = call(&mut state(), "/api/kpi?category=Furniture");
        assert_eq!(status, 200);
        assert_eq!(body["record_count"], 1);
        assert_eq!(body["total_profit"], -50.0);
        assert_eq!(body["profit_margin"], -25.0);
    }

    #[test]
    fn empty_subset_has_zero_margin() {
        let (status, body) = call(&mut state(), "/api/kpi?segment=Corporate");
        assert_eq!(status, 200);
        assert_eq!(body["record_count"], 0);
        assert_eq!(body["profit_margin"], 0.0);
    }

    #[test]
    fn bad_query_values_are_400() {
        let mut state = state();
        assert_eq!(call(&mut state, "/api/kpi?discount_bin=15%25").0, 400);
        assert_eq!(call(&mut state, "/api/drilldown?top_k=lots").0, 400);
        assert_eq!(call(&mut state, "/api/drilldown?top_k=0").0, 400);
        assert_eq!(call(&mut state, "/api/drilldown?scope=partial").0, 400);
        assert_eq!(call(&mut state, "/api/drilldown?dims=segment").0, 400);
    }

    #[test]
    fn drilldown_scope_is_explicit() {
        let mut state = state();
        let (_, full) = call(&mut state, "/api/drilldown?segment=Home%20Office");
        assert_eq!(full["scope"], "full");
        assert_eq!(full["table"]["rows"].as_array().unwrap().len(), 1);

        let (_, filtered) = call(&mut state, "/api/drilldown?segment=Home%20Office&scope=filtered");
        assert_eq!(filtered["scope"], "filtered");
        assert!(filtered["table"]["rows"].as_array().unwrap().is_empty());
    }

    #[test]
    fn options_list_views_and_values() {
        let (status, body) = call(&mut state(), "/api/options");
        assert_eq!(status, 200);
        assert_eq!(body["all"], "All");
        assert_eq!(body["segments"][1], "Home Office");
        assert_eq!(body["discount_bins"][0], "10–20%");
        assert_eq!(body["views"][2], "panels");
    }

    #[test]
    fn health_reports_dataset() {
        let (status, body) = call(&mut state(), "/api/health");
        assert_eq!(status, 200);
        assert_eq!(body["data_path"], "orders.csv");
        assert_eq!(body["record_count"], 2);
        assert_eq!(body["excluded_rows"], 0);
    }

    #[test]
    fn config_update_request_deserializes() {
        let json = r#"{"updates": [{"key": "drilldown.top_k", "value": "5"}]}"#;
        let req: ConfigUpdateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.updates.len(), 1);
        assert_eq!(req.updates[0].key, "drilldown.top_k");
        assert_eq!(req.updates[0].value, "5");
    }
}
