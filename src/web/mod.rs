//! Embedded web dashboard for profitlens.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard with a view switcher and filter controls
//! - JSON API endpoints for views, KPIs, drilldowns and config management
//!
//! The dataset is loaded once before the server starts and is only read
//! afterwards. Launched via `profitlens web` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::{Cursor, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{info, warn};

use crate::config::ProfitlensConfig;
use crate::pipeline::Dataset;

type HttpResponse = Response<Cursor<Vec<u8>>>;

/// What the server holds between requests.
pub struct AppState {
    pub dataset: Dataset,
    pub data_path: PathBuf,
    /// Defaults for any query parameter a request leaves out.
    pub config: ProfitlensConfig,
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard server on the given address.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user dashboard); a failing request gets a JSON error and
/// the server keeps going.
pub fn serve(addr: &str, mut state: AppState, open: bool) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("profitlens dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");
    info!(addr, records = state.dataset.records().len(), "dashboard started");

    if open && let Err(e) = open_browser(&format!("http://{addr}")) {
        warn!(error = %e, "could not open browser");
    }

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Read body up-front for methods that carry one
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            read_body(request.as_reader()).map(Some)
        } else {
            Ok(None)
        };

        let resp = match body {
            Ok(body) => dispatch(&mut state, &method, &url, body.as_deref())
                .unwrap_or_else(|e| error_response(500, &format!("{e:#}"))),
            Err(resp) => resp,
        };

        let status = resp.status_code().0;
        if let Err(e) = request.respond(resp) {
            warn!(error = %e, "failed to send response");
        }

        info!(%method, url = %url, status, "request");
    }

    Ok(())
}

/// Read a request body as UTF-8, or the 400 response to send instead.
fn read_body(reader: &mut dyn Read) -> std::result::Result<String, HttpResponse> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .map(|_| buf)
        .map_err(|e| error_response(400, &format!("unreadable request body: {e}")))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(
    state: &mut AppState,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<HttpResponse> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API: analytics
        (&Method::Get, p) if p.starts_with("/api/view/") => {
            api::get_view(state, &p["/api/view/".len()..], url)
        }
        (&Method::Get, "/api/kpi") => api::get_kpi(state, url),
        (&Method::Get, "/api/drilldown") => api::get_drilldown(state, url),
        (&Method::Get, "/api/options") => api::get_options(state),

        // API: configuration
        (&Method::Get, "/api/config") => api::get_config(),
        (&Method::Put, "/api/config") => {
            let body = body.unwrap_or("{}");
            api::put_config(state, body)
        }
        (&Method::Post, "/api/config/reset") => api::post_config_reset(state),

        // API: health
        (&Method::Get, "/api/health") => api::get_health(state),

        // 404
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> HttpResponse {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// 404 response.
fn not_found() -> HttpResponse {
    error_response(404, "not found")
}

/// JSON `{"error": ...}` body with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    header("Content-Type", "application/json; charset=utf-8")
}

/// HTML content type header.
fn content_type_html() -> Header {
    header("Content-Type", "text/html; charset=utf-8")
}

fn header(name: &'static str, value: &'static str) -> Header {
    Header::from_bytes(name, value).expect("static header is valid ASCII")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RawOrderRow;

    pub(super) fn state() -> AppState {
        let row = |segment: &str, category: &str, state: &str, profit: &str| RawOrderRow {
            order_date: Some("2017-05-02".to_string()),
            ship_date: Some("2017-05-06".to_string()),
            segment: Some(segment.to_string()),
            category: Some(category.to_string()),
            ship_mode: Some("Second Class".to_string()),
            state: Some(state.to_string()),
            sales: Some("200".to_string()),
            profit: Some(profit.to_string()),
            discount: Some("0.2".to_string()),
            ..Default::default()
        };
        let dataset = Dataset::from_raw(&[
            row("Consumer", "Furniture", "California", "-50"),
            row("Home Office", "Technology", "Texas", "80"),
        ])
        .unwrap();
        AppState {
            dataset,
            data_path: PathBuf::from("orders.csv"),
            config: ProfitlensConfig::default(),
        }
    }

    pub(super) fn call(state: &mut AppState, url: &str) -> (u16, serde_json::Value) {
        let resp = dispatch(state, &Method::Get, url, None).unwrap();
        let status = resp.status_code().0;
        let mut body = String::new();
        resp.into_reader().read_to_string(&mut body).unwrap();
        (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    #[test]
    fn serves_frontend() {
        let resp = dispatch(&mut state(), &Method::Get, "/", None).unwrap();
        assert_eq!(resp.status_code().0, 200);
    }

    #[test]
    fn unknown_route_is_404() {
        let (status, body) = call(&mut state(), "/api/nope");
        assert_eq!(status, 404);
        assert_eq!(body["error"], "not found");
    }

    #[test]
    fn view_route_takes_kind_from_path() {
        let (status, body) = call(&mut state(), "/api/view/summary?segment=Home%20Office");
        assert_eq!(status, 200);
        assert_eq!(body["view"], "summary");
        assert_eq!(body["record_count"], 1);
    }

    #[test]
    fn non_utf8_body_is_400() {
        let mut body: &[u8] = &[b'{', 0xff, 0xfe, b'}'];
        let resp = read_body(&mut body).unwrap_err();
        assert_eq!(resp.status_code().0, 400);

        let mut body: &[u8] = br#"{"updates": []}"#;
        assert_eq!(read_body(&mut body).ok().as_deref(), Some(r#"{"updates": []}"#));
    }

    #[test]
    fn unknown_view_is_400() {
        let (status, _) = call(&mut state(), "/api/view/dashboard");
        assert_eq!(status, 400);
    }
}
