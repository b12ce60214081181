/// Configuration schema and defaults for profitlens.
///
/// Sections: `[data]`, `[filters]`, `[drilldown]`, `[web]` and `[logging]`.
/// Every field has a built-in default; users only set what they want to
/// change.
use serde::{Deserialize, Serialize};

use crate::pipeline::drilldown::{DEFAULT_TOP_K, DrilldownSpec};
use crate::pipeline::error::Result;
use crate::pipeline::filter::{ALL, FilterConfig};
use crate::pipeline::Dimension;
use crate::views::{DrilldownScope, ViewConfig};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level profitlens configuration.
///
/// Maps directly to `~/.profitlens/config.toml` and `.profitlens.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitlensConfig {
    pub data: DataConfig,
    pub filters: FiltersConfig,
    pub drilldown: DrilldownConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

impl ProfitlensConfig {
    /// Resolve the analysis options into the typed form views consume.
    pub fn view_config(&self) -> Result<ViewConfig> {
        let filters = FilterConfig::from_options(
            Some(self.filters.segment.as_str()),
            Some(self.filters.category.as_str()),
            Some(self.filters.discount_bin.as_str()),
        )?;
        let drilldown = self.drilldown.spec()?;
        Ok(ViewConfig {
            filters,
            drilldown,
            drilldown_scope: self.drilldown.scope,
        })
    }
}

// ---------------------------------------------------------------------------
// [data]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the cleaned order CSV.
    pub path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: "superstore_cleaned.csv".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [filters]
// ---------------------------------------------------------------------------

/// Default filters. `"All"` or an empty string means no filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    pub segment: String,
    pub category: String,
    pub discount_bin: String,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            segment: ALL.to_string(),
            category: ALL.to_string(),
            discount_bin: ALL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [drilldown]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrilldownConfig {
    /// Number of loss groups kept in the ranked table.
    pub top_k: usize,
    /// `full` ignores the active filters; `filtered` honours them.
    pub scope: DrilldownScope,
    /// Two or three grouping dimensions.
    pub dimensions: Vec<String>,
}

impl Default for DrilldownConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            scope: DrilldownScope::Full,
            dimensions: vec![
                "segment".to_string(),
                "category".to_string(),
                "ship_mode".to_string(),
            ],
        }
    }
}

impl DrilldownConfig {
    pub fn spec(&self) -> Result<DrilldownSpec> {
        let dimensions = self
            .dimensions
            .iter()
            .map(|d| d.parse::<Dimension>())
            .collect::<Result<Vec<_>>>()?;
        let spec = DrilldownSpec {
            dimensions,
            top_k: self.top_k,
        };
        spec.validate()?;
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `profitlens web`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive: `"error"`, `"warn"`, `"info"`, `"debug"`
    /// or `"trace"`. Overridden by `PROFITLENS_LOG` / `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl ProfitlensConfig {
    /// Annotated default config written by `profitlens config init`.
    pub fn default_toml() -> String {
        r#"# profitlens configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Command-line flags
#   2. Environment variables (PROFITLENS_*)
#   3. Project config (.profitlens.toml in current directory)
#   4. User global config (~/.profitlens/config.toml)
#   5. Built-in defaults

[data]
path = "superstore_cleaned.csv"

[filters]
segment = "All"        # Consumer | Corporate | Home Office | All
category = "All"       # Furniture | Office Supplies | Technology | All
discount_bin = "All"   # 0% | 0-10% | 10-20% | 20-40% | 40-80% | >80% | All

[drilldown]
top_k = 10
scope = "full"         # full | filtered
dimensions = ["segment", "category", "ship_mode"]

[web]
addr = "127.0.0.1:9747"
open_browser = true

[logging]
level = "info"         # error | warn | info | debug | trace
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
