/// Configuration system for profitlens.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::ProfitlensConfig::default()`]
/// 2. **User global config**: `~/.profitlens/config.toml`
/// 3. **Project local config**: `.profitlens.toml` in the current directory
/// 4. **Environment variables**: `PROFITLENS_*` overrides
///
/// Command-line flags are applied on top by the caller.
///
/// Layers merge at the key level: a file that sets only `[filters] segment`
/// leaves every other key at the value of the layer beneath it. A file that
/// fails to parse is skipped with a warning.
///
/// # Usage
///
/// ```rust,ignore
/// use profitlens::config;
///
/// let cfg = config::load();
/// let view = cfg.view_config()?;
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub use schema::ProfitlensConfig;

use crate::views::DrilldownScope;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration: defaults, global TOML, project
/// TOML, then environment variables.
pub fn load() -> ProfitlensConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Merge the given TOML files, in order, over the built-in defaults.
pub fn load_layers(paths: &[Option<PathBuf>]) -> ProfitlensConfig {
    let mut merged = default_value();
    for path in paths.iter().flatten() {
        if let Some(layer) = load_toml_file(path) {
            merge_values(&mut merged, layer);
        }
    }
    merged.try_into::<ProfitlensConfig>().unwrap_or_else(|e| {
        warn!(error = %e, "merged config is invalid, using defaults");
        ProfitlensConfig::default()
    })
}

/// Read one config layer. Missing files are `None`; unreadable or invalid
/// files are logged and skipped.
fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match parse_layer(&content) {
        Ok(value) => {
            debug!(path = %path.display(), "loaded config layer");
            Some(value)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

/// Parse a layer, checking that it is valid on its own before it is merged.
fn parse_layer(content: &str) -> Result<toml::Value> {
    let value: toml::Value = toml::from_str(content).context("invalid TOML")?;
    ProfitlensConfig::deserialize_value(value.clone())?;
    Ok(value)
}

impl ProfitlensConfig {
    fn deserialize_value(value: toml::Value) -> Result<Self> {
        value.try_into::<Self>().context("config does not match schema")
    }
}

fn default_value() -> toml::Value {
    toml::Value::try_from(ProfitlensConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Recursively overlay `overlay` onto `base`, table by table. Non-table
/// values in the overlay replace the base value outright.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.profitlens/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".profitlens").join("config.toml"))
}

/// Path to the project local config: `.profitlens.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".profitlens.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides, reading through `lookup`.
///
/// Supported variables:
/// - `PROFITLENS_DATA`: dataset path
/// - `PROFITLENS_SEGMENT`, `PROFITLENS_CATEGORY`, `PROFITLENS_DISCOUNT_BIN`: default filters
/// - `PROFITLENS_TOP_K`: drilldown table size
/// - `PROFITLENS_DRILLDOWN_SCOPE`: `full` or `filtered`
/// - `PROFITLENS_WEB_ADDR`: dashboard listen address
/// - `PROFITLENS_LOG_LEVEL`: default log filter
pub fn apply_env_overrides(config: &mut ProfitlensConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(val) = var("PROFITLENS_DATA") {
        config.data.path = val;
    }

    if let Some(val) = var("PROFITLENS_SEGMENT") {
        config.filters.segment = val;
    }
    if let Some(val) = var("PROFITLENS_CATEGORY") {
        config.filters.category = val;
    }
    if let Some(val) = var("PROFITLENS_DISCOUNT_BIN") {
        config.filters.discount_bin = val;
    }

    if let Some(val) = var("PROFITLENS_TOP_K") {
        match val.trim().parse::<usize>() {
            Ok(k) => config.drilldown.top_k = k,
            Err(_) => warn!(value = %val, "ignoring invalid PROFITLENS_TOP_K"),
        }
    }
    if let Some(val) = var("PROFITLENS_DRILLDOWN_SCOPE") {
        match val.parse::<DrilldownScope>() {
            Ok(scope) => config.drilldown.scope = scope,
            Err(e) => warn!(error = %e, "ignoring invalid PROFITLENS_DRILLDOWN_SCOPE"),
        }
    }

    if let Some(val) = var("PROFITLENS_WEB_ADDR") {
        config.web.addr = val;
    }
    if let Some(val) = var("PROFITLENS_LOG_LEVEL") {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.profitlens/config.toml`.
///
/// Returns an error if the file already exists, unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default_config(&path, force)?;
    Ok(path)
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, ProfitlensConfig::default_toml()).context("failed to write config file")
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `drilldown.top_k`. Values are parsed to the
/// type of the key's default, and the resulting file must still be a valid
/// config.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_in(&path, key, value)
}

fn set_config_value_in(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        default_value()
    };

    set_toml_value(&mut root, &default_value(), key, value)?;
    ProfitlensConfig::deserialize_value(root.clone())
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    debug!(key, value, "config value set");
    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// `schema` is the defaults tree: it decides which keys exist and how the
/// raw string is typed. Missing sections in `root` are created.
fn set_toml_value(
    root: &mut toml::Value,
    schema: &toml::Value,
    key: &str,
    raw_value: &str,
) -> Result<()> {
    let Some((sections, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config key must be of the form section.key, got '{key}'");
    };

    let mut current = root;
    let mut template = schema;
    for part in sections.split('.') {
        template = template
            .get(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table at '{sections}'"))?;
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let existing = template
        .get(leaf)
        .with_context(|| format!("config key not found: '{key}'"))?;

    let new_value = match existing {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        toml::Value::Array(_) => {
            // Comma-separated list
            let items: Vec<toml::Value> = raw_value
                .split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .collect();
            toml::Value::Array(items)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{sections}'"))?;
    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "profitlens-config-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("YES"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn no_layers_gives_defaults() {
        assert_eq!(load_layers(&[None, None]), ProfitlensConfig::default());
    }

    #[test]
    fn layers_merge_at_key_level() {
        let dir = scratch_dir("merge");
        let global = dir.join("global.toml");
        let project = dir.join("project.toml");
        fs::write(&global, "[filters]\nsegment = \"Consumer\"\n[drilldown]\ntop_k = 5\n").unwrap();
        fs::write(&project, "[filters]\ncategory = \"Technology\"\n").unwrap();

        let config = load_layers(&[Some(global), Some(project)]);
        assert_eq!(config.filters.segment, "Consumer");
        assert_eq!(config.filters.category, "Technology");
        assert_eq!(config.drilldown.top_k, 5);
        assert_eq!(config.web.addr, "127.0.0.1:9747");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_layer_is_skipped() {
        let dir = scratch_dir("invalid");
        let bad = dir.join("bad.toml");
        let good = dir.join("good.toml");
        fs::write(&bad, "[drilldown]\ntop_k = \"many\"\n").unwrap();
        fs::write(&good, "[data]\npath = \"orders.csv\"\n").unwrap();

        let config = load_layers(&[Some(bad), Some(good)]);
        assert_eq!(config.drilldown.top_k, 10);
        assert_eq!(config.data.path, "orders.csv");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PROFITLENS_DATA", "/tmp/orders.csv"),
            ("PROFITLENS_SEGMENT", "Corporate"),
            ("PROFITLENS_TOP_K", "3"),
            ("PROFITLENS_DRILLDOWN_SCOPE", "filtered"),
            ("PROFITLENS_LOG_LEVEL", "debug"),
        ]);
        let mut config = ProfitlensConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.data.path, "/tmp/orders.csv");
        assert_eq!(config.filters.segment, "Corporate");
        assert_eq!(config.drilldown.top_k, 3);
        assert_eq!(config.drilldown.scope, DrilldownScope::Filtered);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PROFITLENS_TOP_K", "ten"),
            ("PROFITLENS_DRILLDOWN_SCOPE", "partial"),
            ("PROFITLENS_CATEGORY", "  "),
        ]);
        let mut config = ProfitlensConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config, ProfitlensConfig::default());
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value = toml::from_str("[filters]\nsegment = \"All\"\n").unwrap();
        set_toml_value(&mut root, &default_value(), "filters.segment", "Consumer").unwrap();
        assert_eq!(root["filters"]["segment"].as_str(), Some("Consumer"));
    }

    #[test]
    fn set_toml_value_updates_bool() {
        let mut root: toml::Value = toml::from_str("[web]\nopen_browser = true\n").unwrap();
        set_toml_value(&mut root, &default_value(), "web.open_browser", "off").unwrap();
        assert_eq!(root["web"]["open_browser"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_updates_integer() {
        let mut root: toml::Value = toml::from_str("").unwrap();
        set_toml_value(&mut root, &default_value(), "drilldown.top_k", "25").unwrap();
        assert_eq!(root["drilldown"]["top_k"].as_integer(), Some(25));
    }

    #[test]
    fn set_toml_value_splits_lists() {
        let mut root = default_value();
        set_toml_value(&mut root, &default_value(), "drilldown.dimensions", "category, state").unwrap();
        let dims: Vec<&str> = root["drilldown"]["dimensions"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(dims, vec!["category", "state"]);
    }

    #[test]
    fn set_toml_value_rejects_invalid_key() {
        let mut root = default_value();
        assert!(set_toml_value(&mut root, &default_value(), "nonexistent.key", "x").is_err());
        assert!(set_toml_value(&mut root, &default_value(), "filters.region", "x").is_err());
        assert!(set_toml_value(&mut root, &default_value(), "toplevel", "x").is_err());
        assert!(set_toml_value(&mut root, &default_value(), "drilldown.top_k", "x").is_err());
    }

    #[test]
    fn set_config_value_round_trips_through_file() {
        let dir = scratch_dir("set");
        let path = dir.join("config.toml");
        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());

        set_config_value_in(&path, "drilldown.scope", "filtered").unwrap();
        assert!(set_config_value_in(&path, "drilldown.scope", "sideways").is_err());

        let config = load_layers(&[Some(path)]);
        assert_eq!(config.drilldown.scope, DrilldownScope::Filtered);
        assert_eq!(config.drilldown.top_k, 10);

        let _ = fs::remove_dir_all(&dir);
    }
}
