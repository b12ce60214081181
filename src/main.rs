use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use profitlens::config::{self, ProfitlensConfig};
use profitlens::pipeline::{Dimension, Metric, Reduction};
use profitlens::views::ViewKind;
use profitlens::web::{self, AppState};
use profitlens::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "profitlens")]
#[command(about = "Profitability analytics for retail order datasets")]
struct App {
    /// Path to the cleaned order CSV (overrides `data.path` from config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by every analysis command. Omitted values fall back to config.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Customer segment, or "All"
    #[arg(long)]
    segment: Option<String>,
    /// Product category, or "All"
    #[arg(long)]
    category: Option<String>,
    /// Discount level label, e.g. "0-10%", or "All"
    #[arg(long)]
    discount_bin: Option<String>,
}

#[derive(Debug, Args)]
struct DrilldownArgs {
    /// Number of loss groups to keep
    #[arg(long)]
    top_k: Option<usize>,
    /// full (ignore filters) or filtered
    #[arg(long)]
    scope: Option<String>,
    /// Comma-separated grouping dimensions, e.g. segment,category,ship_mode
    #[arg(long)]
    dims: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a complete dashboard view
    Report {
        /// View layout: tabbed (default), summary, panels
        #[arg(long, default_value = "tabbed")]
        view: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        drilldown: DrilldownArgs,
    },
    /// Show total sales, total profit and profit margin
    Kpi {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Group orders and reduce one metric
    Aggregate {
        /// Comma-separated dimensions, e.g. category or segment,ship_mode
        #[arg(long, default_value = "category")]
        by: String,
        /// sales, profit, discount, loss
        #[arg(long, default_value = "profit")]
        metric: String,
        /// sum, mean, count
        #[arg(long, default_value = "sum")]
        reduce: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Rank the worst loss-making groups
    Drilldown {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        drilldown: DrilldownArgs,
    },
    /// List the values available to each filter
    Options {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Summarize how the dataset loaded, including excluded rows
    Inspect,
    /// Launch the web dashboard
    Web {
        /// Address to bind (overrides `web.addr` from config)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_open: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective merged configuration
    Show,
    /// Write a default global config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one value in the global config, e.g. `drilldown.top_k 15`
    Set { key: String, value: String },
    /// Restore the global config to defaults
    Reset,
}

impl FilterArgs {
    fn apply(self, cfg: &mut ProfitlensConfig) {
        if let Some(segment) = self.segment {
            cfg.filters.segment = segment;
        }
        if let Some(category) = self.category {
            cfg.filters.category = category;
        }
        if let Some(bin) = self.discount_bin {
            cfg.filters.discount_bin = bin;
        }
    }
}

impl DrilldownArgs {
    fn apply(self, cfg: &mut ProfitlensConfig) -> Result<()> {
        if let Some(top_k) = self.top_k {
            cfg.drilldown.top_k = top_k;
        }
        if let Some(scope) = self.scope {
            cfg.drilldown.scope = scope.parse()?;
        }
        if let Some(dims) = self.dims {
            cfg.drilldown.dimensions = split_list(&dims);
        }
        Ok(())
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_dimensions(s: &str) -> Result<Vec<Dimension>> {
    split_list(s)
        .iter()
        .map(|d| d.parse::<Dimension>().map_err(anyhow::Error::from))
        .collect()
}

fn main() -> Result<()> {
    let app = App::parse();

    let mut cfg = config::load();
    if let Some(path) = &app.data {
        cfg.data.path = path.display().to_string();
    }
    logging::init(&cfg.logging.level);

    let data_path = PathBuf::from(&cfg.data.path);

    match app.command {
        Commands::Report {
            view,
            format,
            filters,
            drilldown,
        } => {
            let kind: ViewKind = view.parse()?;
            filters.apply(&mut cfg);
            drilldown.apply(&mut cfg)?;
            let view_config = cfg.view_config()?;
            let dataset = cli::load_dataset(&data_path)?;
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_report(&dataset, kind, &view_config, fmt)
        }
        Commands::Kpi { format, filters } => {
            filters.apply(&mut cfg);
            let view_config = cfg.view_config()?;
            let dataset = cli::load_dataset(&data_path)?;
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_kpi(&dataset, &view_config.filters, fmt)
        }
        Commands::Aggregate {
            by,
            metric,
            reduce,
            format,
            filters,
        } => {
            let dimensions = parse_dimensions(&by)?;
            let metric: Metric = metric.parse()?;
            let reduction: Reduction = reduce.parse()?;
            filters.apply(&mut cfg);
            let view_config = cfg.view_config()?;
            let dataset = cli::load_dataset(&data_path)?;
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_aggregate(
                &dataset,
                &view_config.filters,
                &dimensions,
                metric,
                reduction,
                fmt,
            )
        }
        Commands::Drilldown {
            format,
            filters,
            drilldown,
        } => {
            filters.apply(&mut cfg);
            drilldown.apply(&mut cfg)?;
            let view_config = cfg.view_config()?;
            let dataset = cli::load_dataset(&data_path)?;
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_drilldown(&dataset, &view_config, fmt)
        }
        Commands::Options { format } => {
            let dataset = cli::load_dataset(&data_path)?;
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_options(&dataset, fmt)
        }
        Commands::Inspect => {
            let dataset = cli::load_dataset(&data_path)?;
            cli::run_inspect(&dataset, &data_path)
        }
        Commands::Web { addr, no_open } => {
            // Fail on a broken config before binding rather than on first request.
            cfg.view_config()?;
            let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
            let open = cfg.web.open_browser && !no_open;
            let dataset = cli::load_dataset(&data_path)?;
            let state = AppState {
                dataset,
                data_path,
                config: cfg,
            };
            web::serve(&addr, state, open)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
