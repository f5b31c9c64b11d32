use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use portal_charts_config::{
    ConfigurationStore, JsonFileBackend, SavedConfiguration, StoreOrigin,
};
use portal_charts_data::{RawSeries, SourceClient};
use portal_charts_pipeline::{
    ChartPipeline, LoadOptions, PortalConfig, StatusLevel, StatusSink,
};
use portal_charts_shared::{Provenance, SeriesKey};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod render;

use render::TextRenderer;

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Portal statistics dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and draw one series (or all of them)
    Show {
        /// Series to display: empresas, usuarios, eventos
        series: Option<String>,

        /// Reporting period forwarded to the origins
        #[arg(short, long)]
        period: Option<String>,

        /// Extra query filter, repeatable (name=value)
        #[arg(short, long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,

        /// Bypass the cache and fetch fresh data
        #[arg(short, long)]
        refresh: bool,
    },
    /// Probe each configured endpoint and report what it answers
    Test {
        /// Series whose endpoints to probe; all when omitted
        series: Option<String>,
    },
    /// Manage saved chart configurations
    Configs {
        #[command(subcommand)]
        action: ConfigsAction,
    },
}

#[derive(Subcommand)]
enum ConfigsAction {
    /// List every saved configuration in both stores
    List,
    /// Save a new configuration
    Save {
        /// Configuration name (becomes the chart title)
        #[arg(short, long)]
        name: String,

        /// Series the configuration applies to
        #[arg(short, long)]
        series: String,

        /// Chart kind: line, bar, pie, doughnut
        #[arg(short, long)]
        kind: Option<String>,

        /// Primary color, e.g. "#1e88e5"
        #[arg(long)]
        color: Option<String>,

        /// Save to the secondary store instead of the primary
        #[arg(long)]
        secondary: bool,
    },
    /// Delete one entry by store and position
    Delete {
        /// Store holding the entry: primary or secondary
        origin: String,

        /// Zero-based position within that store
        index: usize,
    },
    /// Empty both stores
    Clear,
}

/// Forwards pipeline status messages to the log
struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn set_status(&self, message: &str, level: StatusLevel) {
        match level {
            StatusLevel::Info | StatusLevel::Success => info!("{}", message),
            StatusLevel::Warning => warn!("{}", message),
            StatusLevel::Error => error!("{}", message),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if let Some(config_path) = cli.config {
        let path = config_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("config path is not valid UTF-8"))?;
        PortalConfig::from_file(path)?
    } else {
        PortalConfig::from_env()?
    };

    match cli.command {
        Some(Commands::Show {
            series,
            period,
            filters,
            refresh,
        }) => {
            show_series(config, series, period, filters, refresh).await?;
        }
        Some(Commands::Test { series }) => {
            probe_endpoints(config, series).await?;
        }
        Some(Commands::Configs { action }) => {
            manage_configs(config, action)?;
        }
        None => {
            // Default: draw every series
            show_series(config, None, None, Vec::new(), false).await?;
        }
    }

    Ok(())
}

async fn show_series(
    config: PortalConfig,
    series: Option<String>,
    period: Option<String>,
    filters: Vec<String>,
    refresh: bool,
) -> Result<()> {
    let keys = resolve_keys(series)?;
    let options = LoadOptions {
        period,
        filters: parse_filters(&filters)?,
        force_refresh: refresh,
    };

    let store = file_store(&config);
    let pipeline = ChartPipeline::new(config, store, Box::new(TracingStatusSink))
        .with_renderer(Box::new(TextRenderer));

    for key in keys {
        let container = format!("grafico-{}", key);
        let result = pipeline.render_into(&container, key, &options).await;

        match result.outcome.provenance {
            Provenance::Synthetic => {
                warn!("{} shows synthetic example data", key.schema().display_name)
            }
            Provenance::Live if result.outcome.from_cache => {
                info!("{} served from cache", key.schema().display_name)
            }
            Provenance::Live => {}
        }
    }

    Ok(())
}

async fn probe_endpoints(config: PortalConfig, series: Option<String>) -> Result<()> {
    let keys = resolve_keys(series)?;
    let client = SourceClient::new(config.request_timeout());

    for key in keys {
        info!("Probing endpoints for {}...", key);

        for endpoint in config.sources.endpoints_for(key) {
            let chain = [endpoint.clone()];
            match client.fetch_series(key, &chain, &[]).await {
                Ok(payload) => match &payload.raw {
                    RawSeries::Records(items) => {
                        info!("  OK {} ({} records)", endpoint.url, items.len());
                    }
                    RawSeries::Aggregate(snapshot) => {
                        info!("  OK {} (aggregate, total {})", endpoint.url, snapshot.total);
                    }
                },
                Err(err) => {
                    error!("  FAIL {}: {}", endpoint.url, err);
                }
            }
        }
    }

    Ok(())
}

fn manage_configs(config: PortalConfig, action: ConfigsAction) -> Result<()> {
    let store = file_store(&config);

    match action {
        ConfigsAction::List => {
            let entries = store.list();
            if entries.is_empty() {
                println!("No saved configurations");
                return Ok(());
            }

            let effective = store.resolve_effective();
            let mut counters: BTreeMap<String, usize> = BTreeMap::new();

            println!("Origin,Index,Name,Source,SavedAt,Effective");
            for entry in &entries {
                let counter = counters.entry(entry.origin.to_string()).or_insert(0);
                let index = *counter;
                *counter += 1;

                let is_effective = effective.as_ref() == Some(entry);
                println!(
                    "{},{},{},{},{},{}",
                    entry.origin,
                    index,
                    entry.name,
                    entry.data_source,
                    entry.saved_at.to_rfc3339(),
                    if is_effective { "yes" } else { "" }
                );
            }

            info!("Total configurations: {}", entries.len());
        }
        ConfigsAction::Save {
            name,
            series,
            kind,
            color,
            secondary,
        } => {
            let key: SeriesKey = series.parse()?;
            let mut entry = SavedConfiguration::for_series(name, key);
            if let Some(kind) = kind {
                entry.chart_kind = Some(kind.parse()?);
            }
            entry.color_primary = color;
            if secondary {
                entry.origin = StoreOrigin::Secondary;
            }

            store.save(&entry)?;
            info!("Saved configuration '{}' to the {} store", entry.name, entry.origin);
        }
        ConfigsAction::Delete { origin, index } => {
            let origin: StoreOrigin = origin.parse()?;
            store.delete(origin, index)?;
            info!("Deleted entry {} from the {} store", index, origin);
        }
        ConfigsAction::Clear => {
            store.clear_all()?;
            info!("Cleared both configuration stores");
        }
    }

    Ok(())
}

fn file_store(config: &PortalConfig) -> ConfigurationStore {
    ConfigurationStore::new(
        Box::new(JsonFileBackend::new("primary", &config.stores.primary_path)),
        Box::new(JsonFileBackend::new(
            "secondary",
            &config.stores.secondary_path,
        )),
    )
}

fn resolve_keys(series: Option<String>) -> Result<Vec<SeriesKey>> {
    match series {
        Some(name) => Ok(vec![name.parse()?]),
        None => Ok(SeriesKey::ALL.to_vec()),
    }
}

fn parse_filters(filters: &[String]) -> Result<BTreeMap<String, String>> {
    let mut parsed = BTreeMap::new();
    for filter in filters {
        let Some((name, value)) = filter.split_once('=') else {
            bail!("invalid filter '{}', expected name=value", filter);
        };
        parsed.insert(name.to_string(), value.to_string());
    }
    Ok(parsed)
}
