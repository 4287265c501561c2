use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clusterscan_config::{
    ConfigLoad, ConfigLoader, ConfigSource, apply_guard_rails, render_toml,
};
use clusterscan_core::{
    ControllerConfig, InMemoryStore, ScanRunController, store::StoreSeed,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "clusterscan-operator")]
#[command(about = "Reconciles finished compliance scan runs into reports")]
struct Cli {
    /// Controller config file (TOML or JSON). Overrides CLUSTERSCAN_CONFIG_PATH.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller identity matched against run-object labels
    #[arg(long)]
    controller_name: Option<String>,

    /// Number of reconcile workers (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Profile used for scans that do not name one (overrides config)
    #[arg(long)]
    default_profile: Option<String>,

    /// JSON fixture with scans, profiles, artifacts and runs to preload
    #[arg(long, env = "CLUSTERSCAN_SEED_PATH")]
    seed: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Stdout carries only the rendered config under --print-config.
    if !cli.print_config {
        init_tracing();
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad {
        mut config,
        source,
        warnings,
    } = loader.load().context("failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);
    apply_guard_rails(&config).context("invalid command-line overrides")?;

    if cli.print_config {
        print!("{}", render_toml(&config)?);
        return Ok(());
    }

    match &source {
        ConfigSource::Default => info!("no config file found, using defaults"),
        ConfigSource::EnvInline => {
            info!("controller config loaded from inline environment json")
        }
        other => {
            if let Some(path) = other.path() {
                info!(path = %path.display(), "controller config loaded from file");
            }
        }
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    info!(
        controller.name = %config.controller_name,
        controller.workers = config.workers,
        output.namespace = %config.output_namespace,
        output.file = %config.output_file_name,
        retry.base_ms = config.retry.backoff_base_ms,
        retry.max_ms = config.retry.backoff_max_ms,
        "controller configuration in effect"
    );

    let store = Arc::new(InMemoryStore::new(config.event_channel_capacity));
    if let Some(path) = cli.seed.as_ref() {
        let seed = load_seed(path)?;
        info!(
            path = %path.display(),
            scans = seed.scans.len(),
            runs = seed.runs.len(),
            "seeding store"
        );
        store.seed(seed).await;
    }

    let controller = ScanRunController::new(config, store);
    controller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for shutdown signal: {e}");
            }
            info!("shutdown signal received");
        })
        .await
        .context("controller failed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Override via RUST_LOG.
                "info,clusterscan::reconcile=info,clusterscan::runtime=info,clusterscan::extract=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn apply_cli_overrides(config: &mut ControllerConfig, cli: &Cli) {
    if let Some(name) = cli.controller_name.clone() {
        config.controller_name = name;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(profile) = cli.default_profile.clone() {
        config.default_profile = Some(profile);
    }
}

fn load_seed(path: &Path) -> anyhow::Result<StoreSeed> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file {}", path.display()))
}
