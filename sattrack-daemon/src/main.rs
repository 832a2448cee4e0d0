use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use sattrack_core::module::Module;
use sattrack_core::sat::SatDataSource;
use sattrack_core::time::{Clock, SystemClock};

mod logging;
mod store;
mod views;

/// Daemon configuration file.
#[derive(Debug, Clone, Deserialize)]
struct DaemonConfig {
    /// Module configuration files to open at startup.
    modules: Vec<PathBuf>,

    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    log_dir: PathBuf,

    #[serde(default = "default_log_level")]
    log_level: String,

    #[serde(default = "default_log_retention_days")]
    log_retention_days: u64,

    /// Shared preferences file applied to modules without local overrides.
    #[serde(default)]
    preferences_file: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_retention_days() -> u64 {
    3
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sattrack.toml".to_string());
    let content = std::fs::read_to_string(&cfg_path)
        .with_context(|| format!("failed to read {cfg_path}"))?;
    let config: DaemonConfig =
        toml::from_str(&content).with_context(|| format!("failed to parse {cfg_path}"))?;

    let _log_guard = logging::init(
        &config.log_dir,
        "sattrack",
        &config.log_level,
        config.log_retention_days,
    )?;

    tracing::info!("sattrack daemon starting");
    tracing::info!("satellite data from {}", config.data_dir.display());

    let store: Arc<dyn SatDataSource> = Arc::new(store::EphemerisStore::new(&config.data_dir));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let factory = views::view_factory();

    let mut modules = Vec::new();
    for path in &config.modules {
        match Module::open(
            path,
            config.preferences_file.clone(),
            store.clone(),
            clock.clone(),
            factory.clone(),
        )
        .await
        {
            Ok(mut module) => {
                module.start().await?;
                tracing::info!("module '{}' running", module.name());
                modules.push(module);
            }
            Err(e) => {
                tracing::error!("failed to open module from {}: {}", path.display(), e);
            }
        }
    }
    if modules.is_empty() {
        anyhow::bail!("no modules could be opened");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down {} modules", modules.len());
    for module in modules {
        module.close().await;
    }
    Ok(())
}
