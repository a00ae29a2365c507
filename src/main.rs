//! wsgate server
//!
//! Run with: cargo run -- --config config.toml
//!
//! Without `--config` the default locations are tried, then defaults with
//! `WSGATE_*` environment overrides.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use wsgate::{api, config, logging, websocket::Hub, AppState, Config, LoadedConfig};

#[derive(Parser)]
#[command(name = "wsgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "WebSocket publish/subscribe gateway")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the default config file and exit
    #[arg(long)]
    pub print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", config::generate_default_config());
        return Ok(());
    }

    let loaded = match cli.config {
        Some(path) => {
            let config = Config::load_with_env(&path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            LoadedConfig::from_file(config, path)
        }
        None => Config::load_default(),
    };

    logging::init(&loaded.config.logging).context("initializing logging")?;

    tracing::info!("Starting wsgate v{}", env!("CARGO_PKG_VERSION"));
    loaded.log();
    let config = loaded.config;

    let (hub, hub_task) = Hub::spawn(config.hub_config());
    let api_config = config.api_config();
    let state = AppState::new(hub, config.ws_settings(), api_config.clone());

    api::serve(state, &api_config).await?;

    hub_task.abort();
    tracing::info!("wsgate stopped");
    Ok(())
}
