// src/main.rs - Device entry point: config, logging, control loop
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use krusty_node::config::{self, Config, ConfigError};
use krusty_node::control::buttons::KeyboardButtons;
use krusty_node::control::ControlLoop;
use krusty_node::logging::init_logging;
use krusty_node::print_job::Orchestrator;
use krusty_node::printer::SimulatedPrinter;
use krusty_node::service::HttpJobService;
use krusty_node::ui::{CharacterLcd, ConsoleDriver};

const DEFAULT_CONFIG_PATH: &str = "krusty-node.toml";

#[derive(Parser, Debug)]
#[command(name = "printer-client", version, about = "Networked 3D printer job client.")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    /// Start in polling mode instead of the main menu
    #[arg(long)]
    polling: bool,
}

fn resolve_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => config::load_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => config::load_config(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();
    let loaded = resolve_config(cli.config.as_deref());

    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let config = loaded.map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        tracing::error!("Please ensure the configuration file exists and is properly formatted");
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    tracing::info!("Starting krusty-node {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Printer {} -> {}", config.server.printer_id, config.server.base_url);

    let service = match HttpJobService::new(&config.server) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!("Failed to initialize HTTP client: {}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>);
        }
    };
    let printer = Box::new(SimulatedPrinter::new(&config.simulation));
    let orchestrator = Orchestrator::new(service, printer, &config);
    let display = Box::new(CharacterLcd::new(ConsoleDriver::new()));
    let buttons = Box::new(
        KeyboardButtons::spawn_stdin().with_min_interval(Duration::from_millis(config.ui.debounce_ms)),
    );

    let mut device = ControlLoop::new(orchestrator, display, buttons, &config);
    if cli.polling {
        device.enter_polling();
    }

    device
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
