use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use listener_group::config::loader::load_config;
use listener_group::config::{apply_overrides, ConfigOverrides, GroupConfig};
use listener_group::error::exit_status;
use listener_group::lifecycle::{startup, SignalWatcher};
use listener_group::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "listener-group")]
#[command(about = "Run several HTTP listeners that shut down together", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address; repeat for several listeners. Replaces configured listeners.
    #[arg(short, long = "listen", value_name = "ADDR")]
    listen: Vec<String>,

    /// Time each listener gets to drain after shutdown starts.
    #[arg(long)]
    grace_period_ms: Option<u64>,

    /// Artificial latency of every request.
    #[arg(long)]
    handler_delay_ms: Option<u64>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen: self.listen.clone(),
            grace_period_ms: self.grace_period_ms,
            handler_delay_ms: self.handler_delay_ms,
            log_level: self.log_level.clone(),
        }
    }

    fn load_config(&self) -> listener_group::Result<GroupConfig> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => GroupConfig::default(),
        };
        Ok(apply_overrides(config, &self.overrides())?)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            println!("{}", e);
            return ExitCode::from(exit_status(&Err(e)));
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::info!(
        listeners = config.listeners.len(),
        grace_period_ms = config.shutdown.grace_period_ms,
        handler_delay_ms = config.handler.delay_ms,
        "listener-group v0.1.0 starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Before any listener is spawned, so an early signal is not lost.
    let watcher = match SignalWatcher::register() {
        Ok(watcher) => watcher,
        Err(e) => {
            println!("failed to register signal handlers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = startup::run(&config, watcher).await;
    match &result {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(e) => {
            println!("{}", e);
            if e.is_intentional() {
                tracing::info!("Shutdown complete");
            }
        }
    }
    ExitCode::from(exit_status(&result))
}
