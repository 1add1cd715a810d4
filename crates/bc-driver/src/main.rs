//! backchannel driver
//!
//! Runs the rendezvous listener and attaches to dial-back applications.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bc_core::config::{self, DriverConfig};
use bc_core::options::AGENT_OPTIONS_ENV;
use bc_driver::Driver;

#[derive(Parser)]
#[command(name = "bc-driver")]
#[command(about = "backchannel test driver")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Rendezvous port (overrides config, 0 picks a free port)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the rendezvous listener and log announcements until Ctrl+C
    Listen,

    /// Wait for an application to announce itself and attach to it
    Attach {
        /// Alias for the attached application
        #[arg(long, default_value = "app")]
        alias: String,

        /// Only accept agents whose name contains this text
        #[arg(long)]
        name: Option<String>,

        /// Seconds to wait for the agent (overrides config)
        #[arg(long)]
        timeout: Option<f64>,

        /// Ask the application to exit and wait until it has closed
        #[arg(long)]
        exit: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = load_config(args.config.as_ref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    let driver = Driver::start(config).await?;
    println!("{}={}", AGENT_OPTIONS_ENV, driver.agent_options());

    match args.command {
        Command::Listen => {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
            tracing::info!("Received Ctrl+C, shutting down...");
            for agent in driver.registry().list(true) {
                tracing::info!("Known agent: {}", agent);
            }
            driver.shutdown();
        }

        Command::Attach {
            alias,
            name,
            timeout,
            exit,
        } => {
            let timeout = timeout
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("Invalid timeout")?;

            driver
                .application_started(&alias, timeout, name.as_deref())
                .await?;
            let environment = driver.log_system_properties().await?;
            println!("{}", serde_json::to_string_pretty(&environment)?);

            if exit {
                driver
                    .ensure_application_should_close(timeout, driver.system_exit(0))
                    .await?;
                tracing::info!("Application \"{}\" closed", alias);
            }
        }
    }

    Ok(())
}

/// Load configuration from `path`, the default location, or defaults
fn load_config(path: Option<&PathBuf>) -> Result<DriverConfig> {
    if let Some(config_path) = path {
        return config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(config::load_config(&default_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
            DriverConfig::default()
        }))
    } else {
        tracing::info!("Using default configuration");
        Ok(DriverConfig::default())
    }
}
