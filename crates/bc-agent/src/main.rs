//! backchannel agent
//!
//! Binds a remote-call endpoint, announces it to the driver and serves
//! requests until the driver asks it to exit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bc_agent::{Agent, KeywordSet};
use bc_core::config::{self, AgentConfig};
use bc_core::options::{AgentOptions, AGENT_OPTIONS_ENV};

#[derive(Parser)]
#[command(name = "bc-agent")]
#[command(about = "backchannel agent - dials back to the driver and serves remote calls")]
#[command(version)]
struct Args {
    /// Driver option string (host:port[:APPORT=n][:DEBUG][:CLOSE_SECURITY_DIALOGS])
    #[arg(long, env = AGENT_OPTIONS_ENV)]
    options: Option<String>,

    /// Agent name announced to the driver (defaults to hostname and pid)
    #[arg(short, long)]
    name: Option<String>,

    /// Remote-call port (overrides options and config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let options = args
        .options
        .as_deref()
        .map(str::parse::<AgentOptions>)
        .transpose()
        .context("Invalid agent options")?;

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_agent_config_path);
    let mut config = match &options {
        Some(options) => AgentConfig::from_options(options),
        None if config_path.exists() => config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?,
        None => AgentConfig::default(),
    };

    // Apply command-line overrides
    if let Some(name) = args.name {
        config.name = Some(name);
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // Initialize logging
    let log_level = if config.debug { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let library = KeywordSet::new().with("echo", |args, _| {
        Ok(args.into_iter().next().unwrap_or(Value::Null))
    });
    let agent = Agent::new(config, Arc::new(library)).with_exit_hook(|code| {
        tracing::info!("Exiting with code {}", code);
        std::process::exit(code);
    });

    let handle = agent.start().await.context("Failed to start agent")?;

    tokio::select! {
        _ = handle.stopped() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            tracing::info!("Received Ctrl+C, shutting down...");
            handle.shutdown();
        }
    }

    Ok(())
}
