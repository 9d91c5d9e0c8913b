//! VOC CLI - Command-line tool for Volvo On Call vehicles
//!
//! Reads account and vehicle data and runs remote commands (lock, unlock,
//! honk and blink, status refresh) against the Volvo On Call customer API.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use voc_client::VocClient;

use crate::config::{ArgOverrides, Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "voc-cli")]
#[command(author, version, about = "Volvo On Call vehicle CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Account username
    #[arg(short, long, env = "VOC_USERNAME")]
    username: Option<String>,

    /// Account password
    #[arg(short, long, env = "VOC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Service region (e.g. eu, na, cn)
    #[arg(short, long, env = "VOC_REGION")]
    region: Option<String>,

    /// Explicit API root, overrides the region
    #[arg(long, env = "VOC_BASE_URL")]
    base_url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "VOC_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the account and its vehicle relations
    Account,

    /// List vehicles linked to the account
    Vehicles,

    /// Show the last reported status of a vehicle
    Status {
        /// Vehicle ID
        vehicle: String,
    },

    /// Show static attributes of a vehicle
    Attributes {
        /// Vehicle ID
        vehicle: String,
    },

    /// Ask the vehicle to report fresh status, then show it
    Refresh {
        /// Vehicle ID
        vehicle: String,
    },

    /// Lock the vehicle
    Lock {
        /// Vehicle ID
        vehicle: String,
    },

    /// Unlock the vehicle
    Unlock {
        /// Vehicle ID
        vehicle: String,
    },

    /// Honk the horn and blink the lights
    Honk {
        /// Vehicle ID
        vehicle: String,
    },

    /// Show a remote operation by id
    Service {
        /// Vehicle ID
        vehicle: String,

        /// Operation ID (customerServiceId)
        operation: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&ArgOverrides {
        username: cli.username.as_deref(),
        region: cli.region.as_deref(),
        base_url: cli.base_url.as_deref(),
        no_color: cli.no_color,
    });

    let format = cli
        .output
        .or_else(|| config.output.as_deref().and_then(OutputFormat::parse))
        .unwrap_or_default();

    // Create output context
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);

    let client = create_client(&merged, cli.password.as_deref())?;

    // Execute command
    match &cli.command {
        Commands::Account => commands::account(&client, &ctx).await?,
        Commands::Vehicles => commands::vehicles(&client, &ctx).await?,
        Commands::Status { vehicle } => commands::status(&client, vehicle, &ctx).await?,
        Commands::Attributes { vehicle } => commands::attributes(&client, vehicle, &ctx).await?,
        Commands::Refresh { vehicle } => commands::refresh(&client, vehicle, &ctx).await?,
        Commands::Lock { vehicle } => commands::lock(&client, vehicle, &ctx).await?,
        Commands::Unlock { vehicle } => commands::unlock(&client, vehicle, &ctx).await?,
        Commands::Honk { vehicle } => commands::honk(&client, vehicle, &ctx).await?,
        Commands::Service { vehicle, operation } => {
            commands::service(&client, vehicle, operation, &ctx).await?
        }
    }

    Ok(())
}

/// Create an authenticated client for the resolved settings
fn create_client(merged: &MergedConfig, password: Option<&str>) -> Result<VocClient> {
    let username = merged
        .username
        .as_deref()
        .context("No username given (use --username, VOC_USERNAME or the config file)")?;
    let password = password.context("No password given (use --password or VOC_PASSWORD)")?;

    let client = VocClient::new(merged.client_config()).context("Failed to create VOC client")?;
    Ok(client.authenticate(username, password))
}
