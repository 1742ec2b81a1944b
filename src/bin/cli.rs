//! lotsync CLI
//!
//! Local operation of the inventory pipeline against a JSON-file store.
//! For the hosted endpoints, use `lotsync-ingest` and `lotsync-relay`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lotsync::{
    config::FeedConfig,
    error::{AppError, Result},
    export::export_listings,
    feed,
    models::{OverridePatch, VehicleStatus},
    pipeline,
    storage::{InventoryStore, LocalStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// lotsync - Dealer Inventory Sync
#[derive(Parser, Debug)]
#[command(name = "lotsync", version, about = "Dealer inventory feed pipeline")]
struct Cli {
    /// Path to the storage directory
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to a feed config TOML (default: {storage_dir}/feed.toml)
    #[arg(long)]
    feed_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a feed CSV and show columns, counts and a sample record
    Parse {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Sync the store against a feed CSV
    Sync {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// List stored vehicles
    List {
        /// Filter by status: available, call or sold (default: active)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one stored vehicle as JSON
    Show {
        vin: String,
    },

    /// Apply an override patch to one vehicle
    Set {
        vin: String,
        /// Patch as JSON, e.g. '{"featured": true}'
        overrides: String,
    },

    /// Write the public listing feed
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the feed configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.feed_config {
        Some(path) => FeedConfig::load(path)?,
        None => {
            let default_path = cli.storage_dir.join("feed.toml");
            if default_path.exists() {
                FeedConfig::load_or_default(default_path)
            } else {
                FeedConfig::default()
            }
        }
    };
    config.validate()?;

    let store = LocalStore::new(&cli.storage_dir);

    match cli.command {
        Command::Parse { file } => {
            let text = std::fs::read_to_string(&file)?;
            let parsed = feed::parse_feed(&text, &config)?;

            println!("Columns: {}", parsed.columns.join(", "));
            println!("Parsed {} vehicles", parsed.vehicles.len());
            if let Some(sample) = parsed.vehicles.first() {
                println!("{}", serde_json::to_string_pretty(sample)?);
            }
        }

        Command::Sync { file } => {
            let text = std::fs::read_to_string(&file)?;
            let summary = pipeline::run_sync(&text, &config, &store).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::List { status } => {
            let statuses = match status {
                Some(value) => vec![parse_status(&value)?],
                None => VehicleStatus::active().to_vec(),
            };

            let mut vehicles = Vec::new();
            for status in statuses {
                vehicles.extend(store.get_by_status(status).await?);
            }
            vehicles.sort_by(|a, b| a.record.vin.cmp(&b.record.vin));

            for vehicle in &vehicles {
                let mut flags = Vec::new();
                if vehicle.featured {
                    flags.push("featured");
                }
                if vehicle.hidden {
                    flags.push("hidden");
                }
                if vehicle.auction {
                    flags.push("auction");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };

                println!(
                    "{:<18} {:<32} {:>16} {}{}",
                    vehicle.record.vin,
                    vehicle.record.display_name(),
                    vehicle.manual_price.as_deref().unwrap_or(&vehicle.record.price),
                    vehicle.record.status,
                    flags
                );
            }
            println!("{} vehicles", vehicles.len());
        }

        Command::Show { vin } => match store.get_by_vin(&vin).await? {
            Some(vehicle) => println!("{}", serde_json::to_string_pretty(&vehicle)?),
            None => return Err(AppError::not_found(vin)),
        },

        Command::Set { vin, overrides } => {
            let patch: OverridePatch = serde_json::from_str(&overrides)?;
            let vehicle = store.apply_overrides(&vin, &patch).await?;
            println!("{}", serde_json::to_string_pretty(&vehicle)?);
        }

        Command::Export { output } => {
            let mut vehicles = Vec::new();
            for status in VehicleStatus::active() {
                vehicles.extend(store.get_by_status(status).await?);
            }
            let listings = export_listings(&vehicles);
            let json = serde_json::to_string_pretty(&listings)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Wrote {} listings to {}", listings.len(), path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Validate => {
            println!("Feed config OK. Effective configuration:");
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Parse a status filter argument.
fn parse_status(value: &str) -> Result<VehicleStatus> {
    match value.to_ascii_lowercase().as_str() {
        "available" => Ok(VehicleStatus::Available),
        "sold" => Ok(VehicleStatus::Sold),
        "call" => Ok(VehicleStatus::Call),
        other => Err(AppError::validation(format!(
            "Unknown status '{other}' (expected available, call or sold)"
        ))),
    }
}
