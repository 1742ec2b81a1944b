//! AWS Lambda entry point for the sync endpoint
//!
//! Deploy with `cargo lambda build --release --features lambda`.
//!
//! Environment:
//! - `SYNC_API_KEY` - shared secret for /sync and /overrides
//! - `SYNC_PAUSED` - set truthy to refuse feed uploads
//! - `INVENTORY_TABLE` - DynamoDB table name (default: inventory)
//! - `FEED_CONFIG` - optional path to a feed config TOML

use lambda_http::{Error as LambdaError, service_fn};

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("lotsync ingest endpoint starting...");
    lambda_http::run(service_fn(lotsync::ingest::handler)).await
}
