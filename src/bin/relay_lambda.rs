//! AWS Lambda entry point for the feed relay
//!
//! Triggered by S3 `ObjectCreated` notifications on the feed bucket.
//! Deploy with `cargo lambda build --release --features lambda`.
//!
//! Environment:
//! - `SYNC_ENDPOINT_URL` - full URL of the sync endpoint
//! - `SYNC_API_KEY` - shared secret forwarded as x-api-key

use lambda_runtime::{Error as LambdaError, service_fn};

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("lotsync feed relay starting...");
    lambda_runtime::run(service_fn(lotsync::relay::handler)).await
}
