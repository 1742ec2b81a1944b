//! Feed synchronization.
//!
//! One sync run parses a feed snapshot, marks vehicles that vanished from
//! it as sold, and upserts every feed record. The two writes touch
//! disjoint VIN sets, so their relative order does not matter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::error::{AppError, Result};
use crate::feed::{self, ParsedFeed};
use crate::models::{VehicleRecord, VehicleStatus};
use crate::storage::InventoryStore;

use super::diff::{NewlySold, detect_newly_sold, feed_vin_set};

/// Diagnostic summary of one sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub previous_inventory_count: usize,
    pub new_inventory_count: usize,
    pub newly_sold_count: usize,
    pub newly_sold_vins: Vec<NewlySold>,
    /// Raw header names from the feed, for spotting format drift.
    pub csv_columns: Vec<String>,
    /// First parsed record, as a quick shape check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_vehicle: Option<VehicleRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Parse a feed snapshot and reconcile the store against it.
pub async fn run_sync(
    feed_text: &str,
    config: &FeedConfig,
    store: &dyn InventoryStore,
) -> Result<SyncSummary> {
    let ParsedFeed { vehicles, columns } = feed::parse_feed(feed_text, config)?;
    if vehicles.is_empty() {
        // A truncated or malformed upload must never empty the lot.
        return Err(AppError::empty_feed(columns));
    }

    let mut active = Vec::new();
    for status in VehicleStatus::active() {
        active.extend(store.get_by_status(status).await?);
    }

    let feed_vins = feed_vin_set(&vehicles);
    let newly_sold = detect_newly_sold(&active, &feed_vins);

    if !newly_sold.is_empty() {
        for sold in &newly_sold {
            info!("Marking sold: {} ({})", sold.vin, sold.name);
        }
        let vins: Vec<String> = newly_sold.iter().map(|s| s.vin.clone()).collect();
        let report = store.mark_sold(&vins).await?;
        for failure in &report.failed {
            warn!("Could not mark {} sold: {}", failure.vin, failure.reason);
        }
    }

    let report = store.upsert_batch(&vehicles).await?;
    for failure in &report.failed {
        warn!("Upsert failed for {}: {}", failure.vin, failure.reason);
    }

    info!(
        "Sync complete: {} active before, {} in feed, {} newly sold",
        active.len(),
        vehicles.len(),
        newly_sold.len()
    );

    Ok(SyncSummary {
        previous_inventory_count: active.len(),
        new_inventory_count: vehicles.len(),
        newly_sold_count: newly_sold.len(),
        newly_sold_vins: newly_sold,
        csv_columns: columns,
        sample_vehicle: vehicles.first().cloned(),
        timestamp: Utc::now(),
    })
}
