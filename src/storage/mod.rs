//! Storage abstractions for inventory persistence.
//!
//! Two writers share these records: the feed sync (full refresh of
//! feed-owned fields via [`InventoryStore::upsert_batch`]) and the admin
//! panel (named override fields via [`InventoryStore::apply_overrides`]).
//! The operations touch disjoint field sets, so neither can clobber the
//! other.

pub mod local;

#[cfg(feature = "dynamo")]
pub mod dynamo;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{OverridePatch, StoredVehicle, VehicleRecord, VehicleStatus};

// Re-export for convenience
pub use local::LocalStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoStore;

/// Per-request item cap for batch writes.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Collapse repeated VINs to their last occurrence, keeping first-seen
/// order. Batch requests reject duplicate keys, and a later feed row
/// supersedes an earlier one for the same vehicle.
pub(crate) fn dedupe_by_vin(records: &[VehicleRecord]) -> Vec<&VehicleRecord> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut deduped: Vec<&VehicleRecord> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(record.vin.as_str()) {
            Some(&at) => deduped[at] = record,
            None => {
                index.insert(record.vin.as_str(), deduped.len());
                deduped.push(record);
            }
        }
    }
    deduped
}

/// A write that failed for one VIN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFailure {
    pub vin: String,
    pub reason: String,
}

/// Outcome of a batch upsert. Per-VIN failures are reported, not thrown;
/// VINs are independent and one bad item must not sink the batch.
#[derive(Debug, Clone, Default)]
pub struct UpsertReport {
    pub written: usize,
    pub failed: Vec<WriteFailure>,
}

/// Outcome of a mark-sold pass.
#[derive(Debug, Clone, Default)]
pub struct MarkSoldReport {
    pub sold: Vec<String>,
    pub failed: Vec<WriteFailure>,
}

/// Trait for inventory storage backends.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// All records with the given status, across every result page.
    async fn get_by_status(&self, status: VehicleStatus) -> Result<Vec<StoredVehicle>>;

    /// Point lookup by VIN.
    async fn get_by_vin(&self, vin: &str) -> Result<Option<StoredVehicle>>;

    /// Idempotent bulk write of feed records.
    ///
    /// Existing entries keep their `created_at`, `sold_date` and override
    /// fields; feed-owned fields are replaced and `updated_at` refreshed.
    async fn upsert_batch(&self, records: &[VehicleRecord]) -> Result<UpsertReport>;

    /// Mark each VIN sold: status, sold date and the price sentinel.
    ///
    /// Updates are independent per VIN; a failure on one is reported and
    /// does not block the others.
    async fn mark_sold(&self, vins: &[String]) -> Result<MarkSoldReport>;

    /// Merge-patch the override fields named in `patch`.
    async fn apply_overrides(&self, vin: &str, patch: &OverridePatch) -> Result<StoredVehicle>;

    /// Hard removal. Admin path only; the sync pipeline never deletes.
    async fn delete(&self, vin: &str) -> Result<()>;
}
