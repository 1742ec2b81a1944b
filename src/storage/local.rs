//! Local filesystem storage implementation.
//!
//! Keeps the whole inventory in one JSON file, written atomically. This is
//! the development and test backend; production deployments use DynamoStore.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{OverridePatch, StoredVehicle, VehicleRecord, VehicleStatus};
use crate::storage::{InventoryStore, MarkSoldReport, UpsertReport, WriteFailure, dedupe_by_vin};

const INVENTORY_FILE: &str = "inventory.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn inventory_path(&self) -> PathBuf {
        self.root_dir.join(INVENTORY_FILE)
    }

    /// Load the inventory map; an absent file is an empty inventory.
    async fn load(&self) -> Result<BTreeMap<String, StoredVehicle>> {
        match tokio::fs::read(self.inventory_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write the inventory map atomically (write to temp, then rename).
    async fn save(&self, map: &BTreeMap<String, StoredVehicle>) -> Result<()> {
        let path = self.inventory_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for LocalStore {
    async fn get_by_status(&self, status: VehicleStatus) -> Result<Vec<StoredVehicle>> {
        let map = self.load().await?;
        Ok(map
            .into_values()
            .filter(|v| v.record.status == status)
            .collect())
    }

    async fn get_by_vin(&self, vin: &str) -> Result<Option<StoredVehicle>> {
        let map = self.load().await?;
        Ok(map.get(vin).cloned())
    }

    async fn upsert_batch(&self, records: &[VehicleRecord]) -> Result<UpsertReport> {
        let records = dedupe_by_vin(records);
        let mut map = self.load().await?;
        let now = Utc::now();

        for &record in &records {
            match map.get_mut(&record.vin) {
                Some(existing) => existing.apply_feed(record.clone(), now),
                None => {
                    map.insert(
                        record.vin.clone(),
                        StoredVehicle::from_feed(record.clone(), now),
                    );
                }
            }
        }

        self.save(&map).await?;
        Ok(UpsertReport {
            written: records.len(),
            failed: Vec::new(),
        })
    }

    async fn mark_sold(&self, vins: &[String]) -> Result<MarkSoldReport> {
        let mut map = self.load().await?;
        let now = Utc::now();
        let mut report = MarkSoldReport::default();

        for vin in vins {
            match map.get_mut(vin) {
                Some(vehicle) => {
                    vehicle.mark_sold(now);
                    report.sold.push(vin.clone());
                }
                None => report.failed.push(WriteFailure {
                    vin: vin.clone(),
                    reason: "not found".to_string(),
                }),
            }
        }

        self.save(&map).await?;
        Ok(report)
    }

    async fn apply_overrides(&self, vin: &str, patch: &OverridePatch) -> Result<StoredVehicle> {
        if patch.is_empty() {
            return Err(AppError::validation("override patch names no fields"));
        }

        let mut map = self.load().await?;
        let vehicle = map.get_mut(vin).ok_or_else(|| AppError::not_found(vin))?;
        vehicle.apply_patch(patch);
        let updated = vehicle.clone();

        self.save(&map).await?;
        Ok(updated)
    }

    async fn delete(&self, vin: &str) -> Result<()> {
        let mut map = self.load().await?;
        if map.remove(vin).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}
