//! AWS DynamoDB storage implementation.
//!
//! Table layout: partition key `vin` (S), no sort key. A global secondary
//! index `status-index` partitioned on `status` (projection ALL) serves the
//! active-inventory reads; the table is never scanned.
//!
//! Items are the camelCase JSON shape of `StoredVehicle`, mapped field by
//! field onto attribute values.

use std::collections::HashMap;

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{
    AttributeValue, KeysAndAttributes, PutRequest, ReturnValue, WriteRequest,
};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{OverridePatch, PRICE_SOLD, StoredVehicle, VehicleRecord, VehicleStatus};
use crate::storage::{
    BATCH_WRITE_LIMIT, InventoryStore, MarkSoldReport, UpsertReport, WriteFailure, dedupe_by_vin,
};

/// Secondary index partitioned by status.
const STATUS_INDEX: &str = "status-index";

/// Items per BatchGetItem request (service cap).
const BATCH_GET_LIMIT: usize = 100;

/// DynamoDB-backed inventory storage.
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    /// Create a new DynamoDB store for a table.
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Create a store from environment configuration.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);
        let table = std::env::var("INVENTORY_TABLE").unwrap_or_else(|_| "inventory".to_string());
        Ok(Self::new(client, table))
    }

    /// Fetch existing records for the given VINs, chunked to the
    /// BatchGetItem cap, draining unprocessed keys before moving on.
    async fn fetch_existing(&self, vins: &[String]) -> Result<HashMap<String, StoredVehicle>> {
        let mut found = HashMap::with_capacity(vins.len());

        for chunk in vins.chunks(BATCH_GET_LIMIT) {
            let mut pending = key_batch(chunk);

            while !pending.is_empty() {
                let keys = KeysAndAttributes::builder()
                    .set_keys(Some(pending))
                    .build()
                    .map_err(|e| AppError::store(e.to_string()))?;

                let output = self
                    .client
                    .batch_get_item()
                    .request_items(&self.table, keys)
                    .send()
                    .await
                    .map_err(|e| AppError::store(e.to_string()))?;

                if let Some(mut responses) = output.responses {
                    for item in responses.remove(&self.table).unwrap_or_default() {
                        let vehicle = from_item(item)?;
                        found.insert(vehicle.record.vin.clone(), vehicle);
                    }
                }

                pending = output
                    .unprocessed_keys
                    .and_then(|mut m| m.remove(&self.table))
                    .map(|ka| ka.keys().to_vec())
                    .unwrap_or_default();
            }
        }

        Ok(found)
    }

    /// Issue one BatchWriteItem call; returns the unprocessed requests.
    async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<Vec<WriteRequest>> {
        let output = self
            .client
            .batch_write_item()
            .request_items(&self.table, requests)
            .send()
            .await
            .map_err(|e| AppError::store(e.to_string()))?;

        Ok(output
            .unprocessed_items
            .and_then(|mut m| m.remove(&self.table))
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl InventoryStore for DynamoStore {
    async fn get_by_status(&self, status: VehicleStatus) -> Result<Vec<StoredVehicle>> {
        let mut vehicles = Vec::new();
        let mut last_key: Option<HashMap<String, AttributeValue>> = None;

        // "status" is a reserved word, hence the #st alias.
        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table)
                .index_name(STATUS_INDEX)
                .key_condition_expression("#st = :status")
                .expression_attribute_names("#st", "status")
                .expression_attribute_values(
                    ":status",
                    AttributeValue::S(status.as_str().to_string()),
                );
            if let Some(key) = last_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let output = request
                .send()
                .await
                .map_err(|e| AppError::store(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                vehicles.push(from_item(item)?);
            }

            last_key = output.last_evaluated_key;
            if last_key.is_none() {
                break;
            }
        }

        Ok(vehicles)
    }

    async fn get_by_vin(&self, vin: &str) -> Result<Option<StoredVehicle>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("vin", AttributeValue::S(vin.to_string()))
            .send()
            .await
            .map_err(|e| AppError::store(e.to_string()))?;

        match output.item {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn upsert_batch(&self, records: &[VehicleRecord]) -> Result<UpsertReport> {
        if records.is_empty() {
            return Ok(UpsertReport::default());
        }
        let now = Utc::now();

        // BatchGetItem and BatchWriteItem both reject duplicate keys in one
        // request, so repeated VINs collapse before anything is built.
        let records = dedupe_by_vin(records);

        // Read existing items first so the put preserves created_at,
        // sold_date and every override field.
        let vins: Vec<String> = records.iter().map(|r| r.vin.clone()).collect();
        let mut existing = self.fetch_existing(&vins).await?;

        let (requests, failed) = build_put_requests(&records, &mut existing, now);
        let mut report = UpsertReport { written: 0, failed };

        for chunk in requests.chunks(BATCH_WRITE_LIMIT) {
            let mut unprocessed = self.write_batch(chunk.to_vec()).await?;
            if !unprocessed.is_empty() {
                // One immediate retry for throttled items.
                unprocessed = self.write_batch(unprocessed).await?;
            }
            report.written += chunk.len() - unprocessed.len();
            for vin in request_vins(&unprocessed) {
                warn!("Upsert left unprocessed after retry: {}", vin);
                report.failed.push(WriteFailure {
                    vin,
                    reason: "unprocessed after retry".to_string(),
                });
            }
        }

        info!(
            "Upserted {} of {} records into {}",
            report.written,
            records.len(),
            self.table
        );
        Ok(report)
    }

    async fn mark_sold(&self, vins: &[String]) -> Result<MarkSoldReport> {
        let now = Utc::now();
        let updated_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let sold_date = now.date_naive().to_string();

        // Independent per-VIN updates, dispatched together. One VIN failing
        // must not hold up the rest.
        let updates = vins.iter().map(|vin| {
            let client = self.client.clone();
            let table = self.table.clone();
            let updated_at = updated_at.clone();
            let sold_date = sold_date.clone();
            let vin = vin.clone();
            async move {
                let result = client
                    .update_item()
                    .table_name(&table)
                    .key("vin", AttributeValue::S(vin.clone()))
                    .update_expression(
                        "SET #st = :sold, soldDate = :date, updatedAt = :now, price = :price",
                    )
                    .expression_attribute_names("#st", "status")
                    .expression_attribute_values(
                        ":sold",
                        AttributeValue::S(VehicleStatus::Sold.as_str().to_string()),
                    )
                    .expression_attribute_values(":date", AttributeValue::S(sold_date))
                    .expression_attribute_values(":now", AttributeValue::S(updated_at))
                    .expression_attribute_values(":price", AttributeValue::S(PRICE_SOLD.to_string()))
                    .condition_expression("attribute_exists(vin)")
                    .send()
                    .await;
                (vin, result)
            }
        });

        let mut report = MarkSoldReport::default();
        for (vin, result) in join_all(updates).await {
            match result {
                Ok(_) => report.sold.push(vin),
                Err(e) => {
                    let reason = e.into_service_error().to_string();
                    warn!("Mark-sold failed for {}: {}", vin, reason);
                    report.failed.push(WriteFailure { vin, reason });
                }
            }
        }
        Ok(report)
    }

    async fn apply_overrides(&self, vin: &str, patch: &OverridePatch) -> Result<StoredVehicle> {
        if patch.is_empty() {
            return Err(AppError::validation("override patch names no fields"));
        }

        let Value::Object(fields) = serde_json::to_value(patch.normalized())? else {
            return Err(AppError::store("override patch did not serialize to an object"));
        };

        let mut assignments = Vec::with_capacity(fields.len());
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("vin", AttributeValue::S(vin.to_string()))
            .condition_expression("attribute_exists(vin)")
            .return_values(ReturnValue::AllNew);

        for (i, (name, value)) in fields.into_iter().enumerate() {
            assignments.push(format!("#f{i} = :v{i}"));
            request = request
                .expression_attribute_names(format!("#f{i}"), name)
                .expression_attribute_values(format!(":v{i}"), to_attr(value));
        }

        let output = request
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_conditional_check_failed_exception() {
                    AppError::not_found(vin)
                } else {
                    AppError::store(service.to_string())
                }
            })?;

        let item = output
            .attributes
            .ok_or_else(|| AppError::store("update returned no attributes"))?;
        from_item(item)
    }

    async fn delete(&self, vin: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("vin", AttributeValue::S(vin.to_string()))
            .send()
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(())
    }
}

/// Key maps for one BatchGetItem request.
fn key_batch(vins: &[String]) -> Vec<HashMap<String, AttributeValue>> {
    vins.iter()
        .map(|vin| HashMap::from([("vin".to_string(), AttributeValue::S(vin.clone()))]))
        .collect()
}

/// Merge each feed record with its stored counterpart and build the put
/// requests, reporting records that fail to serialize.
fn build_put_requests(
    records: &[&VehicleRecord],
    existing: &mut HashMap<String, StoredVehicle>,
    now: DateTime<Utc>,
) -> (Vec<WriteRequest>, Vec<WriteFailure>) {
    let mut requests = Vec::with_capacity(records.len());
    let mut failed = Vec::new();

    for &record in records {
        let merged = match existing.remove(&record.vin) {
            Some(mut stored) => {
                stored.apply_feed(record.clone(), now);
                stored
            }
            None => StoredVehicle::from_feed(record.clone(), now),
        };

        let put = to_item(&merged).and_then(|item| {
            PutRequest::builder()
                .set_item(Some(item))
                .build()
                .map_err(|e| AppError::store(e.to_string()))
        });
        match put {
            Ok(put) => requests.push(WriteRequest::builder().put_request(put).build()),
            Err(e) => failed.push(WriteFailure {
                vin: record.vin.clone(),
                reason: e.to_string(),
            }),
        }
    }

    (requests, failed)
}

/// Serialize a vehicle into a DynamoDB item.
fn to_item(vehicle: &StoredVehicle) -> Result<HashMap<String, AttributeValue>> {
    let Value::Object(map) = serde_json::to_value(vehicle)? else {
        return Err(AppError::store("vehicle did not serialize to an object"));
    };
    Ok(map.into_iter().map(|(k, v)| (k, to_attr(v))).collect())
}

/// Deserialize a DynamoDB item back into a vehicle.
fn from_item(item: HashMap<String, AttributeValue>) -> Result<StoredVehicle> {
    let map: serde_json::Map<String, Value> =
        item.into_iter().map(|(k, v)| (k, from_attr(v))).collect();
    Ok(serde_json::from_value(Value::Object(map))?)
}

fn to_attr(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(to_attr).collect()),
        Value::Object(map) => {
            AttributeValue::M(map.into_iter().map(|(k, v)| (k, to_attr(v))).collect())
        }
    }
}

fn from_attr(attr: AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => {
            if let Ok(i) = n.parse::<i64>() {
                Value::Number(i.into())
            } else {
                n.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.into_iter().map(from_attr).collect()),
        AttributeValue::M(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, from_attr(v))).collect())
        }
        // Binary and set attributes never appear in inventory items.
        _ => Value::Null,
    }
}

/// Pull the VINs out of put requests, for failure reporting.
fn request_vins(requests: &[WriteRequest]) -> Vec<String> {
    requests
        .iter()
        .filter_map(|w| w.put_request())
        .filter_map(|p| p.item().get("vin"))
        .filter_map(|attr| attr.as_s().ok())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleRecord;

    fn record(vin: &str) -> VehicleRecord {
        VehicleRecord {
            vin: vin.to_string(),
            year: Some(2021),
            make: "Audi".to_string(),
            model: "RS6 Avant".to_string(),
            slug: "2021-audi-rs6-avant".to_string(),
            price: "$112,000".to_string(),
            status: VehicleStatus::Available,
            trim: None,
            odometer: Some(15000),
            exterior_color: Some("Nardo Gray".to_string()),
            interior_color: None,
            transmission: None,
            description: Some("one owner".to_string()),
            images: vec!["https://cdn.example/a.jpg".to_string()],
            video_url: None,
        }
    }

    fn stored(vin: &str) -> StoredVehicle {
        StoredVehicle::from_feed(record(vin), Utc::now())
    }

    #[test]
    fn item_round_trip_preserves_the_vehicle() {
        let vehicle = stored("WAUZZZF21MN900111");
        let item = to_item(&vehicle).unwrap();

        assert_eq!(
            item.get("vin"),
            Some(&AttributeValue::S("WAUZZZF21MN900111".to_string()))
        );
        assert_eq!(
            item.get("status"),
            Some(&AttributeValue::S("available".to_string()))
        );
        assert_eq!(item.get("year"), Some(&AttributeValue::N("2021".to_string())));
        // Absent options are skipped entirely, not stored as NULL.
        assert!(!item.contains_key("interiorColor"));

        let back = from_item(item).unwrap();
        assert_eq!(back, vehicle);
    }

    #[test]
    fn numbers_come_back_as_integers() {
        assert_eq!(from_attr(AttributeValue::N("42".into())), Value::from(42));
        assert_eq!(
            from_attr(AttributeValue::N("4.5".into())),
            Value::from(4.5)
        );
    }

    #[test]
    fn request_vins_reads_put_items() {
        let vehicle = stored("VIN123");
        let put = PutRequest::builder()
            .set_item(Some(to_item(&vehicle).unwrap()))
            .build()
            .unwrap();
        let requests = vec![WriteRequest::builder().put_request(put).build()];
        assert_eq!(request_vins(&requests), vec!["VIN123"]);
    }

    #[test]
    fn write_plan_splits_at_the_batch_cap() {
        let records: Vec<VehicleRecord> = (0..26).map(|i| record(&format!("VIN{i:03}"))).collect();
        let deduped = dedupe_by_vin(&records);
        let (requests, failed) = build_put_requests(&deduped, &mut HashMap::new(), Utc::now());

        assert!(failed.is_empty());
        assert_eq!(request_vins(&requests).len(), 26);
        let chunk_sizes: Vec<usize> = requests
            .chunks(BATCH_WRITE_LIMIT)
            .map(|chunk| chunk.len())
            .collect();
        assert_eq!(chunk_sizes, vec![25, 1]);
    }

    #[test]
    fn read_keys_chunk_at_the_batch_get_cap() {
        let vins: Vec<String> = (0..120).map(|i| format!("VIN{i:05}")).collect();
        let chunk_sizes: Vec<usize> = vins
            .chunks(BATCH_GET_LIMIT)
            .map(|chunk| key_batch(chunk).len())
            .collect();
        assert_eq!(chunk_sizes, vec![100, 20]);

        let keys = key_batch(&vins[..1]);
        assert_eq!(
            keys[0].get("vin"),
            Some(&AttributeValue::S("VIN00000".to_string()))
        );
    }

    #[test]
    fn duplicate_vins_collapse_to_one_put() {
        let mut first = record("VINDUP");
        first.price = "$10,000".to_string();
        let mut second = record("VINDUP");
        second.price = "$12,500".to_string();
        let records = vec![first, second, record("VINB")];

        let deduped = dedupe_by_vin(&records);
        let (requests, failed) = build_put_requests(&deduped, &mut HashMap::new(), Utc::now());

        assert!(failed.is_empty());
        assert_eq!(request_vins(&requests), vec!["VINDUP", "VINB"]);
        let item = requests[0].put_request().unwrap().item();
        assert_eq!(
            item.get("price"),
            Some(&AttributeValue::S("$12,500".to_string()))
        );
    }
}
