//! Vehicle record structures.
//!
//! `VehicleRecord` is one parsed feed row; `StoredVehicle` wraps it with
//! lifecycle metadata and the admin override fields. The feed sync and the
//! admin panel write disjoint field sets: upsert replaces the embedded
//! record and refreshes `updated_at`, while `OverridePatch` touches override
//! fields only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Display price for records with no usable numeric price.
pub const PRICE_CALL: &str = "Call for Price";

/// Display price forced onto sold records.
pub const PRICE_SOLD: &str = "Sold";

/// Availability state of a vehicle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Available,
    Sold,
    /// Price withheld ("call for price")
    Call,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
            Self::Call => "call",
        }
    }

    /// Statuses counted as active inventory.
    pub fn active() -> [VehicleStatus; 2] {
        [Self::Available, Self::Call]
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One vehicle row parsed from a feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    /// Normalized VIN (uppercase alphanumerics), the record identity
    pub vin: String,

    /// Model year; absent when the feed value was missing or non-numeric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Manufacturer (empty string if the header was absent)
    #[serde(default)]
    pub make: String,

    /// Model name (empty string if the header was absent)
    #[serde(default)]
    pub model: String,

    /// URL-safe identifier derived from year, make and model
    pub slug: String,

    /// Display price string ("$45,000", "Call for Price" or "Sold")
    pub price: String,

    pub status: VehicleStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exterior_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interior_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,

    /// Long text after encoding recovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl VehicleRecord {
    /// Human-readable "2024 Porsche 911" style name.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if !self.make.is_empty() {
            parts.push(self.make.clone());
        }
        if !self.model.is_empty() {
            parts.push(self.model.clone());
        }
        parts.join(" ")
    }
}

/// A vehicle as it lives in the inventory store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredVehicle {
    /// Feed-owned fields; replaced wholesale on every upsert
    #[serde(flatten)]
    pub record: VehicleRecord,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set when the vehicle is marked sold by reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_date: Option<NaiveDate>,

    // Admin override fields. Never written by the feed path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_images: Option<Vec<String>>,

    #[serde(default)]
    pub manually_marked_sold: bool,

    #[serde(default)]
    pub featured: bool,

    #[serde(default)]
    pub hidden: bool,

    /// Pulled for a third-party auction listing; exempt from
    /// sold-by-absence inference
    #[serde(default)]
    pub auction: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_house: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_date: Option<NaiveDate>,
}

impl StoredVehicle {
    /// Create a fresh entry for a VIN seen for the first time.
    pub fn from_feed(record: VehicleRecord, now: DateTime<Utc>) -> Self {
        Self {
            record,
            created_at: now,
            updated_at: now,
            sold_date: None,
            manual_price: None,
            manual_description: None,
            manual_images: None,
            manually_marked_sold: false,
            featured: false,
            hidden: false,
            auction: false,
            auction_house: None,
            auction_url: None,
            auction_date: None,
        }
    }

    /// Refresh feed-owned fields from a newer feed row.
    ///
    /// `created_at`, `sold_date` and every override field stay untouched.
    pub fn apply_feed(&mut self, record: VehicleRecord, now: DateTime<Utc>) {
        self.record = record;
        self.updated_at = now;
    }

    /// Transition to sold: status, sold date and the price sentinel.
    pub fn mark_sold(&mut self, now: DateTime<Utc>) {
        self.record.status = VehicleStatus::Sold;
        self.record.price = PRICE_SOLD.to_string();
        self.sold_date = Some(now.date_naive());
        self.updated_at = now;
    }

    /// Merge-patch the override fields named in `patch`.
    pub fn apply_patch(&mut self, patch: &OverridePatch) {
        let patch = patch.normalized();
        if let Some(v) = patch.manual_price {
            self.manual_price = Some(v);
        }
        if let Some(v) = patch.manual_description {
            self.manual_description = Some(v);
        }
        if let Some(v) = patch.manual_images {
            self.manual_images = Some(v);
        }
        if let Some(v) = patch.manually_marked_sold {
            self.manually_marked_sold = v;
        }
        if let Some(v) = patch.featured {
            self.featured = v;
        }
        if let Some(v) = patch.hidden {
            self.hidden = v;
        }
        if let Some(v) = patch.auction {
            self.auction = v;
        }
        if let Some(v) = patch.auction_house {
            self.auction_house = Some(v);
        }
        if let Some(v) = patch.auction_url {
            self.auction_url = Some(v);
        }
        if let Some(v) = patch.auction_date {
            self.auction_date = Some(v);
        }
    }

    /// Whether this record counts as active inventory.
    pub fn is_active(&self) -> bool {
        matches!(
            self.record.status,
            VehicleStatus::Available | VehicleStatus::Call
        )
    }
}

/// Partial update for the admin-owned override fields.
///
/// Every field is optional; absent means untouched. Unknown JSON fields are
/// dropped by deserialization, which is the allow-list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverridePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_images: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manually_marked_sold: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_house: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_date: Option<NaiveDate>,
}

impl OverridePatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the cross-field rule: marking a vehicle manually sold or
    /// sending it to auction also clears `featured`. A sold or auctioned
    /// vehicle cannot stay featured, whatever the patch said.
    pub fn normalized(&self) -> OverridePatch {
        let mut patch = self.clone();
        if patch.manually_marked_sold == Some(true) || patch.auction == Some(true) {
            patch.featured = Some(false);
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(vin: &str) -> VehicleRecord {
        VehicleRecord {
            vin: vin.to_string(),
            year: Some(2024),
            make: "Porsche".to_string(),
            model: "911 GT3".to_string(),
            slug: "2024-porsche-911-gt3".to_string(),
            price: "$239,000".to_string(),
            status: VehicleStatus::Available,
            trim: Some("GT3".to_string()),
            odometer: Some(1200),
            exterior_color: Some("GT Silver".to_string()),
            interior_color: None,
            transmission: Some("PDK".to_string()),
            description: None,
            images: vec!["https://cdn.example/a.jpg".to_string()],
            video_url: None,
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&VehicleStatus::Call).unwrap(),
            "\"call\""
        );
        let parsed: VehicleStatus = serde_json::from_str("\"sold\"").unwrap();
        assert_eq!(parsed, VehicleStatus::Sold);
    }

    #[test]
    fn display_name_skips_missing_year() {
        let mut record = sample_record("VIN1");
        assert_eq!(record.display_name(), "2024 Porsche 911 GT3");
        record.year = None;
        assert_eq!(record.display_name(), "Porsche 911 GT3");
    }

    #[test]
    fn apply_feed_preserves_overrides_and_created_at() {
        let now = Utc::now();
        let mut stored = StoredVehicle::from_feed(sample_record("VIN1"), now);
        stored.manual_price = Some("$199,999".to_string());
        stored.featured = true;

        let later = now + chrono::Duration::hours(1);
        let mut fresh = sample_record("VIN1");
        fresh.price = "$231,500".to_string();
        stored.apply_feed(fresh, later);

        assert_eq!(stored.record.price, "$231,500");
        assert_eq!(stored.manual_price.as_deref(), Some("$199,999"));
        assert!(stored.featured);
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.updated_at, later);
    }

    #[test]
    fn mark_sold_sets_sentinel_and_date() {
        let now = Utc::now();
        let mut stored = StoredVehicle::from_feed(sample_record("VIN1"), now);
        stored.mark_sold(now);
        assert_eq!(stored.record.status, VehicleStatus::Sold);
        assert_eq!(stored.record.price, PRICE_SOLD);
        assert_eq!(stored.sold_date, Some(now.date_naive()));
    }

    #[test]
    fn patch_forces_featured_off_when_marked_sold() {
        let now = Utc::now();
        let mut stored = StoredVehicle::from_feed(sample_record("VIN1"), now);
        stored.featured = true;

        let patch = OverridePatch {
            manually_marked_sold: Some(true),
            featured: Some(true),
            ..Default::default()
        };
        stored.apply_patch(&patch);

        assert!(stored.manually_marked_sold);
        assert!(!stored.featured);
    }

    #[test]
    fn patch_forces_featured_off_when_auctioned() {
        let now = Utc::now();
        let mut stored = StoredVehicle::from_feed(sample_record("VIN1"), now);
        let patch = OverridePatch {
            auction: Some(true),
            featured: Some(true),
            ..Default::default()
        };
        stored.apply_patch(&patch);
        assert!(stored.auction);
        assert!(!stored.featured);
    }

    #[test]
    fn patch_leaves_unnamed_fields_untouched() {
        let now = Utc::now();
        let mut stored = StoredVehicle::from_feed(sample_record("VIN1"), now);
        stored.manual_price = Some("$100".to_string());
        stored.hidden = true;

        let patch = OverridePatch {
            featured: Some(true),
            ..Default::default()
        };
        stored.apply_patch(&patch);

        assert_eq!(stored.manual_price.as_deref(), Some("$100"));
        assert!(stored.hidden);
        assert!(stored.featured);
    }

    #[test]
    fn patch_drops_unknown_fields() {
        let json = r#"{"manualPrice": "$5,000", "feedOwnedPrice": "$1", "vin": "X"}"#;
        let patch: OverridePatch = serde_json::from_str(json).unwrap();
        assert_eq!(patch.manual_price.as_deref(), Some("$5,000"));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"manualPrice": "$5,000"})
        );
    }

    #[test]
    fn stored_vehicle_round_trips_camel_case() {
        let now = Utc::now();
        let stored = StoredVehicle::from_feed(sample_record("VIN1"), now);
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["vin"], "VIN1");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("exteriorColor").is_some());
        let back: StoredVehicle = serde_json::from_value(value).unwrap();
        assert_eq!(back, stored);
    }
}
