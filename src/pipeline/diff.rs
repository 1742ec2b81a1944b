//! Sold-vehicle detection.
//!
//! Compares the active inventory against the VINs present in a feed
//! snapshot. A vehicle that was listed but no longer appears in the feed
//! has been sold out from under us; the sync run marks it accordingly.
//!
//! Auction vehicles are exempt: they are managed by hand and never appear
//! in the feed, so their absence means nothing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{StoredVehicle, VehicleRecord};

/// A vehicle that disappeared from the feed and should be marked sold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewlySold {
    pub vin: String,
    /// Human-readable label for logs and the sync summary.
    pub name: String,
}

/// Collect the normalized VINs present in a parsed feed.
pub fn feed_vin_set(records: &[VehicleRecord]) -> HashSet<String> {
    records.iter().map(|r| r.vin.clone()).collect()
}

/// Find active vehicles whose VIN is absent from the current feed.
pub fn detect_newly_sold(
    active: &[StoredVehicle],
    feed_vins: &HashSet<String>,
) -> Vec<NewlySold> {
    active
        .iter()
        .filter(|v| !v.auction)
        .filter(|v| !feed_vins.contains(&v.record.vin))
        .map(|v| NewlySold {
            vin: v.record.vin.clone(),
            name: v.record.display_name(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PRICE_CALL, VehicleStatus};
    use chrono::Utc;

    fn make_record(vin: &str) -> VehicleRecord {
        VehicleRecord {
            vin: vin.to_string(),
            year: Some(2020),
            make: "Chevrolet".to_string(),
            model: "Corvette".to_string(),
            slug: "2020-chevrolet-corvette".to_string(),
            price: PRICE_CALL.to_string(),
            status: VehicleStatus::Call,
            trim: None,
            odometer: None,
            exterior_color: None,
            interior_color: None,
            transmission: None,
            description: None,
            images: Vec::new(),
            video_url: None,
        }
    }

    fn make_stored(vin: &str) -> StoredVehicle {
        StoredVehicle::from_feed(make_record(vin), Utc::now())
    }

    fn vins(sold: &[NewlySold]) -> Vec<&str> {
        sold.iter().map(|s| s.vin.as_str()).collect()
    }

    #[test]
    fn test_vehicles_missing_from_feed_are_sold() {
        let active = vec![make_stored("A"), make_stored("B"), make_stored("C")];
        let feed = feed_vin_set(&[make_record("A"), make_record("C"), make_record("D")]);

        let sold = detect_newly_sold(&active, &feed);
        assert_eq!(vins(&sold), vec!["B"]);
    }

    #[test]
    fn test_no_changes_when_feed_covers_inventory() {
        let active = vec![make_stored("A"), make_stored("B")];
        let feed = feed_vin_set(&[make_record("A"), make_record("B")]);

        assert!(detect_newly_sold(&active, &feed).is_empty());
    }

    #[test]
    fn test_auction_vehicles_are_never_marked() {
        let mut auctioned = make_stored("A");
        auctioned.auction = true;
        let active = vec![auctioned, make_stored("B")];
        let feed = feed_vin_set(&[]);

        let sold = detect_newly_sold(&active, &feed);
        assert_eq!(vins(&sold), vec!["B"]);
    }

    #[test]
    fn test_empty_inventory_yields_nothing() {
        let feed = feed_vin_set(&[make_record("A")]);
        assert!(detect_newly_sold(&[], &feed).is_empty());
    }

    #[test]
    fn test_name_carries_the_display_label() {
        let active = vec![make_stored("GONE")];
        let sold = detect_newly_sold(&active, &feed_vin_set(&[]));

        assert_eq!(sold[0].name, "2020 Chevrolet Corvette");
    }

    #[test]
    fn test_feed_vins_deduplicate() {
        let set = feed_vin_set(&[make_record("A"), make_record("A"), make_record("B")]);
        assert_eq!(set.len(), 2);
    }
}
