//! Read-side listing export.
//!
//! Projects the stored inventory into the public vehicle listing feed.
//! Only active, non-hidden, non-auction, non-manually-sold records are
//! published, with admin overrides taking display precedence over feed
//! data.

use serde::{Deserialize, Serialize};

use crate::models::{StoredVehicle, VehicleStatus};

/// One vehicle as published in the listing feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportListing {
    pub vin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub make: String,
    pub model: String,
    pub slug: String,
    pub price: String,
    pub status: VehicleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exterior_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interior_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub featured: bool,
}

impl ExportListing {
    /// Build a listing from a stored record, applying override precedence.
    fn from_stored(vehicle: &StoredVehicle) -> Self {
        let record = &vehicle.record;
        Self {
            vin: record.vin.clone(),
            year: record.year,
            make: record.make.clone(),
            model: record.model.clone(),
            slug: record.slug.clone(),
            price: vehicle
                .manual_price
                .clone()
                .unwrap_or_else(|| record.price.clone()),
            status: record.status,
            trim: record.trim.clone(),
            odometer: record.odometer,
            exterior_color: record.exterior_color.clone(),
            interior_color: record.interior_color.clone(),
            transmission: record.transmission.clone(),
            description: vehicle
                .manual_description
                .clone()
                .or_else(|| record.description.clone()),
            images: vehicle
                .manual_images
                .clone()
                .unwrap_or_else(|| record.images.clone()),
            video_url: record.video_url.clone(),
            featured: vehicle.featured,
        }
    }
}

/// True when a vehicle belongs in the public listing.
fn is_listed(vehicle: &StoredVehicle) -> bool {
    vehicle.is_active() && !vehicle.hidden && !vehicle.auction && !vehicle.manually_marked_sold
}

/// Project stored vehicles into the listing feed.
///
/// Ordering is stable: featured vehicles first, then newest model year,
/// then VIN.
pub fn export_listings(vehicles: &[StoredVehicle]) -> Vec<ExportListing> {
    let mut listings: Vec<ExportListing> = vehicles
        .iter()
        .filter(|v| is_listed(v))
        .map(ExportListing::from_stored)
        .collect();
    listings.sort_by(|a, b| {
        b.featured
            .cmp(&a.featured)
            .then_with(|| b.year.cmp(&a.year))
            .then_with(|| a.vin.cmp(&b.vin))
    });
    listings
}
