// src/feed/mod.rs

//! Feed parsing: a raw CSV document in, structured vehicle records out.
//!
//! The parser is tolerant of the dealer-management system's shifting column
//! names (see [`headers`]) and of its encoding corruption (see [`encoding`]).
//! Rows without a resolvable VIN are dropped; structural CSV errors fail the
//! whole parse.

mod encoding;
mod fields;
mod headers;

pub use encoding::{MARKER, recover_text};
pub use fields::{
    derive_price_status, normalize_vin, parse_odometer, slugify, split_images, upscale_image_url,
};
pub use headers::HeaderIndex;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::config::FeedConfig;
use crate::error::Result;
use crate::models::VehicleRecord;

/// A parsed feed: the records plus the literal headers seen, kept for
/// format-drift diagnostics.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub vehicles: Vec<VehicleRecord>,
    pub columns: Vec<String>,
}

/// Parse one CSV document into vehicle records.
pub fn parse_feed(text: &str, config: &FeedConfig) -> Result<ParsedFeed> {
    let mut reader = ReaderBuilder::new().from_reader(text.as_bytes());
    let header_row = reader.headers()?.clone();
    let index = HeaderIndex::new(&header_row);

    let mut vehicles = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = row?;
        match parse_row(&row, &index, config) {
            Some(vehicle) => vehicles.push(vehicle),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("Skipped {} rows without a resolvable VIN", skipped);
    }

    Ok(ParsedFeed {
        vehicles,
        columns: index.columns().to_vec(),
    })
}

/// Parse a single row; `None` when the VIN does not resolve.
fn parse_row(row: &StringRecord, index: &HeaderIndex, config: &FeedConfig) -> Option<VehicleRecord> {
    let aliases = &config.headers;

    let vin = normalize_vin(index.resolve(row, &aliases.vin)?);
    if vin.is_empty() {
        return None;
    }

    let year = index
        .resolve(row, &aliases.year)
        .and_then(|y| y.parse::<i32>().ok());
    let make = index
        .resolve(row, &aliases.make)
        .unwrap_or_default()
        .to_string();
    let model = index
        .resolve(row, &aliases.model)
        .unwrap_or_default()
        .to_string();

    let (price, status) = derive_price_status(
        index.resolve(row, &aliases.price),
        index.resolve(row, &aliases.status),
    );

    let year_part = year.map(|y| y.to_string()).unwrap_or_default();
    let slug = slugify(&format!("{year_part} {make} {model}"));

    let images = index
        .resolve(row, &aliases.photos)
        .map(|raw| split_images(raw, &config.images))
        .unwrap_or_default();

    Some(VehicleRecord {
        vin,
        year,
        make,
        model,
        slug,
        price,
        status,
        trim: index.resolve(row, &aliases.trim).map(str::to_string),
        odometer: index
            .resolve(row, &aliases.mileage)
            .and_then(parse_odometer),
        exterior_color: index
            .resolve(row, &aliases.exterior_color)
            .map(str::to_string),
        interior_color: index
            .resolve(row, &aliases.interior_color)
            .map(str::to_string),
        transmission: index
            .resolve(row, &aliases.transmission)
            .map(str::to_string),
        description: index
            .resolve(row, &aliases.description)
            .map(recover_text),
        images,
        video_url: index.resolve(row, &aliases.video).map(str::to_string),
    })
}
