// src/models/mod.rs

//! Domain models for the inventory sync application.

mod vehicle;

// Re-export all public types
pub use vehicle::{
    OverridePatch, PRICE_CALL, PRICE_SOLD, StoredVehicle, VehicleRecord, VehicleStatus,
};
