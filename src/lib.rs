// src/lib.rs

//! lotsync - Dealer Inventory Sync Library

pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod relay;
pub mod storage;
