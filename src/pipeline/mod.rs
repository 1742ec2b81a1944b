//! Pipeline entry points for inventory operations.
//!
//! - `run_sync`: Reconcile the store against a feed snapshot
//! - `detect_newly_sold`: Find active vehicles missing from a feed

pub mod diff;
pub mod sync;

pub use diff::{NewlySold, detect_newly_sold, feed_vin_set};
pub use sync::{SyncSummary, run_sync};
