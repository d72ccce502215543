//! Aggregation of raw delay events into dashboard statistics.
//!
//! Derives the summary snapshot, per-route performance rows and
//! per-location analysis from a list of [`crate::models::DelayEvent`]s.

pub mod aggregate;
pub mod performance;
pub mod types;
pub mod utility;
