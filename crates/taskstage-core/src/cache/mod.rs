//! Local copy of the last fetched task listing.
//!
//! The poll loop itself keeps nothing between ticks; the binary writes each
//! changed listing here so it can be inspected (or reported on) offline.

pub mod manager;

pub use manager::{CachedData, TaskCache};
