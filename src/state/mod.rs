//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RegionState`: the phase a region worker is in (resolving pages, fetching page n, done)

mod region_state;

pub use region_state::RegionState;
