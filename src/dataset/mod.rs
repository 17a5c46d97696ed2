//! Dataset module: decoded records and their aggregation
//!
//! This module handles:
//! - Column schemas and records produced by the page decoders
//! - Merging region results into one ordered dataset
//! - Summarizing a run in a per-region report

mod aggregator;
mod record;

pub use aggregator::{
    aggregate, CrawlReport, Dataset, DatasetRow, RegionSummary, REGION_COLUMN,
};
pub use record::{Column, Record, RecordBuilder, Schema};
