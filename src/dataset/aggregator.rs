//! Result aggregation
//!
//! Region workers finish in any order. The aggregator puts their results back
//! into the order the regions were requested in, keeps every region's
//! records in page order, and tags each row with its region.

use crate::crawler::{RegionResult, RegionStatus};
use crate::dataset::{Column, Record, Schema};

/// Leading column of every dataset row
pub const REGION_COLUMN: Column = Column::new("region", "区域", "");

/// One output row: a record and the region it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub region: String,
    pub record: Record,
}

/// Ordered rows of a whole run with a fixed column layout
///
/// Columns are `region` followed by the schema columns, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Header labels, region column first
    pub fn headers(&self) -> Vec<&'static str> {
        std::iter::once(REGION_COLUMN.header)
            .chain(self.schema.columns().iter().map(|c| c.header))
            .collect()
    }

    /// Column keys, region column first
    pub fn keys(&self) -> Vec<&'static str> {
        std::iter::once(REGION_COLUMN.key)
            .chain(self.schema.keys())
            .collect()
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell values of a row in column order
    pub fn row_values<'a>(&self, row: &'a DatasetRow) -> Vec<&'a str> {
        let mut values = Vec::with_capacity(self.schema.len() + 1);
        values.push(row.region.as_str());
        for column in self.schema.columns() {
            values.push(row.record.get(column.key).unwrap_or(column.sentinel));
        }
        values
    }

    /// Records of one region, in page order
    pub fn records_for<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.region == region)
            .map(|row| &row.record)
    }

    fn push_region(&mut self, region: &str, records: Vec<Record>) {
        self.rows.extend(records.into_iter().map(|record| DatasetRow {
            region: region.to_string(),
            record,
        }));
    }
}

/// Outcome of one region as shown in the run report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSummary {
    pub region: String,
    pub status: RegionStatus,
    pub records: usize,
    pub pages_total: u32,
    pub pages_attempted: u32,
    pub pages_succeeded: u32,
    pub pages_exhausted: u32,
    pub error: Option<String>,
}

impl RegionSummary {
    fn from_result(result: &RegionResult) -> Self {
        Self {
            region: result.region.clone(),
            status: result.status(),
            records: result.records.len(),
            pages_total: result.pages_total,
            pages_attempted: result.pages_attempted,
            pages_succeeded: result.pages_succeeded,
            pages_exhausted: result.pages_exhausted,
            error: result.error.clone(),
        }
    }
}

/// Per-region summary of a run, in requested region order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub regions: Vec<RegionSummary>,
    pub total_records: usize,
}

impl CrawlReport {
    /// Regions that contributed no rows, whatever the reason
    pub fn empty_regions(&self) -> Vec<&str> {
        self.select(|s| s.records == 0)
    }

    pub fn failed_regions(&self) -> Vec<&str> {
        self.select(|s| s.status == RegionStatus::Failed)
    }

    pub fn incomplete_regions(&self) -> Vec<&str> {
        self.select(|s| s.status == RegionStatus::Incomplete)
    }

    pub fn interrupted_regions(&self) -> Vec<&str> {
        self.select(|s| s.status == RegionStatus::Interrupted)
    }

    pub fn summary_for(&self, region: &str) -> Option<&RegionSummary> {
        self.regions.iter().find(|s| s.region == region)
    }

    /// True when every region either completed or genuinely had no data
    pub fn is_clean(&self) -> bool {
        self.regions
            .iter()
            .all(|s| matches!(s.status, RegionStatus::Complete | RegionStatus::NoData))
    }

    fn select(&self, pred: impl Fn(&RegionSummary) -> bool) -> Vec<&str> {
        self.regions
            .iter()
            .filter(|s| pred(s))
            .map(|s| s.region.as_str())
            .collect()
    }
}

/// Merges region results into a dataset and a report
///
/// # Arguments
///
/// * `requested` - Regions in the order they were configured
/// * `results` - Region results in completion order
/// * `schema` - Column schema shared by every record
///
/// # Returns
///
/// The dataset grouped by region in requested order, and the matching
/// report. Results for regions missing from `requested` are appended last.
pub fn aggregate(
    requested: &[String],
    mut results: Vec<RegionResult>,
    schema: Schema,
) -> (Dataset, CrawlReport) {
    results.sort_by_key(|result| {
        requested
            .iter()
            .position(|r| *r == result.region)
            .unwrap_or(usize::MAX)
    });

    let mut dataset = Dataset::new(schema);
    let mut report = CrawlReport::default();

    for result in results {
        report.regions.push(RegionSummary::from_result(&result));
        dataset.push_region(&result.region, result.records);
    }
    report.total_records = dataset.len();

    tracing::debug!(
        "Aggregated {} rows from {} regions",
        report.total_records,
        report.regions.len()
    );

    (dataset, report)
}
