//! Run report rendering
//!
//! This module formats the per-region crawl report for the terminal.

use crate::crawler::RegionStatus;
use crate::dataset::CrawlReport;
use std::fmt::Write;

/// Renders the report as a plain-text table with a totals section
///
/// # Arguments
///
/// * `report` - The report produced by aggregation
///
/// # Returns
///
/// The rendered text, ending with a newline
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    let width = report
        .regions
        .iter()
        .map(|s| s.region.chars().count())
        .max()
        .unwrap_or(0)
        .max("Region".len());

    let _ = writeln!(out, "=== Crawl Report ===\n");
    let _ = writeln!(
        out,
        "{:<width$}  {:<11}  {:>7}  {:>13}  {}",
        "Region",
        "Status",
        "Records",
        "Pages ok/all",
        "Exhausted",
        width = width
    );

    for summary in &report.regions {
        let pages = format!("{}/{}", summary.pages_succeeded, summary.pages_total);
        let _ = writeln!(
            out,
            "{:<width$}  {:<11}  {:>7}  {:>13}  {}",
            summary.region,
            summary.status.as_str(),
            summary.records,
            pages,
            summary.pages_exhausted,
            width = width
        );
        if let Some(error) = &summary.error {
            let _ = writeln!(out, "    error: {}", error);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Total records: {}", report.total_records);

    let sections = [
        ("Regions without data", report.empty_regions()),
        ("Incomplete regions", report.incomplete_regions()),
        ("Interrupted regions", report.interrupted_regions()),
        ("Failed regions", report.failed_regions()),
    ];
    for (label, regions) in sections {
        if !regions.is_empty() {
            let _ = writeln!(out, "{} ({}): {}", label, regions.len(), regions.join(", "));
        }
    }

    out
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Counts regions per status, in a fixed status order
pub fn status_counts(report: &CrawlReport) -> Vec<(RegionStatus, usize)> {
    [
        RegionStatus::Complete,
        RegionStatus::Incomplete,
        RegionStatus::NoData,
        RegionStatus::Interrupted,
        RegionStatus::Failed,
    ]
    .into_iter()
    .map(|status| {
        let count = report.regions.iter().filter(|s| s.status == status).count();
        (status, count)
    })
    .filter(|(_, count)| *count > 0)
    .collect()
}
