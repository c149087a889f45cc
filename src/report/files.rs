use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::report::AggregateReport;

/// `{report_type}_{YYYYMMDD-HHMMSS}.{ext}`
pub fn report_filename(report_type: &str, ext: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.{}", report_type, at.format("%Y%m%d-%H%M%S"), ext)
}

pub fn save_report(output_dir: &Path, filename: &str, contents: &str) -> Result<PathBuf> {
    if !output_dir.exists() {
        debug!("Creating report directory {}", output_dir.display());
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create report directory {}", output_dir.display()))?;
    }
    let path = output_dir.join(filename);
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!("Saved report to {}", path.display());
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRow {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Running Instances")]
    pub running_instances: u32,
    #[serde(rename = "Reserved Instances")]
    pub reserved_instances: u32,
    #[serde(rename = "Uncovered Instances")]
    pub uncovered_instances: u32,
    #[serde(rename = "Coverage Percentage")]
    pub coverage_percentage: f64,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

/// One row per region followed by a `TOTAL (All Regions)` row.
pub fn coverage_rows(report: &AggregateReport) -> Vec<CoverageRow> {
    let timestamp = report.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let mut rows: Vec<CoverageRow> = report
        .regions
        .iter()
        .map(|r| CoverageRow {
            region: r.region.clone(),
            running_instances: r.coverage.total_running,
            reserved_instances: r.coverage.total_reserved,
            uncovered_instances: r.coverage.uncovered,
            coverage_percentage: r.coverage.coverage_percentage,
            timestamp: timestamp.clone(),
        })
        .collect();

    let summary = &report.summary;
    rows.push(CoverageRow {
        region: "TOTAL (All Regions)".to_string(),
        running_instances: summary.total_running,
        reserved_instances: summary.total_reserved,
        uncovered_instances: summary.total_uncovered,
        coverage_percentage: summary.overall_coverage_percentage,
        timestamp,
    });
    rows
}

pub fn coverage_rows_json(report: &AggregateReport) -> Result<String> {
    serde_json::to_string_pretty(&coverage_rows(report)).context("Failed to serialize coverage rows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;
    use chrono::TimeZone;

    #[test]
    fn test_report_filename() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(report_filename("ri_coverage", "md", at), "ri_coverage_20250102-030405.md");
        assert_eq!(
            report_filename("prometheus_inspection", "json", at),
            "prometheus_inspection_20250102-030405.json"
        );
    }

    #[test]
    fn test_save_report_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("reports");
        let path = save_report(&dir, "report.md", "# hello\n").unwrap();

        assert_eq!(path, dir.join("report.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hello\n");

        // Existing directory is reused
        let second = save_report(&dir, "other.md", "x").unwrap();
        assert!(second.exists());
    }

    #[test]
    fn test_coverage_rows() {
        let rows = coverage_rows(&sample_report());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].region, "us-east-1");
        assert_eq!(rows[0].running_instances, 12);
        assert_eq!(rows[1].region, "eu-west-1");
        assert_eq!(rows[1].coverage_percentage, 0.0);

        let total = rows.last().unwrap();
        assert_eq!(total.region, "TOTAL (All Regions)");
        assert_eq!(total.running_instances, 20);
        assert_eq!(total.reserved_instances, 15);
        assert_eq!(total.uncovered_instances, 6);
        assert_eq!(total.timestamp, "2025-01-02T03:04:05Z");
    }

    #[test]
    fn test_coverage_rows_json_field_names() {
        let json = coverage_rows_json(&sample_report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let total = &parsed[3];
        assert_eq!(total["Region"], "TOTAL (All Regions)");
        assert_eq!(total["Running Instances"], 20);
        assert_eq!(total["Coverage Percentage"], 70.0);
    }
}
