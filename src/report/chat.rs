use crate::parsing::format_percentage;
use crate::report::AggregateReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageStatus {
    Healthy,
    Degraded,
    Critical,
}

impl CoverageStatus {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 80.0 {
            CoverageStatus::Healthy
        } else if pct >= 50.0 {
            CoverageStatus::Degraded
        } else {
            CoverageStatus::Critical
        }
    }

    /// Tier for a value shown with one decimal, so the icon never
    /// disagrees with the printed label.
    pub fn for_display(pct: f64) -> Self {
        Self::from_percentage((pct * 10.0).round() / 10.0)
    }

    pub fn icon(self) -> &'static str {
        match self {
            CoverageStatus::Healthy => "🟢",
            CoverageStatus::Degraded => "🟡",
            CoverageStatus::Critical => "🔴",
        }
    }
}

/// Condensed table for the chat channel. Only regions with running
/// instances get a row; percentages use one decimal.
pub fn render_chat_summary(report: &AggregateReport) -> String {
    let summary = &report.summary;
    let overall = CoverageStatus::for_display(summary.overall_coverage_percentage);

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "#### {} EC2 RI Coverage: {}",
        overall.icon(),
        format_percentage(summary.overall_coverage_percentage, 1)
    ));
    lines.push(format!(
        "Inspection Time: {}",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.push(String::new());
    lines.push("| | Region | Running | Reserved | Uncovered | Coverage |".to_string());
    lines.push("|:-:|:--|--:|--:|--:|--:|".to_string());
    lines.push(format!(
        "| {} | **All Regions** | {} | {} | {} | {} |",
        overall.icon(),
        summary.total_running,
        summary.total_reserved,
        summary.total_uncovered,
        format_percentage(summary.overall_coverage_percentage, 1)
    ));

    for region in report.regions.iter().filter(|r| r.coverage.total_running > 0) {
        let c = &region.coverage;
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            CoverageStatus::for_display(c.coverage_percentage).icon(),
            region.region_name,
            c.total_running,
            c.total_reserved,
            c.uncovered,
            format_percentage(c.coverage_percentage, 1)
        ));
    }

    if let Some(next) = &summary.soonest_expiring {
        lines.push(String::new());
        lines.push(format!(
            "**Next RI Expiration:** {} in {} on {} (`{}`)",
            next.reservation.instance_type,
            next.region_name,
            next.reservation.end_date.format("%Y-%m-%d"),
            next.reservation.id
        ));
    }

    let degraded: Vec<&str> = report
        .regions
        .iter()
        .filter(|r| !r.fetch_errors.is_empty())
        .map(|r| r.region_name.as_str())
        .collect();
    if !degraded.is_empty() {
        lines.push(String::new());
        lines.push(format!("_Incomplete inventory data for: {}_", degraded.join(", ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::*;
    use chrono::Utc;

    #[test]
    fn test_status_thresholds() {
        assert_eq!(CoverageStatus::from_percentage(100.0), CoverageStatus::Healthy);
        assert_eq!(CoverageStatus::from_percentage(80.0), CoverageStatus::Healthy);
        assert_eq!(CoverageStatus::from_percentage(79.99), CoverageStatus::Degraded);
        assert_eq!(CoverageStatus::from_percentage(50.0), CoverageStatus::Degraded);
        assert_eq!(CoverageStatus::from_percentage(49.9), CoverageStatus::Critical);
        assert_eq!(CoverageStatus::from_percentage(0.0), CoverageStatus::Critical);
    }

    #[test]
    fn test_icon_follows_rounded_label() {
        assert_eq!(CoverageStatus::for_display(79.96), CoverageStatus::Healthy);
        assert_eq!(CoverageStatus::for_display(79.94), CoverageStatus::Degraded);
        assert_eq!(CoverageStatus::for_display(49.96), CoverageStatus::Degraded);

        let mut report = sample_report();
        report.summary.overall_coverage_percentage = 79.96;
        assert!(render_chat_summary(&report).starts_with("#### 🟢 EC2 RI Coverage: 80.0%"));
    }

    #[test]
    fn test_render_chat_summary_exact() {
        let expected = "\
#### 🟡 EC2 RI Coverage: 70.0%
Inspection Time: 2025-01-02 03:04 UTC

| | Region | Running | Reserved | Uncovered | Coverage |
|:-:|:--|--:|--:|--:|--:|
| 🟡 | **All Regions** | 20 | 15 | 6 | 70.0% |
| 🟡 | US East (N. Virginia) | 12 | 7 | 6 | 50.0% |
| 🟢 | Asia Pacific (Tokyo) | 8 | 8 | 0 | 100.0% |

**Next RI Expiration:** t3.micro in US East (N. Virginia) on 2025-01-15 (`r-jan`)";
        assert_eq!(render_chat_summary(&sample_report()), expected);
    }

    #[test]
    fn test_regions_without_instances_are_skipped() {
        let md = render_chat_summary(&sample_report());
        assert!(!md.contains("Europe (Ireland)"));
    }

    #[test]
    fn test_critical_without_instances_or_reservations() {
        let report = AggregateReport::from_regions(Utc::now(), vec![region("us-east-1", &[], vec![])]);
        let md = render_chat_summary(&report);
        assert!(md.starts_with("#### 🔴 EC2 RI Coverage: 0.0%"));
        assert!(md.contains("| 🔴 | **All Regions** | 0 | 0 | 0 | 0.0% |"));
        assert!(!md.contains("Next RI Expiration"));
    }

    #[test]
    fn test_incomplete_regions_are_flagged() {
        let mut failed = region("eu-west-1", &[], vec![]);
        failed.fetch_errors.push("reservations: throttled".to_string());
        let report = AggregateReport::from_regions(Utc::now(), vec![failed]);
        assert!(render_chat_summary(&report).ends_with("_Incomplete inventory data for: Europe (Ireland)_"));
    }

    #[test]
    fn test_chat_and_markdown_agree() {
        let report = sample_report();
        let chat = render_chat_summary(&report);
        let md = crate::report::markdown::render_markdown(&report);
        assert!(chat.contains("| 20 | 15 | 6 | 70.0% |"));
        assert!(md.contains("- Total Running EC2 Instances: 20"));
        assert!(md.contains("- Total Reserved Instances (RI): 15"));
        assert!(md.contains("- Total Uncovered Instances: 6"));
        assert!(md.contains("- Overall Coverage: 70.00%"));
    }
}
