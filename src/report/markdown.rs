use crate::parsing::format_percentage;
use crate::report::AggregateReport;
use crate::types::{RegionReport, ReservationRecord};

pub const REPORT_TITLE: &str = "EC2 Reserved Instance Coverage Report";

/// Render the archival markdown document. Pure function of `report`.
pub fn render_markdown(report: &AggregateReport) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", REPORT_TITLE));
    md.push_str(&format!(
        "Inspection Time: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    if let Some(next) = &report.summary.soonest_expiring {
        md.push_str(&format!(
            "**Next RI Expiration:** {} in {} will expire on {}\n\n",
            next.reservation.instance_type,
            next.region_name,
            next.reservation.end_date.format("%Y-%m-%d")
        ));
    }

    for region in &report.regions {
        md.push_str(&render_region_section(region));
    }

    let summary = &report.summary;
    md.push_str("## Summary\n");
    md.push_str(&format!("- Total Running EC2 Instances: {}\n", summary.total_running));
    md.push_str(&format!("- Total Reserved Instances (RI): {}\n", summary.total_reserved));
    md.push_str(&format!("- Total Uncovered Instances: {}\n", summary.total_uncovered));
    md.push_str(&format!(
        "- Overall Coverage: {}\n",
        format_percentage(summary.overall_coverage_percentage, 2)
    ));
    md
}

fn render_region_section(region: &RegionReport) -> String {
    let coverage = &region.coverage;
    let mut section = format!("## {}\n", region.region_name);

    if !region.fetch_errors.is_empty() {
        section.push_str(&format!(
            "> Warning: inventory data incomplete ({})\n\n",
            region.fetch_errors.join("; ")
        ));
    }

    if coverage.total_running == 0 {
        section.push_str("No running EC2 instances in this region.\n\n");
        return section;
    }

    section.push_str(&format!(
        "Currently running {} EC2 instances, with {}/{} instances covered by RIs",
        coverage.total_running, coverage.covered, coverage.total_running
    ));
    if coverage.uncovered_by_type.is_empty() {
        section.push_str(". All instances are fully covered by RIs.\n");
    } else {
        section.push_str(", remaining:\n");
        for (instance_type, count) in &coverage.uncovered_by_type {
            section.push_str(&format!(" - {} x '{}' instances\n", count, instance_type));
        }
    }

    if !coverage.reservations.is_empty() {
        section.push_str("\n### Currently Active Reserved Instances\n");
        section.push_str("| Instance Type | Count | Platform | Expiration Date |\n");
        section.push_str("|---------------|-------|----------|-----------------|\n");
        for ri in sorted_by_expiration(&coverage.reservations) {
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                ri.instance_type,
                ri.count,
                ri.platform,
                ri.end_date.format("%Y-%m-%d")
            ));
        }
    }

    section.push('\n');
    section
}

/// Ascending by end date; records sharing a date keep fetch order.
pub fn sorted_by_expiration(records: &[ReservationRecord]) -> Vec<&ReservationRecord> {
    let mut sorted: Vec<&ReservationRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.end_date);
    sorted
}
