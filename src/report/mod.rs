pub mod chat;
pub mod files;
pub mod markdown;

use chrono::{DateTime, Utc};

use crate::coverage::coverage_percentage;
use crate::types::{ExpiringReservation, RegionReport};

/// Coverage results for every analysed region plus the cross-region roll-up.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub generated_at: DateTime<Utc>,
    pub regions: Vec<RegionReport>,
    pub summary: CrossRegionSummary,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossRegionSummary {
    pub total_running: u32,
    pub total_reserved: u32,
    pub total_uncovered: u32,
    pub overall_coverage_percentage: f64,
    pub soonest_expiring: Option<RegionalExpiry>,
}

/// The globally soonest reservation together with the region that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalExpiry {
    pub reservation: ExpiringReservation,
    pub region: String,
    pub region_name: String,
}

impl AggregateReport {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            regions: Vec::new(),
            summary: CrossRegionSummary::default(),
        }
    }

    pub fn from_regions(generated_at: DateTime<Utc>, regions: Vec<RegionReport>) -> Self {
        let mut report = Self::new(generated_at);
        for region in regions {
            report.add_region(region);
        }
        report
    }

    pub fn add_region(&mut self, region: RegionReport) {
        let summary = &mut self.summary;
        summary.total_running += region.coverage.total_running;
        summary.total_reserved += region.coverage.total_reserved;
        summary.total_uncovered += region.coverage.uncovered;
        // From totals, never an average of region percentages
        summary.overall_coverage_percentage =
            coverage_percentage(summary.total_covered(), summary.total_running);

        if let Some(candidate) = &region.coverage.soonest_expiring {
            let replace = match &summary.soonest_expiring {
                None => true,
                Some(current) => candidate.end_date < current.reservation.end_date,
            };
            if replace {
                summary.soonest_expiring = Some(RegionalExpiry {
                    reservation: candidate.clone(),
                    region: region.region.clone(),
                    region_name: region.region_name.clone(),
                });
            }
        }

        self.regions.push(region);
    }

    /// True when any region fell back to empty data after a provider error.
    pub fn has_fetch_errors(&self) -> bool {
        self.regions.iter().any(|r| !r.fetch_errors.is_empty())
    }
}

impl CrossRegionSummary {
    pub fn total_covered(&self) -> u32 {
        self.total_running - self.total_uncovered
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::AggregateReport;
    use crate::coverage::{calculate_coverage, summarize_reservations};
    use crate::regions::region_display_name;
    use crate::types::{InstanceGroup, RegionReport, ReservationRecord};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn ri(id: &str, instance_type: &str, count: u32, end: NaiveDate) -> ReservationRecord {
        ReservationRecord {
            id: id.to_string(),
            instance_type: instance_type.to_string(),
            count,
            platform: "Linux/UNIX".to_string(),
            end_date: end,
        }
    }

    pub fn region(code: &str, running: &[(&str, u32)], reservations: Vec<ReservationRecord>) -> RegionReport {
        let group: InstanceGroup = running.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        RegionReport {
            region: code.to_string(),
            region_name: region_display_name(code).to_string(),
            coverage: calculate_coverage(&group, &summarize_reservations(reservations)),
            fetch_errors: Vec::new(),
        }
    }

    pub fn sample_report() -> AggregateReport {
        let generated_at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        AggregateReport::from_regions(
            generated_at,
            vec![
                region(
                    "us-east-1",
                    &[("m5.large", 10), ("t3.micro", 2)],
                    vec![
                        ri("r-mar", "m5.large", 4, date(2025, 3, 1)),
                        ri("r-jan", "t3.micro", 2, date(2025, 1, 15)),
                        ri("r-jun", "c5.large", 1, date(2025, 6, 1)),
                    ],
                ),
                region("eu-west-1", &[], vec![]),
                region(
                    "ap-northeast-1",
                    &[("c5.xlarge", 8)],
                    vec![ri("r-tokyo", "c5.xlarge", 8, date(2026, 2, 1))],
                ),
            ],
        )
    }
}
