use crate::types::{
    CoverageResult, ExpiringReservation, InstanceGroup, ReservationRecord, ReservationSummary,
    RunningInstance,
};

pub fn group_by_category(instances: &[RunningInstance]) -> InstanceGroup {
    let mut group = InstanceGroup::new();
    for instance in instances {
        *group.entry(instance.instance_type.clone()).or_insert(0) += 1;
    }
    group
}

pub fn summarize_reservations(records: Vec<ReservationRecord>) -> ReservationSummary {
    let mut summary = ReservationSummary::default();
    for record in &records {
        *summary.count_by_type.entry(record.instance_type.clone()).or_insert(0) += record.count;
    }
    summary.details = records;
    summary
}

/// Earliest expiring reservation; on equal dates the first record in fetch order wins.
pub fn soonest_expiring(records: &[ReservationRecord]) -> Option<ExpiringReservation> {
    records
        .iter()
        .min_by_key(|r| r.end_date)
        .map(|r| ExpiringReservation {
            id: r.id.clone(),
            instance_type: r.instance_type.clone(),
            end_date: r.end_date,
        })
}

pub fn coverage_percentage(covered: u32, running: u32) -> f64 {
    if running == 0 {
        return 0.0;
    }
    covered as f64 / running as f64 * 100.0
}

/// Match running instances against reservations of the same instance type.
///
/// Reservations for types with no running instances count towards
/// `total_reserved` but cover nothing.
pub fn calculate_coverage(running: &InstanceGroup, reserved: &ReservationSummary) -> CoverageResult {
    let mut covered_total = 0u32;
    let mut uncovered_total = 0u32;
    let mut uncovered_by_type = std::collections::BTreeMap::new();

    for (instance_type, &count) in running {
        let available = reserved.count_by_type.get(instance_type).copied().unwrap_or(0);
        let covered = count.min(available);
        let uncovered = count - covered;

        covered_total += covered;
        uncovered_total += uncovered;
        if uncovered > 0 {
            uncovered_by_type.insert(instance_type.clone(), uncovered);
        }
    }

    let total_running: u32 = running.values().sum();
    let total_reserved: u32 = reserved.count_by_type.values().sum();

    CoverageResult {
        total_running,
        total_reserved,
        covered: covered_total,
        uncovered: uncovered_total,
        coverage_percentage: coverage_percentage(covered_total, total_running),
        running_by_type: running.clone(),
        reserved_by_type: reserved.count_by_type.clone(),
        uncovered_by_type,
        reservations: reserved.details.clone(),
        soonest_expiring: soonest_expiring(&reserved.details),
    }
}
