use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::coverage::{calculate_coverage, group_by_category, summarize_reservations};
use crate::inventory::InventoryProvider;
use crate::regions::region_display_name;
use crate::report::AggregateReport;
use crate::types::{RegionReport, RiAnalysisSettings};

/// Runs the per-region coverage analysis against an inventory provider.
pub struct CoverageAnalyzer<'a, P: InventoryProvider> {
    provider: &'a P,
    settings: &'a RiAnalysisSettings,
}

impl<'a, P: InventoryProvider> CoverageAnalyzer<'a, P> {
    pub fn new(provider: &'a P, settings: &'a RiAnalysisSettings) -> Self {
        Self { provider, settings }
    }

    /// Analyse one region. Provider failures never propagate: the failing
    /// half is treated as empty and recorded in `fetch_errors`.
    pub async fn analyze_region(&self, region: &str) -> RegionReport {
        info!("Analyzing RI coverage for region: {}", region);
        let mut fetch_errors = Vec::new();

        let instances = match self.provider.running_instances(region).await {
            Ok(instances) => instances,
            Err(e) => {
                warn!("Failed to fetch running instances: {}", e);
                fetch_errors.push(format!("running instances: {}", e));
                Vec::new()
            }
        };
        let reservations = match self.provider.active_reservations(region).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to fetch reserved instances: {}", e);
                fetch_errors.push(format!("reserved instances: {}", e));
                Vec::new()
            }
        };

        let running = group_by_category(&instances);
        let reserved = summarize_reservations(reservations);
        let coverage = calculate_coverage(&running, &reserved);
        info!(
            "{}: {} running, {} reserved, {:.2}% covered",
            region, coverage.total_running, coverage.total_reserved, coverage.coverage_percentage
        );

        RegionReport {
            region: region.to_string(),
            region_name: region_display_name(region).to_string(),
            coverage,
            fetch_errors,
        }
    }

    pub async fn generate_report(&self, generated_at: DateTime<Utc>) -> AggregateReport {
        info!(
            "Starting RI coverage analysis for {} regions (lookback {} days)",
            self.settings.regions.len(),
            self.settings.lookback_days
        );
        let mut report = AggregateReport::new(generated_at);
        for region in &self.settings.regions {
            let region_report = self.analyze_region(region).await;
            report.add_region(region_report);
        }
        info!(
            "RI coverage analysis completed: {:.2}% overall",
            report.summary.overall_coverage_percentage
        );
        report
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::inventory::{InventoryError, InventoryProvider};
    use crate::types::{ReservationRecord, RunningInstance};

    /// In-memory provider; regions listed in `failing` return API errors.
    #[derive(Default)]
    pub struct MockInventory {
        pub running: HashMap<String, Vec<RunningInstance>>,
        pub reservations: HashMap<String, Vec<ReservationRecord>>,
        pub failing_running: Vec<String>,
        pub failing_reservations: Vec<String>,
    }

    impl MockInventory {
        pub fn with_running(mut self, region: &str, instance_type: &str, count: usize) -> Self {
            let entry = self.running.entry(region.to_string()).or_default();
            for i in 0..count {
                entry.push(RunningInstance {
                    instance_id: format!("i-{}-{}", instance_type, i),
                    instance_type: instance_type.to_string(),
                    platform: "Linux/UNIX".to_string(),
                });
            }
            self
        }

        pub fn with_reservation(mut self, region: &str, record: ReservationRecord) -> Self {
            self.reservations.entry(region.to_string()).or_default().push(record);
            self
        }
    }

    fn failure(region: &str) -> InventoryError {
        InventoryError::Api {
            region: region.to_string(),
            message: "UnauthorizedOperation".to_string(),
        }
    }

    #[async_trait]
    impl InventoryProvider for MockInventory {
        async fn running_instances(&self, region: &str) -> Result<Vec<RunningInstance>, InventoryError> {
            if self.failing_running.iter().any(|r| r == region) {
                return Err(failure(region));
            }
            Ok(self.running.get(region).cloned().unwrap_or_default())
        }

        async fn active_reservations(&self, region: &str) -> Result<Vec<ReservationRecord>, InventoryError> {
            if self.failing_reservations.iter().any(|r| r == region) {
                return Err(failure(region));
            }
            Ok(self.reservations.get(region).cloned().unwrap_or_default())
        }
    }
}
