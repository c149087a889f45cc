use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::collector::CoverageAnalyzer;
use crate::config::{validate_coverage, validate_inspection, ConfigError};
use crate::inspector::completion::Summarizer;
use crate::inspector::{inspection_message, InspectionError, PrometheusInspector};
use crate::inventory::InventoryProvider;
use crate::notifier::MattermostNotifier;
use crate::report::chat::render_chat_summary;
use crate::report::files::{coverage_rows_json, report_filename, save_report};
use crate::report::markdown::render_markdown;
use crate::report::AggregateReport;
use crate::types::{InspectionReport, MattermostSettings, ReportFormat, Settings};

/// Outcome of the chat notification for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Skipped,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub notify: bool,
    /// Stamped into the report and every archive filename.
    pub started_at: DateTime<Utc>,
}

impl RunOptions {
    pub fn new(notify: bool) -> Self {
        Self {
            notify,
            started_at: Utc::now(),
        }
    }
}

/// Files written for a run. Write failures are logged and collected here;
/// they never discard the computed result.
#[derive(Debug, Default)]
pub struct Archive {
    pub saved: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl Archive {
    fn record(&mut self, result: Result<PathBuf>) {
        match result {
            Ok(path) => self.saved.push(path),
            Err(e) => {
                error!("{:#}", e);
                self.errors.push(format!("{:#}", e));
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
pub struct CoverageRun {
    pub report: AggregateReport,
    pub markdown: String,
    pub archive: Archive,
    pub delivery: Delivery,
}

#[derive(Debug)]
pub struct InspectionRun {
    pub report: InspectionReport,
    pub document: String,
    pub archive: Archive,
    pub delivery: Delivery,
}

/// `Ok(false)` when the analysis is switched off; configuration is only
/// validated for enabled pipelines.
pub fn coverage_ready(settings: &Settings) -> Result<bool, ConfigError> {
    if !settings.ri_analysis.enabled {
        info!("RI analysis is disabled in configuration");
        return Ok(false);
    }
    validate_coverage(settings)?;
    Ok(true)
}

pub fn inspection_ready(settings: &Settings) -> Result<bool, ConfigError> {
    if !settings.prometheus_inspection.enabled {
        info!("Prometheus inspection is disabled in configuration");
        return Ok(false);
    }
    validate_inspection(settings)?;
    Ok(true)
}

/// Best-effort notification. Client setup errors count as a failed delivery.
pub async fn deliver(settings: &MattermostSettings, text: &str, notify: bool) -> Delivery {
    if !notify || !settings.enabled {
        return Delivery::Skipped;
    }
    let notifier = match MattermostNotifier::new(settings) {
        Ok(notifier) => notifier,
        Err(e) => {
            warn!("Mattermost notifier unavailable: {:#}", e);
            return Delivery::Failed;
        }
    };
    if notifier.send(text).await {
        Delivery::Sent
    } else {
        warn!("Notification was not delivered to Mattermost");
        Delivery::Failed
    }
}

/// Analyse, archive, then notify. Provider, write and delivery failures are
/// all absorbed; the returned report is always the computed one.
pub async fn run_coverage<P: InventoryProvider>(provider: &P, settings: &Settings, options: RunOptions) -> CoverageRun {
    let analyzer = CoverageAnalyzer::new(provider, &settings.ri_analysis);
    let report = analyzer.generate_report(options.started_at).await;
    if report.has_fetch_errors() {
        warn!("Some regions returned incomplete inventory data; figures may be understated");
    }

    let markdown = render_markdown(&report);
    let output_dir = &settings.reporting.output_dir;
    let mut archive = Archive::default();
    for format in &settings.reporting.formats {
        match format {
            ReportFormat::Markdown => {
                let filename = report_filename("ri_coverage", "md", options.started_at);
                archive.record(save_report(output_dir, &filename, &markdown));
            }
            ReportFormat::Json => {
                let filename = report_filename("ri_coverage", "json", options.started_at);
                archive.record(coverage_rows_json(&report).and_then(|json| save_report(output_dir, &filename, &json)));
            }
        }
    }

    let delivery = deliver(&settings.notifications.mattermost, &render_chat_summary(&report), options.notify).await;
    CoverageRun {
        report,
        markdown,
        archive,
        delivery,
    }
}

pub fn inspection_document(report: &InspectionReport) -> String {
    format!(
        "{}\n\n## Collected Metrics\n\nSource: {}\n\n```\n{}\n```\n",
        inspection_message(report),
        report.prometheus_url,
        report.formatted_data
    )
}

/// Only a failure to reach Prometheus at all is an error.
pub async fn run_inspection<S: Summarizer>(
    settings: &Settings,
    summarizer: &S,
    options: RunOptions,
) -> Result<InspectionRun, InspectionError> {
    let inspector = PrometheusInspector::new(&settings.prometheus_inspection, summarizer);
    let report = inspector.run_inspection().await?;

    let document = inspection_document(&report);
    let mut archive = Archive::default();
    let filename = report_filename("prometheus_inspection", "md", options.started_at);
    archive.record(save_report(&settings.reporting.output_dir, &filename, &document));

    let delivery = deliver(&settings.notifications.mattermost, &inspection_message(&report), options.notify).await;
    Ok(InspectionRun {
        report,
        document,
        archive,
        delivery,
    })
}
