use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ri_analysis: RiAnalysisSettings,
    pub prometheus_inspection: InspectionSettings,
    pub notifications: NotificationSettings,
    pub reporting: ReportingSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiAnalysisSettings {
    pub enabled: bool,
    pub regions: Vec<String>,
    pub lookback_days: u32,
    pub aws: AwsSettings,
    pub timeout_secs: u64,
}

impl Default for RiAnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            regions: vec!["us-east-1".to_string()],
            lookback_days: 30,
            aws: AwsSettings::default(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub profile: Option<String>,
    pub role_arn: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InspectionSettings {
    pub enabled: bool,
    pub prometheus_url: Option<String>,
    pub container_name: Option<String>,
    pub openai_api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    /// PromQL range used by the default queries, e.g. `7d`.
    pub lookback: String,
    /// Replaces the default queries entirely when set.
    pub queries: Option<BTreeMap<String, String>>,
    pub thresholds: Thresholds,
    pub timeout_secs: u64,
}

impl Default for InspectionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prometheus_url: None,
            container_name: None,
            openai_api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            lookback: "7d".to_string(),
            queries: None,
            thresholds: Thresholds::default(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_warning: f64,
    pub mem_warning: f64,
    pub disk_warning: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_warning: 80.0,
            mem_warning: 90.0,
            disk_warning: 15.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub mattermost: MattermostSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MattermostSettings {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub username: String,
    pub icon_emoji: String,
    pub timeout_secs: u64,
}

impl Default for MattermostSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            channel: None,
            username: "AWS Resource Optimizer".to_string(),
            icon_emoji: ":money_with_wings:".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingSettings {
    pub output_dir: PathBuf,
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            formats: vec![ReportFormat::Markdown],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { dir: PathBuf::from("logs") }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunningInstance {
    pub instance_id: String,
    pub instance_type: String,
    pub platform: String,
}

/// Running instance counts keyed by instance type.
pub type InstanceGroup = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationRecord {
    pub id: String,
    pub instance_type: String,
    pub count: u32,
    pub platform: String,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationSummary {
    pub count_by_type: BTreeMap<String, u32>,
    /// Records in the order the provider returned them.
    pub details: Vec<ReservationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiringReservation {
    pub id: String,
    pub instance_type: String,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageResult {
    pub total_running: u32,
    pub total_reserved: u32,
    pub covered: u32,
    pub uncovered: u32,
    pub coverage_percentage: f64,
    pub running_by_type: InstanceGroup,
    pub reserved_by_type: BTreeMap<String, u32>,
    /// Only categories with a non-zero surplus appear here.
    pub uncovered_by_type: BTreeMap<String, u32>,
    pub reservations: Vec<ReservationRecord>,
    pub soonest_expiring: Option<ExpiringReservation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionReport {
    pub region: String,
    pub region_name: String,
    pub coverage: CoverageResult,
    pub fetch_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub instance: String,
    pub metric: String,
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone)]
pub struct InspectionReport {
    pub prometheus_url: String,
    pub metrics_count: usize,
    pub raw_metrics: Vec<MetricSample>,
    pub formatted_data: String,
    pub ai_summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}
