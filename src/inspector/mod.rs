pub mod completion;
pub mod prometheus;

use thiserror::Error;
use tracing::{error, info};

use crate::types::{InspectionReport, InspectionSettings, MetricSample, Thresholds};
use completion::Summarizer;
use prometheus::{default_queries, resolve_prometheus_url, PrometheusClient};

pub use completion::OpenAiSummarizer;

pub const NO_DATA_TEXT: &str = "No data collected from Prometheus.";
pub const NO_DATA_SUMMARY: &str =
    "No data collected from Prometheus. Please check container status and configuration.";
pub const REPORT_HEADING: &str = "## 🛡️ Infrastructure Daily Report\n---\n";

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Prometheus query '{name}' returned HTTP {status}")]
    Status { name: String, status: u16 },

    #[error("Prometheus query '{name}' failed: {message}")]
    Query { name: String, message: String },

    #[error("Prometheus discovery failed: {0}")]
    Discovery(String),

    #[error("completion request failed: {0}")]
    Completion(String),
}

pub fn format_metrics_for_prompt(samples: &[MetricSample]) -> String {
    if samples.is_empty() {
        return NO_DATA_TEXT.to_string();
    }
    samples
        .iter()
        .map(|s| s.display.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_inspection_prompt(data: &str, thresholds: &Thresholds, lookback: &str) -> String {
    format!(
        "You are an expert SRE. Below is the system performance data for the past {lookback}:

{data}

Please provide a concise inspection report in English with factual analysis only:
1. Overall system health status (Normal/Warning/Critical).
2. Highlight any instances with potential risks:
   - CPU > {cpu}%
   - Memory > {mem}%
   - Disk free space < {disk}%
3. Identify instances with potential resource waste:
   - List each server only once, with all its resource waste indicators on the same line
   - Format: Server name - CPU usage: X%, Memory usage: Y% (indicate if very low)
   - Focus on servers with very low average CPU usage (< 10-15%) and/or very low memory usage (< 20-30%)
   - Do not create separate categories for the same server; combine all observations for each server into a single entry

Use Markdown formatting with bullet points. Keep it professional and concise.
This is a factual analysis report only - provide observations and data analysis, but do not include actionable suggestions or recommendations. Do not offer to generate additional documents or rulesets.
",
        lookback = lookback,
        data = data,
        cpu = thresholds.cpu_warning,
        mem = thresholds.mem_warning,
        disk = thresholds.disk_warning,
    )
}

/// Chat message wrapping an inspection summary.
pub fn inspection_message(report: &InspectionReport) -> String {
    format!("{}{}", REPORT_HEADING, report.ai_summary)
}

pub struct PrometheusInspector<'a, S: Summarizer> {
    settings: &'a InspectionSettings,
    summarizer: &'a S,
}

impl<'a, S: Summarizer> PrometheusInspector<'a, S> {
    pub fn new(settings: &'a InspectionSettings, summarizer: &'a S) -> Self {
        Self { settings, summarizer }
    }

    /// Run every configured query; a failing query is logged and skipped.
    pub async fn fetch_metrics(&self, client: &PrometheusClient) -> Vec<MetricSample> {
        let queries = self
            .settings
            .queries
            .clone()
            .unwrap_or_else(|| default_queries(&self.settings.lookback));

        let mut samples = Vec::new();
        for (name, query) in &queries {
            match client.query(name, query).await {
                Ok(mut fetched) => samples.append(&mut fetched),
                Err(e) => error!("Error fetching {} from Prometheus: {}", name, e),
            }
        }
        samples
    }

    /// Never fails: completion errors become a visible placeholder.
    pub async fn summarize(&self, formatted: &str) -> String {
        if formatted.trim().is_empty() || formatted == NO_DATA_TEXT {
            return NO_DATA_SUMMARY.to_string();
        }
        let prompt = build_inspection_prompt(formatted, &self.settings.thresholds, &self.settings.lookback);
        match self.summarizer.summarize(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Error generating AI summary: {}", e);
                format!("Error generating AI summary: {}", e)
            }
        }
    }

    pub async fn run_inspection(&self) -> Result<InspectionReport, InspectionError> {
        info!("Starting Prometheus system inspection");
        let url = resolve_prometheus_url(self.settings).await?;
        let client = PrometheusClient::new(&url)?;

        info!("Fetching data from {}", client.base_url());
        let raw_metrics = self.fetch_metrics(&client).await;
        let formatted_data = format_metrics_for_prompt(&raw_metrics);

        info!("Generating AI summary");
        let ai_summary = self.summarize(&formatted_data).await;

        info!("Inspection completed with {} metrics", raw_metrics.len());
        Ok(InspectionReport {
            prometheus_url: client.base_url().to_string(),
            metrics_count: raw_metrics.len(),
            raw_metrics,
            formatted_data,
            ai_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records prompts and replies with a canned answer or error.
    struct StubSummarizer {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubSummarizer {
        fn ok(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing(message: &str) -> Self {
            Self { reply: Err(message.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, prompt: &str) -> Result<String, InspectionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(InspectionError::Completion)
        }
    }

    fn sample(display: &str) -> MetricSample {
        MetricSample {
            instance: "node".to_string(),
            metric: "cpu_usage".to_string(),
            value: 1.0,
            display: display.to_string(),
        }
    }

    #[test]
    fn test_format_metrics_for_prompt() {
        assert_eq!(format_metrics_for_prompt(&[]), NO_DATA_TEXT);
        let text = format_metrics_for_prompt(&[sample("[a] Avg CPU Usage: 1.00%"), sample("[b] Avg CPU Usage: 2.00%")]);
        assert_eq!(text, "[a] Avg CPU Usage: 1.00%\n[b] Avg CPU Usage: 2.00%");
    }

    #[test]
    fn test_prompt_embeds_thresholds() {
        let thresholds = Thresholds { cpu_warning: 75.0, mem_warning: 85.5, disk_warning: 10.0 };
        let prompt = build_inspection_prompt("[a] Avg CPU Usage: 1.00%", &thresholds, "7d");
        assert!(prompt.contains("past 7d"));
        assert!(prompt.contains("[a] Avg CPU Usage: 1.00%"));
        assert!(prompt.contains("CPU > 75%"));
        assert!(prompt.contains("Memory > 85.5%"));
        assert!(prompt.contains("Disk free space < 10%"));
        assert!(prompt.trim_end().ends_with("Do not offer to generate additional documents or rulesets."));
    }

    #[tokio::test]
    async fn test_summarize_skips_completion_without_data() {
        let settings = InspectionSettings::default();
        let stub = StubSummarizer::ok("unused");
        let inspector = PrometheusInspector::new(&settings, &stub);

        assert_eq!(inspector.summarize(NO_DATA_TEXT).await, NO_DATA_SUMMARY);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_summarize_failure_becomes_placeholder() {
        let settings = InspectionSettings::default();
        let stub = StubSummarizer::failing("HTTP 500");
        let inspector = PrometheusInspector::new(&settings, &stub);

        let summary = inspector.summarize("[a] Avg CPU Usage: 1.00%").await;
        assert_eq!(summary, "Error generating AI summary: completion request failed: HTTP 500");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_run_inspection_with_partial_failures() {
        let mut server = mockito::Server::new_async().await;
        let _cpu = server
            .mock("GET", "/api/v1/query")
            .match_query(mockito::Matcher::UrlEncoded("query".into(), "cpu_q".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"status": "success", "data": {"result": [
                    {"metric": {"instance": "web-1"}, "value": [1.0, "42.123"]}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;
        let _mem = server
            .mock("GET", "/api/v1/query")
            .match_query(mockito::Matcher::UrlEncoded("query".into(), "mem_q".into()))
            .with_status(500)
            .create_async()
            .await;

        let mut queries = std::collections::BTreeMap::new();
        queries.insert("cpu_usage".to_string(), "cpu_q".to_string());
        queries.insert("mem_usage".to_string(), "mem_q".to_string());
        let settings = InspectionSettings {
            prometheus_url: Some(server.url()),
            queries: Some(queries),
            ..Default::default()
        };
        let stub = StubSummarizer::ok("- Overall: Normal");
        let inspector = PrometheusInspector::new(&settings, &stub);

        let report = inspector.run_inspection().await.unwrap();
        assert_eq!(report.metrics_count, 1);
        assert_eq!(report.formatted_data, "[web-1] Avg CPU Usage: 42.12%");
        assert_eq!(report.ai_summary, "- Overall: Normal");
        assert_eq!(report.prometheus_url, server.url());

        let prompts = stub.prompts.lock().unwrap();
        assert!(prompts[0].contains("[web-1] Avg CPU Usage: 42.12%"));
        assert!(prompts[0].contains("CPU > 80%"));

        assert_eq!(
            inspection_message(&report),
            "## 🛡️ Infrastructure Daily Report\n---\n- Overall: Normal"
        );
    }

    #[tokio::test]
    async fn test_run_inspection_requires_prometheus_location() {
        let settings = InspectionSettings::default();
        let stub = StubSummarizer::ok("unused");
        let inspector = PrometheusInspector::new(&settings, &stub);
        assert!(matches!(inspector.run_inspection().await, Err(InspectionError::Discovery(_))));
    }
}
