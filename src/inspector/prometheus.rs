use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::inspector::InspectionError;
use crate::parsing::{format_metric_display, parse_sample_value};
use crate::types::{InspectionSettings, MetricSample};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
const PROMETHEUS_PORT: u16 = 9090;

/// The CPU, memory and disk queries used when none are configured.
pub fn default_queries(lookback: &str) -> BTreeMap<String, String> {
    let mut queries = BTreeMap::new();
    queries.insert(
        "cpu_usage".to_string(),
        format!(
            "avg by (instance) (1 - rate(node_cpu_seconds_total{{mode=\"idle\"}}[{}])) * 100",
            lookback
        ),
    );
    queries.insert(
        "mem_usage".to_string(),
        "max by (instance) (1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)) * 100"
            .to_string(),
    );
    queries.insert(
        "disk_free".to_string(),
        "min by (instance, mountpoint) (node_filesystem_avail_bytes{fstype=~\"ext4|xfs\"} / node_filesystem_size_bytes{fstype=~\"ext4|xfs\"}) * 100"
            .to_string(),
    );
    queries
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryData {
    #[serde(default)]
    pub result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

/// Convert an instant-vector response into samples. Unparseable values are skipped.
pub fn samples_from_response(metric_name: &str, response: QueryResponse) -> Result<Vec<MetricSample>, InspectionError> {
    if response.status != "success" {
        return Err(InspectionError::Query {
            name: metric_name.to_string(),
            message: response.error.unwrap_or_else(|| format!("status '{}'", response.status)),
        });
    }

    let mut samples = Vec::new();
    for sample in response.data.map(|d| d.result).unwrap_or_default() {
        let Some(value) = parse_sample_value(&sample.value.1) else {
            debug!("Skipping non-numeric sample '{}' for {}", sample.value.1, metric_name);
            continue;
        };
        let instance = sample
            .metric
            .get("instance")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let display = format_metric_display(
            metric_name,
            &instance,
            sample.metric.get("mountpoint").map(String::as_str),
            value,
        );
        samples.push(MetricSample {
            instance,
            metric: metric_name.to_string(),
            value,
            display,
        });
    }
    Ok(samples)
}

pub struct PrometheusClient {
    client: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> Result<Self, InspectionError> {
        let client = reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(&self, metric_name: &str, promql: &str) -> Result<Vec<MetricSample>, InspectionError> {
        let url = format!("{}/api/v1/query", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[("query", promql)])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(InspectionError::Status {
                name: metric_name.to_string(),
                status: res.status().as_u16(),
            });
        }
        let body: QueryResponse = res.json().await?;
        let samples = samples_from_response(metric_name, body)?;
        info!("Fetched {} results for metric: {}", samples.len(), metric_name);
        Ok(samples)
    }
}

/// Look up a running container's IP through `docker inspect`.
pub async fn discover_container_url(container_name: &str) -> Result<String, InspectionError> {
    let output = Command::new("docker")
        .args([
            "inspect",
            "-f",
            "{{range .NetworkSettings.Networks}}{{.IPAddress}}{{end}}",
            container_name,
        ])
        .output()
        .await
        .map_err(|e| InspectionError::Discovery(format!("failed to run docker: {}", e)))?;

    if !output.status.success() {
        return Err(InspectionError::Discovery(format!(
            "docker inspect {} exited with {}",
            container_name, output.status
        )));
    }
    let ip = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if ip.is_empty() {
        return Err(InspectionError::Discovery(format!(
            "could not find IP for container: {}",
            container_name
        )));
    }
    let url = format!("http://{}:{}", ip, PROMETHEUS_PORT);
    info!("Found Prometheus container at {}", url);
    Ok(url)
}

pub async fn resolve_prometheus_url(settings: &InspectionSettings) -> Result<String, InspectionError> {
    match (&settings.prometheus_url, &settings.container_name) {
        (Some(url), _) if !url.trim().is_empty() => Ok(url.clone()),
        (_, Some(container)) if !container.trim().is_empty() => discover_container_url(container).await,
        _ => Err(InspectionError::Discovery(
            "either prometheus_url or container_name must be configured".to_string(),
        )),
    }
}
