use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::types::Settings;

pub const CONFIG_PATH_VAR: &str = "OPS_REPORTER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_config_with_env(path, &SystemEnvironment)
}

/// Resolve the config path (explicit, then `OPS_REPORTER_CONFIG`, then the
/// default), read it, and apply environment overrides.
pub fn load_config_with_env<E: EnvironmentProvider>(path: Option<&Path>, env: &E) -> Result<Settings, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => env
            .get_var(CONFIG_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    };
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let settings = parse_settings(&content, env)?;
    info!("Configuration loaded from {}", path.display());
    Ok(settings)
}

pub fn parse_settings<E: EnvironmentProvider>(yaml: &str, env: &E) -> Result<Settings, ConfigError> {
    let mut settings: Settings = if yaml.trim().is_empty() {
        Settings::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    apply_env_overrides(&mut settings, env);
    Ok(settings)
}

fn non_empty_var<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_bool_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

/// Secrets and deployment-specific values may come from the environment
/// instead of the YAML file.
pub fn apply_env_overrides<E: EnvironmentProvider>(settings: &mut Settings, env: &E) {
    let mattermost = &mut settings.notifications.mattermost;
    if let Some(url) = non_empty_var(env, "MATTERMOST_WEBHOOK_URL") {
        mattermost.webhook_url = Some(url);
    }
    if let Some(flag) = env.get_var("MATTERMOST_ENABLED") {
        mattermost.enabled = parse_bool_flag(&flag);
    }
    if let Some(key) = non_empty_var(env, "OPENAI_API_KEY") {
        settings.prometheus_inspection.openai_api_key = Some(key);
    }
    if settings.ri_analysis.aws.profile.is_none() {
        settings.ri_analysis.aws.profile = non_empty_var(env, "AWS_PROFILE");
    }
    if let Some(dir) = non_empty_var(env, "OPS_REPORTER_OUTPUT_DIR") {
        settings.reporting.output_dir = PathBuf::from(dir);
    }
}

fn validate_notifications(settings: &Settings) -> Result<(), ConfigError> {
    let mattermost = &settings.notifications.mattermost;
    if mattermost.enabled && mattermost.webhook_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
        return Err(ConfigError::Missing("notifications.mattermost.webhook_url"));
    }
    Ok(())
}

pub fn validate_coverage(settings: &Settings) -> Result<(), ConfigError> {
    let ri = &settings.ri_analysis;
    if ri.regions.is_empty() {
        return Err(ConfigError::Missing("ri_analysis.regions"));
    }
    if let Some(bad) = ri.regions.iter().find(|r| r.trim().is_empty() || r.contains(char::is_whitespace)) {
        return Err(ConfigError::Invalid {
            key: "ri_analysis.regions",
            reason: format!("'{}' is not a region code", bad),
        });
    }
    validate_notifications(settings)
}

pub fn validate_inspection(settings: &Settings) -> Result<(), ConfigError> {
    let inspection = &settings.prometheus_inspection;
    if inspection.openai_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        return Err(ConfigError::Missing("prometheus_inspection.openai_api_key"));
    }
    let has_url = inspection.prometheus_url.as_deref().is_some_and(|u| !u.trim().is_empty());
    let has_container = inspection.container_name.as_deref().is_some_and(|c| !c.trim().is_empty());
    if !has_url && !has_container {
        return Err(ConfigError::Missing("prometheus_inspection.prometheus_url or container_name"));
    }
    if inspection.lookback.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key: "prometheus_inspection.lookback",
            reason: "must not be empty".to_string(),
        });
    }
    validate_notifications(settings)
}
