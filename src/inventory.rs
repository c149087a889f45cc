use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::parsing::{date_from_epoch_secs, instance_count_from_api};
use crate::types::{ReservationRecord, RiAnalysisSettings, RunningInstance};

const DEFAULT_PLATFORM: &str = "Linux/UNIX";
const SESSION_NAME: &str = "AWSResourceOptimizer";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("EC2 API error in {region}: {message}")]
    Api { region: String, message: String },

    #[error("EC2 request in {region} timed out after {secs}s")]
    Timeout { region: String, secs: u64 },
}

/// Read-only view of a cloud account's compute inventory, scoped per region.
#[async_trait]
pub trait InventoryProvider {
    async fn running_instances(&self, region: &str) -> Result<Vec<RunningInstance>, InventoryError>;

    async fn active_reservations(&self, region: &str) -> Result<Vec<ReservationRecord>, InventoryError>;
}

pub struct Ec2Inventory {
    profile: Option<String>,
    role_arn: Option<String>,
    timeout: Duration,
}

impl Ec2Inventory {
    pub fn new(settings: &RiAnalysisSettings) -> Self {
        Self {
            profile: settings.aws.profile.clone(),
            role_arn: settings.aws.role_arn.clone(),
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        }
    }

    async fn client(&self, region: &str) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        let base = loader.load().await;

        match &self.role_arn {
            None => Client::new(&base),
            Some(role_arn) => {
                debug!("Assuming role {} for region {}", role_arn, region);
                let provider = AssumeRoleProvider::builder(role_arn)
                    .session_name(SESSION_NAME)
                    .configure(&base)
                    .build()
                    .await;
                let conf = aws_sdk_ec2::config::Builder::from(&base)
                    .credentials_provider(provider)
                    .build();
                Client::from_conf(conf)
            }
        }
    }

    async fn bounded<T, F>(&self, region: &str, fut: F) -> Result<T, InventoryError>
    where
        F: Future<Output = Result<T, InventoryError>> + Send,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| InventoryError::Timeout {
                region: region.to_string(),
                secs: self.timeout.as_secs(),
            })?
    }
}

fn api_error<E>(region: &str, err: E) -> InventoryError
where
    E: std::error::Error + 'static,
{
    InventoryError::Api {
        region: region.to_string(),
        message: DisplayErrorContext(&err).to_string(),
    }
}

#[async_trait]
impl InventoryProvider for Ec2Inventory {
    async fn running_instances(&self, region: &str) -> Result<Vec<RunningInstance>, InventoryError> {
        self.bounded(region, async {
            let client = self.client(region).await;
            let running = Filter::builder()
                .name("instance-state-name")
                .values("running")
                .build();
            let mut pages = client
                .describe_instances()
                .filters(running)
                .into_paginator()
                .send();

            let mut instances = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| api_error(region, e))?;
                for reservation in page.reservations() {
                    for instance in reservation.instances() {
                        let Some(instance_type) = instance.instance_type() else {
                            warn!("Skipping instance without a type in {}", region);
                            continue;
                        };
                        instances.push(RunningInstance {
                            instance_id: instance.instance_id().unwrap_or_default().to_string(),
                            instance_type: instance_type.as_str().to_string(),
                            platform: instance
                                .platform()
                                .map(|p| p.as_str().to_string())
                                .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
                        });
                    }
                }
            }
            debug!("Found {} running instances in {}", instances.len(), region);
            Ok(instances)
        })
        .await
    }

    async fn active_reservations(&self, region: &str) -> Result<Vec<ReservationRecord>, InventoryError> {
        self.bounded(region, async {
            let client = self.client(region).await;
            let active = Filter::builder().name("state").values("active").build();
            let output = client
                .describe_reserved_instances()
                .filters(active)
                .send()
                .await
                .map_err(|e| api_error(region, e))?;

            let mut records = Vec::new();
            for ri in output.reserved_instances() {
                let id = ri.reserved_instances_id().unwrap_or_default().to_string();
                let Some(end_date) = ri.end().and_then(|end| date_from_epoch_secs(end.secs())) else {
                    warn!("Skipping reservation {} without an end date", id);
                    continue;
                };
                records.push(ReservationRecord {
                    id,
                    instance_type: ri
                        .instance_type()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    count: instance_count_from_api(ri.instance_count()),
                    platform: ri
                        .product_description()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
                    end_date,
                });
            }
            debug!("Found {} active reservations in {}", records.len(), region);
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AwsSettings;

    #[test]
    fn test_ec2_inventory_from_settings() {
        let settings = RiAnalysisSettings {
            aws: AwsSettings {
                profile: Some("billing".to_string()),
                role_arn: Some("arn:aws:iam::123456789012:role/ReadOnly".to_string()),
            },
            timeout_secs: 0,
            ..Default::default()
        };
        let inventory = Ec2Inventory::new(&settings);
        assert_eq!(inventory.profile.as_deref(), Some("billing"));
        assert!(inventory.role_arn.is_some());
        // Zero would make every call time out immediately
        assert_eq!(inventory.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_inventory_error_messages() {
        let err = InventoryError::Timeout { region: "us-east-1".to_string(), secs: 60 };
        assert_eq!(err.to_string(), "EC2 request in us-east-1 timed out after 60s");

        let err = InventoryError::Api { region: "eu-west-1".to_string(), message: "UnauthorizedOperation".to_string() };
        assert!(err.to_string().contains("eu-west-1"));
        assert!(err.to_string().contains("UnauthorizedOperation"));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let inventory = Ec2Inventory {
            profile: None,
            role_arn: None,
            timeout: Duration::from_millis(10),
        };
        let result: Result<(), InventoryError> = inventory
            .bounded("us-east-1", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(InventoryError::Timeout { .. })));
    }
}
