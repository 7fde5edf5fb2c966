//! Configuration types for DRF scheduling

use crate::{Consumer, DrfError, DrfResult, EnabledResourceTypes, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Workload description file format (TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Cluster-wide policy settings
    pub cluster: ClusterConfig,
    /// Consumers competing for the cluster
    #[serde(default)]
    pub consumers: Vec<Consumer>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WorkloadConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> DrfResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DrfError::Config(format!("Failed to read config file: {}", e)))?;
        content.parse()
    }

    /// Reject configurations a policy cannot be started with
    pub fn validate(&self) -> DrfResult<()> {
        self.cluster.validate()?;

        let mut seen = HashSet::new();
        for consumer in &self.consumers {
            consumer.validate()?;
            if !seen.insert(consumer.name.as_str()) {
                return Err(DrfError::Config(format!(
                    "Duplicate consumer name: {}",
                    consumer.name
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for WorkloadConfig {
    type Err = DrfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: WorkloadConfig = toml::from_str(s)
            .map_err(|e| DrfError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Cluster capacity and the dimensions that take part in fairness decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Total cluster resources
    pub capacity: Resource,
    /// Dimensions considered by the policy (all when omitted)
    #[serde(default)]
    pub enabled: EnabledResourceTypes,
}

impl ClusterConfig {
    /// A cluster whose enabled dimensions are all empty cannot be shared
    pub fn validate(&self) -> DrfResult<()> {
        validate_capacity(&self.capacity, &self.enabled)
    }
}

/// Check that at least one enabled dimension has non-zero capacity.
///
/// A single empty dimension (a cluster without GPUs, say) is allowed: its
/// shares are defined as zero.
pub fn validate_capacity(capacity: &Resource, enabled: &EnabledResourceTypes) -> DrfResult<()> {
    if enabled.iter().all(|t| capacity.get(t) == 0) {
        return Err(DrfError::Config(format!(
            "Cluster capacity {} is zero on every enabled resource type",
            capacity
        )));
    }
    Ok(())
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
