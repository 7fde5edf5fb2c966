//! The consumer data boundary: queues or applications competing for resources

use crate::{DrfError, DrfResult, Resource, ResourceType, ResourceWeights};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of a workload consumer as seen by a scheduling policy.
///
/// Implementors hand out copies; a policy never holds on to them past a
/// single comparison pass.
pub trait Schedulable {
    /// Unique name, used as the last-resort tie-break
    fn name(&self) -> &str;

    /// Resources currently held
    fn resource_usage(&self) -> Resource;

    /// Guaranteed floor
    fn min_share(&self) -> Resource;

    /// Per-dimension weights
    fn weights(&self) -> ResourceWeights;

    /// Submission time
    fn start_time(&self) -> DateTime<Utc>;

    /// Upper bound on what the consumer may be given
    fn max_share(&self) -> Resource {
        Resource::unbounded()
    }

    /// Resources the consumer could use right now, held plus pending
    fn demand(&self) -> Resource {
        Resource::unbounded()
    }
}

/// An owned consumer snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    pub name: String,
    #[serde(default)]
    pub usage: Resource,
    #[serde(default)]
    pub min_share: Resource,
    #[serde(default = "Resource::unbounded")]
    pub max_share: Resource,
    #[serde(default = "Resource::unbounded")]
    pub demand: Resource,
    #[serde(default)]
    pub weights: ResourceWeights,
    /// Defaults to the Unix epoch so undated consumers tie on name alone
    #[serde(default = "unix_epoch")]
    pub start_time: DateTime<Utc>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl Consumer {
    /// Create an idle consumer with neutral weights, no guarantee, and the
    /// current time as its submission time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: Resource::none(),
            min_share: Resource::none(),
            max_share: Resource::unbounded(),
            demand: Resource::unbounded(),
            weights: ResourceWeights::NEUTRAL,
            start_time: Utc::now(),
        }
    }

    pub fn with_usage(mut self, usage: Resource) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_min_share(mut self, min_share: Resource) -> Self {
        self.min_share = min_share;
        self
    }

    pub fn with_max_share(mut self, max_share: Resource) -> Self {
        self.max_share = max_share;
        self
    }

    pub fn with_demand(mut self, demand: Resource) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_weights(mut self, weights: ResourceWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Check the invariants policies rely on
    pub fn validate(&self) -> DrfResult<()> {
        if self.name.is_empty() {
            return Err(DrfError::InvalidResource(
                "consumer name must not be empty".to_string(),
            ));
        }
        for t in ResourceType::ALL {
            let w = self.weights.get(t);
            if !(w.is_finite() && w > 0.0) {
                return Err(DrfError::InvalidResource(format!(
                    "consumer {}: weight for {} must be positive, got {}",
                    self.name, t, w
                )));
            }
        }
        if !self.min_share.fits_in(&self.max_share) {
            return Err(DrfError::InvalidResource(format!(
                "consumer {}: min share {} exceeds max share {}",
                self.name, self.min_share, self.max_share
            )));
        }
        Ok(())
    }
}

impl Schedulable for Consumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_usage(&self) -> Resource {
        self.usage
    }

    fn min_share(&self) -> Resource {
        self.min_share
    }

    fn weights(&self) -> ResourceWeights {
        self.weights
    }

    fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    fn max_share(&self) -> Resource {
        self.max_share
    }

    fn demand(&self) -> Resource {
        self.demand
    }
}
