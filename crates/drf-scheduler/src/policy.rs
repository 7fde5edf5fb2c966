//! Scheduling policies

use std::cmp::Ordering;

use drf_core::{
    validate_capacity, DrfError, DrfResult, EnabledResourceTypes, Resource, ResourceType,
    Schedulable,
};
use tracing::info;

use crate::comparator::DrfComparator;
use crate::fair_share::compute_fair_shares;

/// A policy orders sibling consumers and decides how much each may hold
pub trait SchedulingPolicy: Send + Sync {
    /// Short policy name
    fn name(&self) -> &'static str;

    /// Set the cluster capacity; called at startup and on cluster resize
    fn initialize(&mut self, capacity: Resource) -> DrfResult<()>;

    /// `Less` means `a` should be allocated to before `b`
    fn compare(&self, a: &dyn Schedulable, b: &dyn Schedulable) -> Ordering;

    /// Fair share of every consumer, in input order
    fn compute_shares(&self, schedulables: &[&dyn Schedulable], total: &Resource) -> Vec<Resource>;

    /// True when `usage` exceeds `fair_share` on any considered dimension
    fn check_if_usage_over_fair_share(&self, usage: &Resource, fair_share: &Resource) -> bool;

    /// True when application-master usage exceeds its limit
    fn check_if_am_resource_usage_over_limit(
        &self,
        usage: &Resource,
        max_am_resource: &Resource,
    ) -> bool;

    /// What a consumer may still take given its fair share and the free pool
    fn headroom(&self, fair_share: &Resource, usage: &Resource, max_available: &Resource)
        -> Resource;
}

/// Dominant Resource Fairness
#[derive(Debug, Clone)]
pub struct DominantResourceFairnessPolicy {
    capacity: Resource,
    enabled: EnabledResourceTypes,
    initialized: bool,
}

impl DominantResourceFairnessPolicy {
    pub const NAME: &'static str = "DRF";

    /// Create an uninitialized policy with every resource type enabled
    pub fn new() -> Self {
        Self {
            capacity: Resource::none(),
            enabled: EnabledResourceTypes::all(),
            initialized: false,
        }
    }

    /// Restrict the dimensions the policy considers.
    ///
    /// Must not be called during a comparison pass. If the policy is already
    /// initialized, the current capacity is re-validated against the new set.
    pub fn set_enabled_resource_types(&mut self, enabled: EnabledResourceTypes) -> DrfResult<()> {
        if enabled.is_empty() {
            return Err(DrfError::Config(
                "enabled resource type set must not be empty".to_string(),
            ));
        }
        if self.initialized {
            validate_capacity(&self.capacity, &enabled)?;
        }
        self.enabled = enabled;
        let types: Vec<ResourceType> = enabled.iter().collect();
        info!(enabled = ?types, "Enabled resource types updated");
        Ok(())
    }

    pub fn enabled_resource_types(&self) -> &EnabledResourceTypes {
        &self.enabled
    }

    pub fn capacity(&self) -> &Resource {
        &self.capacity
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Snapshot of the current configuration as a comparator
    pub fn comparator(&self) -> DrfResult<DrfComparator> {
        if !self.initialized {
            return Err(DrfError::Config(
                "DRF policy used before initialize".to_string(),
            ));
        }
        Ok(DrfComparator::new(self.capacity, self.enabled))
    }

    fn exceeds_on_enabled(&self, usage: &Resource, limit: &Resource) -> bool {
        self.enabled.iter().any(|t| usage.get(t) > limit.get(t))
    }
}

impl Default for DominantResourceFairnessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for DominantResourceFairnessPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, capacity: Resource) -> DrfResult<()> {
        validate_capacity(&capacity, &self.enabled)?;
        self.capacity = capacity;
        self.initialized = true;
        info!(capacity = %capacity, "DRF policy initialized");
        Ok(())
    }

    fn compare(&self, a: &dyn Schedulable, b: &dyn Schedulable) -> Ordering {
        debug_assert!(self.initialized, "DRF policy used before initialize");
        DrfComparator::new(self.capacity, self.enabled).compare(a, b)
    }

    fn compute_shares(&self, schedulables: &[&dyn Schedulable], total: &Resource) -> Vec<Resource> {
        compute_fair_shares(schedulables, total, &self.enabled)
    }

    fn check_if_usage_over_fair_share(&self, usage: &Resource, fair_share: &Resource) -> bool {
        self.exceeds_on_enabled(usage, fair_share)
    }

    fn check_if_am_resource_usage_over_limit(
        &self,
        usage: &Resource,
        max_am_resource: &Resource,
    ) -> bool {
        self.exceeds_on_enabled(usage, max_am_resource)
    }

    fn headroom(
        &self,
        fair_share: &Resource,
        usage: &Resource,
        max_available: &Resource,
    ) -> Resource {
        let mut headroom = Resource::none();
        for t in ResourceType::ALL {
            let available = fair_share.get(t).saturating_sub(usage.get(t));
            headroom.set(t, available.min(max_available.get(t)));
        }
        headroom
    }
}
