//! Fair scheduler: owns consumers and picks who is allocated to next

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use drf_core::{
    ClusterConfig, Consumer, DrfError, DrfResult, EnabledResourceTypes, Resource, Schedulable,
};
use tracing::{debug, info};

use crate::comparator::DrfComparator;
use crate::policy::{DominantResourceFairnessPolicy, SchedulingPolicy};

type ConsumersMap = HashMap<String, Consumer>;

/// Scheduler holding a DRF policy and the consumers it orders.
///
/// Allocation and release may happen from any thread. Every ordering query
/// copies the policy configuration and all consumers under one pair of read
/// locks, then sorts the copies, so a single pass never observes a
/// half-applied allocation.
pub struct FairScheduler {
    /// Policy configuration
    policy: RwLock<DominantResourceFairnessPolicy>,
    /// Consumers indexed by name
    consumers: RwLock<ConsumersMap>,
}

impl FairScheduler {
    /// Create a scheduler for the given cluster capacity
    pub fn new(capacity: Resource, enabled: EnabledResourceTypes) -> DrfResult<Self> {
        let mut policy = DominantResourceFairnessPolicy::new();
        policy.set_enabled_resource_types(enabled)?;
        policy.initialize(capacity)?;

        info!(
            capacity = %capacity,
            enabled = enabled.len(),
            "Fair scheduler initialized"
        );

        Ok(Self {
            policy: RwLock::new(policy),
            consumers: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(cluster: &ClusterConfig) -> DrfResult<Self> {
        Self::new(cluster.capacity, cluster.enabled)
    }

    /// Register a new consumer
    pub fn register(&self, consumer: Consumer) -> DrfResult<()> {
        consumer.validate()?;

        let mut consumers = write(&self.consumers);
        if consumers.contains_key(&consumer.name) {
            return Err(DrfError::ConsumerExists(consumer.name));
        }

        info!(
            consumer = %consumer.name,
            usage = %consumer.usage,
            min_share = %consumer.min_share,
            "Registering consumer"
        );
        consumers.insert(consumer.name.clone(), consumer);
        Ok(())
    }

    /// Remove a consumer that no longer holds any resources
    pub fn remove(&self, name: &str) -> DrfResult<Consumer> {
        let mut consumers = write(&self.consumers);
        let consumer = consumers
            .get(name)
            .ok_or_else(|| DrfError::ConsumerNotFound(name.to_string()))?;

        if !consumer.usage.is_zero() {
            return Err(DrfError::ConsumerBusy(format!(
                "{} still holds {}",
                name, consumer.usage
            )));
        }

        info!(consumer = name, "Removing consumer");
        consumers
            .remove(name)
            .ok_or_else(|| DrfError::ConsumerNotFound(name.to_string()))
    }

    /// Record resources granted to a consumer
    pub fn allocate(&self, name: &str, amount: Resource) -> DrfResult<()> {
        let mut consumers = write(&self.consumers);
        let consumer = consumers
            .get_mut(name)
            .ok_or_else(|| DrfError::ConsumerNotFound(name.to_string()))?;

        consumer.usage = consumer.usage.saturating_add(&amount);
        debug!(consumer = name, amount = %amount, usage = %consumer.usage, "Allocated");
        Ok(())
    }

    /// Record resources returned by a consumer
    pub fn release(&self, name: &str, amount: Resource) -> DrfResult<()> {
        let mut consumers = write(&self.consumers);
        let consumer = consumers
            .get_mut(name)
            .ok_or_else(|| DrfError::ConsumerNotFound(name.to_string()))?;

        consumer.usage = consumer.usage.checked_sub(&amount).ok_or_else(|| {
            DrfError::InsufficientUsage(format!(
                "{} holds {}, cannot release {}",
                name, consumer.usage, amount
            ))
        })?;
        debug!(consumer = name, amount = %amount, usage = %consumer.usage, "Released");
        Ok(())
    }

    /// Update a consumer's outstanding demand
    pub fn set_demand(&self, name: &str, demand: Resource) -> DrfResult<()> {
        let mut consumers = write(&self.consumers);
        let consumer = consumers
            .get_mut(name)
            .ok_or_else(|| DrfError::ConsumerNotFound(name.to_string()))?;
        consumer.demand = demand;
        Ok(())
    }

    /// Refresh cluster capacity, e.g. after nodes join or leave
    pub fn update_capacity(&self, capacity: Resource) -> DrfResult<()> {
        write(&self.policy).initialize(capacity)
    }

    pub fn set_enabled_resource_types(&self, enabled: EnabledResourceTypes) -> DrfResult<()> {
        write(&self.policy).set_enabled_resource_types(enabled)
    }

    pub fn capacity(&self) -> Resource {
        *read(&self.policy).capacity()
    }

    /// Copy of a single consumer
    pub fn get(&self, name: &str) -> DrfResult<Consumer> {
        read(&self.consumers)
            .get(name)
            .cloned()
            .ok_or_else(|| DrfError::ConsumerNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        read(&self.consumers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent copy of the policy configuration and every consumer
    pub fn snapshot(&self) -> DrfResult<(DrfComparator, Vec<Consumer>)> {
        let policy = read(&self.policy);
        let consumers = read(&self.consumers);
        let comparator = policy.comparator()?;
        Ok((comparator, consumers.values().cloned().collect()))
    }

    /// All consumers, the one to allocate to first at the front
    pub fn ordering(&self) -> DrfResult<Vec<Consumer>> {
        let (comparator, mut consumers) = self.snapshot()?;
        consumers.sort_by(|a, b| comparator.compare(a, b));
        Ok(consumers)
    }

    /// The consumer that should receive the next allocation
    pub fn next_consumer(&self) -> DrfResult<Option<Consumer>> {
        let (comparator, consumers) = self.snapshot()?;
        let next = consumers
            .into_iter()
            .min_by(|a, b| comparator.compare(a, b));

        if let Some(c) = &next {
            debug!(consumer = %c.name, usage = %c.usage, "Selected next consumer");
        }
        Ok(next)
    }

    /// Fair share of every consumer against the current capacity, sorted
    /// by consumer name
    pub fn fair_shares(&self) -> DrfResult<Vec<(String, Resource)>> {
        let (policy, consumers) = self.sorted_copy();
        let shares = share_pass(&policy, &consumers);
        Ok(consumers.into_iter().map(|c| c.name).zip(shares).collect())
    }

    /// Names of consumers holding more than their fair share
    pub fn over_fair_share(&self) -> DrfResult<Vec<String>> {
        let (policy, consumers) = self.sorted_copy();
        let shares = share_pass(&policy, &consumers);
        let over = consumers
            .into_iter()
            .zip(shares)
            .filter(|(c, fair)| policy.check_if_usage_over_fair_share(&c.usage, fair))
            .map(|(c, _)| c.name)
            .collect();
        Ok(over)
    }

    fn sorted_copy(&self) -> (DominantResourceFairnessPolicy, Vec<Consumer>) {
        let policy = read(&self.policy);
        let consumers = read(&self.consumers);
        let mut copy: Vec<Consumer> = consumers.values().cloned().collect();
        copy.sort_by(|a, b| a.name.cmp(&b.name));
        (policy.clone(), copy)
    }
}

fn share_pass(policy: &DominantResourceFairnessPolicy, consumers: &[Consumer]) -> Vec<Resource> {
    let refs: Vec<&dyn Schedulable> = consumers.iter().map(|c| c as &dyn Schedulable).collect();
    policy.compute_shares(&refs, policy.capacity())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
