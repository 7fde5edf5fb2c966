//! Share calculation
//!
//! A share is usage normalized by capacity and weight. The dimension order
//! returned alongside the shares puts the dominant dimension first and leaves
//! the remaining enabled dimensions in declaration order, except for the one
//! that was swapped out of position 0. Tie-breaking walks this order, so it
//! must not be replaced by a full sort.

use drf_core::{EnabledResourceTypes, Resource, ResourceType, ResourceWeights};
use tracing::trace;

/// Normalized share per resource dimension
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceShares {
    values: [f64; ResourceType::COUNT],
}

impl ResourceShares {
    pub fn get(&self, resource_type: ResourceType) -> f64 {
        self.values[resource_type.index()]
    }

    fn set(&mut self, resource_type: ResourceType, value: f64) {
        self.values[resource_type.index()] = value;
    }
}

/// Enabled dimensions with the dominant one at position 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOrder {
    types: [ResourceType; ResourceType::COUNT],
    len: usize,
}

impl ResourceOrder {
    fn declaration(enabled: &EnabledResourceTypes) -> Self {
        let mut types = ResourceType::ALL;
        let mut len = 0;
        for t in enabled.iter() {
            types[len] = t;
            len += 1;
        }
        Self { types, len }
    }

    /// The dominant dimension
    pub fn dominant(&self) -> ResourceType {
        self.types[0]
    }

    pub fn as_slice(&self) -> &[ResourceType] {
        &self.types[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Compute `usage / (capacity * weight)` for every enabled dimension.
///
/// A dimension with zero capacity has share 0. The dominant dimension is the
/// first one reaching the maximum share; it is swapped into position 0 of the
/// returned order.
pub fn calculate_shares(
    usage: &Resource,
    capacity: &Resource,
    weights: &ResourceWeights,
    enabled: &EnabledResourceTypes,
) -> (ResourceShares, ResourceOrder) {
    debug_assert!(!enabled.is_empty(), "enabled resource set must not be empty");

    let mut shares = ResourceShares::default();
    let mut order = ResourceOrder::declaration(enabled);

    let mut max_index = 0;
    let mut max_share = 0.0;
    for (i, t) in order.as_slice().iter().copied().enumerate() {
        debug_assert!(weights.get(t) > 0.0, "weight for {} must be positive", t);
        let pool = capacity.get(t) as f64 * weights.get(t);
        let share = if pool > 0.0 {
            usage.get(t) as f64 / pool
        } else {
            0.0
        };
        shares.set(t, share);
        if share > max_share {
            max_share = share;
            max_index = i;
        }
    }
    order.types.swap(0, max_index);

    trace!(
        usage = %usage,
        dominant = %order.dominant(),
        share = max_share,
        "Calculated shares"
    );

    (shares, order)
}

/// Usage relative to the guaranteed floor for every enabled dimension.
///
/// A zero floor is trivially met, so its ratio is 1.0.
pub fn min_share_ratios(
    usage: &Resource,
    min_share: &Resource,
    enabled: &EnabledResourceTypes,
) -> ResourceShares {
    let mut ratios = ResourceShares::default();
    for t in enabled.iter() {
        let floor = min_share.get(t);
        let ratio = if floor > 0 {
            usage.get(t) as f64 / floor as f64
        } else {
            1.0
        };
        ratios.set(t, ratio);
    }
    ratios
}
