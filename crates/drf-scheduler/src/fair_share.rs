//! Weighted max-min fair share computation
//!
//! For each dimension, finds the weight-to-resource ratio `R` at which
//! `Σ clamp(weight * R, min_share, cap)` uses up the available capacity, where
//! `cap` is the smaller of a consumer's max share and its demand. `R` is
//! bracketed by doubling and then refined by bisection from below, so the
//! integer shares never add up to more than the target. Units lost to
//! truncation are handed out one round at a time in consumer-name order.

use drf_core::{EnabledResourceTypes, Resource, ResourceType, Schedulable};
use tracing::debug;

const COMPUTE_FAIR_SHARES_ITERATIONS: usize = 25;

/// Fair share of every consumer, in input order
pub fn compute_fair_shares<S: Schedulable + ?Sized>(
    schedulables: &[&S],
    total: &Resource,
    enabled: &EnabledResourceTypes,
) -> Vec<Resource> {
    let mut shares = vec![Resource::none(); schedulables.len()];
    if schedulables.is_empty() {
        return shares;
    }

    let mut by_name: Vec<usize> = (0..schedulables.len()).collect();
    by_name.sort_by(|&a, &b| schedulables[a].name().cmp(schedulables[b].name()));

    for t in enabled.iter() {
        let caps: Vec<u64> = schedulables.iter().map(|s| reachable_cap(*s, t)).collect();
        let target = total.get(t).min(sum(&caps));

        let ratio = weight_to_resource_ratio(schedulables, target, t);
        let mut dim: Vec<u64> = schedulables
            .iter()
            .map(|s| compute_share(*s, ratio, t))
            .collect();
        let remainder = target.saturating_sub(sum(&dim));
        distribute_remainder(&mut dim, &caps, &by_name, remainder);

        for (share, value) in shares.iter_mut().zip(dim) {
            share.set(t, value);
        }
        debug!(resource = %t, ratio, remainder, "Computed fair shares");
    }

    shares
}

/// Largest ratio whose shares do not exceed `target`
fn weight_to_resource_ratio<S: Schedulable + ?Sized>(
    schedulables: &[&S],
    target: u64,
    t: ResourceType,
) -> f64 {
    let mut right = 1.0;
    while resource_used_with_ratio(right, schedulables, t) < target && right.is_finite() {
        right *= 2.0;
    }
    if !right.is_finite() {
        return f64::MAX;
    }

    let mut left = 0.0;
    for _ in 0..COMPUTE_FAIR_SHARES_ITERATIONS {
        let mid = (left + right) / 2.0;
        let used = resource_used_with_ratio(mid, schedulables, t);
        if used == target {
            return mid;
        } else if used < target {
            left = mid;
        } else {
            right = mid;
        }
    }
    left
}

/// Give truncated units back round-robin, never past a consumer's cap
fn distribute_remainder(shares: &mut [u64], caps: &[u64], order: &[usize], mut remainder: u64) {
    while remainder > 0 {
        let open: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&i| shares[i] < caps[i])
            .collect();
        if open.is_empty() {
            break;
        }

        let per_consumer = (remainder / open.len() as u64).max(1);
        for i in open {
            if remainder == 0 {
                break;
            }
            let give = per_consumer.min(caps[i] - shares[i]).min(remainder);
            shares[i] += give;
            remainder -= give;
        }
    }
}

fn resource_used_with_ratio<S: Schedulable + ?Sized>(
    ratio: f64,
    schedulables: &[&S],
    t: ResourceType,
) -> u64 {
    schedulables
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(compute_share(*s, ratio, t)))
}

fn sum(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

fn cap<S: Schedulable + ?Sized>(s: &S, t: ResourceType) -> u64 {
    s.max_share().get(t).min(s.demand().get(t))
}

/// The cap as `compute_share` can actually reach it after the float round trip
fn reachable_cap<S: Schedulable + ?Sized>(s: &S, t: ResourceType) -> u64 {
    cap(s, t) as f64 as u64
}

fn compute_share<S: Schedulable + ?Sized>(s: &S, ratio: f64, t: ResourceType) -> u64 {
    let share = s.weights().get(t) * ratio;
    let share = share.max(s.min_share().get(t) as f64);
    let share = share.min(cap(s, t) as f64);
    // float to int casts saturate
    share as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use drf_core::{Consumer, ResourceWeights};

    fn shares_of(consumers: &[Consumer], total: Resource) -> Vec<Resource> {
        let refs: Vec<&Consumer> = consumers.iter().collect();
        compute_fair_shares(&refs, &total, &EnabledResourceTypes::all())
    }

    #[test]
    fn test_equal_weights_split_evenly() {
        let consumers = vec![Consumer::new("a"), Consumer::new("b")];
        let shares = shares_of(&consumers, Resource::new(8000, 8, 0));
        assert_eq!(shares[0], Resource::new(4000, 4, 0));
        assert_eq!(shares[1], Resource::new(4000, 4, 0));
    }

    #[test]
    fn test_weights_skew_split() {
        let consumers = vec![
            Consumer::new("a").with_weights(ResourceWeights::uniform(3.0).unwrap()),
            Consumer::new("b"),
        ];
        let shares = shares_of(&consumers, Resource::new(8000, 8, 0));
        assert_eq!(shares[0].memory(), 6000);
        assert_eq!(shares[1].memory(), 2000);
        assert_eq!(shares[0].cpu(), 6);
        assert_eq!(shares[1].cpu(), 2);
    }

    #[test]
    fn test_demand_caps_and_surplus_redistributes() {
        let consumers = vec![
            Consumer::new("small").with_demand(Resource::new(1000, 1, 0)),
            Consumer::new("large"),
        ];
        let shares = shares_of(&consumers, Resource::new(8000, 8, 0));
        assert_eq!(shares[0], Resource::new(1000, 1, 0));
        assert_eq!(shares[1], Resource::new(7000, 7, 0));
    }

    #[test]
    fn test_min_share_is_honoured() {
        let consumers = vec![
            Consumer::new("guaranteed").with_min_share(Resource::new(6000, 0, 0)),
            Consumer::new("b"),
            Consumer::new("c"),
        ];
        let shares = shares_of(&consumers, Resource::new(9000, 0, 0));
        assert_eq!(shares[0].memory(), 6000);
        assert_eq!(shares[1].memory(), 1500);
        assert_eq!(shares[2].memory(), 1500);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let consumers = vec![
            Consumer::new("a").with_max_share(Resource::new(500, 1, 1)),
            Consumer::new("b").with_max_share(Resource::new(700, 2, 1)),
        ];
        let shares = shares_of(&consumers, Resource::new(8000, 8, 8));
        assert_eq!(shares[0], Resource::new(500, 1, 1));
        assert_eq!(shares[1], Resource::new(700, 2, 1));
    }

    #[test]
    fn test_disabled_dimension_left_zero() {
        let consumers = vec![Consumer::new("a")];
        let refs: Vec<&Consumer> = consumers.iter().collect();
        let enabled = EnabledResourceTypes::from_types([ResourceType::Memory]).unwrap();
        let shares = compute_fair_shares(&refs, &Resource::new(100, 100, 100), &enabled);
        assert_eq!(shares[0], Resource::new(100, 0, 0));
    }

    #[test]
    fn test_uneven_split_stays_within_capacity() {
        let consumers = vec![Consumer::new("c"), Consumer::new("a"), Consumer::new("b")];
        let shares = shares_of(&consumers, Resource::new(10, 0, 0));
        let total: u64 = shares.iter().map(|s| s.memory()).sum();
        assert_eq!(total, 10);
        // the leftover unit goes to the first consumer by name
        assert_eq!(shares[0].memory(), 3);
        assert_eq!(shares[1].memory(), 4);
        assert_eq!(shares[2].memory(), 3);
    }

    #[test]
    fn test_remainder_respects_caps() {
        let consumers = vec![
            Consumer::new("a").with_max_share(Resource::new(1, 1, 1)),
            Consumer::new("b").with_max_share(Resource::new(2, 2, 2)),
        ];
        let shares = shares_of(&consumers, Resource::new(8, 8, 8));
        assert_eq!(shares[0], Resource::new(1, 1, 1));
        assert_eq!(shares[1], Resource::new(2, 2, 2));
    }

    #[test]
    fn test_cap_beyond_float_precision_terminates() {
        let demand = (1u64 << 53) + 1;
        let consumers = vec![Consumer::new("a").with_demand(Resource::new(demand, 0, 0))];
        let shares = shares_of(&consumers, Resource::new(u64::MAX, 0, 0));
        assert!(shares[0].memory() <= demand);
        assert!(shares[0].memory() >= demand - 1);
    }

    #[test]
    fn test_no_consumers() {
        let shares = shares_of(&[], Resource::new(100, 100, 100));
        assert!(shares.is_empty());
    }
}
