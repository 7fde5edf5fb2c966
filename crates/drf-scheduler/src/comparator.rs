//! Dominant Resource Fairness ordering
//!
//! `compare(a, b) == Less` means `a` should receive the next allocation
//! before `b`.

use std::cmp::Ordering;

use drf_core::{EnabledResourceTypes, Resource, Schedulable};
use tracing::trace;

use crate::shares::{calculate_shares, min_share_ratios, ResourceOrder, ResourceShares};

/// Total order over consumers for a fixed capacity and enabled set.
///
/// Cheap to copy; build one per comparison pass from the policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrfComparator {
    capacity: Resource,
    enabled: EnabledResourceTypes,
}

impl DrfComparator {
    pub fn new(capacity: Resource, enabled: EnabledResourceTypes) -> Self {
        Self { capacity, enabled }
    }

    pub fn capacity(&self) -> &Resource {
        &self.capacity
    }

    pub fn enabled(&self) -> &EnabledResourceTypes {
        &self.enabled
    }

    /// Shares of cluster capacity and the dimension order for one consumer
    pub fn cluster_shares<S: Schedulable + ?Sized>(
        &self,
        s: &S,
    ) -> (ResourceShares, ResourceOrder) {
        calculate_shares(
            &s.resource_usage(),
            &self.capacity,
            &s.weights(),
            &self.enabled,
        )
    }

    /// A consumer is needy when it holds less than its guaranteed floor on
    /// its dominant cluster dimension
    pub fn is_needy<S: Schedulable + ?Sized>(&self, s: &S, cluster_order: &ResourceOrder) -> bool {
        let ratios = self.min_share_ratios(s);
        let needy = is_needy_with(&ratios, cluster_order);
        trace!(consumer = s.name(), needy, "Evaluated neediness");
        needy
    }

    fn min_share_ratios<S: Schedulable + ?Sized>(&self, s: &S) -> ResourceShares {
        min_share_ratios(&s.resource_usage(), &s.min_share(), &self.enabled)
    }

    pub fn compare<S: Schedulable + ?Sized>(&self, a: &S, b: &S) -> Ordering {
        let (cluster_a, order_a) = self.cluster_shares(a);
        let (cluster_b, order_b) = self.cluster_shares(b);
        let min_a = self.min_share_ratios(a);
        let min_b = self.min_share_ratios(b);

        let res = match (is_needy_with(&min_a, &order_a), is_needy_with(&min_b, &order_b)) {
            (false, false) => compare_shares(&cluster_a, &cluster_b, &order_a, &order_b),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => compare_shares(&min_a, &min_b, &order_a, &order_b),
        };

        res.then_with(|| a.start_time().cmp(&b.start_time()))
            .then_with(|| a.name().cmp(b.name()))
    }
}

fn is_needy_with(min_share_ratios: &ResourceShares, cluster_order: &ResourceOrder) -> bool {
    min_share_ratios.get(cluster_order.dominant()) < 1.0
}

/// Walk both orders in lockstep; the smaller value at the first differing
/// position sorts first
pub fn compare_shares(
    shares_a: &ResourceShares,
    shares_b: &ResourceShares,
    order_a: &ResourceOrder,
    order_b: &ResourceOrder,
) -> Ordering {
    debug_assert_eq!(order_a.len(), order_b.len());
    order_a
        .as_slice()
        .iter()
        .zip(order_b.as_slice())
        .map(|(ta, tb)| shares_a.get(*ta).total_cmp(&shares_b.get(*tb)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use drf_core::{Consumer, ResourceType, ResourceWeights};

    fn comparator(mem: u64, cpu: u64, gpu: u64) -> DrfComparator {
        DrfComparator::new(Resource::new(mem, cpu, gpu), EnabledResourceTypes::all())
    }

    fn consumer(name: &str, mem: u64, cpu: u64, gpu: u64) -> Consumer {
        Consumer::new(name)
            .with_usage(Resource::new(mem, cpu, gpu))
            .with_start_time(Utc.timestamp_opt(0, 0).unwrap())
    }

    fn with_min(c: Consumer, mem: u64, cpu: u64, gpu: u64) -> Consumer {
        c.with_min_share(Resource::new(mem, cpu, gpu))
    }

    fn weighted(c: Consumer, mem: f64, cpu: f64, gpu: f64) -> Consumer {
        c.with_weights(ResourceWeights::new(mem, cpu, gpu).unwrap())
    }

    #[test]
    fn test_same_dominant_resource() {
        let cmp = comparator(8000, 4, 4);
        let a = consumer("a", 1000, 1, 1);
        let b = consumer("b", 2000, 1, 1);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_different_dominant_resource() {
        let cmp = comparator(8000, 8, 8);
        let a = consumer("a", 4000, 3, 3);
        let b = consumer("b", 2000, 5, 5);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_one_is_needy() {
        let cmp = comparator(8000, 8, 8);
        let a = with_min(consumer("a", 2000, 5, 1), 0, 6, 0);
        let b = with_min(consumer("b", 4000, 3, 1), 0, 0, 0);

        let (_, order_a) = cmp.cluster_shares(&a);
        let (_, order_b) = cmp.cluster_shares(&b);
        assert!(cmp.is_needy(&a, &order_a));
        assert!(!cmp.is_needy(&b, &order_b));
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
        assert_eq!(cmp.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_both_are_needy() {
        let cmp = comparator(8000, 100, 100);
        // dominant shares 0.25 vs 0.5, neither has a floor
        let a = consumer("a", 2000, 5, 5);
        let b = consumer("b", 4000, 3, 3);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);

        // dominant min share ratios 2/3 vs 4/5
        let a = with_min(consumer("a", 2000, 5, 1), 3000, 6, 6);
        let b = with_min(consumer("b", 4000, 3, 1), 5000, 4, 4);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_both_needy_secondary_ratio_decides() {
        let cmp = comparator(8000, 100, 100);
        // memory dominates both; min share ratios tie at 0.5 there, cpu 0.5 vs 0.2
        let a = with_min(consumer("a", 2000, 5, 1), 4000, 10, 4);
        let b = with_min(consumer("b", 2000, 2, 1), 4000, 10, 4);
        assert_eq!(cmp.compare(&a, &b), Ordering::Greater);
        assert_eq!(cmp.compare(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_both_needy_walk_own_orders() {
        let cmp = comparator(8000, 100, 100);
        // a: order [cpu, memory, gpu]; b: order [memory, cpu, gpu]
        let a = with_min(consumer("a", 1000, 50, 1), 2000, 100, 4);
        let b = with_min(consumer("b", 4000, 5, 1), 8000, 25, 4);
        assert_eq!(cmp.cluster_shares(&a).1.dominant(), ResourceType::Cpu);
        assert_eq!(cmp.cluster_shares(&b).1.dominant(), ResourceType::Memory);

        // position 0 ties at 0.5; position 1 compares a's memory 0.5 with b's cpu 0.2
        assert_eq!(cmp.compare(&a, &b), Ordering::Greater);
        assert_eq!(cmp.compare(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_even_weights_same_dominant_resource() {
        let cmp = comparator(8000, 8, 20);
        let a = weighted(consumer("a", 3000, 1, 2), 2.0, 2.0, 2.0);
        let b = consumer("b", 2000, 1, 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);

        let a = weighted(consumer("a", 1000, 3, 6), 2.0, 2.0, 2.0);
        let b = consumer("b", 1000, 2, 4);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_even_weights_different_dominant_resource() {
        let cmp = comparator(8000, 8, 20);
        let a = weighted(consumer("a", 1000, 3, 6), 2.0, 2.0, 2.0);
        let b = consumer("b", 2000, 1, 1);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);

        let cmp = comparator(8000, 8, 8);
        let a = weighted(consumer("a", 3000, 1, 1), 2.0, 2.0, 2.0);
        let b = consumer("b", 1000, 2, 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_uneven_weights_same_dominant_resource() {
        let cmp = comparator(8000, 8, 8);
        let a = weighted(consumer("a", 3000, 1, 1), 3.0, 2.0, 1.0);
        let b = consumer("b", 2000, 1, 1);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);

        let a = weighted(consumer("a", 1000, 3, 3), 1.0, 2.0, 3.0);
        let b = consumer("b", 1000, 2, 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_uneven_weights_different_dominant_resource() {
        let cmp = comparator(8000, 8, 8);
        let a = weighted(consumer("a", 1000, 3, 3), 1.0, 2.0, 3.0);
        let b = consumer("b", 2000, 1, 1);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);

        let a = weighted(consumer("a", 3000, 1, 1), 3.0, 2.0, 1.0);
        let b = consumer("b", 1000, 2, 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_reflexive() {
        let cmp = comparator(8000, 8, 8);
        let a = with_min(consumer("a", 2000, 5, 1), 0, 6, 0);
        assert_eq!(cmp.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_antisymmetric() {
        let cmp = comparator(8000, 8, 8);
        let consumers = [
            consumer("a", 1000, 1, 1),
            consumer("b", 4000, 3, 3),
            with_min(consumer("c", 2000, 5, 1), 0, 6, 0),
            weighted(consumer("d", 3000, 1, 1), 3.0, 2.0, 1.0),
            consumer("e", 1000, 1, 1),
        ];
        for x in &consumers {
            for y in &consumers {
                assert_eq!(cmp.compare(x, y), cmp.compare(y, x).reverse());
            }
        }
    }

    #[test]
    fn test_secondary_dimension_breaks_dominant_tie() {
        let cmp = comparator(100, 100, 100);
        // both dominated by memory at 0.5; a holds less cpu
        let a = consumer("a", 50, 10, 40);
        let b = consumer("b", 50, 20, 0);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_needy_first_regardless_of_share() {
        let cmp = comparator(100, 100, 100);
        let needy = with_min(consumer("needy", 90, 10, 10), 95, 0, 0);
        let idle = consumer("idle", 0, 0, 0);
        assert_eq!(cmp.compare(&needy, &idle), Ordering::Less);
    }

    #[test]
    fn test_zero_min_share_never_needy() {
        let cmp = comparator(100, 100, 100);
        for usage in [(0, 0, 0), (1, 0, 0), (50, 60, 70)] {
            let c = consumer("c", usage.0, usage.1, usage.2);
            let (_, order) = cmp.cluster_shares(&c);
            assert!(!cmp.is_needy(&c, &order));
        }
    }

    #[test]
    fn test_neediness_only_checks_dominant_dimension() {
        let cmp = comparator(100, 100, 100);
        // below floor on gpu, but memory dominates
        let c = with_min(consumer("c", 50, 0, 1), 0, 0, 10);
        let (_, order) = cmp.cluster_shares(&c);
        assert_eq!(order.dominant(), ResourceType::Memory);
        assert!(!cmp.is_needy(&c, &order));
    }

    #[test]
    fn test_weight_on_dominant_dimension_improves_position() {
        let cmp = comparator(8000, 8, 8);
        let a = consumer("a", 4000, 1, 1);
        let b = consumer("b", 3000, 1, 1);
        assert_eq!(cmp.compare(&a, &b), Ordering::Greater);

        let (before, _) = cmp.cluster_shares(&a);
        let a = weighted(a, 2.0, 1.0, 1.0);
        let (after, _) = cmp.cluster_shares(&a);
        assert!(after.get(ResourceType::Memory) < before.get(ResourceType::Memory));
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_start_time_breaks_exact_ties() {
        let cmp = comparator(8000, 8, 8);
        let early = consumer("z", 1000, 1, 1).with_start_time(Utc.timestamp_opt(10, 0).unwrap());
        let late = consumer("a", 1000, 1, 1).with_start_time(Utc.timestamp_opt(20, 0).unwrap());
        assert_eq!(cmp.compare(&early, &late), Ordering::Less);
    }

    #[test]
    fn test_name_breaks_remaining_ties() {
        let cmp = comparator(8000, 8, 8);
        let a = consumer("a", 1000, 1, 1);
        let b = consumer("b", 1000, 1, 1);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
        assert_eq!(cmp.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_disabled_dimension_ignored() {
        let enabled =
            EnabledResourceTypes::from_types([ResourceType::Memory, ResourceType::Cpu]).unwrap();
        let cmp = DrfComparator::new(Resource::new(100, 100, 10), enabled);
        // a would lose on gpu if it counted
        let a = consumer("a", 10, 10, 9);
        let b = consumer("b", 20, 10, 0);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_sort_by_comparator() {
        let cmp = comparator(8000, 8, 8);
        let mut consumers = vec![
            consumer("big", 4000, 4, 4),
            with_min(consumer("guaranteed", 2000, 5, 1), 0, 6, 0),
            consumer("small", 1000, 1, 1),
        ];
        consumers.sort_by(|x, y| cmp.compare(x, y));
        let names: Vec<_> = consumers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["guaranteed", "small", "big"]);
    }
}
