//! drf-scheduler: Dominant Resource Fairness policy
//!
//! This crate decides which consumer receives the next allocation:
//! - Per-dimension share calculation and dominant resource selection
//! - Neediness against guaranteed minimum shares
//! - The total order used to sort or heap-order sibling consumers
//! - Weighted max-min fair share computation
//! - A snapshotting scheduler that owns consumers

pub mod comparator;
pub mod fair_share;
pub mod policy;
pub mod scheduler;
pub mod shares;

pub use comparator::{compare_shares, DrfComparator};
pub use fair_share::compute_fair_shares;
pub use policy::{DominantResourceFairnessPolicy, SchedulingPolicy};
pub use scheduler::FairScheduler;
pub use shares::{calculate_shares, min_share_ratios, ResourceOrder, ResourceShares};
