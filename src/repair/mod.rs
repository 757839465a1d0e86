//! Constraint repair.
//!
//! Turns raw clusters, which ignore size bounds, into groups that satisfy
//! `[min_size, max_size]` and the `max_groups` ceiling. Families are moved
//! whole in every pass.
//!
//! # Passes
//!
//! 1. **Classify**: keep in-bounds clusters, mark oversized ones for
//!    splitting, dissolve undersized ones into the backlog.
//! 2. **Split**: shuffle an oversized cluster and cut it into buckets no
//!    larger than `max_size`; short buckets go to the backlog.
//! 3. **Redistribute**: drop backlog families into groups with room, open
//!    new groups while under the ceiling, force into the smallest group
//!    otherwise.
//! 4. **Rebalance**: at the ceiling with bounds still violated, rebuild all
//!    groups around `total / max_groups`, largest families first.
//! 5. **Cleanup**: merge undersized groups into the smallest partner.
//!
//! The group count never exceeds `max_groups` and no family is ever split.
//! Size bounds are best effort: forced placements in passes 3 to 5 accept a
//! violation rather than fail, and log a warning when they do.

mod bucket;
mod repairer;

pub(crate) use bucket::{into_family_groups, smallest, Bucket};
pub use repairer::ConstraintRepair;
