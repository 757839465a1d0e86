//! Multi-pass repair of raw clusters.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use super::bucket::{into_family_groups, smallest, Bucket};
use crate::models::{Family, Partition, PartitionConfig};

/// Repair state between passes: accepted groups plus unplaced families.
#[derive(Debug, Default)]
struct RepairState {
    groups: Vec<Bucket>,
    backlog: Vec<usize>,
}

/// Converts raw family clusters into a bounded partition.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::SmallRng;
/// use u_partition::models::{
///     group_families, AgeCategory, Competitor, EquipmentClass, Gender, PartitionConfig,
/// };
/// use u_partition::repair::ConstraintRepair;
///
/// let batch: Vec<Competitor> = (0..9)
///     .map(|i| Competitor::new(format!("{i}"), Gender::Female, AgeCategory::U21, EquipmentClass::Barebow))
///     .collect();
/// let families = group_families(&batch);
/// let config = PartitionConfig::default().with_sizes(2, 3, 3);
///
/// // One cluster holding everything: split into bounded groups.
/// let raw = vec![(0..9).collect::<Vec<usize>>()];
/// let groups = ConstraintRepair::new(&families, &config)
///     .repair(raw, &mut SmallRng::seed_from_u64(1));
/// assert!(groups.iter().all(|g| (2..=3).contains(&g.len())));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConstraintRepair<'a> {
    families: &'a [Family],
    config: &'a PartitionConfig,
}

impl<'a> ConstraintRepair<'a> {
    /// Creates a repairer over the given families.
    pub fn new(families: &'a [Family], config: &'a PartitionConfig) -> Self {
        Self { families, config }
    }

    /// Repairs raw clusters of family indices into groups of family indices.
    ///
    /// Every family index present in `clusters` appears in exactly one output
    /// group. Empty clusters are ignored.
    pub fn repair<R: Rng + ?Sized>(&self, clusters: Vec<Vec<usize>>, rng: &mut R) -> Vec<Vec<usize>> {
        let (state, oversized) = self.classify(clusters);
        let state = self.split(state, oversized, rng);
        let groups = self.redistribute(state);
        let groups = self.rebalance(groups);
        let groups = self.cleanup(groups);

        debug!(
            groups = groups.len(),
            sizes = ?groups.iter().map(|g| g.size).collect::<Vec<_>>(),
            "repair finished"
        );
        into_family_groups(groups)
    }

    /// Repairs raw clusters and materializes the partition.
    pub fn repair_partition<R: Rng + ?Sized>(
        &self,
        clusters: Vec<Vec<usize>>,
        rng: &mut R,
    ) -> Partition {
        let groups = self.repair(clusters, rng);
        Partition::from_family_groups(&groups, self.families)
    }

    fn family_size(&self, family: usize) -> usize {
        self.families[family].size()
    }

    /// Pass 1: sort clusters into kept groups, oversized clusters, and backlog.
    fn classify(&self, clusters: Vec<Vec<usize>>) -> (RepairState, Vec<Bucket>) {
        let mut state = RepairState::default();
        let mut oversized = Vec::new();

        for cluster in clusters.into_iter().filter(|c| !c.is_empty()) {
            let bucket = Bucket::from_families(cluster, self.families);
            if bucket.size > self.config.max_size {
                oversized.push(bucket);
            } else if bucket.size >= self.config.min_size
                && state.groups.len() < self.config.max_groups
            {
                state.groups.push(bucket);
            } else {
                state.backlog.extend(bucket.families);
            }
        }

        debug!(
            kept = state.groups.len(),
            oversized = oversized.len(),
            backlog = state.backlog.len(),
            "classified clusters"
        );
        (state, oversized)
    }

    /// Pass 2: cut oversized clusters into buckets of at most `max_size`.
    fn split<R: Rng + ?Sized>(
        &self,
        mut state: RepairState,
        oversized: Vec<Bucket>,
        rng: &mut R,
    ) -> RepairState {
        for cluster in oversized {
            let mut order = cluster.families;
            order.shuffle(rng);

            let mut bucket = Bucket::new();
            for family in order {
                let size = self.family_size(family);
                if !bucket.is_empty() && bucket.size + size > self.config.max_size {
                    self.close_bucket(&mut state, std::mem::take(&mut bucket));
                }
                bucket.push(family, self.families);
            }
            if !bucket.is_empty() {
                self.close_bucket(&mut state, bucket);
            }
        }
        state
    }

    /// Keeps a split bucket if it is large enough and a slot is free.
    fn close_bucket(&self, state: &mut RepairState, bucket: Bucket) {
        if bucket.size >= self.config.min_size && state.groups.len() < self.config.max_groups {
            state.groups.push(bucket);
        } else {
            state.backlog.extend(bucket.families);
        }
    }

    /// Pass 3: place every backlog family.
    fn redistribute(&self, state: RepairState) -> Vec<Bucket> {
        let RepairState {
            mut groups,
            backlog,
        } = state;
        let mut backlog: VecDeque<usize> = backlog.into();

        while let Some(family) = backlog.pop_front() {
            let size = self.family_size(family);

            if let Some(g) = self.roomiest_fit(&groups, size) {
                groups[g].push(family, self.families);
                continue;
            }

            if groups.len() < self.config.max_groups {
                let mut bucket = Bucket::with_family(family, self.families);
                while bucket.size < self.config.preferred_size {
                    let Some(&next) = backlog.front() else {
                        break;
                    };
                    if bucket.size + self.family_size(next) > self.config.max_size {
                        break;
                    }
                    backlog.pop_front();
                    bucket.push(next, self.families);
                }
                groups.push(bucket);
                continue;
            }

            match smallest(&groups) {
                Some(g) => {
                    warn!(
                        family = %self.families[family].head().id,
                        group = g,
                        size = groups[g].size + size,
                        max_size = self.config.max_size,
                        "forced placement during redistribution"
                    );
                    groups[g].push(family, self.families);
                }
                None => groups.push(Bucket::with_family(family, self.families)),
            }
        }

        groups
    }

    /// Smallest in-bounds group that can take `size` more members without
    /// exceeding `max_size`; ties go to the lowest index.
    fn roomiest_fit(&self, groups: &[Bucket], size: usize) -> Option<usize> {
        groups
            .iter()
            .enumerate()
            .filter(|(_, g)| self.config.size_in_bounds(g.size))
            .filter(|(_, g)| g.size + size <= self.config.max_size)
            .min_by_key(|(i, g)| (g.size, *i))
            .map(|(i, _)| i)
    }

    fn has_bound_violation(&self, groups: &[Bucket]) -> bool {
        groups
            .iter()
            .any(|g| !self.config.size_in_bounds(g.size))
    }

    /// Pass 4: rebuild from scratch when at the ceiling with bounds violated.
    ///
    /// Each family, largest first, goes to the opened group whose resulting
    /// size is closest to `total / max_groups` without exceeding `max_size`;
    /// ties prefer the smaller group, then the lower index. A new group is
    /// opened only when no opened group fits, and a family is forced into the
    /// smallest group only once all `max_groups` are open.
    fn rebalance(&self, groups: Vec<Bucket>) -> Vec<Bucket> {
        let max_groups = self.config.max_groups;
        if groups.len() != max_groups || !self.has_bound_violation(&groups) {
            return groups;
        }

        let total: usize = groups.iter().map(|g| g.size).sum();
        let target = total / max_groups;

        let mut order: Vec<usize> = groups.into_iter().flat_map(|g| g.families).collect();
        order.sort_unstable();
        order.sort_by(|&a, &b| self.family_size(b).cmp(&self.family_size(a)));

        let mut slots: Vec<Bucket> = Vec::with_capacity(max_groups);
        for family in order {
            let size = self.family_size(family);
            let best = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.size + size <= self.config.max_size)
                .min_by_key(|(i, s)| ((s.size + size).abs_diff(target), s.size, *i))
                .map(|(i, _)| i);

            if let Some(g) = best {
                slots[g].push(family, self.families);
                continue;
            }
            if slots.len() < max_groups {
                slots.push(Bucket::with_family(family, self.families));
                continue;
            }
            match smallest(&slots) {
                Some(g) => {
                    warn!(
                        family = %self.families[family].head().id,
                        group = g,
                        size = slots[g].size + size,
                        max_size = self.config.max_size,
                        "forced placement during rebalance"
                    );
                    slots[g].push(family, self.families);
                }
                None => slots.push(Bucket::with_family(family, self.families)),
            }
        }

        debug!(target, groups = slots.len(), "rebalanced groups");
        slots
    }

    /// Pass 5: merge undersized groups until none remain or one group is left.
    fn cleanup(&self, mut groups: Vec<Bucket>) -> Vec<Bucket> {
        groups.retain(|g| !g.is_empty());

        while groups.len() > 1 {
            let Some(small) = groups
                .iter()
                .enumerate()
                .filter(|(_, g)| g.size < self.config.min_size)
                .min_by_key(|(i, g)| (g.size, *i))
                .map(|(i, _)| i)
            else {
                break;
            };

            let small_size = groups[small].size;
            let others = || groups.iter().enumerate().filter(move |(i, _)| *i != small);
            let fitting = others()
                .filter(|(_, g)| g.size + small_size <= self.config.max_size)
                .min_by_key(|(i, g)| (g.size, *i))
                .map(|(i, _)| i);
            let target = match fitting {
                Some(t) => t,
                None => {
                    let Some(t) = others().min_by_key(|(i, g)| (g.size, *i)).map(|(i, _)| i)
                    else {
                        break;
                    };
                    warn!(
                        group = t,
                        size = groups[t].size + small_size,
                        max_size = self.config.max_size,
                        "forced merge of undersized group"
                    );
                    t
                }
            };

            let merged = groups.remove(small);
            let target = if target > small { target - 1 } else { target };
            groups[target].absorb(merged);
        }

        groups
    }
}
