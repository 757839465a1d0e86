//! Marginal-score greedy packer.

use tracing::{debug, warn};

use crate::models::{Competitor, Family, Partition, PartitionConfig};
use crate::repair::{into_family_groups, smallest, Bucket};
use crate::scoring::GroupScore;

/// Greedy group builder with per-group score lookahead.
///
/// Deterministic: the same families and configuration always produce the
/// same groups.
///
/// # Example
///
/// ```
/// use u_partition::greedy::GreedyPacker;
/// use u_partition::models::{
///     group_families, AgeCategory, Competitor, EquipmentClass, Gender, PartitionConfig,
/// };
///
/// let batch: Vec<Competitor> = (0..8)
///     .map(|i| Competitor::new(format!("{i}"), Gender::Male, AgeCategory::Senior, EquipmentClass::Recurve))
///     .collect();
/// let families = group_families(&batch);
/// let config = PartitionConfig::default().with_sizes(2, 4, 4);
///
/// let partition = GreedyPacker::new().pack_partition(&families, &config);
/// assert_eq!(partition.sizes(), vec![4, 4]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GreedyPacker;

impl GreedyPacker {
    /// Creates a new packer.
    pub fn new() -> Self {
        Self
    }

    /// Packs families into groups of family indices.
    ///
    /// Every family appears in exactly one group and the group count never
    /// exceeds `max_groups`.
    pub fn pack(&self, families: &[Family], config: &PartitionConfig) -> Vec<Vec<usize>> {
        let mut backlog: Vec<usize> = (0..families.len()).collect();
        let mut groups: Vec<Bucket> = Vec::new();

        while groups.len() < config.max_groups && !backlog.is_empty() {
            let group = fill_group(families, config, &mut backlog);
            if group.is_empty() {
                break;
            }
            groups.push(group);
        }

        debug!(
            groups = groups.len(),
            leftovers = backlog.len(),
            "greedy main pass finished"
        );

        for family in backlog {
            place_leftover(family, families, config, &mut groups);
        }

        into_family_groups(groups)
    }

    /// Packs families and materializes the partition.
    pub fn pack_partition(&self, families: &[Family], config: &PartitionConfig) -> Partition {
        let groups = self.pack(families, config);
        Partition::from_family_groups(&groups, families)
    }
}

impl Default for GreedyPacker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fills one group from the backlog until no remaining family fits.
fn fill_group(families: &[Family], config: &PartitionConfig, backlog: &mut Vec<usize>) -> Bucket {
    let mut group = Bucket::new();
    let mut members: Vec<&Competitor> = Vec::new();

    while let Some(pos) = best_candidate(families, config, backlog, &group, &members) {
        let family = backlog.remove(pos);
        members.extend(families[family].members());
        group.push(family, families);
    }

    group
}

/// Backlog position of the family whose addition scores highest.
fn best_candidate(
    families: &[Family],
    config: &PartitionConfig,
    backlog: &[usize],
    group: &Bucket,
    members: &[&Competitor],
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (pos, &family) in backlog.iter().enumerate() {
        let candidate = &families[family];
        if group.size + candidate.size() > config.max_size {
            continue;
        }
        let score = GroupScore::calculate(
            members.iter().copied().chain(candidate.members()),
            config,
        )
        .weighted_total(config);

        // strict: earlier backlog entries win ties
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((pos, score));
        }
    }

    best.map(|(pos, _)| pos)
}

/// Closeness of `size` to the preferred size plus the space left under
/// `max_size`.
fn placement_score(size: usize, config: &PartitionConfig) -> f64 {
    let closeness = (10.0 - 2.0 * size.abs_diff(config.preferred_size) as f64).max(0.0);
    let space = config.max_size.saturating_sub(size) as f64;
    closeness + space
}

/// Places a family left over after the main pass.
fn place_leftover(
    family: usize,
    families: &[Family],
    config: &PartitionConfig,
    groups: &mut Vec<Bucket>,
) {
    let size = families[family].size();

    let mut best: Option<(usize, f64)> = None;
    for (i, group) in groups.iter().enumerate() {
        let resulting = group.size + size;
        if resulting > config.max_size {
            continue;
        }
        let score = placement_score(resulting, config);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((i, score));
        }
    }

    if let Some((g, _)) = best {
        groups[g].push(family, families);
    } else if groups.len() < config.max_groups {
        groups.push(Bucket::with_family(family, families));
    } else if let Some(g) = smallest(groups) {
        warn!(
            family = %families[family].head().id,
            group = g,
            size = groups[g].size + size,
            max_size = config.max_size,
            "forced placement of leftover family"
        );
        groups[g].push(family, families);
    } else {
        groups.push(Bucket::with_family(family, families));
    }
}
