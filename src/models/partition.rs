//! Partition (solution) model.
//!
//! A partition is an ordered list of groups covering every competitor
//! exactly once. Heuristic fallbacks may leave a group outside the size
//! bounds; such residual problems are reported as violations rather than
//! raised as errors.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{group_families, Competitor, Family, PartitionConfig};

/// One output bucket of a partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group members, whole families only.
    pub members: Vec<Competitor>,
}

impl Group {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every member of a family.
    pub fn add_family(&mut self, family: &Family) {
        self.members.extend(family.members().iter().cloned());
    }

    /// Number of members.
    #[inline]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether a competitor with this ID is in the group.
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Member IDs in group order.
    pub fn ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }
}

/// A complete partition of a competitor batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Groups in output order.
    pub groups: Vec<Group>,
}

/// A residual constraint violation in a partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Offending group index, or competitor ID for family violations.
    pub subject: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of partition violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Group smaller than `min_size`.
    GroupTooSmall,
    /// Group larger than `max_size`.
    GroupTooLarge,
    /// More groups than `max_groups`.
    TooManyGroups,
    /// A family's members are spread over several groups.
    SplitFamily,
}

impl Violation {
    /// Creates an undersized-group violation.
    pub fn group_too_small(group_index: usize, size: usize, min_size: usize) -> Self {
        Self {
            violation_type: ViolationType::GroupTooSmall,
            subject: group_index.to_string(),
            message: format!("Group {group_index} has {size} members, minimum is {min_size}"),
            severity: 40,
        }
    }

    /// Creates an oversized-group violation.
    pub fn group_too_large(group_index: usize, size: usize, max_size: usize) -> Self {
        Self {
            violation_type: ViolationType::GroupTooLarge,
            subject: group_index.to_string(),
            message: format!("Group {group_index} has {size} members, maximum is {max_size}"),
            severity: 60,
        }
    }

    /// Creates a group-count violation.
    pub fn too_many_groups(count: usize, max_groups: usize) -> Self {
        Self {
            violation_type: ViolationType::TooManyGroups,
            subject: count.to_string(),
            message: format!("{count} groups exceed the limit of {max_groups}"),
            severity: 80,
        }
    }

    /// Creates a split-family violation.
    pub fn split_family(head_id: impl Into<String>, group_count: usize) -> Self {
        let head_id = head_id.into();
        Self {
            message: format!("Family of '{head_id}' is spread over {group_count} groups"),
            violation_type: ViolationType::SplitFamily,
            subject: head_id,
            severity: 100,
        }
    }
}

impl Partition {
    /// Creates an empty partition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a partition from groups of family indices, dropping empty groups.
    pub(crate) fn from_family_groups(groups: &[Vec<usize>], families: &[Family]) -> Self {
        let groups = groups
            .iter()
            .filter(|g| !g.is_empty())
            .map(|indices| {
                let mut group = Group::new();
                for &f in indices {
                    group.add_family(&families[f]);
                }
                group
            })
            .collect();
        Self { groups }
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of competitors across all groups.
    pub fn entity_count(&self) -> usize {
        self.groups.iter().map(Group::size).sum()
    }

    /// Whether the partition has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group sizes in order.
    pub fn sizes(&self) -> Vec<usize> {
        self.groups.iter().map(Group::size).collect()
    }

    /// Index of the group holding the given competitor.
    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(id))
    }

    /// Whether every listed competitor is in the same group.
    pub fn co_located(&self, ids: &[&str]) -> bool {
        let mut indices = ids.iter().map(|id| self.group_of(id));
        match indices.next() {
            Some(Some(first)) => indices.all(|i| i == Some(first)),
            _ => false,
        }
    }

    /// Residual violations against the configuration.
    ///
    /// An empty list means every group is within bounds, the group count
    /// respects the ceiling, and no family is split.
    pub fn violations(&self, config: &PartitionConfig) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (i, group) in self.groups.iter().enumerate() {
            let size = group.size();
            if size < config.min_size {
                violations.push(Violation::group_too_small(i, size, config.min_size));
            } else if size > config.max_size {
                violations.push(Violation::group_too_large(i, size, config.max_size));
            }
        }

        if self.groups.len() > config.max_groups {
            violations.push(Violation::too_many_groups(self.groups.len(), config.max_groups));
        }

        let location: HashMap<&str, usize> = self
            .groups
            .iter()
            .enumerate()
            .flat_map(|(i, g)| g.members.iter().map(move |m| (m.id.as_str(), i)))
            .collect();
        let everyone: Vec<Competitor> = self
            .groups
            .iter()
            .flat_map(|g| g.members.iter().cloned())
            .collect();
        for family in group_families(&everyone) {
            let spread: BTreeSet<usize> = family
                .members()
                .iter()
                .filter_map(|m| location.get(m.id.as_str()).copied())
                .collect();
            if spread.len() > 1 {
                violations.push(Violation::split_family(&family.head().id, spread.len()));
            }
        }

        violations
    }
}
