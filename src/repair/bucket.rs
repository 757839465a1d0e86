//! Working group representation shared by the repair passes and the packer.

use crate::models::Family;

/// A group under construction: family indices plus a cached member count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub families: Vec<usize>,
    pub size: usize,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family(family: usize, families: &[Family]) -> Self {
        let mut bucket = Self::new();
        bucket.push(family, families);
        bucket
    }

    pub fn from_families(indices: Vec<usize>, families: &[Family]) -> Self {
        let size = indices.iter().map(|&f| families[f].size()).sum();
        Self {
            families: indices,
            size,
        }
    }

    pub fn push(&mut self, family: usize, families: &[Family]) {
        self.size += families[family].size();
        self.families.push(family);
    }

    pub fn absorb(&mut self, other: Bucket) {
        self.size += other.size;
        self.families.extend(other.families);
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// Index of the smallest bucket; ties go to the lowest index.
pub(crate) fn smallest(buckets: &[Bucket]) -> Option<usize> {
    buckets
        .iter()
        .enumerate()
        .min_by_key(|(i, b)| (b.size, *i))
        .map(|(i, _)| i)
}

/// Strips buckets down to their family index lists, dropping empty ones.
pub(crate) fn into_family_groups(buckets: Vec<Bucket>) -> Vec<Vec<usize>> {
    buckets
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(|b| b.families)
        .collect()
}
