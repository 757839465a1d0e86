//! Feature encoding and distance model.
//!
//! Turns competitors and families into numeric vectors for clustering.
//! The vector is a concatenation of one-hot segments plus a guardian flag:
//!
//! ```text
//! [ gender one-hot | age one-hot | equipment one-hot | has_guardian ]
//! ```
//!
//! Segment vocabularies are the distinct values observed in the current
//! batch, in order of first appearance, so the dimension adapts to the
//! input instead of spanning every possible category.
//!
//! A family's vector is the coordinate-wise mean of its members' vectors.

use std::ops::Range;

use crate::models::{AgeCategory, Competitor, EquipmentClass, Family, Gender, ScoreWeights};

/// A dense feature vector.
pub type FeatureVector = Vec<f64>;

/// Which part of the feature vector a coordinate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Gender,
    Age,
    Equipment,
    Guardian,
}

/// Coordinate ranges of each segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLayout {
    pub gender: Range<usize>,
    pub age: Range<usize>,
    pub equipment: Range<usize>,
    /// Index of the guardian flag (last coordinate).
    pub guardian: usize,
}

impl SegmentLayout {
    /// Total vector length.
    pub fn dimension(&self) -> usize {
        self.guardian + 1
    }

    /// Segment of a coordinate.
    pub fn segment_of(&self, index: usize) -> Segment {
        if self.gender.contains(&index) {
            Segment::Gender
        } else if self.age.contains(&index) {
            Segment::Age
        } else if self.equipment.contains(&index) {
            Segment::Equipment
        } else {
            Segment::Guardian
        }
    }

    /// Per-coordinate weights; the guardian flag is unweighted.
    pub fn coordinate_weights(&self, weights: &ScoreWeights) -> Vec<f64> {
        (0..self.dimension())
            .map(|i| match self.segment_of(i) {
                Segment::Gender => weights.gender,
                Segment::Age => weights.age,
                Segment::Equipment => weights.equipment,
                Segment::Guardian => 1.0,
            })
            .collect()
    }
}

/// Batch-specific encoder.
///
/// # Example
/// ```
/// use u_partition::features::FeatureSpace;
/// use u_partition::models::{AgeCategory, Competitor, EquipmentClass, Gender};
///
/// let batch = vec![
///     Competitor::new("a", Gender::Male, AgeCategory::U15, EquipmentClass::Recurve),
///     Competitor::new("b", Gender::Female, AgeCategory::U15, EquipmentClass::Compound)
///         .with_guardian("a"),
/// ];
/// let space = FeatureSpace::from_batch(&batch);
/// // 2 genders + 1 age + 2 equipment + guardian flag
/// assert_eq!(space.dimension(), 6);
/// assert_eq!(space.encode(&batch[1]), vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    genders: Vec<Gender>,
    ages: Vec<AgeCategory>,
    equipment: Vec<EquipmentClass>,
    layout: SegmentLayout,
}

impl FeatureSpace {
    /// Builds the vocabulary from the values present in `batch`.
    pub fn from_batch(batch: &[Competitor]) -> Self {
        let mut genders = Vec::new();
        let mut ages = Vec::new();
        let mut equipment = Vec::new();
        for c in batch {
            push_unique(&mut genders, c.gender);
            push_unique(&mut ages, c.age_category);
            push_unique(&mut equipment, c.equipment_class);
        }

        let gender_end = genders.len();
        let age_end = gender_end + ages.len();
        let equipment_end = age_end + equipment.len();
        let layout = SegmentLayout {
            gender: 0..gender_end,
            age: gender_end..age_end,
            equipment: age_end..equipment_end,
            guardian: equipment_end,
        };

        Self {
            genders,
            ages,
            equipment,
            layout,
        }
    }

    /// Builds the vocabulary from every member of every family.
    pub fn from_families(families: &[Family]) -> Self {
        let batch: Vec<Competitor> = families
            .iter()
            .flat_map(|f| f.members().iter().cloned())
            .collect();
        Self::from_batch(&batch)
    }

    /// Segment layout.
    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    /// Vector length.
    pub fn dimension(&self) -> usize {
        self.layout.dimension()
    }

    /// Encodes one competitor.
    ///
    /// Values absent from the batch vocabulary leave their segment all-zero.
    pub fn encode(&self, competitor: &Competitor) -> FeatureVector {
        let mut v = vec![0.0; self.dimension()];
        if let Some(i) = self.genders.iter().position(|&g| g == competitor.gender) {
            v[self.layout.gender.start + i] = 1.0;
        }
        if let Some(i) = self.ages.iter().position(|&a| a == competitor.age_category) {
            v[self.layout.age.start + i] = 1.0;
        }
        if let Some(i) = self
            .equipment
            .iter()
            .position(|&e| e == competitor.equipment_class)
        {
            v[self.layout.equipment.start + i] = 1.0;
        }
        if competitor.has_guardian() {
            v[self.layout.guardian] = 1.0;
        }
        v
    }

    /// Encodes a family as the mean of its members' vectors.
    pub fn encode_family(&self, family: &Family) -> FeatureVector {
        let vectors: Vec<FeatureVector> = family.members().iter().map(|m| self.encode(m)).collect();
        mean(&vectors, self.dimension())
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Coordinate-wise mean. Returns the zero vector for an empty input.
pub fn mean<V: AsRef<[f64]>>(vectors: &[V], dimension: usize) -> FeatureVector {
    let mut out = vec![0.0; dimension];
    if vectors.is_empty() {
        return out;
    }
    for v in vectors {
        for (o, x) in out.iter_mut().zip(v.as_ref()) {
            *o += x;
        }
    }
    let n = vectors.len() as f64;
    for o in &mut out {
        *o /= n;
    }
    out
}

/// Squared Euclidean distance.
#[inline]
pub fn squared_distance(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// Euclidean distance.
#[inline]
pub fn distance(u: &[f64], v: &[f64]) -> f64 {
    squared_distance(u, v).sqrt()
}

/// Euclidean distance after scaling each coordinate by its segment weight.
pub fn weighted_distance(
    u: &[f64],
    v: &[f64],
    weights: &ScoreWeights,
    layout: &SegmentLayout,
) -> f64 {
    weighted_distance_with(u, v, &layout.coordinate_weights(weights))
}

/// Weighted distance with precomputed per-coordinate weights.
#[inline]
pub(crate) fn weighted_distance_with(u: &[f64], v: &[f64], coordinate_weights: &[f64]) -> f64 {
    u.iter()
        .zip(v)
        .zip(coordinate_weights)
        .map(|((a, b), w)| {
            let d = w * (a - b);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
