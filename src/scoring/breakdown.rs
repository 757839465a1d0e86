//! Group and partition scores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{Competitor, Partition, PartitionConfig};

/// Largest class count that can earn full distribution credit.
const DISTRIBUTION_SPAN: usize = 3;

/// Unweighted sub-scores of a single group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupScore {
    pub size: f64,
    pub gender: f64,
    pub age: f64,
    pub equipment: f64,
}

impl GroupScore {
    /// Scores a group given its members.
    ///
    /// An empty group scores zero on every dimension.
    pub fn calculate<'a, I>(members: I, config: &PartitionConfig) -> Self
    where
        I: IntoIterator<Item = &'a Competitor>,
    {
        let mut genders = HashMap::new();
        let mut ages = HashMap::new();
        let mut equipment = HashMap::new();
        let mut s = 0usize;
        for m in members {
            s += 1;
            bump(&mut genders, m.gender);
            bump(&mut ages, m.age_category);
            bump(&mut equipment, m.equipment_class);
        }
        if s == 0 {
            return Self::default();
        }

        let sf = s as f64;
        let deviation = s.abs_diff(config.preferred_size) as f64;
        let size = (10.0 - 2.0 * deviation).max(0.0);

        let paired: usize = genders.values().filter(|&&n| n % 2 == 0).sum();
        let gender = 10.0 * paired as f64 / sf;

        let age = 10.0 * largest(&ages) as f64 / sf;

        let equipment = if config.group_by_equipment_class {
            10.0 * largest(&equipment) as f64 / sf
        } else {
            10.0 * equipment.len() as f64 / s.min(DISTRIBUTION_SPAN) as f64
        };

        Self {
            size,
            gender,
            age,
            equipment,
        }
    }

    /// Weighted total of this group alone.
    pub fn weighted_total(&self, config: &PartitionConfig) -> f64 {
        let w = &config.weights;
        self.size + w.gender * self.gender + w.age * self.age + w.equipment * self.equipment
    }
}

fn bump<K: Eq + Hash>(counts: &mut HashMap<K, usize>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

fn largest<K>(counts: &HashMap<K, usize>) -> usize {
    counts.values().copied().max().unwrap_or(0)
}

/// Aggregate partition score, weights applied.
///
/// `total()` is the value algorithms compete on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Mean size sub-score.
    pub size: f64,
    /// Mean gender sub-score × gender weight.
    pub gender: f64,
    /// Mean age sub-score × age weight.
    pub age: f64,
    /// Mean equipment sub-score × equipment weight.
    pub equipment: f64,
}

impl ScoreBreakdown {
    /// Scores a partition. A partition with no groups scores zero.
    ///
    /// The result depends only on the multiset of group contents, not on the
    /// order of groups or of members within a group.
    pub fn calculate(partition: &Partition, config: &PartitionConfig) -> Self {
        let groups: Vec<GroupScore> = partition
            .groups
            .iter()
            .map(|g| GroupScore::calculate(&g.members, config))
            .collect();
        Self::from_group_scores(&groups, config)
    }

    /// Aggregates precomputed group scores.
    pub fn from_group_scores(groups: &[GroupScore], config: &PartitionConfig) -> Self {
        if groups.is_empty() {
            return Self::default();
        }
        let n = groups.len() as f64;
        let avg = |f: fn(&GroupScore) -> f64| groups.iter().map(f).sum::<f64>() / n;
        let w = &config.weights;

        Self {
            size: avg(|g| g.size),
            gender: avg(|g| g.gender) * w.gender,
            age: avg(|g| g.age) * w.age,
            equipment: avg(|g| g.equipment) * w.equipment,
        }
    }

    /// Sum of the four components.
    pub fn total(&self) -> f64 {
        self.size + self.gender + self.age + self.equipment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeCategory, EquipmentClass, Gender, Group, ScoreWeights};

    fn c(id: &str, gender: Gender, age: AgeCategory, eq: EquipmentClass) -> Competitor {
        Competitor::new(id, gender, age, eq)
    }

    fn config() -> PartitionConfig {
        PartitionConfig::default().with_sizes(2, 4, 6)
    }

    fn mixed_group() -> Vec<Competitor> {
        vec![
            c("1", Gender::Male, AgeCategory::U15, EquipmentClass::Recurve),
            c("2", Gender::Male, AgeCategory::U15, EquipmentClass::Recurve),
            c("3", Gender::Female, AgeCategory::U15, EquipmentClass::Compound),
            c("4", Gender::Male, AgeCategory::Senior, EquipmentClass::Barebow),
        ]
    }

    #[test]
    fn test_group_score_grouping_mode() {
        let s = GroupScore::calculate(&mixed_group(), &config());
        assert!((s.size - 10.0).abs() < 1e-10);
        // 3 male (odd), 1 female (odd) → 0 paired
        assert!((s.gender - 0.0).abs() < 1e-10);
        // 3 of 4 are U15
        assert!((s.age - 7.5).abs() < 1e-10);
        // 2 of 4 are Recurve
        assert!((s.equipment - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_group_score_distribution_mode() {
        let config = config().with_group_by_equipment_class(false);
        let s = GroupScore::calculate(&mixed_group(), &config);
        // 3 distinct classes / min(4, 3)
        assert!((s.equipment - 10.0).abs() < 1e-10);

        let group = mixed_group();
        let s = GroupScore::calculate(&group[..2], &config);
        // 1 distinct / min(2, 3)
        assert!((s.equipment - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_gender_even_counts() {
        let members = vec![
            c("1", Gender::Male, AgeCategory::U15, EquipmentClass::Recurve),
            c("2", Gender::Male, AgeCategory::U15, EquipmentClass::Recurve),
            c("3", Gender::Female, AgeCategory::U15, EquipmentClass::Recurve),
        ];
        let s = GroupScore::calculate(&members, &config());
        assert!((s.gender - 20.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_size_score_floor() {
        let config = PartitionConfig::default().with_sizes(1, 10, 12);
        let s = GroupScore::calculate(&mixed_group()[..1], &config);
        assert!((s.size - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_group_scores_zero() {
        let s = GroupScore::calculate(&[], &config());
        assert_eq!(s, GroupScore::default());
    }

    #[test]
    fn test_weighted_total() {
        let config = config().with_weights(ScoreWeights {
            gender: 2.0,
            age: 0.0,
            equipment: 1.0,
        });
        let s = GroupScore::calculate(&mixed_group(), &config);
        assert!((s.weighted_total(&config) - (10.0 + 0.0 + 0.0 + 5.0)).abs() < 1e-10);
    }

    #[test]
    fn test_breakdown_averages_and_weights() {
        let config = config().with_weights(ScoreWeights {
            gender: 1.0,
            age: 2.0,
            equipment: 1.0,
        });
        let partition = Partition {
            groups: vec![
                Group {
                    members: mixed_group(),
                },
                Group {
                    members: mixed_group()[..2].to_vec(),
                },
            ],
        };
        let b = ScoreBreakdown::calculate(&partition, &config);
        // size: (10 + 6) / 2
        assert!((b.size - 8.0).abs() < 1e-10);
        // gender: (0 + 10) / 2
        assert!((b.gender - 5.0).abs() < 1e-10);
        // age: (7.5 + 10) / 2 × 2
        assert!((b.age - 17.5).abs() < 1e-10);
        // equipment: (5 + 10) / 2
        assert!((b.equipment - 7.5).abs() < 1e-10);
        assert!((b.total() - 38.0).abs() < 1e-10);
    }

    #[test]
    fn test_order_invariance() {
        let a = mixed_group();
        let mut reversed = a.clone();
        reversed.reverse();
        let p1 = Partition {
            groups: vec![
                Group { members: a.clone() },
                Group {
                    members: a[..2].to_vec(),
                },
            ],
        };
        let p2 = Partition {
            groups: vec![
                Group {
                    members: a[..2].iter().rev().cloned().collect(),
                },
                Group { members: reversed },
            ],
        };
        let config = config();
        assert_eq!(
            ScoreBreakdown::calculate(&p1, &config),
            ScoreBreakdown::calculate(&p2, &config)
        );
    }

    #[test]
    fn test_empty_partition() {
        let b = ScoreBreakdown::calculate(&Partition::new(), &config());
        assert_eq!(b, ScoreBreakdown::default());
        assert_eq!(b.total(), 0.0);
    }
}
