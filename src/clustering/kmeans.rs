//! Weighted k-means over family feature vectors.
//!
//! # Complexity
//! O(i · k · f · d) where i=iterations, k=clusters, f=families, d=dimension.

use rand::Rng;
use tracing::{debug, warn};

use crate::features::{mean, squared_distance, weighted_distance_with, FeatureSpace, FeatureVector};
use crate::models::{Family, PartitionConfig};

/// A raw cluster: a center and the families nearest to it.
///
/// Family entries are indices into the slice passed to the clusterer.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Centroid.
    pub center: FeatureVector,
    /// Member family indices, ascending.
    pub families: Vec<usize>,
}

impl Cluster {
    /// Whether no family was assigned.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Number of competitors across the member families.
    pub fn entity_count(&self, families: &[Family]) -> usize {
        self.families.iter().map(|&f| families[f].size()).sum()
    }
}

/// Result of a clustering run.
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    /// Exactly `k` clusters; some may be empty.
    pub clusters: Vec<Cluster>,
    /// Assign/Update cycles performed.
    pub iterations: usize,
    /// Whether centers settled before the iteration cap.
    pub converged: bool,
}

impl ClusteringOutcome {
    fn empty() -> Self {
        Self {
            clusters: Vec::new(),
            iterations: 0,
            converged: true,
        }
    }

    /// Member family indices of each non-empty cluster.
    pub fn family_groups(&self) -> Vec<Vec<usize>> {
        self.clusters
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.families.clone())
            .collect()
    }
}

/// Chooses the number of clusters.
///
/// `k = clamp(round(n / preferred), ceil(n / max), min(max_groups, floor(n / min)))`,
/// capped at the number of families and floored at 1 for non-empty input.
/// When the lower bound exceeds the upper, the upper bound wins.
pub fn select_k(entity_count: usize, family_count: usize, config: &PartitionConfig) -> usize {
    if entity_count == 0 || family_count == 0 {
        return 0;
    }
    let min_k = entity_count.div_ceil(config.max_size.max(1));
    let max_k = config.max_groups.min(entity_count / config.min_size.max(1));
    let pref_k = (entity_count as f64 / config.preferred_size.max(1) as f64).round() as usize;

    pref_k.max(min_k).min(max_k).min(family_count).max(1)
}

/// K-means clusterer with k-means++ seeding.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::SmallRng;
/// use u_partition::clustering::KMeansClusterer;
/// use u_partition::models::{
///     group_families, AgeCategory, Competitor, EquipmentClass, Gender, PartitionConfig,
/// };
///
/// let batch: Vec<Competitor> = (0..8)
///     .map(|i| Competitor::new(format!("{i}"), Gender::Male, AgeCategory::U18, EquipmentClass::Recurve))
///     .collect();
/// let families = group_families(&batch);
/// let config = PartitionConfig::default().with_sizes(2, 4, 4);
/// let mut rng = SmallRng::seed_from_u64(7);
///
/// let outcome = KMeansClusterer::new().cluster(&families, &config, &mut rng);
/// assert_eq!(outcome.clusters.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct KMeansClusterer {
    max_iterations: usize,
    tolerance: f64,
}

impl KMeansClusterer {
    /// Creates a clusterer (100 iterations, tolerance 1e-6).
    pub fn new() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }

    /// Sets the Assign/Update cycle cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Sets the per-coordinate convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Clusters families into [`select_k`] clusters.
    pub fn cluster<R: Rng + ?Sized>(
        &self,
        families: &[Family],
        config: &PartitionConfig,
        rng: &mut R,
    ) -> ClusteringOutcome {
        let entity_count: usize = families.iter().map(Family::size).sum();
        let k = select_k(entity_count, families.len(), config);
        debug!(entity_count, families = families.len(), k, "selected cluster count");
        self.cluster_with_k(families, k, config, rng)
    }

    /// Clusters families into exactly `k` clusters (capped at family count).
    pub fn cluster_with_k<R: Rng + ?Sized>(
        &self,
        families: &[Family],
        k: usize,
        config: &PartitionConfig,
        rng: &mut R,
    ) -> ClusteringOutcome {
        let k = k.min(families.len());
        if k == 0 {
            return ClusteringOutcome::empty();
        }

        let space = FeatureSpace::from_families(families);
        let points: Vec<FeatureVector> = families.iter().map(|f| space.encode_family(f)).collect();
        let weights = space.layout().coordinate_weights(&config.weights);
        let dimension = space.dimension();

        let mut centers = seed_centers(&points, k, rng);
        let mut assignment = vec![0usize; points.len()];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            assignment = assign(&points, &centers, &weights);
            let updated = update(&points, &assignment, &centers, dimension);
            let shift = max_shift(&centers, &updated);
            centers = updated;
            if shift <= self.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(iterations, k, "k-means converged");
        } else {
            warn!(
                iterations,
                k, "k-means hit the iteration cap; using current assignment"
            );
        }

        let mut clusters: Vec<Cluster> = centers
            .into_iter()
            .map(|center| Cluster {
                center,
                families: Vec::new(),
            })
            .collect();
        for (family, &c) in assignment.iter().enumerate() {
            clusters[c].families.push(family);
        }

        ClusteringOutcome {
            clusters,
            iterations,
            converged,
        }
    }
}

impl Default for KMeansClusterer {
    fn default() -> Self {
        Self::new()
    }
}

/// k-means++ seeding on unweighted squared distance.
///
/// When every point coincides with an existing center the next one is drawn
/// uniformly.
fn seed_centers<R: Rng + ?Sized>(
    points: &[FeatureVector],
    k: usize,
    rng: &mut R,
) -> Vec<FeatureVector> {
    let mut centers = Vec::with_capacity(k);
    let first = rng.random_range(0..points.len());
    centers.push(points[first].clone());

    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = nearest.iter().sum();
        let next = if total > 0.0 {
            sample_proportional(&nearest, total, rng)
        } else {
            rng.random_range(0..points.len())
        };

        let center = points[next].clone();
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &center));
        }
        centers.push(center);
    }

    centers
}

/// Index drawn with probability proportional to `weights[i]`.
fn sample_proportional<R: Rng + ?Sized>(weights: &[f64], total: f64, rng: &mut R) -> usize {
    let mut target = rng.random::<f64>() * total;
    let mut fallback = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        if target < w {
            return i;
        }
        target -= w;
        fallback = i;
    }
    // Rounding can leave a sliver of `target`; take the last positive weight.
    fallback
}

/// Nearest center per point; ties go to the lowest center index.
fn assign(points: &[FeatureVector], centers: &[FeatureVector], weights: &[f64]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (c, center) in centers.iter().enumerate() {
                let d = weighted_distance_with(p, center, weights);
                if d < best_dist {
                    best_dist = d;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// New centers as member means. A center with no members stays put.
fn update(
    points: &[FeatureVector],
    assignment: &[usize],
    centers: &[FeatureVector],
    dimension: usize,
) -> Vec<FeatureVector> {
    centers
        .iter()
        .enumerate()
        .map(|(c, old)| {
            let members: Vec<&FeatureVector> = points
                .iter()
                .zip(assignment)
                .filter(|(_, a)| **a == c)
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                old.clone()
            } else {
                mean(&members, dimension)
            }
        })
        .collect()
}

/// Largest coordinate movement between two center sets.
fn max_shift(before: &[FeatureVector], after: &[FeatureVector]) -> f64 {
    before
        .iter()
        .zip(after)
        .flat_map(|(b, a)| b.iter().zip(a).map(|(x, y)| (x - y).abs()))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{group_families, AgeCategory, Competitor, EquipmentClass, Gender};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn archer(id: usize, gender: Gender, age: AgeCategory, eq: EquipmentClass) -> Competitor {
        Competitor::new(format!("{id:03}"), gender, age, eq)
    }

    fn two_camps() -> Vec<Family> {
        let mut batch = Vec::new();
        for i in 0..6 {
            batch.push(archer(i, Gender::Male, AgeCategory::U13, EquipmentClass::Recurve));
        }
        for i in 6..12 {
            batch.push(archer(i, Gender::Female, AgeCategory::Master, EquipmentClass::Compound));
        }
        group_families(&batch)
    }

    fn mixed(n: usize) -> Vec<Family> {
        let genders = [Gender::Male, Gender::Female];
        let ages = [AgeCategory::U15, AgeCategory::U18, AgeCategory::Senior];
        let eqs = [
            EquipmentClass::Recurve,
            EquipmentClass::Compound,
            EquipmentClass::Barebow,
            EquipmentClass::Longbow,
        ];
        let mut batch: Vec<Competitor> = (0..n)
            .map(|i| archer(i, genders[i % 2], ages[i % 3], eqs[i % 4]))
            .collect();
        // A few guardian families.
        for i in (1..n).step_by(7) {
            batch[i].guardian = Some(batch[i - 1].id.clone());
        }
        group_families(&batch)
    }

    #[test]
    fn test_select_k_preferred() {
        let config = PartitionConfig::default().with_sizes(2, 4, 4);
        assert_eq!(select_k(8, 5, &config), 2);
        assert_eq!(select_k(0, 0, &config), 0);
    }

    #[test]
    fn test_select_k_bounds() {
        let config = PartitionConfig::default().with_sizes(2, 4, 6);
        // min_k = 28, max_k = min(28, 84), pref_k = 42
        assert_eq!(select_k(168, 150, &config), 28);

        // Lower bound lifts the preferred count: ceil(10 / 2) = 5 > round(10 / 6)
        let config = PartitionConfig::default().with_sizes(1, 6, 2);
        assert_eq!(select_k(10, 10, &config), 5);
    }

    #[test]
    fn test_select_k_capped_by_families_and_floor() {
        let config = PartitionConfig::default().with_sizes(2, 2, 2);
        assert_eq!(select_k(12, 3, &config), 3);
        // n < min_size gives max_k = 0; still one cluster.
        assert_eq!(select_k(1, 1, &config), 1);
    }

    #[test]
    fn test_every_family_assigned_once() {
        let families = mixed(40);
        let config = PartitionConfig::default().with_sizes(2, 4, 6);
        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = KMeansClusterer::new().cluster(&families, &config, &mut rng);

        let mut seen: Vec<usize> = outcome
            .clusters
            .iter()
            .flat_map(|c| c.families.iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..families.len()).collect::<Vec<_>>());
        assert_eq!(outcome.clusters.len(), select_k(40, families.len(), &config));
    }

    #[test]
    fn test_separates_distinct_camps() {
        let families = two_camps();
        let config = PartitionConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = KMeansClusterer::new().cluster_with_k(&families, 2, &config, &mut rng);

        assert!(outcome.converged);
        assert_eq!(outcome.clusters.len(), 2);
        for cluster in &outcome.clusters {
            assert_eq!(cluster.families.len(), 6);
            let first_gender = families[cluster.families[0]].head().gender;
            assert!(cluster
                .families
                .iter()
                .all(|&f| families[f].head().gender == first_gender));
            assert_eq!(cluster.entity_count(&families), 6);
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let families = mixed(60);
        let config = PartitionConfig::default();
        let clusterer = KMeansClusterer::new();

        let a = clusterer.cluster(&families, &config, &mut SmallRng::seed_from_u64(9));
        let b = clusterer.cluster(&families, &config, &mut SmallRng::seed_from_u64(9));
        assert_eq!(a.clusters, b.clusters);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_iteration_cap_is_not_failure() {
        let families = mixed(60);
        let config = PartitionConfig::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let outcome = KMeansClusterer::new()
            .with_max_iterations(1)
            .with_tolerance(-1.0)
            .cluster(&families, &config, &mut rng);

        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.converged);
        let total: usize = outcome.clusters.iter().map(|c| c.families.len()).sum();
        assert_eq!(total, families.len());
    }

    #[test]
    fn test_k_capped_at_family_count() {
        let families = two_camps();
        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = KMeansClusterer::new().cluster_with_k(
            &families,
            100,
            &PartitionConfig::default(),
            &mut rng,
        );
        assert_eq!(outcome.clusters.len(), families.len());
    }

    #[test]
    fn test_empty_input() {
        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = KMeansClusterer::new().cluster(&[], &PartitionConfig::default(), &mut rng);
        assert!(outcome.clusters.is_empty());
        assert!(outcome.family_groups().is_empty());
    }

    #[test]
    fn test_sample_proportional_skips_zero_weights() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..100 {
            let i = sample_proportional(&[0.0, 2.0, 0.0, 1.0], 3.0, &mut rng);
            assert!(i == 1 || i == 3);
        }
    }
}
