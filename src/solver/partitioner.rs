//! Algorithm orchestration and result selection.

use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clustering::KMeansClusterer;
use crate::error::PartitionError;
use crate::greedy::GreedyPacker;
use crate::lp::{LpModelBuilder, LpSolver};
use crate::models::{
    group_families, Competitor, Family, Partition, PartitionConfig, PartitionOptions, Violation,
};
use crate::repair::ConstraintRepair;
use crate::scoring::ScoreBreakdown;
use crate::validation::validate_input;

/// Partitioning algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Constructive greedy packing.
    Greedy,
    /// k-means clustering followed by constraint repair.
    Clustering,
    /// External LP solver.
    ExternalLp,
    /// Run every available algorithm and keep the best.
    #[default]
    Auto,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Greedy => "greedy",
            Self::Clustering => "clustering",
            Self::ExternalLp => "external-lp",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// A scored partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    /// Algorithm that produced the groups.
    pub algorithm: Algorithm,
    /// The groups.
    pub groups: Partition,
    /// Total score (`breakdown.total()`).
    pub score: f64,
    /// Per-dimension score.
    pub breakdown: ScoreBreakdown,
    /// Residual bound violations left by best-effort placement.
    pub violations: Vec<Violation>,
}

impl PartitionResult {
    /// Scores a partition under the given configuration.
    pub fn evaluate(algorithm: Algorithm, groups: Partition, config: &PartitionConfig) -> Self {
        let breakdown = ScoreBreakdown::calculate(&groups, config);
        let violations = groups.violations(config);
        Self {
            algorithm,
            score: breakdown.total(),
            breakdown,
            groups,
            violations,
        }
    }

    /// The result for an empty batch.
    pub fn empty(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            groups: Partition::new(),
            score: 0.0,
            breakdown: ScoreBreakdown::default(),
            violations: Vec::new(),
        }
    }

    /// Whether every group respects the configured bounds.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Family-aware group partitioner.
///
/// # Example
///
/// ```
/// use u_partition::models::{AgeCategory, Competitor, EquipmentClass, Gender, PartitionOptions};
/// use u_partition::solver::{Algorithm, Partitioner};
///
/// let batch = vec![
///     Competitor::new("001", Gender::Male, AgeCategory::Senior, EquipmentClass::Recurve),
///     Competitor::new("002", Gender::Female, AgeCategory::Senior, EquipmentClass::Recurve),
///     Competitor::new("003", Gender::Female, AgeCategory::U15, EquipmentClass::Barebow)
///         .with_guardian("002"),
/// ];
///
/// let result = Partitioner::new(PartitionOptions::default())
///     .with_seed(42)
///     .partition(&batch, Algorithm::Auto)
///     .unwrap();
/// assert!(result.groups.co_located(&["002", "003"]));
/// assert!(result.score > 0.0);
/// ```
pub struct Partitioner {
    options: PartitionOptions,
    seed: Option<u64>,
    lp_solver: Option<Box<dyn LpSolver>>,
    clusterer: KMeansClusterer,
    validate: bool,
}

impl Partitioner {
    /// Creates a partitioner with the given raw options.
    pub fn new(options: PartitionOptions) -> Self {
        Self {
            options,
            seed: None,
            lp_solver: None,
            clusterer: KMeansClusterer::new(),
            validate: true,
        }
    }

    /// Fixes the random seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attaches an external LP solver.
    pub fn with_lp_solver(mut self, solver: impl LpSolver + 'static) -> Self {
        self.lp_solver = Some(Box::new(solver));
        self
    }

    /// Replaces the k-means settings.
    pub fn with_clusterer(mut self, clusterer: KMeansClusterer) -> Self {
        self.clusterer = clusterer;
        self
    }

    /// Enables or disables input validation (enabled by default).
    ///
    /// Disable only for batches already checked by
    /// [`crate::validation::validate_input`].
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Partitions a competitor batch.
    ///
    /// # Errors
    /// - [`PartitionError::InvalidInput`] when validation fails.
    /// - [`PartitionError::SolverUnavailable`] for `ExternalLp` without a solver.
    /// - [`PartitionError::SolverFailed`] / [`PartitionError::InvalidSolution`]
    ///   when `ExternalLp` was requested and the solver did not deliver.
    pub fn partition(
        &self,
        competitors: &[Competitor],
        algorithm: Algorithm,
    ) -> Result<PartitionResult, PartitionError> {
        if self.validate {
            validate_input(competitors).map_err(PartitionError::InvalidInput)?;
        }

        let config = PartitionConfig::sanitize(&self.options, competitors.len());
        if competitors.is_empty() {
            return Ok(PartitionResult::empty(algorithm));
        }

        let families = group_families(competitors);
        let mut rng = self.rng();
        debug!(
            competitors = competitors.len(),
            families = families.len(),
            %algorithm,
            "partitioning"
        );

        match algorithm {
            Algorithm::Greedy => Ok(self.run_greedy(&families, &config)),
            Algorithm::Clustering => Ok(self.run_clustering(&families, &config, &mut rng)),
            Algorithm::ExternalLp => {
                let solver = self
                    .lp_solver
                    .as_deref()
                    .ok_or(PartitionError::SolverUnavailable)?;
                self.run_lp(solver, &families, &config)
            }
            Algorithm::Auto => Ok(self.run_auto(&families, &config, &mut rng)),
        }
    }

    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }

    fn run_greedy(&self, families: &[Family], config: &PartitionConfig) -> PartitionResult {
        let groups = GreedyPacker::new().pack_partition(families, config);
        PartitionResult::evaluate(Algorithm::Greedy, groups, config)
    }

    fn run_clustering(
        &self,
        families: &[Family],
        config: &PartitionConfig,
        rng: &mut SmallRng,
    ) -> PartitionResult {
        let outcome = self.clusterer.cluster(families, config, rng);
        let groups = ConstraintRepair::new(families, config)
            .repair_partition(outcome.family_groups(), rng);
        PartitionResult::evaluate(Algorithm::Clustering, groups, config)
    }

    fn run_lp(
        &self,
        solver: &dyn LpSolver,
        families: &[Family],
        config: &PartitionConfig,
    ) -> Result<PartitionResult, PartitionError> {
        let groups = LpModelBuilder::new(families, config).solve(solver)?;
        Ok(PartitionResult::evaluate(Algorithm::ExternalLp, groups, config))
    }

    fn run_auto(
        &self,
        families: &[Family],
        config: &PartitionConfig,
        rng: &mut SmallRng,
    ) -> PartitionResult {
        let mut best = scored(self.run_greedy(families, config));
        best = better(best, scored(self.run_clustering(families, config, rng)));

        if let Some(solver) = self.lp_solver.as_deref() {
            match self.run_lp(solver, families, config) {
                Ok(result) => best = better(best, scored(result)),
                Err(err) => warn!(solver = solver.name(), error = %err, "LP candidate excluded"),
            }
        }

        info!(algorithm = %best.algorithm, score = best.score, "selected partition");
        best
    }
}

fn scored(candidate: PartitionResult) -> PartitionResult {
    debug!(
        algorithm = %candidate.algorithm,
        score = candidate.score,
        groups = candidate.groups.group_count(),
        violations = candidate.violations.len(),
        "candidate scored"
    );
    candidate
}

/// Keeps `best` unless `candidate` scores strictly higher.
fn better(best: PartitionResult, candidate: PartitionResult) -> PartitionResult {
    if candidate.score > best.score {
        candidate
    } else {
        best
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new(PartitionOptions::default())
    }
}

impl fmt::Debug for Partitioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partitioner")
            .field("options", &self.options)
            .field("seed", &self.seed)
            .field("lp_solver", &self.lp_solver.as_ref().map(|s| s.name()))
            .field("clusterer", &self.clusterer)
            .field("validate", &self.validate)
            .finish()
    }
}
