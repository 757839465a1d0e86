//! Partitioning configuration.
//!
//! `PartitionOptions` is the loosely specified user input (every field
//! optional). `PartitionConfig` is the sanitized, fully populated form the
//! algorithms consume. Sanitizing never fails: out-of-range values are
//! coerced.

use serde::{Deserialize, Serialize};

/// Batches with at most this many competitors cap `max_size` at
/// [`SMALL_BATCH_MAX_SIZE`].
pub const SMALL_BATCH_THRESHOLD: usize = 112;

/// Group size cap applied to small batches.
pub const SMALL_BATCH_MAX_SIZE: usize = 4;

const DEFAULT_MIN_SIZE: usize = 2;
const DEFAULT_MAX_SIZE: usize = 6;
const DEFAULT_PREFERRED_SIZE: usize = 4;
const DEFAULT_MAX_GROUPS: usize = 28;
const DEFAULT_WEIGHT: f64 = 1.0;

/// Per-dimension score weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight of the gender-balance sub-score.
    pub gender: f64,
    /// Weight of the age-homogeneity sub-score.
    pub age: f64,
    /// Weight of the equipment sub-score.
    pub equipment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            gender: DEFAULT_WEIGHT,
            age: DEFAULT_WEIGHT,
            equipment: DEFAULT_WEIGHT,
        }
    }
}

/// Raw user options. Missing fields take defaults during sanitizing.
///
/// # Example
/// ```
/// use u_partition::models::{PartitionConfig, PartitionOptions};
///
/// let options = PartitionOptions {
///     min_size: Some(5),
///     max_size: Some(3),
///     ..Default::default()
/// };
/// let config = PartitionConfig::sanitize(&options, 200);
/// assert_eq!((config.min_size, config.max_size), (3, 5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionOptions {
    pub min_size: Option<usize>,
    pub max_size: Option<usize>,
    pub preferred_size: Option<usize>,
    pub max_groups: Option<usize>,
    pub gender_weight: Option<f64>,
    pub age_weight: Option<f64>,
    pub equipment_weight: Option<f64>,
    /// `true` rewards same-class groups, `false` rewards spreading classes.
    pub group_by_equipment_class: Option<bool>,
}

/// Sanitized configuration shared by every algorithm.
///
/// Invariants after [`PartitionConfig::sanitize`]:
/// `1 <= min_size <= preferred_size <= max_size`, `max_groups >= 1`,
/// weights finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Smallest acceptable group.
    pub min_size: usize,
    /// Largest acceptable group.
    pub max_size: usize,
    /// Target group size used by scoring and filling.
    pub preferred_size: usize,
    /// Upper bound on the number of groups.
    pub max_groups: usize,
    /// Score weights.
    pub weights: ScoreWeights,
    /// Equipment mode: grouping (`true`) or distribution (`false`).
    pub group_by_equipment_class: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            preferred_size: DEFAULT_PREFERRED_SIZE,
            max_groups: DEFAULT_MAX_GROUPS,
            weights: ScoreWeights::default(),
            group_by_equipment_class: true,
        }
    }
}

impl PartitionConfig {
    /// Merges options with defaults and coerces them into a valid configuration
    /// for a batch of `entity_count` competitors.
    ///
    /// # Rules
    /// 1. Missing values take defaults; sizes and `max_groups` are floored at 1.
    /// 2. An inverted `min_size`/`max_size` pair is swapped.
    /// 3. Batches of at most 112 competitors cap `max_size` at 4 (lowering
    ///    `min_size` with it if needed).
    /// 4. `preferred_size` is clamped into `[min_size, max_size]`.
    /// 5. Negative or non-finite weights fall back to the default.
    pub fn sanitize(options: &PartitionOptions, entity_count: usize) -> Self {
        let mut min_size = options.min_size.unwrap_or(DEFAULT_MIN_SIZE).max(1);
        let mut max_size = options.max_size.unwrap_or(DEFAULT_MAX_SIZE).max(1);
        if min_size > max_size {
            std::mem::swap(&mut min_size, &mut max_size);
        }

        if entity_count <= SMALL_BATCH_THRESHOLD {
            max_size = max_size.min(SMALL_BATCH_MAX_SIZE);
            min_size = min_size.min(max_size);
        }

        let preferred_size = options
            .preferred_size
            .unwrap_or(DEFAULT_PREFERRED_SIZE)
            .clamp(min_size, max_size);

        let weight = |w: Option<f64>| match w {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => DEFAULT_WEIGHT,
        };

        Self {
            min_size,
            max_size,
            preferred_size,
            max_groups: options.max_groups.unwrap_or(DEFAULT_MAX_GROUPS).max(1),
            weights: ScoreWeights {
                gender: weight(options.gender_weight),
                age: weight(options.age_weight),
                equipment: weight(options.equipment_weight),
            },
            group_by_equipment_class: options.group_by_equipment_class.unwrap_or(true),
        }
    }

    /// Sets size bounds and preferred size directly (no coercion).
    pub fn with_sizes(mut self, min_size: usize, preferred_size: usize, max_size: usize) -> Self {
        self.min_size = min_size;
        self.preferred_size = preferred_size;
        self.max_size = max_size;
        self
    }

    /// Sets the group count ceiling.
    pub fn with_max_groups(mut self, max_groups: usize) -> Self {
        self.max_groups = max_groups;
        self
    }

    /// Sets the score weights.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the equipment mode.
    pub fn with_group_by_equipment_class(mut self, enabled: bool) -> Self {
        self.group_by_equipment_class = enabled;
        self
    }

    /// Whether `size` lies within `[min_size, max_size]`.
    #[inline]
    pub fn size_in_bounds(&self, size: usize) -> bool {
        (self.min_size..=self.max_size).contains(&size)
    }
}
