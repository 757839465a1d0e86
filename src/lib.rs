//! Family-aware group partitioning for the U-Engine ecosystem.
//!
//! Splits a batch of competitors into bounded groups. Guardians and their
//! dependents always land in the same group, and groups are scored on size,
//! gender balance, age homogeneity and equipment mix.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Competitor`, `Family`, `Group`, `Partition`,
//!   `PartitionConfig`
//! - **`validation`**: Input integrity checks (duplicate IDs, guardian cycles,
//!   family size)
//! - **`features`**: One-hot encoding of competitors and families
//! - **`scoring`**: Per-group and per-partition quality scores
//! - **`clustering`**: Weighted k-means with k-means++ seeding
//! - **`repair`**: Multi-pass repair of raw clusters into bounded groups
//! - **`greedy`**: Constructive greedy packer with score lookahead
//! - **`lp`**: Integer programming model for an external solver
//! - **`solver`**: `Partitioner`, which runs and compares the algorithms
//!
//! # Architecture
//!
//! The algorithms are synchronous and infallible: they always return a
//! partition, reporting bound violations instead of failing. Only the LP
//! boundary and the `Partitioner` return [`PartitionError`].
//!
//! # References
//!
//! - Lloyd (1982), "Least squares quantization in PCM"
//! - Arthur & Vassilvitskii (2007), "k-means++: The Advantages of Careful Seeding"
//! - Wolsey (1998), "Integer Programming"

pub mod clustering;
pub mod error;
pub mod features;
pub mod greedy;
pub mod lp;
pub mod models;
pub mod repair;
pub mod scoring;
pub mod solver;
pub mod validation;

pub use error::PartitionError;
pub use solver::{Algorithm, PartitionResult, Partitioner};
