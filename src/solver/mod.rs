//! Partitioning entry point.
//!
//! [`Partitioner`] validates a batch, sanitizes options for its size, runs
//! one or more algorithms and scores the results.
//!
//! # Algorithms
//!
//! | [`Algorithm`] | Pipeline |
//! |---------------|----------|
//! | `Greedy` | families → [`crate::greedy::GreedyPacker`] |
//! | `Clustering` | families → [`crate::clustering::KMeansClusterer`] → [`crate::repair::ConstraintRepair`] |
//! | `ExternalLp` | families → [`crate::lp::LpModelBuilder`] → attached [`crate::lp::LpSolver`] |
//! | `Auto` | all of the above, best total score wins |
//!
//! Under `Auto` the algorithms run in table order. Ties keep the earlier
//! result, and an LP failure only removes that candidate.

mod partitioner;

pub use partitioner::{Algorithm, PartitionResult, Partitioner};
