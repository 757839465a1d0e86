//! Partitioning domain models.
//!
//! Provides the core data types for describing a partitioning problem and
//! its solution: competitors and their families on the input side, groups
//! and partitions on the output side, and the configuration shared by every
//! algorithm.
//!
//! # Domain Mappings
//!
//! | u-partition | Archery | Sports camp | Classroom |
//! |-------------|---------|-------------|-----------|
//! | Competitor | Archer | Camper | Student |
//! | Family | Parent + children | Siblings | Carpool |
//! | Group | Target butt | Cabin | Project team |
//! | Partition | Target assignment | Cabin plan | Team roster |

mod competitor;
mod config;
mod family;
mod partition;

pub use competitor::{AgeCategory, Competitor, EquipmentClass, Gender};
pub use config::{
    PartitionConfig, PartitionOptions, ScoreWeights, SMALL_BATCH_MAX_SIZE, SMALL_BATCH_THRESHOLD,
};
pub use family::{group_families, Family};
pub use partition::{Group, Partition, Violation, ViolationType};
