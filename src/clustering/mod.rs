//! Family clustering.
//!
//! Groups families by weighted feature similarity with k-means. The raw
//! clusters it produces ignore size bounds; [`crate::repair`] turns them
//! into valid groups.
//!
//! # Algorithm
//!
//! `Init → Assign ⇄ Update → Done`
//!
//! 1. **k selection** from the size bounds, preferred size and group ceiling.
//! 2. **Init** with k-means++ seeding on unweighted distance.
//! 3. **Assign** each family to the nearest center by weighted distance.
//! 4. **Update** centers to the mean of their members; stop when no
//!    coordinate moves more than the tolerance or the iteration cap is hit.
//!
//! # References
//!
//! - Lloyd (1982), "Least squares quantization in PCM"
//! - Arthur & Vassilvitskii (2007), "k-means++: The Advantages of Careful Seeding"

mod kmeans;

pub use kmeans::{select_k, Cluster, ClusteringOutcome, KMeansClusterer};
