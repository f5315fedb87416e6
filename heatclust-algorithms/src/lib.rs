//! heatclust-algorithms: batch clustering building blocks.
//!
//! This crate provides:
//! - **K-Means** with farthest-point seeding and empty-cluster repair
//! - **Agglomerative** hierarchical clustering over pluggable linkage
//! - **Munkres** optimal assignment over integer cost matrices
//! - **Level extraction** picking the number of clusters of a batch
//!
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::float_cmp
)]

pub mod agglomerative;
pub mod kmeans;
pub mod level;
pub mod munkres;
mod processing;

pub use agglomerative::{AgglomerativeClustering, AgglomerativeConfig, ClusteringHierarchy};
pub use kmeans::{KMeansClustering, KMeansConfig};
pub use level::{fetch_level, LevelExtractor, LevelHeuristic};
pub use munkres::{munkres, CostMatrix, DISTANCE_SCALE};
pub use processing::{
    agglomerative_best_level, cluster_best_level, kmeans_best_level, AlgorithmParams,
    ClusteringAlgorithm,
};
