//! heatclust-core: vector primitives and cluster types for streaming clustering.
//!
//! This crate provides the point and coordinate types, the point arena that
//! owns every observation of a batch, the index-based cluster bag with its
//! derived statistics and the silhouette quality measures.
//!
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::module_name_repetitions,
    clippy::float_cmp
)]

pub mod arena;
pub mod cluster;
pub mod error;
pub mod point;
pub mod quality;

pub use arena::{PointArena, PointId};
pub use cluster::{Cluster, ClusterMeasure, ClusterProperties, Diameter, Radius};
pub use error::{Error, Result};
pub use point::{Coordinate, DeltaPoint, Point, PointMeasure};
pub use quality::{cluster_silhouette, level_silhouette, mean_in, mean_out_min_in, point_silhouette};
