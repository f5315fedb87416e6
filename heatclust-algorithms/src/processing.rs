//! High-level helpers that cluster a batch and extract its best level.

use crate::agglomerative::{AgglomerativeClustering, AgglomerativeConfig, ClusteringHierarchy};
use crate::kmeans::{KMeansClustering, KMeansConfig};
use crate::level::{fetch_level, LevelExtractor};
use heatclust_core::arena::PointArena;
use heatclust_core::cluster::{Cluster, ClusterMeasure};
use heatclust_core::error::{Error, Result};
use heatclust_core::point::PointMeasure;
use log::debug;
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusteringAlgorithm {
    Agglomerative,
    KMeans,
}

#[derive(Clone, Debug)]
pub struct AlgorithmParams {
    /// Upper bound on the number of clusters.
    pub max_k: usize,
    /// K-Means convergence bound.
    pub epsilon: f64,
    /// K-Means seed; each candidate `k` derives its own seed from it.
    pub seed: Option<u64>,
    /// Distance used while clustering.
    pub point_measure: PointMeasure,
    /// One agglomerative hierarchy is built per measure. The first one
    /// supplies the returned partition.
    pub cluster_measures: Vec<ClusterMeasure>,
    pub extractor: LevelExtractor,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self {
            max_k: 5,
            epsilon: 0.01,
            seed: None,
            point_measure: PointMeasure::WeightedEuclidean,
            cluster_measures: vec![
                ClusterMeasure::SingleLink,
                ClusterMeasure::MeanDistance,
                ClusterMeasure::CompleteLink,
            ],
            extractor: LevelExtractor::default(),
        }
    }
}

/// Clusters every point of `arena` with `algorithm` and returns the best
/// partition with at most `params.max_k` clusters.
///
/// # Errors
/// Propagates clustering errors; an empty arena yields [`Error::EmptyInput`].
pub fn cluster_best_level(
    arena: &PointArena,
    algorithm: ClusteringAlgorithm,
    params: &AlgorithmParams,
) -> Result<Vec<Cluster>> {
    match algorithm {
        ClusteringAlgorithm::Agglomerative => agglomerative_best_level(arena, params),
        ClusteringAlgorithm::KMeans => kmeans_best_level(arena, params),
    }
}

/// Builds one hierarchy per cluster measure, selects `k` across all of them
/// and returns the level with `k` clusters of the first hierarchy.
///
/// # Errors
/// [`Error::EmptyInput`] for an empty arena, [`Error::ConfigError`] when no
/// cluster measure is given.
pub fn agglomerative_best_level(arena: &PointArena, params: &AlgorithmParams) -> Result<Vec<Cluster>> {
    if params.cluster_measures.is_empty() {
        return Err(Error::ConfigError(
            "at least one cluster distance measure is required".into(),
        ));
    }
    let hierarchies: Vec<ClusteringHierarchy> = params
        .cluster_measures
        .par_iter()
        .map(|&measure| {
            AgglomerativeClustering::new(AgglomerativeConfig::new(measure, params.point_measure))
                .build(arena)
        })
        .collect::<Result<_>>()?;

    let sets: Vec<&[Vec<Cluster>]> = hierarchies.iter().map(ClusteringHierarchy::levels).collect();
    let k = params.extractor.best_k(params.max_k, &sets, arena);
    debug!(
        "agglomerative batch of {} points over {} hierarchies: k={k}",
        arena.len(),
        sets.len()
    );
    fetch_level(sets[0], k)
        .map(<[Cluster]>::to_vec)
        .ok_or(Error::EmptyInput)
}

/// Runs K-Means for every `k` from `params.max_k` down to one and returns
/// the partition selected by the level extractor.
///
/// # Errors
/// [`Error::EmptyInput`] for an empty arena, or the K-Means configuration
/// error.
pub fn kmeans_best_level(arena: &PointArena, params: &AlgorithmParams) -> Result<Vec<Cluster>> {
    if arena.is_empty() {
        return Err(Error::EmptyInput);
    }
    let upper = params.max_k.min(arena.len());
    let base = KMeansConfig::new(params.max_k.max(1))
        .with_epsilon(params.epsilon)
        .with_point_measure(params.point_measure);
    base.validate()?;

    let partitions: Vec<Vec<Cluster>> = (0..upper)
        .into_par_iter()
        .map(|i| upper - i)
        .map(|k| {
            let mut config = base.clone();
            config.k = k;
            config.seed = params.seed.map(|s| s.wrapping_add(k as u64));
            KMeansClustering::new(config).cluster(arena)
        })
        .collect::<Result<_>>()?;

    let k = params.extractor.best_k(params.max_k, &[partitions.as_slice()], arena);
    debug!("k-means batch of {} points: k={k}", arena.len());
    fetch_level(&partitions, k)
        .map(<[Cluster]>::to_vec)
        .ok_or(Error::EmptyInput)
}
