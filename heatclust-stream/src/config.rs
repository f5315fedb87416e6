//! Learner configuration.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use heatclust_algorithms::AlgorithmParams;
use heatclust_core::cluster::ClusterMeasure;
use heatclust_core::point::PointMeasure;
use serde::{Deserialize, Serialize};

/// Parameters of the stream learner, fixed at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Maximum number of clusters per bucket (K).
    pub max_clusters: usize,
    /// K-Means convergence bound.
    pub epsilon: f64,
    /// Observations per initial bucket (p).
    pub batch_size: usize,
    /// Length of one oracle window in seconds.
    pub sampling_period_secs: u32,
    /// Overlap of successive oracle windows in seconds.
    pub overlap_secs: u32,
    /// Largest size class; bigger buckets are never created.
    pub max_bucket_size: usize,
    /// Merges reaching this combined size keep cluster identities.
    pub identity_merge_threshold: usize,
    /// Merges reaching this combined size recluster with K-Means, smaller
    /// ones agglomeratively.
    pub recluster_kmeans_threshold: usize,
    /// Number of bucket summaries kept by the learner.
    pub summary_history: usize,
    /// Seed for K-Means reclustering.
    pub seed: Option<u64>,
    /// Rounds of the identity merge before it falls back to reclustering
    /// cluster summaries.
    pub max_merge_rounds: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            max_clusters: 5,
            epsilon: 0.01,
            batch_size: 16,
            sampling_period_secs: 14,
            overlap_secs: 6,
            max_bucket_size: 512,
            identity_merge_threshold: 64,
            recluster_kmeans_threshold: 32,
            summary_history: 600,
            seed: None,
            max_merge_rounds: 16,
        }
    }
}

impl LearnerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_clusters(mut self, k: usize) -> Self {
        self.max_clusters = k;
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, p: usize) -> Self {
        self.batch_size = p;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, period_secs: u32, overlap_secs: u32) -> Self {
        self.sampling_period_secs = period_secs;
        self.overlap_secs = overlap_secs;
        self
    }

    #[must_use]
    pub fn with_max_bucket_size(mut self, size: usize) -> Self {
        self.max_bucket_size = size;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_max_merge_rounds(mut self, rounds: usize) -> Self {
        self.max_merge_rounds = rounds;
        self
    }

    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values. The result is validated.
    ///
    /// # Errors
    /// I/O, JSON or validation errors.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parameters.
    ///
    /// # Errors
    /// [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.max_clusters == 0 {
            return Err(Error::Config("max_clusters must be at least 1".into()));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(Error::Config(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.sampling_period_secs <= self.overlap_secs {
            return Err(Error::Config(format!(
                "sampling period ({}s) must exceed the overlap ({}s)",
                self.sampling_period_secs, self.overlap_secs
            )));
        }
        if self.batch_size > self.max_bucket_size {
            return Err(Error::Config(format!(
                "batch_size {} exceeds max_bucket_size {}",
                self.batch_size, self.max_bucket_size
            )));
        }
        if self.max_bucket_size % self.batch_size != 0
            || !(self.max_bucket_size / self.batch_size).is_power_of_two()
        {
            return Err(Error::Config(format!(
                "max_bucket_size {} must be batch_size {} times a power of two",
                self.max_bucket_size, self.batch_size
            )));
        }
        if self.recluster_kmeans_threshold > self.identity_merge_threshold {
            return Err(Error::Config(
                "recluster_kmeans_threshold must not exceed identity_merge_threshold".into(),
            ));
        }
        if self.max_merge_rounds == 0 {
            return Err(Error::Config("max_merge_rounds must be at least 1".into()));
        }
        Ok(())
    }

    /// Seconds between two oracle requests.
    #[must_use]
    pub fn request_interval_secs(&self) -> u32 {
        self.sampling_period_secs.saturating_sub(self.overlap_secs)
    }

    /// Maximum bucket age in seconds.
    ///
    /// A batch of `p` observations takes `p * (period - overlap)` seconds to
    /// fill. Size classes double from `p` up to `max_bucket_size`; with at
    /// most two residents per class the retained history spans
    /// `2 * sum(2^i)` batches over all classes.
    #[must_use]
    pub fn time_horizon_secs(&self) -> i64 {
        let batch_secs = self.batch_size as i64 * i64::from(self.request_interval_secs());
        let classes = size_classes(self.batch_size, self.max_bucket_size);
        let batches: i64 = (0..classes).map(|i| 1i64 << i).sum();
        batch_secs * 2 * batches
    }

    /// Whether a bucket of `itemcount` points keeps its raw points: true when
    /// merging it with a same-sized bucket would still recluster.
    #[must_use]
    pub fn retains_points(&self, itemcount: usize) -> bool {
        itemcount.saturating_mul(2) < self.identity_merge_threshold
    }

    /// Clustering parameters for initial buckets and reclustering merges.
    #[must_use]
    pub fn algorithm_params(&self) -> AlgorithmParams {
        AlgorithmParams {
            max_k: self.max_clusters,
            epsilon: self.epsilon,
            seed: self.seed,
            point_measure: PointMeasure::WeightedEuclidean,
            cluster_measures: vec![
                ClusterMeasure::SingleLink,
                ClusterMeasure::MeanDistance,
                ClusterMeasure::CompleteLink,
            ],
            ..AlgorithmParams::default()
        }
    }
}

/// Number of size classes `p, 2p, 4p, ..., max`.
fn size_classes(batch_size: usize, max_bucket_size: usize) -> u32 {
    if batch_size == 0 || max_bucket_size < batch_size {
        return 0;
    }
    (max_bucket_size / batch_size).ilog2() + 1
}
