//! Buckets: time-stamped clustering summaries of a fixed number of
//! observations.

use crate::summary::{BucketSummary, ClusterSummary};
use heatclust_core::arena::PointArena;
use heatclust_core::cluster::Cluster;
use heatclust_core::error::Result;

/// A clustering of `itemcount` observations.
///
/// `record` always holds the cluster summaries. Small buckets also keep the
/// raw points so a merge can recluster them from scratch.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Largest member timestamp.
    pub timestamp: i64,
    /// Number of observations summarised; also the bucket's size class.
    pub itemcount: usize,
    pub record: Vec<ClusterSummary>,
    points: Option<PointArena>,
}

impl Bucket {
    /// Builds a bucket from a partition of `arena`.
    ///
    /// Empty clusters are skipped. When `retain_points` is false the arena is
    /// dropped and only summaries are kept.
    ///
    /// # Errors
    /// Propagates summary errors.
    pub fn from_clusters(arena: PointArena, clusters: &[Cluster], retain_points: bool) -> Result<Self> {
        let record = clusters
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| ClusterSummary::from_cluster(c, &arena))
            .collect::<Result<Vec<_>>>()?;
        let mut bucket = Self::from_summaries(record);
        if retain_points {
            bucket.points = Some(arena);
        }
        Ok(bucket)
    }

    /// Builds a summary-only bucket.
    #[must_use]
    pub fn from_summaries(record: Vec<ClusterSummary>) -> Self {
        let timestamp = record.iter().map(|c| c.timestamp).max().unwrap_or(i64::MIN);
        let itemcount = record.iter().map(|c| c.size).sum();
        Self {
            timestamp,
            itemcount,
            record,
            points: None,
        }
    }

    /// Raw points, if still retained.
    #[must_use]
    pub fn points(&self) -> Option<&PointArena> {
        self.points.as_ref()
    }

    #[must_use]
    pub fn has_points(&self) -> bool {
        self.points.is_some()
    }

    /// Number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.record.len()
    }

    #[must_use]
    pub fn summary(&self) -> BucketSummary {
        BucketSummary::from_record(&self.record, self.timestamp)
    }
}
