//! Cluster and bucket summaries.
//!
//! A [`ClusterSummary`] retains the statistics of a cluster after its raw
//! points are gone. Summaries combine without the points: the centroid is
//! size-weighted, the diameter and radius are estimated from the retained
//! extremal points. A [`BucketSummary`] condenses a whole bucket into the
//! 4-dimensional point `[center, noise, mean diameter, k]` handed to
//! consumers.

use heatclust_core::arena::PointArena;
use heatclust_core::cluster::Cluster;
use heatclust_core::error::Result;
use heatclust_core::point::{Point, PointMeasure};
use serde::{Deserialize, Serialize};

/// Distance used for every summary statistic.
pub const SUMMARY_MEASURE: PointMeasure = PointMeasure::Euclidean;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub size: usize,
    pub centroid: Point,
    /// Largest member timestamp.
    pub timestamp: i64,
    pub diameter: f64,
    /// The two members realising the diameter.
    pub extremes: (Point, Point),
    pub radius: f64,
    /// The member realising the radius.
    pub satellite: Point,
    /// `size / diameter`; infinite for a zero diameter.
    pub density: f64,
    pub average_pair_distance: f64,
}

impl ClusterSummary {
    /// Summarises `cluster`.
    ///
    /// # Errors
    /// [`heatclust_core::Error::EmptyCluster`] for an empty cluster.
    pub fn from_cluster(cluster: &Cluster, arena: &PointArena) -> Result<Self> {
        let props = cluster.properties(arena, SUMMARY_MEASURE)?;
        let (lo, hi) = props.diameter.extremes;
        Ok(Self {
            size: props.size,
            centroid: props.centroid,
            timestamp: props.timestamp,
            diameter: props.diameter.value,
            extremes: (arena.point(lo).clone(), arena.point(hi).clone()),
            radius: props.radius.value,
            satellite: arena.point(props.radius.satellite).clone(),
            density: props.density,
            average_pair_distance: props.average_pair_distance,
        })
    }

    /// Combines two summaries into a new one. Neither input is modified.
    #[must_use]
    pub fn combine(&self, other: &ClusterSummary) -> ClusterSummary {
        let size = self.size + other.size;
        let mut centroid = self.centroid.origin();
        centroid.add_weighted_point(&self.centroid, self.size as f64);
        centroid.add_weighted_point(&other.centroid, other.size as f64);
        centroid.normalize(size as f64);

        let candidates = [
            &self.extremes.0,
            &self.extremes.1,
            &other.extremes.0,
            &other.extremes.1,
        ];
        let mut diameter = self.diameter.max(other.diameter);
        let mut extremes = if self.diameter >= other.diameter {
            self.extremes.clone()
        } else {
            other.extremes.clone()
        };
        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                let d = SUMMARY_MEASURE.distance(a, b);
                if d > diameter {
                    diameter = d;
                    extremes = ((*a).clone(), (*b).clone());
                }
            }
        }

        let mut radius = 0.0;
        let mut satellite = self.satellite.clone();
        for p in candidates.into_iter().chain([&self.satellite, &other.satellite]) {
            let d = SUMMARY_MEASURE.distance(p, &centroid);
            if d > radius {
                radius = d;
                satellite = p.clone();
            }
        }

        // within-pair sums are exact, cross pairs are estimated by the
        // centroid gap
        let pairs = |n: usize| (n * n.saturating_sub(1) / 2) as f64;
        let cross = (self.size * other.size) as f64;
        let total_pairs = pairs(size);
        let average_pair_distance = if total_pairs > 0.0 {
            (pairs(self.size) * self.average_pair_distance
                + pairs(other.size) * other.average_pair_distance
                + cross * SUMMARY_MEASURE.distance(&self.centroid, &other.centroid))
                / total_pairs
        } else {
            0.0
        };

        ClusterSummary {
            size,
            centroid,
            timestamp: self.timestamp.max(other.timestamp),
            diameter,
            extremes,
            radius,
            satellite,
            density: size as f64 / diameter,
            average_pair_distance,
        }
    }

    /// Centroid distance to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &ClusterSummary) -> f64 {
        SUMMARY_MEASURE.distance(&self.centroid, &other.centroid)
    }
}

/// The consumer-facing summary of one finalized bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    /// First coordinate of the size-weighted center of all cluster centroids.
    pub center: f64,
    /// Size-weighted mean distance of the cluster centroids from the center.
    /// The weighted sum is divided by the item count, not the cluster count.
    pub noise: f64,
    /// Mean cluster diameter.
    pub mean_diameter: f64,
    /// Number of clusters.
    pub k: usize,
    pub timestamp: i64,
    pub itemcount: usize,
}

impl BucketSummary {
    /// Summarises a bucket record. An empty record yields all zeros.
    #[must_use]
    pub fn from_record(record: &[ClusterSummary], timestamp: i64) -> Self {
        let itemcount: usize = record.iter().map(|c| c.size).sum();
        let center = weighted_center(record);
        let (noise, center_value) = match &center {
            Some(center) if itemcount > 0 => {
                let spread: f64 = record
                    .iter()
                    .map(|c| SUMMARY_MEASURE.distance(&c.centroid, center) * c.size as f64)
                    .sum();
                (spread / itemcount as f64, center.value(0).unwrap_or_default())
            }
            _ => (0.0, 0.0),
        };
        let mean_diameter = if record.is_empty() {
            0.0
        } else {
            record.iter().map(|c| c.diameter).sum::<f64>() / record.len() as f64
        };
        Self {
            center: center_value,
            noise,
            mean_diameter,
            k: record.len(),
            timestamp,
            itemcount,
        }
    }

    /// The summary as the point `[center, noise, mean diameter, k]`.
    #[must_use]
    pub fn to_point(&self) -> Point {
        Point::new(vec![self.center, self.noise, self.mean_diameter, self.k as f64])
    }
}

fn weighted_center(record: &[ClusterSummary]) -> Option<Point> {
    let first = record.first()?;
    let total: usize = record.iter().map(|c| c.size).sum();
    let mut center = first.centroid.origin();
    for c in record {
        center.add_weighted_point(&c.centroid, c.size as f64);
    }
    center.normalize(total as f64);
    Some(center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use heatclust_core::point::DeltaPoint;

    fn summary(values: &[f64], t0: i64) -> ClusterSummary {
        let deltas: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DeltaPoint::new(v, t0 + i as i64))
            .collect();
        let arena = PointArena::from_deltas(&deltas);
        let cluster: Cluster = arena.ids().collect();
        ClusterSummary::from_cluster(&cluster, &arena).unwrap()
    }

    #[test]
    fn test_from_cluster() {
        let s = summary(&[1.0, 3.0, 2.0], 10);
        assert_eq!(s.size, 3);
        assert_relative_eq!(s.centroid.value(0).unwrap(), 2.0);
        assert_eq!(s.timestamp, 12);
        assert_relative_eq!(s.diameter, 2.0);
        assert_eq!(s.extremes, (Point::scalar(1.0), Point::scalar(3.0)));
        assert_relative_eq!(s.radius, 1.0);
        assert_relative_eq!(s.density, 1.5);
    }

    #[test]
    fn test_empty_cluster_is_rejected() {
        let arena = PointArena::new();
        assert!(ClusterSummary::from_cluster(&Cluster::new(), &arena).is_err());
    }

    #[test]
    fn test_combine() {
        let a = summary(&[0.0, 2.0], 100);
        let b = summary(&[10.0, 10.0, 12.0, 12.0], 50);
        let c = a.combine(&b);
        assert_eq!(c.size, 6);
        assert_relative_eq!(c.centroid.value(0).unwrap(), (2.0 + 44.0) / 6.0);
        assert_eq!(c.timestamp, 101);
        assert_relative_eq!(c.diameter, 12.0);
        assert_relative_eq!(c.density, 0.5);
        assert!(c.radius >= c.diameter / 2.0 - 1e-9);
        // inputs untouched
        assert_eq!(a.size, 2);
        assert_eq!(b.size, 4);
    }

    #[test]
    fn test_bucket_summary() {
        let a = summary(&[0.0, 2.0], 0);
        let b = summary(&[10.0, 10.0, 12.0, 12.0], 0);
        let bucket = BucketSummary::from_record(&[a, b], 77);
        assert_eq!(bucket.k, 2);
        assert_eq!(bucket.itemcount, 6);
        assert_relative_eq!(bucket.center, 46.0 / 6.0);
        let expected_noise = (2.0 * (46.0 / 6.0 - 1.0) + 4.0 * (11.0 - 46.0 / 6.0)) / 6.0;
        assert_relative_eq!(bucket.noise, expected_noise);
        assert_relative_eq!(bucket.mean_diameter, 2.0);
        assert_eq!(bucket.to_point().dimensions(), 4);
        assert_relative_eq!(bucket.to_point().value(3).unwrap(), 2.0);
    }
}
