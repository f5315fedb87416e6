//! Cluster bag and cluster-to-cluster distance measures.
//!
//! A [`Cluster`] only stores `PointId`s; every statistic is computed against
//! the [`PointArena`] that owns the points. Statistics are computed on demand
//! and never cached, so a cluster can be mutated freely between queries.

use crate::arena::{PointArena, PointId};
use crate::error::{Error, Result};
use crate::point::{Point, PointMeasure};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mutable bag of point ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    members: Vec<PointId>,
}

/// The largest pairwise distance inside a cluster and the two points realising it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diameter {
    pub value: f64,
    pub extremes: (PointId, PointId),
}

/// The largest centroid-to-member distance and the member realising it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radius {
    pub value: f64,
    pub satellite: PointId,
}

/// Every derived statistic of a cluster in one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProperties {
    pub size: usize,
    pub centroid: Point,
    /// Largest member timestamp.
    pub timestamp: i64,
    pub diameter: Diameter,
    pub radius: Radius,
    /// `size / diameter`, `+inf` when the diameter is zero.
    pub density: f64,
    pub average_pair_distance: f64,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cluster with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
        }
    }

    /// Creates a single-member cluster.
    #[must_use]
    pub fn singleton(id: PointId) -> Self {
        Self { members: vec![id] }
    }

    /// Adds a point id. O(1).
    pub fn add_item(&mut self, id: PointId) {
        self.members.push(id);
    }

    /// Removes the first occurrence of `id`. A no-op when absent.
    pub fn delete_item(&mut self, id: PointId) {
        if let Some(pos) = self.members.iter().position(|&m| m == id) {
            self.members.remove(pos);
        }
    }

    /// Returns true if `id` is a member.
    #[must_use]
    pub fn has_member(&self, id: PointId) -> bool {
        self.members.contains(&id)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in insertion order.
    #[must_use]
    pub fn members(&self) -> &[PointId] {
        &self.members
    }

    /// Returns an iterator over the member ids.
    pub fn iter(&self) -> impl Iterator<Item = PointId> + '_ {
        self.members.iter().copied()
    }

    /// Returns a new cluster holding the union of both memberships.
    #[must_use]
    pub fn combine_with(&self, other: &Cluster) -> Cluster {
        let mut members = Vec::with_capacity(self.len() + other.len());
        members.extend_from_slice(&self.members);
        members.extend_from_slice(&other.members);
        Cluster { members }
    }

    /// Per-dimension mean of the members as a fresh point. `None` when empty.
    #[must_use]
    pub fn centroid(&self, arena: &PointArena) -> Option<Point> {
        let (&first, rest) = self.members.split_first()?;
        let mut centroid = arena.point(first).clone();
        for &id in rest {
            centroid.add_point(arena.point(id));
        }
        centroid.normalize(self.len() as f64);
        Some(centroid)
    }

    /// Largest member timestamp. `None` when empty.
    #[must_use]
    pub fn timestamp(&self, arena: &PointArena) -> Option<i64> {
        self.iter().map(|id| arena.timestamp(id)).max()
    }

    /// Maximum pairwise distance and the first pair found realising it.
    ///
    /// A singleton has diameter zero with both extremes on its only member.
    #[must_use]
    pub fn diameter(&self, arena: &PointArena, measure: PointMeasure) -> Option<Diameter> {
        let first = *self.members.first()?;
        let mut best = Diameter {
            value: 0.0,
            extremes: (first, first),
        };
        for (i, &a) in self.members.iter().enumerate() {
            for &b in &self.members[i + 1..] {
                let d = measure.distance(arena.point(a), arena.point(b));
                if d > best.value {
                    best = Diameter {
                        value: d,
                        extremes: (a, b),
                    };
                }
            }
        }
        Some(best)
    }

    /// Maximum distance from the centroid to a member, and that member.
    #[must_use]
    pub fn radius(&self, arena: &PointArena, measure: PointMeasure) -> Option<Radius> {
        let centroid = self.centroid(arena)?;
        let mut best = Radius {
            value: 0.0,
            satellite: self.members[0],
        };
        for id in self.iter() {
            let d = measure.distance(arena.point(id), &centroid);
            if d > best.value {
                best = Radius {
                    value: d,
                    satellite: id,
                };
            }
        }
        Some(best)
    }

    /// `size / diameter`.
    ///
    /// A cluster whose members all coincide has diameter zero and therefore
    /// infinite density. That value is returned as is. An empty cluster has
    /// density zero.
    #[must_use]
    pub fn density(&self, arena: &PointArena, measure: PointMeasure) -> f64 {
        match self.diameter(arena, measure) {
            Some(diameter) => self.len() as f64 / diameter.value,
            None => 0.0,
        }
    }

    /// Mean distance over all unordered member pairs, zero below two members.
    #[must_use]
    pub fn average_pair_distance(&self, arena: &PointArena, measure: PointMeasure) -> f64 {
        let n = self.len();
        let pairs = n * n.saturating_sub(1) / 2;
        if pairs == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for (i, &a) in self.members.iter().enumerate() {
            for &b in &self.members[i + 1..] {
                total += measure.distance(arena.point(a), arena.point(b));
            }
        }
        total / pairs as f64
    }

    /// Distance to `other` under the given cluster measure.
    #[must_use]
    pub fn distance_to(
        &self,
        other: &Cluster,
        arena: &PointArena,
        cluster_measure: ClusterMeasure,
        point_measure: PointMeasure,
    ) -> f64 {
        cluster_measure.distance(self, other, arena, point_measure)
    }

    /// All statistics at once.
    ///
    /// # Errors
    /// Returns [`Error::EmptyCluster`] for an empty cluster.
    pub fn properties(&self, arena: &PointArena, measure: PointMeasure) -> Result<ClusterProperties> {
        let centroid = self.centroid(arena).ok_or(Error::EmptyCluster)?;
        let timestamp = self.timestamp(arena).ok_or(Error::EmptyCluster)?;
        let diameter = self.diameter(arena, measure).ok_or(Error::EmptyCluster)?;
        let radius = self.radius(arena, measure).ok_or(Error::EmptyCluster)?;
        Ok(ClusterProperties {
            size: self.len(),
            centroid,
            timestamp,
            diameter,
            radius,
            density: self.len() as f64 / diameter.value,
            average_pair_distance: self.average_pair_distance(arena, measure),
        })
    }
}

impl FromIterator<PointId> for Cluster {
    fn from_iter<I: IntoIterator<Item = PointId>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

/// Cluster-to-cluster distance strategy.
///
/// Distances involving an empty cluster are `f64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClusterMeasure {
    /// Minimum distance over all cross pairs.
    #[default]
    SingleLink,
    /// Maximum distance over all cross pairs.
    CompleteLink,
    /// Mean distance over all cross pairs.
    MeanDistance,
    /// Distance between the two centroids.
    CentroidDistance,
    /// `sqrt(|c_a - c_b|^2 + (n_a - n_b)^2)`: centroid gap plus size gap, with
    /// the cluster size treated as an extra coordinate.
    CenterVolumeDistance,
    /// `|n_a - n_b|`: size gap only.
    VolumeDistance,
}

impl ClusterMeasure {
    /// Every measure, in declaration order.
    pub const ALL: [ClusterMeasure; 6] = [
        Self::SingleLink,
        Self::CompleteLink,
        Self::MeanDistance,
        Self::CentroidDistance,
        Self::CenterVolumeDistance,
        Self::VolumeDistance,
    ];

    /// Distance between `a` and `b`.
    #[must_use]
    pub fn distance(self, a: &Cluster, b: &Cluster, arena: &PointArena, measure: PointMeasure) -> f64 {
        if a.is_empty() || b.is_empty() {
            return f64::MAX;
        }
        let cross = || {
            a.iter().flat_map(move |x| {
                b.iter()
                    .map(move |y| measure.distance(arena.point(x), arena.point(y)))
            })
        };
        match self {
            Self::SingleLink => cross().fold(f64::INFINITY, f64::min),
            Self::CompleteLink => cross().fold(f64::NEG_INFINITY, f64::max),
            Self::MeanDistance => cross().sum::<f64>() / (a.len() * b.len()) as f64,
            Self::CentroidDistance => match (a.centroid(arena), b.centroid(arena)) {
                (Some(ca), Some(cb)) => measure.distance(&ca, &cb),
                _ => f64::MAX,
            },
            Self::CenterVolumeDistance => match (a.centroid(arena), b.centroid(arena)) {
                (Some(ca), Some(cb)) => {
                    let size_gap = a.len() as f64 - b.len() as f64;
                    (ca.powered_distance_to(&cb, 2.0) + size_gap * size_gap).sqrt()
                }
                _ => f64::MAX,
            },
            Self::VolumeDistance => (a.len() as f64 - b.len() as f64).abs(),
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleLink => "single-link",
            Self::CompleteLink => "complete-link",
            Self::MeanDistance => "mean-distance",
            Self::CentroidDistance => "centroid-distance",
            Self::CenterVolumeDistance => "center-volume-distance",
            Self::VolumeDistance => "volume-distance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::DeltaPoint;
    use approx::assert_relative_eq;

    fn arena(values: &[f64]) -> PointArena {
        let deltas: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DeltaPoint::new(v, 100 + i as i64))
            .collect();
        PointArena::from_deltas(&deltas)
    }

    fn ids(range: std::ops::Range<usize>) -> Cluster {
        range.map(PointId).collect()
    }

    #[test]
    fn test_add_and_delete() {
        let mut c = Cluster::new();
        c.add_item(PointId(3));
        c.add_item(PointId(7));
        c.delete_item(PointId(42));
        assert_eq!(c.len(), 2);
        c.delete_item(PointId(3));
        assert_eq!(c.members(), &[PointId(7)]);
        assert!(!c.has_member(PointId(3)));
    }

    #[test]
    fn test_centroid_is_fresh_point() {
        let arena = arena(&[1.0, 2.0, 6.0]);
        let c = ids(0..3);
        let centroid = c.centroid(&arena).unwrap();
        assert_relative_eq!(centroid.value(0).unwrap(), 3.0);
        assert_eq!(arena.point(PointId(0)), &Point::scalar(1.0));
        assert!(Cluster::new().centroid(&arena).is_none());
        assert_eq!(c.timestamp(&arena), Some(102));
    }

    #[test]
    fn test_diameter_and_radius() {
        let arena = arena(&[1.0, 2.0, 6.0, 6.0]);
        let c = ids(0..4);
        let diameter = c.diameter(&arena, PointMeasure::Euclidean).unwrap();
        assert_relative_eq!(diameter.value, 5.0);
        // first maximal pair wins
        assert_eq!(diameter.extremes, (PointId(0), PointId(2)));

        let radius = c.radius(&arena, PointMeasure::Euclidean).unwrap();
        assert_relative_eq!(radius.value, 2.75);
        assert_eq!(radius.satellite, PointId(0));
    }

    #[test]
    fn test_density_of_coincident_points_is_infinite() {
        let arena = arena(&[4.0, 4.0]);
        let c = ids(0..2);
        assert!(c.density(&arena, PointMeasure::Euclidean).is_infinite());
        let spread = self::arena(&[0.0, 2.0]);
        assert_relative_eq!(ids(0..2).density(&spread, PointMeasure::Euclidean), 1.0);
    }

    #[test]
    fn test_average_pair_distance() {
        let arena = arena(&[0.0, 1.0, 3.0]);
        let c = ids(0..3);
        assert_relative_eq!(c.average_pair_distance(&arena, PointMeasure::Euclidean), 2.0);
        assert_relative_eq!(ids(0..1).average_pair_distance(&arena, PointMeasure::Euclidean), 0.0);
    }

    #[test]
    fn test_combine_does_not_mutate_inputs() {
        let a = ids(0..2);
        let b = ids(2..3);
        let combined = a.combine_with(&b);
        assert_eq!(combined.len(), 3);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_cluster_measures() {
        let arena = arena(&[0.0, 1.0, 4.0, 6.0, 7.0]);
        let a = ids(0..2);
        let b = ids(2..5);
        let m = PointMeasure::Euclidean;
        assert_relative_eq!(ClusterMeasure::SingleLink.distance(&a, &b, &arena, m), 3.0);
        assert_relative_eq!(ClusterMeasure::CompleteLink.distance(&a, &b, &arena, m), 7.0);
        assert_relative_eq!(ClusterMeasure::MeanDistance.distance(&a, &b, &arena, m), 31.0 / 6.0);
        let gap = 17.0 / 3.0 - 0.5;
        assert_relative_eq!(ClusterMeasure::CentroidDistance.distance(&a, &b, &arena, m), gap);
        assert_relative_eq!(
            ClusterMeasure::CenterVolumeDistance.distance(&a, &b, &arena, m),
            (gap * gap + 1.0).sqrt()
        );
        assert_relative_eq!(ClusterMeasure::VolumeDistance.distance(&a, &b, &arena, m), 1.0);
        assert_relative_eq!(
            ClusterMeasure::SingleLink.distance(&a, &Cluster::new(), &arena, m),
            f64::MAX
        );
    }

    #[test]
    fn test_properties() {
        let arena = arena(&[2.0, 4.0]);
        let props = ids(0..2).properties(&arena, PointMeasure::Euclidean).unwrap();
        assert_eq!(props.size, 2);
        assert_relative_eq!(props.centroid.value(0).unwrap(), 3.0);
        assert_eq!(props.timestamp, 101);
        assert_relative_eq!(props.diameter.value, 2.0);
        assert_relative_eq!(props.radius.value, 1.0);
        assert_relative_eq!(props.density, 1.0);
        assert_relative_eq!(props.average_pair_distance, 2.0);
        assert_eq!(
            Cluster::new().properties(&arena, PointMeasure::Euclidean),
            Err(Error::EmptyCluster)
        );
    }
}
