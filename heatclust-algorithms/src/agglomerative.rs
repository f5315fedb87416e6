//! Agglomerative hierarchical clustering.
//!
//! Starts from singletons and repeatedly merges the globally closest pair of
//! clusters. Pair distances live in a min-heap keyed by an integer-scaled
//! distance; entries that reference an already merged cluster are dropped
//! lazily when popped.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use heatclust_core::arena::PointArena;
use heatclust_core::cluster::{Cluster, ClusterMeasure};
use heatclust_core::error::{Error, Result};
use heatclust_core::point::PointMeasure;
use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale applied to cluster distances before they become heap priorities.
pub const PRIORITY_SCALE: f64 = 2048.0;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgglomerativeConfig {
    pub cluster_measure: ClusterMeasure,
    pub point_measure: PointMeasure,
    /// Integer resolution of the merge order.
    pub priority_scale: f64,
}

impl Default for AgglomerativeConfig {
    fn default() -> Self {
        Self {
            cluster_measure: ClusterMeasure::SingleLink,
            point_measure: PointMeasure::Euclidean,
            priority_scale: PRIORITY_SCALE,
        }
    }
}

impl AgglomerativeConfig {
    #[must_use]
    pub fn new(cluster_measure: ClusterMeasure, point_measure: PointMeasure) -> Self {
        Self {
            cluster_measure,
            point_measure,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_cluster_measure(mut self, measure: ClusterMeasure) -> Self {
        self.cluster_measure = measure;
        self
    }

    #[must_use]
    pub fn with_point_measure(mut self, measure: PointMeasure) -> Self {
        self.point_measure = measure;
        self
    }

    #[must_use]
    pub fn with_priority_scale(mut self, scale: f64) -> Self {
        self.priority_scale = scale;
        self
    }
}

/// Ordered partitions of one point universe.
///
/// For `n` points there are `n` levels and level `i` holds `n - i` clusters.
/// Level 0 is all singletons, the last level a single cluster.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusteringHierarchy {
    levels: Vec<Vec<Cluster>>,
}

impl ClusteringHierarchy {
    /// Wraps levels ordered by decreasing cluster count.
    #[must_use]
    pub fn from_levels(levels: Vec<Vec<Cluster>>) -> Self {
        Self { levels }
    }

    #[must_use]
    pub fn levels(&self) -> &[Vec<Cluster>] {
        &self.levels
    }

    #[must_use]
    pub fn into_levels(self) -> Vec<Vec<Cluster>> {
        self.levels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The first level holding exactly `k` clusters.
    #[must_use]
    pub fn level_with_k(&self, k: usize) -> Option<&[Cluster]> {
        self.levels
            .iter()
            .find(|level| level.len() == k)
            .map(Vec::as_slice)
    }
}

type HeapEntry = Reverse<(i64, u64, usize, usize)>;

pub struct AgglomerativeClustering {
    config: AgglomerativeConfig,
}

impl AgglomerativeClustering {
    pub fn new(config: AgglomerativeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgglomerativeConfig {
        &self.config
    }

    /// Builds the full hierarchy over every point of `arena`.
    ///
    /// Each new level lists the freshly merged cluster first, followed by the
    /// surviving clusters in creation order. Equal priorities resolve in
    /// insertion order, so the result is deterministic.
    ///
    /// # Errors
    /// Returns [`Error::EmptyInput`] for an empty arena.
    pub fn build(&self, arena: &PointArena) -> Result<ClusteringHierarchy> {
        if arena.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut slab: Vec<Option<Cluster>> = arena.ids().map(|id| Some(Cluster::singleton(id))).collect();
        let mut alive: Vec<usize> = (0..slab.len()).collect();
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(slab.len() * slab.len() / 2);
        let mut seq = 0u64;

        for i in 0..slab.len() {
            for j in i + 1..slab.len() {
                self.push_pair(&mut heap, &mut seq, &slab, i, j, arena);
            }
        }

        let mut levels = Vec::with_capacity(arena.len());
        levels.push(alive.iter().filter_map(|&i| slab[i].clone()).collect::<Vec<_>>());

        while alive.len() > 1 {
            let Some(Reverse((priority, _, a, b))) = heap.pop() else {
                break;
            };
            if slab[a].is_none() || slab[b].is_none() {
                continue;
            }
            let (Some(left), Some(right)) = (slab[a].take(), slab[b].take()) else {
                continue;
            };
            trace!("merging clusters {a} and {b} at priority {priority}");

            let merged = left.combine_with(&right);
            let merged_idx = slab.len();
            slab.push(Some(merged));
            alive.retain(|&i| i != a && i != b);

            let mut level = Vec::with_capacity(alive.len() + 1);
            level.extend(slab[merged_idx].clone());
            level.extend(alive.iter().filter_map(|&i| slab[i].clone()));
            levels.push(level);

            for &other in &alive {
                self.push_pair(&mut heap, &mut seq, &slab, merged_idx, other, arena);
            }
            alive.push(merged_idx);
        }

        Ok(ClusteringHierarchy { levels })
    }

    fn push_pair(
        &self,
        heap: &mut BinaryHeap<HeapEntry>,
        seq: &mut u64,
        slab: &[Option<Cluster>],
        a: usize,
        b: usize,
        arena: &PointArena,
    ) {
        let (Some(left), Some(right)) = (&slab[a], &slab[b]) else {
            return;
        };
        let distance = left.distance_to(right, arena, self.config.cluster_measure, self.config.point_measure);
        let priority = (distance * self.config.priority_scale) as i64;
        heap.push(Reverse((priority, *seq, a, b)));
        *seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatclust_core::arena::PointId;
    use heatclust_core::point::DeltaPoint;

    fn arena(values: &[f64]) -> PointArena {
        let deltas: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DeltaPoint::new(v, i as i64))
            .collect();
        PointArena::from_deltas(&deltas)
    }

    #[test]
    fn test_level_sizes() {
        let arena = arena(&[1.0, 5.0, 2.0, 9.0, 9.5]);
        let hierarchy = AgglomerativeClustering::new(AgglomerativeConfig::default())
            .build(&arena)
            .unwrap();
        assert_eq!(hierarchy.len(), 5);
        for (i, level) in hierarchy.levels().iter().enumerate() {
            assert_eq!(level.len(), 5 - i);
        }
    }

    #[test]
    fn test_first_merge_is_closest_pair() {
        let arena = arena(&[1.0, 5.0, 2.0, 9.0, 9.2]);
        let hierarchy = AgglomerativeClustering::new(AgglomerativeConfig::default())
            .build(&arena)
            .unwrap();
        let merged = &hierarchy.levels()[1][0];
        assert_eq!(merged.members(), &[PointId(3), PointId(4)]);
        let two = hierarchy.level_with_k(2).unwrap();
        let mut sizes: Vec<usize> = two.iter().map(Cluster::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 3]);
    }

    #[test]
    fn test_single_point() {
        let arena = arena(&[3.0]);
        let hierarchy = AgglomerativeClustering::new(AgglomerativeConfig::default())
            .build(&arena)
            .unwrap();
        assert_eq!(hierarchy.len(), 1);
        assert_eq!(hierarchy.level_with_k(1).unwrap()[0].len(), 1);
        assert!(hierarchy.level_with_k(2).is_none());
    }

    #[test]
    fn test_empty_input() {
        let algo = AgglomerativeClustering::new(AgglomerativeConfig::default());
        assert_eq!(algo.build(&PointArena::new()), Err(Error::EmptyInput));
    }
}
