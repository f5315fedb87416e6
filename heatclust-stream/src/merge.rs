//! Bucket merge protocol.
//!
//! Two buckets are merged according to their combined size:
//!
//! - at or above `identity_merge_threshold` (or when a bucket no longer holds
//!   its raw points) clusters keep their identity: an optimal assignment
//!   pairs the clusters of both buckets, pairs that pass the local
//!   optimality test are combined and the rest are matched again in further
//!   rounds;
//! - at or above `recluster_kmeans_threshold` the raw points are reclustered
//!   with K-Means;
//! - below that they are reclustered agglomeratively.

use crate::bucket::Bucket;
use crate::config::LearnerConfig;
use crate::error::Result;
use crate::summary::ClusterSummary;
use heatclust_algorithms::{cluster_best_level, munkres, ClusteringAlgorithm, CostMatrix, DISTANCE_SCALE};
use log::{debug, warn};

/// Merges `a` and `b` into a new bucket. Neither input is modified.
///
/// The result always summarises `a.itemcount + b.itemcount` observations.
///
/// # Errors
/// Propagates clustering errors.
pub fn merge_buckets(a: &Bucket, b: &Bucket, config: &LearnerConfig) -> Result<Bucket> {
    let combined = a.itemcount + b.itemcount;
    let raw = a.points().zip(b.points());
    let merged = match raw {
        Some((points_a, points_b)) if combined < config.identity_merge_threshold => {
            let mut arena = points_a.clone();
            arena.append(points_b);
            let algorithm = if combined >= config.recluster_kmeans_threshold {
                ClusteringAlgorithm::KMeans
            } else {
                ClusteringAlgorithm::Agglomerative
            };
            let clusters = cluster_best_level(&arena, algorithm, &config.algorithm_params())?;
            debug!(
                "reclustered {} + {} points with {algorithm:?} into {} clusters",
                a.itemcount,
                b.itemcount,
                clusters.len()
            );
            Bucket::from_clusters(arena, &clusters, config.retains_points(combined))?
        }
        _ => Bucket::from_summaries(identity_merge(
            &a.record,
            &b.record,
            config.max_clusters,
            config.max_merge_rounds,
        )?),
    };
    debug_assert_eq!(merged.itemcount, combined);
    Ok(merged)
}

/// Identity-preserving merge of two cluster records.
///
/// Rounds of [`combine_round`] run until no cluster is held back. When the
/// rounds are exhausted, each cluster still held back is combined into the
/// nearest merged cluster. If more than `max_k` clusters remain, the closest
/// summaries are combined until at most `max_k` are left.
///
/// # Errors
/// [`heatclust_core::Error::InvalidCostMatrix`] for non-finite centroid
/// distances.
pub fn identity_merge(
    a: &[ClusterSummary],
    b: &[ClusterSummary],
    max_k: usize,
    max_rounds: usize,
) -> Result<Vec<ClusterSummary>> {
    let (mut next, mut backup) = combine_round(a, b)?;
    let mut rounds = 1;
    while !backup.is_empty() && rounds < max_rounds {
        (next, backup) = combine_round(&next, &backup)?;
        rounds += 1;
    }
    if !backup.is_empty() {
        warn!(
            "identity merge still holds back {} clusters after {rounds} rounds, absorbing them",
            backup.len()
        );
        next = absorb_held_back(next, backup);
    }
    if next.len() > max_k {
        debug!("identity merge produced {} clusters, reducing to {max_k}", next.len());
        next = recluster_summaries(next, max_k);
    }
    Ok(next)
}

/// Builds the Munkres input for two records: centroid distances scaled by
/// [`DISTANCE_SCALE`], padded to square.
///
/// # Errors
/// [`heatclust_core::Error::InvalidCostMatrix`] for non-finite distances.
pub fn cost_matrix(a: &[ClusterSummary], b: &[ClusterSummary]) -> Result<CostMatrix> {
    let rows: Vec<Vec<f64>> = a
        .iter()
        .map(|ca| b.iter().map(|cb| ca.distance_to(cb)).collect())
        .collect();
    Ok(CostMatrix::from_distances(&rows, DISTANCE_SCALE)?)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Origin {
    A(usize),
    B(usize),
}

/// One round of the identity merge. Returns the merged record and the
/// clusters held back for the next round.
fn combine_round(
    a: &[ClusterSummary],
    b: &[ClusterSummary],
) -> Result<(Vec<ClusterSummary>, Vec<ClusterSummary>)> {
    if a.is_empty() || b.is_empty() {
        return Ok(([a, b].concat(), Vec::new()));
    }
    let assignment = munkres(&cost_matrix(a, b)?);
    let mut next = Vec::with_capacity(a.len().max(b.len()));
    let mut backup = Vec::new();
    let mut held_back: Vec<Origin> = Vec::new();

    for (i, &j) in assignment.iter().enumerate() {
        match (a.get(i), b.get(j)) {
            (Some(ca), Some(cb)) => {
                let benchmark = ca.distance_to(cb);
                if let Some(neighbour) = closer_neighbour(a, i, benchmark) {
                    // the neighbour of `ca` is closer; keep `ca` back unless
                    // its neighbour is already waiting there
                    if held_back.contains(&Origin::A(neighbour)) {
                        next.push(ca.clone());
                        backup.push(cb.clone());
                        held_back.push(Origin::B(j));
                    } else {
                        backup.push(ca.clone());
                        held_back.push(Origin::A(i));
                        next.push(cb.clone());
                    }
                } else if let Some(neighbour) = closer_neighbour(b, j, benchmark) {
                    if held_back.contains(&Origin::B(neighbour)) {
                        backup.push(ca.clone());
                        held_back.push(Origin::A(i));
                        next.push(cb.clone());
                    } else {
                        next.push(ca.clone());
                        backup.push(cb.clone());
                        held_back.push(Origin::B(j));
                    }
                } else {
                    next.push(ca.combine(cb));
                }
            }
            (Some(c), None) | (None, Some(c)) => next.push(c.clone()),
            (None, None) => {}
        }
    }
    Ok((next, backup))
}

/// Index of the cluster in `record` nearest to `record[index]` if it is
/// strictly closer than `benchmark`.
fn closer_neighbour(record: &[ClusterSummary], index: usize, benchmark: f64) -> Option<usize> {
    let candidate = &record[index];
    let mut best = benchmark;
    let mut nearest = None;
    for (i, other) in record.iter().enumerate() {
        if i == index {
            continue;
        }
        let d = candidate.distance_to(other);
        if d < best {
            best = d;
            nearest = Some(i);
        }
    }
    nearest
}

/// Combines every summary of `held` into the summary of `next` with the
/// nearest centroid. An empty `next` takes `held` as it is.
fn absorb_held_back(mut next: Vec<ClusterSummary>, held: Vec<ClusterSummary>) -> Vec<ClusterSummary> {
    if next.is_empty() {
        return held;
    }
    for cluster in held {
        let nearest = next
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.distance_to(&cluster)))
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map_or(0, |(i, _)| i);
        next[nearest] = next[nearest].combine(&cluster);
    }
    next
}

/// Combines the two summaries with the closest centroids until at most
/// `max_k` remain. The combined summary takes the place of the first one.
#[must_use]
pub fn recluster_summaries(mut record: Vec<ClusterSummary>, max_k: usize) -> Vec<ClusterSummary> {
    let target = max_k.max(1);
    while record.len() > target {
        let mut closest = (0, 1, f64::INFINITY);
        for i in 0..record.len() {
            for j in i + 1..record.len() {
                let d = record[i].distance_to(&record[j]);
                if d < closest.2 {
                    closest = (i, j, d);
                }
            }
        }
        let (i, j, _) = closest;
        let absorbed = record.remove(j);
        record[i] = record[i].combine(&absorbed);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatclust_core::arena::PointArena;
    use heatclust_core::cluster::Cluster;
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

    fn total(record: &[ClusterSummary]) -> usize {
        record.iter().map(|c| c.size).sum()
    }

    #[test]
    fn test_cost_matrix_is_padded() {
        let a = vec![summary(&[0.0], 0), summary(&[1.0], 0)];
        let b = vec![summary(&[0.5], 0)];
        let m = cost_matrix(&a, &b).unwrap();
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(0, 0), 64);
        assert_eq!(m.get(1, 0), 64);
        assert_eq!(m.get(0, 1), 0);
    }

    #[test]
    fn test_identity_merge_pairs_matching_clusters() {
        let a = vec![summary(&[0.0, 1.0], 0), summary(&[20.0, 21.0], 0)];
        let b = vec![summary(&[20.5, 21.5], 10), summary(&[0.5, 1.5], 10)];
        let merged = identity_merge(&a, &b, 5, 16).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(total(&merged), 8);
        let mut centers: Vec<f64> = merged.iter().map(|c| c.centroid.value(0).unwrap()).collect();
        centers.sort_by(f64::total_cmp);
        assert!((centers[0] - 0.75).abs() < 1e-9);
        assert!((centers[1] - 20.75).abs() < 1e-9);
    }

    #[test]
    fn test_identity_merge_holds_back_bad_pairs() {
        // two close clusters in `a` and a single far one in `b`
        let a = vec![summary(&[0.0], 0), summary(&[1.0], 0)];
        let b = vec![summary(&[50.0], 0)];
        let mut merged = identity_merge(&a, &b, 5, 16).unwrap();
        merged.sort_by(|x, y| x.centroid.value(0).unwrap().total_cmp(&y.centroid.value(0).unwrap()));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].size, 2);
        assert_eq!(merged[1].size, 1);
        assert!((merged[0].centroid.value(0).unwrap() - 0.5).abs() < 1e-9);
        assert!((merged[1].centroid.value(0).unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_merge_absorbs_held_back_after_last_round() {
        // one round only: `1.0` is still held back and joins its neighbour `0.0`
        let a = vec![summary(&[0.0], 0), summary(&[1.0], 0)];
        let b = vec![summary(&[50.0], 0)];
        let mut merged = identity_merge(&a, &b, 5, 1).unwrap();
        merged.sort_by(|x, y| x.centroid.value(0).unwrap().total_cmp(&y.centroid.value(0).unwrap()));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].size, 2);
        assert!((merged[0].centroid.value(0).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(merged[1].size, 1);
        assert!((merged[1].centroid.value(0).unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_merge_respects_max_k() {
        let a: Vec<_> = (0..4).map(|i| summary(&[f64::from(i) * 10.0], 0)).collect();
        let b: Vec<_> = (0..4).map(|i| summary(&[f64::from(i) * 10.0 + 5.0], 0)).collect();
        for rounds in [1, 16] {
            let merged = identity_merge(&a, &b, 3, rounds).unwrap();
            assert!(merged.len() <= 3);
            assert_eq!(total(&merged), 8);
        }
    }

    #[test]
    fn test_recluster_summaries() {
        let record = vec![
            summary(&[0.0], 0),
            summary(&[10.0], 0),
            summary(&[0.5], 0),
            summary(&[10.5], 0),
        ];
        let reduced = recluster_summaries(record, 2);
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].size, 2);
        assert!((reduced[0].centroid.value(0).unwrap() - 0.25).abs() < 1e-9);
        assert!((reduced[1].centroid.value(0).unwrap() - 10.25).abs() < 1e-9);
    }

    fn batch_bucket(values: &[f64], t0: i64, config: &LearnerConfig) -> Bucket {
        let deltas: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DeltaPoint::new(v, t0 + i as i64))
            .collect();
        let arena = PointArena::from_deltas(&deltas);
        let clusters = cluster_best_level(&arena, ClusteringAlgorithm::Agglomerative, &config.algorithm_params())
            .unwrap();
        Bucket::from_clusters(arena, &clusters, config.retains_points(values.len())).unwrap()
    }

    #[test]
    fn test_merge_conserves_itemcount_in_every_tier() {
        let config = LearnerConfig::default().with_seed(3);
        let values: Vec<f64> = (0..32).map(|i| f64::from(i % 7) * 3.0 - 9.0).collect();
        for size in [8usize, 16, 32] {
            let a = batch_bucket(&values[..size], 0, &config);
            let b = batch_bucket(&values[..size], 1000, &config);
            let merged = merge_buckets(&a, &b, &config).unwrap();
            assert_eq!(merged.itemcount, 2 * size);
            assert!(merged.k() <= config.max_clusters);
            assert_eq!(merged.timestamp, 1000 + size as i64 - 1);
            assert_eq!(merged.has_points(), config.retains_points(2 * size));
        }
    }
}
