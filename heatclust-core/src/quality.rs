//! Silhouette-based cluster quality measures.

use crate::arena::{PointArena, PointId};
use crate::cluster::Cluster;
use crate::point::PointMeasure;

/// Mean distance from `id` to the other members of `cluster`.
///
/// The divisor is `size - 1`; a singleton scores zero.
#[must_use]
pub fn mean_in(id: PointId, cluster: &Cluster, arena: &PointArena, measure: PointMeasure) -> f64 {
    if cluster.len() <= 1 {
        return 0.0;
    }
    let point = arena.point(id);
    let total: f64 = cluster
        .iter()
        .filter(|&other| other != id)
        .map(|other| measure.distance(point, arena.point(other)))
        .sum();
    total / (cluster.len() - 1) as f64
}

/// Returns `(b, a)` for point `id` in `level`: the smallest mean distance to
/// any cluster not containing `id`, and the mean distance inside its own
/// cluster. `b` is zero when there is no other cluster.
#[must_use]
pub fn mean_out_min_in(
    id: PointId,
    level: &[Cluster],
    arena: &PointArena,
    measure: PointMeasure,
) -> (f64, f64) {
    let point = arena.point(id);
    let mut mean_out_min: Option<f64> = None;
    let mut mean_inside = 0.0;
    for cluster in level {
        if cluster.has_member(id) {
            mean_inside = mean_in(id, cluster, arena, measure);
        } else if !cluster.is_empty() {
            let mean = cluster
                .iter()
                .map(|other| measure.distance(point, arena.point(other)))
                .sum::<f64>()
                / cluster.len() as f64;
            if mean_out_min.map_or(true, |best| mean < best) {
                mean_out_min = Some(mean);
            }
        }
    }
    (mean_out_min.unwrap_or(0.0), mean_inside)
}

/// Silhouette coefficient `(b - a) / max(a, b)` of one point.
///
/// When both means are zero the unnormalised difference (zero) is returned.
#[must_use]
pub fn point_silhouette(id: PointId, level: &[Cluster], arena: &PointArena, measure: PointMeasure) -> f64 {
    let (b, a) = mean_out_min_in(id, level, arena, measure);
    let max = a.max(b);
    if max == 0.0 {
        b - a
    } else {
        (b - a) / max
    }
}

/// Mean silhouette over the members of `cluster`.
#[must_use]
pub fn cluster_silhouette(
    cluster: &Cluster,
    level: &[Cluster],
    arena: &PointArena,
    measure: PointMeasure,
) -> f64 {
    if cluster.is_empty() {
        return 0.0;
    }
    let total: f64 = cluster
        .iter()
        .map(|id| point_silhouette(id, level, arena, measure))
        .sum();
    total / cluster.len() as f64
}

/// Mean silhouette over every point of a partition.
#[must_use]
pub fn level_silhouette(level: &[Cluster], arena: &PointArena, measure: PointMeasure) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for cluster in level {
        for id in cluster.iter() {
            total += point_silhouette(id, level, arena, measure);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
