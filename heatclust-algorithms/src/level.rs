//! Level extraction: choosing the number of clusters.
//!
//! A candidate set is any list of partitions over the same arena, either an
//! agglomerative hierarchy or one K-Means partition per `k`. Every candidate
//! `k <= max_k` is scored across all candidate sets and the best one wins.
//! Ties go to the larger `k`.

use heatclust_core::arena::PointArena;
use heatclust_core::cluster::Cluster;
use heatclust_core::point::PointMeasure;
use heatclust_core::quality::level_silhouette;
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LevelHeuristic {
    /// Mean silhouette coefficient per level, summed over candidate sets.
    #[default]
    Silhouette,
    /// Growth of the summed cluster diameter when one more merge is made,
    /// relative to the diameter of the single-cluster level. Experimental.
    DiameterGrowth,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelExtractor {
    pub heuristic: LevelHeuristic,
    /// Distance used for scoring.
    pub point_measure: PointMeasure,
}

impl Default for LevelExtractor {
    fn default() -> Self {
        Self {
            heuristic: LevelHeuristic::Silhouette,
            point_measure: PointMeasure::Euclidean,
        }
    }
}

impl LevelExtractor {
    #[must_use]
    pub fn new(heuristic: LevelHeuristic) -> Self {
        Self {
            heuristic,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_point_measure(mut self, measure: PointMeasure) -> Self {
        self.point_measure = measure;
        self
    }

    /// Picks the best `k` in `1..=max_k`.
    ///
    /// Only `k` values present in at least one candidate set compete. The
    /// single-cluster partition scores zero; it is chosen when every finer
    /// partition scores below zero or no finer partition exists.
    #[must_use]
    pub fn best_k(&self, max_k: usize, candidates: &[&[Vec<Cluster>]], arena: &PointArena) -> usize {
        let scores = self.scores(max_k, candidates, arena);
        let mut best: Option<(usize, f64)> = None;
        for &(k, score) in scores.iter().rev() {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((k, score));
            }
        }
        let k = best.map_or(1, |(k, _)| k);
        debug!(
            "level scores {:?} ({:?}): picked k={k}",
            scores
                .iter()
                .map(|(k, s)| format!("{k}:{s:.3}"))
                .collect::<Vec<_>>(),
            self.heuristic
        );
        k
    }

    /// Scores of every competing `k`, in increasing `k`.
    #[must_use]
    pub fn scores(&self, max_k: usize, candidates: &[&[Vec<Cluster>]], arena: &PointArena) -> Vec<(usize, f64)> {
        (1..=max_k.max(1))
            .into_par_iter()
            .filter_map(|k| {
                let levels: Vec<(&[Vec<Cluster>], &[Cluster])> = candidates
                    .iter()
                    .filter_map(|set| exact_level(set, k).map(|level| (*set, level)))
                    .collect();
                if levels.is_empty() {
                    return None;
                }
                if k == 1 {
                    return Some((k, 0.0));
                }
                let score: f64 = levels
                    .iter()
                    .map(|(set, level)| self.score_level(set, level, k, arena))
                    .sum();
                Some((k, score))
            })
            .collect()
    }

    fn score_level(&self, set: &[Vec<Cluster>], level: &[Cluster], k: usize, arena: &PointArena) -> f64 {
        match self.heuristic {
            LevelHeuristic::Silhouette => level_silhouette(level, arena, self.point_measure),
            LevelHeuristic::DiameterGrowth => {
                let Some(coarser) = exact_level(set, k - 1) else {
                    return 0.0;
                };
                let whole = exact_level(set, 1).map_or(0.0, |l| self.summed_diameter(l, arena));
                if whole == 0.0 {
                    return 0.0;
                }
                (self.summed_diameter(coarser, arena) - self.summed_diameter(level, arena)) / whole
            }
        }
    }

    fn summed_diameter(&self, level: &[Cluster], arena: &PointArena) -> f64 {
        level
            .iter()
            .filter_map(|c| c.diameter(arena, self.point_measure))
            .map(|d| d.value)
            .sum()
    }
}

fn exact_level(set: &[Vec<Cluster>], k: usize) -> Option<&[Cluster]> {
    set.iter().find(|level| level.len() == k).map(Vec::as_slice)
}

/// Returns the partition with exactly `k` clusters, or else the finest
/// partition with fewer than `k` clusters, or else the coarsest available.
#[must_use]
pub fn fetch_level(set: &[Vec<Cluster>], k: usize) -> Option<&[Cluster]> {
    let k = k.max(1);
    if let Some(level) = exact_level(set, k) {
        return Some(level);
    }
    set.iter()
        .filter(|level| level.len() < k)
        .max_by_key(|level| level.len())
        .or_else(|| set.iter().min_by_key(|level| level.len()))
        .map(Vec::as_slice)
}
