//! K-Means clustering with farthest-point seeding.
//!
//! Every returned partition has exactly `k` non-empty clusters: an empty
//! slot after an assignment step steals the member with the highest mean
//! intra-cluster distance from a cluster that can spare one.

use heatclust_core::arena::{PointArena, PointId};
use heatclust_core::cluster::Cluster;
use heatclust_core::error::{Error, Result};
use heatclust_core::point::{Point, PointMeasure};
use heatclust_core::quality::mean_in;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// K-Means parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Convergence bound on the summed centroid shift of one iteration.
    pub epsilon: f64,
    /// Hard cap on assignment/update rounds.
    pub max_iterations: usize,
    /// Seed of the initial centroid pick. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Point distance used for seeding, assignment and repair.
    pub point_measure: PointMeasure,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 5,
            epsilon: 0.01,
            max_iterations: 300,
            seed: None,
            point_measure: PointMeasure::Euclidean,
        }
    }
}

impl KMeansConfig {
    /// Creates a configuration searching for `k` clusters.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Sets the convergence bound.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Fixes the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the point distance.
    #[must_use]
    pub fn with_point_measure(mut self, measure: PointMeasure) -> Self {
        self.point_measure = measure;
        self
    }

    /// Checks the parameters.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for `k == 0`, a negative or non-finite
    /// epsilon, or a zero iteration cap.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::ConfigError("k must be at least 1".into()));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(Error::ConfigError(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::ConfigError("max_iterations must be at least 1".into()));
        }
        Ok(())
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// K-Means over every point of an arena.
#[derive(Clone, Debug)]
pub struct KMeansClustering {
    config: KMeansConfig,
}

impl KMeansClustering {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Partitions every point of `arena` into exactly `k` non-empty clusters.
    ///
    /// # Errors
    /// Returns [`Error::EmptyInput`] for an empty arena,
    /// [`Error::InsufficientPoints`] when `k` exceeds the number of points and
    /// [`Error::ConfigError`] for invalid parameters. No partial result is
    /// produced on error.
    pub fn cluster(&self, arena: &PointArena) -> Result<Vec<Cluster>> {
        self.config.validate()?;
        if arena.is_empty() {
            return Err(Error::EmptyInput);
        }
        let k = self.config.k;
        if k > arena.len() {
            return Err(Error::InsufficientPoints {
                k,
                available: arena.len(),
            });
        }

        let measure = self.config.point_measure;
        let mut rng = self.config.rng();
        let mut centroids = self.seed_centroids(arena, &mut rng);

        let mut iterations = 0;
        loop {
            iterations += 1;
            let clusters = assign(arena, &centroids, measure);
            let updated: Vec<Point> = clusters
                .iter()
                .zip(&centroids)
                .map(|(cluster, old)| cluster.centroid(arena).unwrap_or_else(|| old.clone()))
                .collect();
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| measure.distance(old, new))
                .sum();
            centroids = updated;
            if shift <= self.config.epsilon {
                break;
            }
            if iterations >= self.config.max_iterations {
                warn!(
                    "k-means (k={k}) stopped after {iterations} iterations, centroid shift {shift:.4} > {}",
                    self.config.epsilon
                );
                break;
            }
        }
        debug!("k-means (k={k}) converged after {iterations} iterations");

        Ok(assign(arena, &centroids, measure))
    }

    /// Picks one point at random, then repeatedly the point farthest from
    /// every centroid chosen so far. When every point coincides with a chosen
    /// centroid the next one is again drawn at random.
    fn seed_centroids(&self, arena: &PointArena, rng: &mut StdRng) -> Vec<Point> {
        let k = self.config.k;
        let measure = self.config.point_measure;
        let n = arena.len();
        let mut chosen: Vec<Point> = Vec::with_capacity(k);
        chosen.push(arena.points[rng.gen_range(0..n)].clone());

        while chosen.len() < k {
            let mut farthest: Option<(usize, f64)> = None;
            for (i, point) in arena.points.iter().enumerate() {
                let nearest = chosen
                    .iter()
                    .map(|c| measure.distance(point, c))
                    .fold(f64::MAX, f64::min);
                if nearest > farthest.map_or(0.0, |(_, d)| d) {
                    farthest = Some((i, nearest));
                }
            }
            let next = if let Some((i, _)) = farthest {
                i
            } else {
                debug!("no point left at positive distance, drawing a centroid at random");
                rng.gen_range(0..n)
            };
            chosen.push(arena.points[next].clone());
        }
        chosen
    }
}

/// Assigns every point to its nearest centroid, then repairs empty slots.
///
/// Ties go to the first centroid found, except that an empty slot claims an
/// exact tie.
fn assign(arena: &PointArena, centroids: &[Point], measure: PointMeasure) -> Vec<Cluster> {
    let mut clusters = vec![Cluster::new(); centroids.len()];
    for (id, point, _) in arena.iter() {
        let mut index = 0;
        let mut closest = f64::MAX;
        for (j, centroid) in centroids.iter().enumerate() {
            let d = measure.distance(point, centroid);
            if j == 0 || d < closest {
                index = j;
                closest = d;
            } else if d == closest && clusters[j].is_empty() {
                index = j;
            }
        }
        clusters[index].add_item(id);
    }
    repair(&mut clusters, arena, measure);
    clusters
}

fn repair(clusters: &mut [Cluster], arena: &PointArena, measure: PointMeasure) {
    for empty in 0..clusters.len() {
        if !clusters[empty].is_empty() {
            continue;
        }
        let mut donor: Option<(usize, PointId, f64)> = None;
        for (j, cluster) in clusters.iter().enumerate() {
            if cluster.len() <= 1 {
                continue;
            }
            for id in cluster.iter() {
                let score = mean_in(id, cluster, arena, measure);
                if donor.map_or(true, |(_, _, best)| score >= best) {
                    donor = Some((j, id, score));
                }
            }
        }
        if let Some((j, id, _)) = donor {
            clusters[j].delete_item(id);
            clusters[empty].add_item(id);
        }
    }
}
