#![allow(clippy::uninlined_format_args, clippy::cast_possible_wrap)]
use std::collections::HashSet;

use heatclust_algorithms::{
    munkres, AgglomerativeClustering, AgglomerativeConfig, CostMatrix, KMeansClustering,
    KMeansConfig,
};
use heatclust_core::{Cluster, ClusterMeasure, DeltaPoint, PointArena, PointId, PointMeasure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_arena(rng: &mut StdRng, n: usize) -> PointArena {
    let deltas: Vec<_> = (0..n)
        .map(|i| DeltaPoint::new(rng.gen_range(-30.0..30.0), i as i64))
        .collect();
    PointArena::from_deltas(&deltas)
}

fn brute_force_min(matrix: &CostMatrix) -> i64 {
    fn permute(matrix: &CostMatrix, row: usize, used: &mut Vec<bool>, acc: i64, best: &mut i64) {
        let n = matrix.size();
        if row == n {
            *best = (*best).min(acc);
            return;
        }
        for col in 0..n {
            if !used[col] {
                used[col] = true;
                permute(matrix, row + 1, used, acc + matrix.get(row, col), best);
                used[col] = false;
            }
        }
    }
    let mut best = i64::MAX;
    let mut used = vec![false; matrix.size()];
    permute(matrix, 0, &mut used, 0, &mut best);
    best
}

#[test]
fn test_munkres_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(2024);
    for n in 1..=6 {
        for round in 0..40 {
            // small value ranges force many ties and repeated zeros
            let upper = if round % 2 == 0 { 4 } else { 100 };
            let rows: Vec<Vec<i64>> = (0..n)
                .map(|_| (0..n).map(|_| rng.gen_range(0..upper)).collect())
                .collect();
            let matrix = CostMatrix::from_rows(&rows).unwrap();
            let assignment = munkres(&matrix);

            let distinct: HashSet<usize> = assignment.iter().copied().collect();
            assert_eq!(distinct.len(), n, "assignment is not a permutation: {:?}", assignment);
            assert_eq!(
                matrix.cost_of(&assignment),
                brute_force_min(&matrix),
                "suboptimal assignment for {:?}",
                rows
            );
        }
    }
}

#[test]
fn test_kmeans_partitions_every_point_once() {
    let mut rng = StdRng::seed_from_u64(99);
    for n in [1usize, 2, 5, 9, 16] {
        let arena = random_arena(&mut rng, n);
        for k in 1..=n.min(6) {
            for seed in 0..3u64 {
                let config = KMeansConfig::new(k)
                    .with_seed(seed)
                    .with_point_measure(PointMeasure::WeightedEuclidean);
                let clusters = KMeansClustering::new(config).cluster(&arena).unwrap();
                assert_eq!(clusters.len(), k);
                assert!(clusters.iter().all(|c| !c.is_empty()), "empty cluster for n={} k={}", n, k);

                let mut seen = vec![0usize; n];
                for c in &clusters {
                    for id in c.iter() {
                        seen[id.index()] += 1;
                    }
                }
                assert!(seen.iter().all(|&s| s == 1));
            }
        }
    }
}

#[test]
fn test_kmeans_with_duplicates() {
    let deltas: Vec<_> = [1.0, 1.0, 1.0, 2.0, 2.0]
        .iter()
        .enumerate()
        .map(|(i, &v)| DeltaPoint::new(v, i as i64))
        .collect();
    let arena = PointArena::from_deltas(&deltas);
    for k in 1..=5 {
        let clusters = KMeansClustering::new(KMeansConfig::new(k).with_seed(8))
            .cluster(&arena)
            .unwrap();
        assert_eq!(clusters.len(), k);
        assert!(clusters.iter().all(|c| !c.is_empty()));
    }
}

fn member_set(cluster: &Cluster) -> HashSet<PointId> {
    cluster.iter().collect()
}

#[test]
fn test_dendrogram_consistency() {
    let mut rng = StdRng::seed_from_u64(7);
    let measures = [
        ClusterMeasure::SingleLink,
        ClusterMeasure::CompleteLink,
        ClusterMeasure::MeanDistance,
        ClusterMeasure::CentroidDistance,
        ClusterMeasure::CenterVolumeDistance,
    ];
    for n in [1usize, 2, 7, 16] {
        let arena = random_arena(&mut rng, n);
        for measure in measures {
            for point_measure in [PointMeasure::Euclidean, PointMeasure::WeightedEuclidean] {
                let hierarchy = AgglomerativeClustering::new(AgglomerativeConfig::new(measure, point_measure))
                    .build(&arena)
                    .unwrap();
                assert_eq!(hierarchy.len(), n);

                let levels = hierarchy.levels();
                for (i, level) in levels.iter().enumerate() {
                    assert_eq!(level.len(), n - i);
                    let total: usize = level.iter().map(Cluster::len).sum();
                    assert_eq!(total, n);
                }
                for pair in levels.windows(2) {
                    let finer: Vec<HashSet<PointId>> = pair[0].iter().map(member_set).collect();
                    let coarser: Vec<HashSet<PointId>> = pair[1].iter().map(member_set).collect();
                    for cluster in &finer {
                        let parents = coarser.iter().filter(|c| cluster.is_subset(c)).count();
                        assert_eq!(parents, 1, "cluster split across levels ({:?})", measure);
                    }
                }
            }
        }
    }
}
