use log::debug;
use nalgebra as na;
use rayon::prelude::*;

/// One neighbor returned by a search: a train row and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Nearest train descriptor for one query descriptor, plus the runner-up
/// distance needed by the ratio test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
    pub second_distance: Option<f32>,
}

/// k-nearest-neighbor search over descriptor rows.
pub trait NearestNeighborSearch: Send + Sync {
    /// For every query row, up to `k` train rows in non-decreasing distance.
    fn knn(&self, query: &na::DMatrix<f32>, train: &na::DMatrix<f32>, k: usize)
    -> Vec<Vec<Neighbor>>;
}

/// Exhaustive L2 search, parallel over query rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceSearch;

impl NearestNeighborSearch for BruteForceSearch {
    fn knn(
        &self,
        query: &na::DMatrix<f32>,
        train: &na::DMatrix<f32>,
        k: usize,
    ) -> Vec<Vec<Neighbor>> {
        if query.ncols() != train.ncols() {
            debug!(
                "descriptor widths differ ({} vs {}), nothing to match",
                query.ncols(),
                train.ncols()
            );
            return vec![Vec::new(); query.nrows()];
        }
        (0..query.nrows())
            .into_par_iter()
            .map(|qi| {
                let q = query.row(qi);
                let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
                for ti in 0..train.nrows() {
                    let distance = q
                        .iter()
                        .zip(train.row(ti).iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f32>()
                        .sqrt();
                    // Strict comparison keeps the lower train index on ties.
                    let pos = best.partition_point(|n| n.distance <= distance);
                    if pos < k {
                        best.insert(pos, Neighbor { index: ti, distance });
                        best.truncate(k);
                    }
                }
                best
            })
            .collect()
    }
}

/// Runs a 2-NN search and keeps the best neighbor of every query row.
pub fn knn_match(
    search: &dyn NearestNeighborSearch,
    query: &na::DMatrix<f32>,
    train: &na::DMatrix<f32>,
) -> Vec<MatchCandidate> {
    search
        .knn(query, train, 2)
        .into_iter()
        .enumerate()
        .filter_map(|(query_idx, neighbors)| {
            let first = neighbors.first()?;
            Some(MatchCandidate {
                query_idx,
                train_idx: first.index,
                distance: first.distance,
                second_distance: neighbors.get(1).map(|n| n.distance),
            })
        })
        .collect()
}
