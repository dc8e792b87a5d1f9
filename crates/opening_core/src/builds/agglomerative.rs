//! # Agglomerative Clustering
//!
//! Bottom-up average-linkage clustering over a precomputed distance matrix.
//!
//! Items carry weights (the number of identical sequences each one stands
//! for); the linkage between two clusters is the weighted mean of all
//! item-pair distances across them, updated with the Lance-Williams rule
//! after every merge.
//!
//! ## Termination
//!
//! Merging continues while more than `max_clusters` clusters remain, or while
//! the closest pair is within `stop_distance`. It stops at one cluster.
//!
//! ## Determinism
//!
//! Every cluster lives in the slot of its lowest item index. Among pairs at
//! the same distance the one with the lowest slot-index sum merges first, then
//! the one with the lowest single slot. Merging is sequential by nature; each
//! row keeps a cached nearest neighbor so a merge costs O(n) plus the rows
//! whose neighbor disappeared.

use super::distance::DistanceMatrix;
use tracing::trace;

const NO_NEIGHBOR: (f64, usize) = (f64::INFINITY, usize::MAX);

struct Workspace {
    n: usize,
    dist: Vec<f64>,
    active: Vec<bool>,
    weight: Vec<usize>,
    members: Vec<Vec<usize>>,
    nearest: Vec<(f64, usize)>,
}

impl Workspace {
    fn d(&self, i: usize, j: usize) -> f64 {
        self.dist[i * self.n + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.dist[i * self.n + j] = value;
        self.dist[j * self.n + i] = value;
    }

    /// Closest active slot to `i`, lowest index on ties.
    fn scan_nearest(&self, i: usize) -> (f64, usize) {
        let mut best = NO_NEIGHBOR;
        for j in 0..self.n {
            if j == i || !self.active[j] {
                continue;
            }
            let d = self.d(i, j);
            if d < best.0 || (d == best.0 && j < best.1) {
                best = (d, j);
            }
        }
        best
    }

    /// Closest pair under the (distance, index sum, lower index) order.
    fn closest_pair(&self) -> Option<(f64, usize, usize)> {
        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..self.n {
            if !self.active[i] {
                continue;
            }
            let (d, j) = self.nearest[i];
            if j == usize::MAX {
                continue;
            }
            let (a, b) = if i < j { (i, j) } else { (j, i) };
            let better = match best {
                None => true,
                Some((bd, ba, bb)) => {
                    d < bd || (d == bd && (a + b < ba + bb || (a + b == ba + bb && a < ba)))
                }
            };
            if better {
                best = Some((d, a, b));
            }
        }
        best
    }

    /// Fold slot `b` into slot `a` (a < b).
    fn merge(&mut self, a: usize, b: usize) {
        let wa = self.weight[a] as f64;
        let wb = self.weight[b] as f64;
        for k in 0..self.n {
            if k == a || k == b || !self.active[k] {
                continue;
            }
            let linked = (wa * self.d(k, a) + wb * self.d(k, b)) / (wa + wb);
            self.set(k, a, linked);
        }

        self.active[b] = false;
        self.weight[a] += self.weight[b];
        let moved = std::mem::take(&mut self.members[b]);
        self.members[a].extend(moved);

        self.nearest[b] = NO_NEIGHBOR;
        self.nearest[a] = self.scan_nearest(a);
        for k in 0..self.n {
            if k == a || !self.active[k] {
                continue;
            }
            let (best_d, best_j) = self.nearest[k];
            if best_j == a || best_j == b {
                self.nearest[k] = self.scan_nearest(k);
            } else {
                // Average linkage never moves a cluster closer than its
                // nearer parent, so only an exact tie can change the answer.
                let d = self.d(k, a);
                if d < best_d || (d == best_d && a < best_j) {
                    self.nearest[k] = (d, a);
                }
            }
        }
    }
}

/// Cluster items `0..matrix.len()`.
///
/// # Arguments
/// * `weights` - Multiplicity of each item, same length as the matrix
/// * `max_clusters` - Upper bound on the number of clusters returned
/// * `stop_distance` - Pairs farther apart than this are not merged once the
///   cluster count is within bound
///
/// # Returns
/// Item indices per cluster, each ascending; clusters ordered by their lowest
/// item.
pub fn agglomerate(
    matrix: &DistanceMatrix,
    weights: &[usize],
    max_clusters: usize,
    stop_distance: f64,
) -> Vec<Vec<usize>> {
    let n = matrix.len();
    debug_assert_eq!(weights.len(), n);
    if n == 0 {
        return Vec::new();
    }

    let mut dist = Vec::with_capacity(n * n);
    for i in 0..n {
        dist.extend_from_slice(matrix.row(i));
    }

    let mut ws = Workspace {
        n,
        dist,
        active: vec![true; n],
        weight: weights.to_vec(),
        members: (0..n).map(|i| vec![i]).collect(),
        nearest: vec![NO_NEIGHBOR; n],
    };
    for i in 0..n {
        ws.nearest[i] = ws.scan_nearest(i);
    }

    let mut active_count = n;
    while active_count > 1 {
        let Some((d, a, b)) = ws.closest_pair() else {
            break;
        };
        if active_count <= max_clusters && d > stop_distance {
            break;
        }
        trace!("merge {} <- {} at {:.4}", a, b, d);
        ws.merge(a, b);
        active_count -= 1;
    }

    (0..n)
        .filter(|&i| ws.active[i])
        .map(|i| {
            let mut members = std::mem::take(&mut ws.members[i]);
            members.sort_unstable();
            members
        })
        .collect()
}
