//! # Position Clusterer
//!
//! Density-based clustering (DBSCAN) over normalized spawn coordinates.
//!
//! A point is a core point when at least `min_samples` points, itself
//! included, lie within `eps`. Clusters are the maximal sets reachable through
//! chains of core points; border points join the first cluster that reaches
//! them; everything else is noise.
//!
//! Points are visited in input order and neighbor lists are sorted, so the
//! partition is fully determined by input order and parameters. Cluster ids are
//! discovery order and carry no meaning until the labeler names them.
//!
//! Region queries go through a uniform grid with `eps`-sized cells, which keeps
//! each query to the 3x3 block of cells around the point.

use crate::models::MapPoint;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Result of one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityClustering {
    /// Cluster id per input point, `None` for noise.
    pub labels: Vec<Option<usize>>,
    /// Mean of member coordinates, indexed by cluster id.
    pub centroids: Vec<MapPoint>,
    pub member_counts: Vec<usize>,
}

impl DensityClustering {
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }

    /// Input indices of each cluster's members, ascending.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.cluster_count()];
        for (idx, label) in self.labels.iter().enumerate() {
            if let Some(cluster) = label {
                members[*cluster].push(idx);
            }
        }
        members
    }

    /// Clusters as sorted member sets, independent of id numbering.
    pub fn partition(&self) -> Vec<Vec<usize>> {
        let mut sets = self.members();
        sets.sort();
        sets
    }
}

struct GridIndex<'a> {
    points: &'a [MapPoint],
    eps: f64,
    eps_sq: f64,
    cells: FxHashMap<(i64, i64), Vec<usize>>,
}

impl<'a> GridIndex<'a> {
    fn new(points: &'a [MapPoint], eps: f64) -> Self {
        let mut cells: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
        for (idx, p) in points.iter().enumerate() {
            cells.entry(Self::cell_of(p, eps)).or_default().push(idx);
        }
        Self {
            points,
            eps,
            eps_sq: eps * eps,
            cells,
        }
    }

    /// Float-to-int casts saturate, so a tiny `eps` clamps far cells to the
    /// i64 range without breaking adjacency.
    fn cell_of(p: &MapPoint, eps: f64) -> (i64, i64) {
        ((p.x / eps).floor() as i64, (p.z / eps).floor() as i64)
    }

    /// Indices within `eps` of point `idx` (itself included), ascending.
    fn neighbors(&self, idx: usize) -> Vec<usize> {
        let p = &self.points[idx];
        let (cx, cz) = Self::cell_of(p, self.eps);
        let mut found = Vec::new();

        for dx in -1..=1 {
            for dz in -1..=1 {
                // Saturated cells at the i64 edge have no neighbor beyond it.
                let (Some(nx), Some(nz)) = (cx.checked_add(dx), cz.checked_add(dz)) else {
                    continue;
                };
                let Some(bucket) = self.cells.get(&(nx, nz)) else {
                    continue;
                };
                for &other in bucket {
                    let q = &self.points[other];
                    let d_sq = (p.x - q.x).powi(2) + (p.z - q.z).powi(2);
                    if d_sq <= self.eps_sq {
                        found.push(other);
                    }
                }
            }
        }

        found.sort_unstable();
        found
    }
}

/// Grow `cluster` outward from a core point's neighborhood.
///
/// A point is claimed when it is queued, so each point enters the queue at
/// most once. Returns the number of points queued.
fn expand_cluster(
    grid: &GridIndex<'_>,
    seed_neighbors: Vec<usize>,
    cluster: usize,
    min_samples: usize,
    labels: &mut [Option<usize>],
    visited: &mut [bool],
) -> usize {
    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut queued = 0usize;
    let mut claim = |k: usize, labels: &mut [Option<usize>], queue: &mut VecDeque<usize>| {
        if labels[k].is_none() {
            labels[k] = Some(cluster);
            queue.push_back(k);
            queued += 1;
        }
    };

    for k in seed_neighbors {
        claim(k, labels, &mut queue);
    }
    while let Some(idx) = queue.pop_front() {
        // Already-visited points were noise; they stay border points.
        if visited[idx] {
            continue;
        }
        visited[idx] = true;

        let neighbors = grid.neighbors(idx);
        if neighbors.len() >= min_samples {
            for k in neighbors {
                claim(k, labels, &mut queue);
            }
        }
    }
    queued
}

/// Run DBSCAN over `points`.
///
/// # Arguments
/// * `eps` - Neighborhood radius, must be positive
/// * `min_samples` - Neighborhood size (self included) that makes a core point
pub fn dbscan(points: &[MapPoint], eps: f64, min_samples: usize) -> DensityClustering {
    let n = points.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut cluster_count = 0usize;

    let grid = GridIndex::new(points, eps);

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        let seed_neighbors = grid.neighbors(seed);
        if seed_neighbors.len() < min_samples {
            // Noise for now; a later cluster may still claim it as border.
            continue;
        }

        let cluster = cluster_count;
        cluster_count += 1;
        labels[seed] = Some(cluster);
        expand_cluster(&grid, seed_neighbors, cluster, min_samples, &mut labels, &mut visited);
    }

    let mut sums = vec![(0.0f64, 0.0f64); cluster_count];
    let mut member_counts = vec![0usize; cluster_count];
    for (p, label) in points.iter().zip(&labels) {
        if let Some(cluster) = label {
            sums[*cluster].0 += p.x;
            sums[*cluster].1 += p.z;
            member_counts[*cluster] += 1;
        }
    }
    let centroids = sums
        .iter()
        .zip(&member_counts)
        .map(|(&(sx, sz), &count)| MapPoint::new(sx / count as f64, sz / count as f64))
        .collect();

    DensityClustering {
        labels,
        centroids,
        member_counts,
    }
}
