//! # Sequence Distance
//!
//! Weighted edit distance over `(token, run_length)` steps:
//!
//! | operation | cost |
//! |---|---|
//! | insert / delete a step | `indel` |
//! | substitute, different token | `token_mismatch` |
//! | substitute, same token, different run | `run_mismatch * |r1 - r2| / max(r1, r2)` |
//!
//! Building the same things in the same order with different quantities is
//! cheap; different order or different units is expensive. The clusterer
//! divides by the longer sequence's length so one threshold fits both short
//! and long openings.

use crate::config::EditCosts;
use crate::models::BuildStep;
use rayon::prelude::*;

pub fn substitution_cost(a: &BuildStep, b: &BuildStep, costs: &EditCosts) -> f64 {
    if a.unit_token != b.unit_token {
        return costs.token_mismatch;
    }
    if a.run_length == b.run_length {
        return 0.0;
    }
    let lo = a.run_length.min(b.run_length) as f64;
    let hi = a.run_length.max(b.run_length) as f64;
    costs.run_mismatch * (hi - lo) / hi
}

/// Raw weighted edit distance (two-row dynamic programme).
pub fn edit_distance(a: &[BuildStep], b: &[BuildStep], costs: &EditCosts) -> f64 {
    let mut prev: Vec<f64> = (0..=b.len()).map(|j| j as f64 * costs.indel).collect();
    let mut curr = vec![0.0; b.len() + 1];

    for (i, step_a) in a.iter().enumerate() {
        curr[0] = (i + 1) as f64 * costs.indel;
        for (j, step_b) in b.iter().enumerate() {
            let substitute = prev[j] + substitution_cost(step_a, step_b, costs);
            let delete = prev[j + 1] + costs.indel;
            let insert = curr[j] + costs.indel;
            curr[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Edit distance divided by the longer length; 0.0 for two empty sequences.
pub fn sequence_distance(a: &[BuildStep], b: &[BuildStep], costs: &EditCosts) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    edit_distance(a, b, costs) / longest as f64
}

/// Symmetric pairwise distance matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute all pairs. Rows are filled in parallel.
    pub fn compute(sequences: &[&[BuildStep]], costs: &EditCosts) -> Self {
        let n = sequences.len();

        // Upper triangle, one row per task
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| sequence_distance(sequences[i], sequences[j], costs))
                    .collect()
            })
            .collect();

        let mut data = vec![0.0; n * n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &d) in row.iter().enumerate() {
                let j = i + 1 + offset;
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }

        Self { n, data }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }
}
