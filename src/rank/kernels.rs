/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Rank factors, teleport mass and the per-vertex update kernels.

use crate::graphs::csr::CsrView;
use crate::math::RAYON_MIN_LEN;
use kahan::KahanSum;
use rayon::prelude::*;

/// Fills `f` with the contribution factor of each node: `damping` divided by
/// the outdegree, or 0 for a dangling node.
///
/// The factors are constant for the whole solve.
pub fn factors(f: &mut [f64], outdegrees: &[usize], damping: f64) {
    for (x, &d) in f.iter_mut().zip(outdegrees) {
        *x = if d > 0 { damping / d as f64 } else { 0.0 };
    }
}

/// Parallel version of [`factors`].
pub fn par_factors(f: &mut [f64], outdegrees: &[usize], damping: f64) {
    f.par_iter_mut()
        .with_min_len(RAYON_MIN_LEN)
        .zip(outdegrees.par_iter())
        .for_each(|(x, &d)| {
            *x = if d > 0 { damping / d as f64 } else { 0.0 };
        });
}

/// Returns the common teleport contribution every node receives, including
/// the rank mass of dangling nodes redistributed uniformly.
///
/// When the graph is known to have no dead ends (the drivers add self-loops
/// for this purpose) the callers skip this computation and use the constant
/// `(1 − damping) / n` instead.
pub fn teleport(r: &[f64], outdegrees: &[usize], damping: f64) -> f64 {
    let n = r.len() as f64;
    let mut dangling = KahanSum::<f64>::new();
    for (&rank, &d) in r.iter().zip(outdegrees) {
        if d == 0 {
            dangling += rank;
        }
    }
    (1.0 - damping) / n + damping * dangling.sum() / n
}

/// Parallel version of [`teleport`], using a sum reduction.
pub fn par_teleport(r: &[f64], outdegrees: &[usize], damping: f64) -> f64 {
    let n = r.len() as f64;
    let dangling = r
        .par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .zip(outdegrees.par_iter())
        .filter(|&(_, &d)| d == 0)
        .fold(KahanSum::<f64>::new, |mut sum, (&rank, _)| {
            sum += rank;
            sum
        })
        .reduce(KahanSum::<f64>::new, |a, b| a + b.sum())
        .sum();
    (1.0 - damping) / n + damping * dangling / n
}

/// Contribution-based kernel: returns the new rank of `v` as the teleport
/// mass plus the precomputed contribution `c[u] = r[u]·f[u]` of each in-edge
/// source.
#[inline(always)]
pub fn contribution_rank(c: &[f64], csr: &CsrView, v: usize, c0: f64) -> f64 {
    let mut rank = c0;
    for &u in csr.in_edges(v) {
        rank += c[u];
    }
    rank
}

/// Delta-based kernel: returns the new rank of `v` computed directly from the
/// ranks and factors of its in-edge sources, along with the change from the
/// previous value.
///
/// No contribution vector is maintained; this is the kernel of the in-place
/// and barrier-free sweeps.
#[inline(always)]
pub fn delta_rank(r: &[f64], f: &[f64], csr: &CsrView, v: usize, c0: f64) -> (f64, f64) {
    let mut rank = c0;
    for &u in csr.in_edges(v) {
        rank += r[u] * f[u];
    }
    (rank, rank - r[v])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphs::vec_graph::VecGraph;

    #[test]
    fn test_factors() {
        let mut f = vec![0.0; 3];
        factors(&mut f, &[2, 1, 0], 0.85);
        assert_eq!(f, vec![0.425, 0.85, 0.0]);
        let mut g = vec![0.0; 3];
        par_factors(&mut g, &[2, 1, 0], 0.85);
        assert_eq!(f, g);
    }

    #[test]
    fn test_teleport() {
        let r = [0.25, 0.25, 0.5];
        // No dangling nodes: the teleport is the plain (1 − damping) / n.
        let base = teleport(&r, &[1, 1, 1], 0.85);
        assert!((base - 0.05).abs() < 1e-15);
        // Node 2 dangling: its mass is redistributed.
        let dead = teleport(&r, &[1, 1, 0], 0.85);
        assert!((dead - (0.05 + 0.85 * 0.5 / 3.0)).abs() < 1e-15);
        assert!((dead - par_teleport(&r, &[1, 1, 0], 0.85)).abs() < 1e-15);
    }

    #[test]
    fn test_kernels_agree() {
        let g = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0), (0, 0), (1, 1), (2, 2)]);
        let csr = CsrView::from_transpose(&g.transposed());
        let r = [0.2, 0.3, 0.5];
        let mut f = vec![0.0; 3];
        factors(&mut f, csr.outdegrees(), 0.85);
        let c: Vec<f64> = r.iter().zip(&f).map(|(&a, &b)| a * b).collect();
        for v in 0..3 {
            let (rank, delta) = delta_rank(&r, &f, &csr, v, 0.05);
            assert!((rank - contribution_rank(&c, &csr, v, 0.05)).abs() < 1e-15);
            assert!((delta - (rank - r[v])).abs() < 1e-15);
        }
    }
}
