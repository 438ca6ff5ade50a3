/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Elementwise vector kernels and norms, in sequential and parallel form.
//!
//! The norms measure the difference between two vectors of equal length; the
//! L1 and L2 accumulations are compensated with a [`KahanSum`]. The parallel
//! variants split the input with rayon, with a minimum per-task length so
//! that small vectors are not parallelized.

use kahan::KahanSum;
use rayon::prelude::*;

/// Minimum length of a rayon task.
pub(crate) const RAYON_MIN_LEN: usize = 100_000;

/// Writes the elementwise product of `x` and `y` into `dst`.
pub fn multiply(dst: &mut [f64], x: &[f64], y: &[f64]) {
    debug_assert_eq!(dst.len(), x.len());
    debug_assert_eq!(dst.len(), y.len());
    for ((d, &a), &b) in dst.iter_mut().zip(x).zip(y) {
        *d = a * b;
    }
}

/// Parallel version of [`multiply`].
pub fn par_multiply(dst: &mut [f64], x: &[f64], y: &[f64]) {
    debug_assert_eq!(dst.len(), x.len());
    debug_assert_eq!(dst.len(), y.len());
    dst.par_iter_mut()
        .with_min_len(RAYON_MIN_LEN)
        .zip(x.par_iter())
        .zip(y.par_iter())
        .for_each(|((d, &a), &b)| *d = a * b);
}

/// Returns the L1 norm of `x − y`.
pub fn l1_norm(x: &[f64], y: &[f64]) -> f64 {
    let mut sum = KahanSum::<f64>::new();
    for (&a, &b) in x.iter().zip(y) {
        sum += (a - b).abs();
    }
    sum.sum()
}

/// Returns the L2 norm of `x − y`.
pub fn l2_norm(x: &[f64], y: &[f64]) -> f64 {
    let mut sum = KahanSum::<f64>::new();
    for (&a, &b) in x.iter().zip(y) {
        sum += (a - b) * (a - b);
    }
    sum.sum().sqrt()
}

/// Returns the L∞ norm of `x − y`.
pub fn linf_norm(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&a, &b)| (a - b).abs())
        .fold(0.0, f64::max)
}

/// Parallel version of [`l1_norm`].
pub fn par_l1_norm(x: &[f64], y: &[f64]) -> f64 {
    x.par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .zip(y.par_iter())
        .fold(KahanSum::<f64>::new, |mut sum, (&a, &b)| {
            sum += (a - b).abs();
            sum
        })
        .reduce(KahanSum::<f64>::new, |a, b| a + b.sum())
        .sum()
}

/// Parallel version of [`l2_norm`].
pub fn par_l2_norm(x: &[f64], y: &[f64]) -> f64 {
    x.par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .zip(y.par_iter())
        .fold(KahanSum::<f64>::new, |mut sum, (&a, &b)| {
            sum += (a - b) * (a - b);
            sum
        })
        .reduce(KahanSum::<f64>::new, |a, b| a + b.sum())
        .sum()
        .sqrt()
}

/// Parallel version of [`linf_norm`].
pub fn par_linf_norm(x: &[f64], y: &[f64]) -> f64 {
    x.par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .zip(y.par_iter())
        .map(|(&a, &b)| (a - b).abs())
        .reduce(|| 0.0, f64::max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_multiply() {
        let mut dst = vec![0.0; 3];
        multiply(&mut dst, &[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5]);
        assert_eq!(dst, vec![0.5, 1.0, 1.5]);
        let mut par_dst = vec![0.0; 3];
        par_multiply(&mut par_dst, &[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5]);
        assert_eq!(dst, par_dst);
    }

    #[test]
    fn test_norm_ordering() {
        // For any fixed pair of vectors, L1 ≥ L2 ≥ L∞.
        let x = [0.1, 0.4, 0.2, 0.3];
        let y = [0.25, 0.25, 0.25, 0.25];
        let l1 = l1_norm(&x, &y);
        let l2 = l2_norm(&x, &y);
        let li = linf_norm(&x, &y);
        assert!(l1 >= l2);
        assert!(l2 >= li);
        assert!((l1 - 0.45).abs() < 1e-15);
        assert!((li - 0.15).abs() < 1e-15);
    }

    #[test]
    fn test_par_matches_seq() {
        let x: Vec<f64> = (0..1000).map(|i| (i as f64).sin()).collect();
        let y: Vec<f64> = (0..1000).map(|i| (i as f64).cos()).collect();
        assert!((l1_norm(&x, &y) - par_l1_norm(&x, &y)).abs() < 1e-9);
        assert!((l2_norm(&x, &y) - par_l2_norm(&x, &y)).abs() < 1e-9);
        assert_eq!(linf_norm(&x, &y), par_linf_norm(&x, &y));
    }
}
