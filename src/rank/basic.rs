/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The basic synchronous loop, sequential and parallel.
//!
//! Every iteration updates all ranks, refreshes the error estimate and checks
//! it against the tolerance; all workers agree on the iteration count. The
//! `IN_PLACE` parameter selects between the double-buffered sweep, in which
//! new ranks are published by swapping the buffers at the iteration boundary,
//! and the in-place sweep, in which every rank write is immediately visible
//! (a Gauss–Seidel-style update).

use super::kernels;
use super::worker::{VertexHook, Worker};
use super::{LoopCtx, Norm};
use crate::math;
use crossbeam_utils::CachePadded;
use kahan::KahanSum;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use sync_cell_slice::SyncSlice;

/// A per-norm accumulator for the error of one in-place sweep.
///
/// The in-place sweep overwrites the previous ranks as it goes, so the error
/// of the iteration is accumulated from the per-vertex changes instead of
/// being computed between two buffers; the result is the same norm of the
/// difference between successive iterates.
pub(crate) enum ErrAcc {
    L1(KahanSum<f64>),
    L2(KahanSum<f64>),
    LInf(f64),
}

impl ErrAcc {
    pub(crate) fn new(norm: Norm) -> Self {
        match norm {
            Norm::L1 => Self::L1(KahanSum::new()),
            Norm::L2 => Self::L2(KahanSum::new()),
            _ => Self::LInf(0.0),
        }
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, delta: f64) {
        match self {
            Self::L1(sum) => *sum += delta.abs(),
            Self::L2(sum) => *sum += delta * delta,
            Self::LInf(max) => *max = max.max(delta.abs()),
        }
    }

    pub(crate) fn merge(&mut self, other: Self) {
        match (self, other) {
            (Self::L1(sum), Self::L1(other)) => *sum += other.sum(),
            (Self::L2(sum), Self::L2(other)) => *sum += other.sum(),
            (Self::LInf(max), Self::LInf(other)) => *max = max.max(other),
            _ => unreachable!("mismatched error accumulators"),
        }
    }

    pub(crate) fn finish(&self) -> f64 {
        match self {
            Self::L1(sum) => sum.sum(),
            Self::L2(sum) => sum.sum().sqrt(),
            Self::LInf(max) => *max,
        }
    }
}

/// Returns the selected norm of `x − y`; anything but L1 and L2 falls back to
/// L∞.
pub(crate) fn error(x: &[f64], y: &[f64], norm: Norm) -> f64 {
    match norm {
        Norm::L1 => math::l1_norm(x, y),
        Norm::L2 => math::l2_norm(x, y),
        _ => math::linf_norm(x, y),
    }
}

/// Parallel version of [`error`].
pub(crate) fn par_error(x: &[f64], y: &[f64], norm: Norm) -> f64 {
    match norm {
        Norm::L1 => math::par_l1_norm(x, y),
        Norm::L2 => math::par_l2_norm(x, y),
        _ => math::par_linf_norm(x, y),
    }
}

/// Sequential basic loop. Returns the number of iterations performed.
pub(crate) fn basic_seq<const IN_PLACE: bool, const DEAD: bool, H: VertexHook>(
    ctx: &LoopCtx,
    a: &mut Vec<f64>,
    r: &mut Vec<f64>,
    c: &mut [f64],
    f: &[f64],
    workers: &mut [CachePadded<Worker>],
    hook: &H,
) -> usize {
    let n = ctx.csr.num_nodes();
    let outdegrees = ctx.csr.outdegrees();
    let worker = &mut workers[0];
    let mut l = 0;
    while l < ctx.max_iterations {
        let c0 = if DEAD {
            kernels::teleport(r, outdegrees, ctx.damping)
        } else {
            (1.0 - ctx.damping) / n as f64
        };
        let err;
        if IN_PLACE {
            let mut acc = ErrAcc::new(ctx.norm);
            for v in 0..n {
                let (new, delta) = kernels::delta_rank(r, f, ctx.csr, v, c0);
                r[v] = new;
                acc.push(delta);
                hook.on_vertex(worker, v);
            }
            l += 1;
            err = acc.finish();
        } else {
            for v in 0..n {
                a[v] = kernels::contribution_rank(c, ctx.csr, v, c0);
                hook.on_vertex(worker, v);
            }
            l += 1;
            math::multiply(c, a, f);
            err = error(a, r, ctx.norm);
            std::mem::swap(a, r);
        }
        if err < ctx.tolerance {
            break;
        }
    }
    l
}

/// Parallel basic loop. Returns the number of iterations performed.
///
/// The sweep is dynamically scheduled: workers grab chunks of
/// `ctx.granularity` nodes from a shared cursor until the range is exhausted,
/// and join at the end of the sweep, so every iteration is still a
/// synchronous step.
pub(crate) fn basic_par<const IN_PLACE: bool, const DEAD: bool, H: VertexHook + Sync>(
    ctx: &LoopCtx,
    a: &mut Vec<f64>,
    r: &mut Vec<f64>,
    c: &mut [f64],
    f: &[f64],
    workers: &mut [CachePadded<Worker>],
    hook: &H,
) -> usize {
    let n = ctx.csr.num_nodes();
    let outdegrees = ctx.csr.outdegrees();
    let granularity = ctx.granularity.max(1);
    let mut l = 0;
    while l < ctx.max_iterations {
        let c0 = if DEAD {
            kernels::par_teleport(r, outdegrees, ctx.damping)
        } else {
            (1.0 - ctx.damping) / n as f64
        };
        let err;
        if IN_PLACE {
            let total = Mutex::new(ErrAcc::new(ctx.norm));
            let cursor = AtomicUsize::new(0);
            let r_sync = r.as_sync_slice();
            std::thread::scope(|s| {
                for worker in workers.iter_mut() {
                    let (cursor, total) = (&cursor, &total);
                    s.spawn(move || {
                        let mut local = ErrAcc::new(ctx.norm);
                        loop {
                            let begin = cursor.fetch_add(granularity, Ordering::Relaxed);
                            if begin >= n {
                                break;
                            }
                            for v in begin..(begin + granularity).min(n) {
                                // SAFETY: each node is written by exactly one
                                // worker per sweep; concurrent reads of ranks
                                // written by other workers are benign
                                // (Gauss–Seidel semantics).
                                unsafe {
                                    let mut new = c0;
                                    for &u in ctx.csr.in_edges(v) {
                                        new += r_sync[u].get() * f[u];
                                    }
                                    local.push(new - r_sync[v].get());
                                    r_sync[v].set(new);
                                }
                                hook.on_vertex(worker, v);
                            }
                        }
                        total.lock().unwrap().merge(local);
                    });
                }
            });
            l += 1;
            err = total.into_inner().unwrap().finish();
        } else {
            let cursor = AtomicUsize::new(0);
            let contribs: &[f64] = c;
            let a_sync = a.as_sync_slice();
            std::thread::scope(|s| {
                for worker in workers.iter_mut() {
                    let cursor = &cursor;
                    s.spawn(move || loop {
                        let begin = cursor.fetch_add(granularity, Ordering::Relaxed);
                        if begin >= n {
                            break;
                        }
                        for v in begin..(begin + granularity).min(n) {
                            // SAFETY: each node is written by exactly one
                            // worker per sweep, and all reads go through the
                            // contribution vector frozen at the previous
                            // iteration boundary.
                            unsafe {
                                a_sync[v].set(kernels::contribution_rank(contribs, ctx.csr, v, c0));
                            }
                            hook.on_vertex(worker, v);
                        }
                    });
                }
            });
            l += 1;
            math::par_multiply(c, a, f);
            err = par_error(a, r, ctx.norm);
            std::mem::swap(a, r);
        }
        if err < ctx.tolerance {
            break;
        }
    }
    l
}
