/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The barrier-free asynchronous loop.
//!
//! Each worker owns a fixed contiguous slice of the node range and iterates
//! on its own counter, with no synchronization between iterations: a worker
//! on iteration 10 may run alongside one still on iteration 3. Publication of
//! a rank is a single scalar write; readers may observe either the old or the
//! new value, which changes the path to the fixed point but not the fixed
//! point itself.
//!
//! Since no whole-vector norm can be taken without a barrier, convergence is
//! judged per node: once the change of a node falls within the tolerance its
//! flag is set, and flags are never cleared, so the decision is local and
//! monotone and a worker can stop as soon as its whole slice is flagged.
//! Other workers may still be running and will keep refining their own
//! slices; the orchestrator joins them all. Only the L∞ criterion is
//! supported: with any other norm the loop returns immediately, reporting
//! zero iterations, which is the caller's cue to use a synchronous solver.

use super::worker::{VertexHook, Worker};
use super::{LoopCtx, Norm};
use crossbeam_utils::CachePadded;
use kahan::KahanSum;
use sync_cell_slice::{SyncCell, SyncSlice};

/// Barrier-free loop. Returns the maximum number of iterations performed by
/// any worker.
///
/// With `IN_PLACE` all workers share a single rank buffer; otherwise each
/// worker ping-pongs between the two buffers following its own iteration
/// parity, and the buffers are swapped once at the end if the iteration count
/// is odd, so that the result is in `r` either way.
pub(crate) fn barrier_free_par<const IN_PLACE: bool, const DEAD: bool, H: VertexHook + Sync>(
    ctx: &LoopCtx,
    a: &mut Vec<f64>,
    r: &mut Vec<f64>,
    e: &mut [bool],
    f: &[f64],
    workers: &mut [CachePadded<Worker>],
    hook: &H,
) -> usize {
    if ctx.norm != Norm::LInf {
        return 0;
    }
    let n = ctx.csr.num_nodes();
    let num_workers = workers.len().min(n).max(1);
    // Balanced static partition: the first `n % num_workers` slices get one
    // extra node.
    let base = n / num_workers;
    let extra = n % num_workers;

    {
        let r_sync = r.as_sync_slice();
        let a_sync = a.as_sync_slice();
        std::thread::scope(|s| {
            let mut begin = 0;
            let mut flags = &mut *e;
            for (t, worker) in workers[..num_workers].iter_mut().enumerate() {
                let end = begin + base + usize::from(t < extra);
                let (slice_flags, rest) = std::mem::take(&mut flags).split_at_mut(end - begin);
                flags = rest;
                s.spawn(move || {
                    worker_loop::<IN_PLACE, DEAD, H>(
                        ctx,
                        r_sync,
                        a_sync,
                        slice_flags,
                        f,
                        begin..end,
                        worker,
                        hook,
                    )
                });
                begin = end;
            }
        });
    }

    let iterations = workers[..num_workers]
        .iter()
        .map(|w| w.iteration())
        .max()
        .unwrap_or(0);
    if !IN_PLACE && iterations % 2 == 1 {
        std::mem::swap(a, r);
    }
    iterations
}

/// The iteration loop of a single worker over its slice.
#[allow(clippy::too_many_arguments)]
fn worker_loop<const IN_PLACE: bool, const DEAD: bool, H: VertexHook>(
    ctx: &LoopCtx,
    r_sync: &[SyncCell<f64>],
    a_sync: &[SyncCell<f64>],
    flags: &mut [bool],
    f: &[f64],
    slice: std::ops::Range<usize>,
    worker: &mut CachePadded<Worker>,
    hook: &H,
) {
    let n = r_sync.len();
    let outdegrees = ctx.csr.outdegrees();
    let teleport_const = (1.0 - ctx.damping) / n as f64;

    while worker.iteration() < ctx.max_iterations {
        let (src, dst) = if IN_PLACE {
            (r_sync, r_sync)
        } else if worker.iteration() % 2 == 0 {
            (r_sync, a_sync)
        } else {
            (a_sync, r_sync)
        };
        // The teleport mass is recomputed from whatever the shared ranks
        // currently hold; no worker waits for a consistent snapshot.
        let c0 = if DEAD {
            teleport(src, outdegrees, ctx.damping)
        } else {
            teleport_const
        };
        for v in slice.clone() {
            // SAFETY: nodes of this slice are written only by this worker;
            // concurrent reads of ranks written by other workers are benign,
            // as the f64 accesses are tearing-free and the fixed point does
            // not depend on which of the two values is observed.
            let delta = unsafe {
                let mut new = c0;
                for &u in ctx.csr.in_edges(v) {
                    new += src[u].get() * f[u];
                }
                let delta = new - src[v].get();
                dst[v].set(new);
                delta
            };
            let flag = &mut flags[v - slice.start];
            if delta.abs() <= ctx.tolerance && !*flag {
                *flag = true;
            }
            hook.on_vertex(worker, v);
        }
        worker.next_iteration();
        if flags.iter().all(|&converged| converged) {
            break;
        }
    }
    worker.record_stop();
}

/// [`teleport`](super::kernels::teleport) over a shared rank buffer.
fn teleport(r: &[SyncCell<f64>], outdegrees: &[usize], damping: f64) -> f64 {
    let n = r.len() as f64;
    let mut dangling = KahanSum::<f64>::new();
    for (cell, &d) in r.iter().zip(outdegrees) {
        if d == 0 {
            // SAFETY: a racy read of a rank is benign, as above.
            dangling += unsafe { cell.get() };
        }
    }
    (1.0 - damping) / n + damping * dangling.sum() / n
}
