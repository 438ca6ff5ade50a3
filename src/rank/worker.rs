/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Per-worker scratchpads and the per-vertex hook.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// The scratchpad of a solver worker.
///
/// Scratchpads are allocated by the orchestrator in a contiguous,
/// cache-padded container and lent to workers, each of which has exclusive
/// ownership of its own for the duration of a solve. The random engine is
/// seeded once, from the operating system, when the scratchpad is allocated.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    iteration: usize,
    stop: Option<Instant>,
    rng: SmallRng,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            iteration: 0,
            stop: None,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Returns the worker index.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the number of iterations this worker has completed in the
    /// current solve.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub(crate) fn next_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Records the time at which the worker left its iteration loop.
    pub(crate) fn record_stop(&mut self) {
        self.stop = Some(Instant::now());
    }

    pub(crate) fn stop(&self) -> Option<Instant> {
        self.stop
    }

    /// Resets the scratchpad between repeats; the random engine is not
    /// reseeded.
    pub(crate) fn clear(&mut self) {
        self.iteration = 0;
        self.stop = None;
    }

    /// Returns the worker's random engine.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

/// A callback invoked by every solver after each vertex update.
///
/// The hook receives the scratchpad of the worker that performed the update
/// and the updated vertex. It is the single extensibility point of the
/// solvers: benchmarks use it to emulate straggling workers, tests to record
/// traces. The solvers are generic over the hook, so the default
/// [`NoHook`] compiles down to nothing.
pub trait VertexHook {
    /// Called after the rank of `v` has been written.
    fn on_vertex(&self, worker: &mut Worker, v: usize);
}

/// The default hook; does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl VertexHook for NoHook {
    #[inline(always)]
    fn on_vertex(&self, _worker: &mut Worker, _v: usize) {}
}

/// Adapts a closure to a [`VertexHook`].
///
/// ```
/// use pagerank::rank::{FnHook, VertexHook, Worker};
///
/// let hook = FnHook(|worker: &mut Worker, v: usize| {
///     log::trace!("worker {} updated {}", worker.id(), v);
/// });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnHook<F>(pub F);

impl<F: Fn(&mut Worker, usize)> VertexHook for FnHook<F> {
    #[inline(always)]
    fn on_vertex(&self, worker: &mut Worker, v: usize) {
        (self.0)(worker, v)
    }
}

/// A hook that sleeps with a given probability after each vertex update,
/// using the worker's random engine.
///
/// This emulates straggling workers, making observable how far the
/// barrier-free solver lets the other workers run ahead.
#[derive(Debug, Clone, Copy)]
pub struct RandomSleep {
    probability: f64,
    duration: Duration,
}

impl RandomSleep {
    pub fn new(probability: f64, duration: Duration) -> Self {
        Self {
            probability,
            duration,
        }
    }
}

impl VertexHook for RandomSleep {
    fn on_vertex(&self, worker: &mut Worker, _v: usize) {
        if worker.rng().random::<f64>() < self.probability {
            std::thread::sleep(self.duration);
        }
    }
}
