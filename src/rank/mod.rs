/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! PageRank by power iteration, with interchangeable coordination strategies.
//!
//! The solvers share the same inputs and outputs and differ in how the rank
//! updates are coordinated:
//!
//! - [`Solver::BasicSeq`] and [`Solver::BasicPar`] perform synchronous
//!   iterations: every iteration updates all ranks, computes a whole-vector
//!   error and checks it against the tolerance.
//! - [`Solver::BarrierFree`] runs workers that iterate at independent rates
//!   over a shared rank vector, each judging convergence locally on its own
//!   slice of the nodes, with no synchronization between iterations.
//!
//! Orthogonally, [`Update`] selects whether new ranks are published at the
//! iteration boundary by swapping buffers, or in place as they are computed,
//! and [`Dangling`] selects whether the teleport includes the rank mass of
//! dangling nodes — the drivers normally remove dead ends beforehand by
//! [adding self-loops](crate::graphs::vec_graph::VecGraph::add_self_loops).
//!
//! # Examples
//!
//! ```
//! use pagerank::graphs::vec_graph::VecGraph;
//! use pagerank::rank::{PageRank, Solver};
//!
//! // A two-node cycle with self-loops.
//! let mut g = VecGraph::from_arcs([(0, 1), (1, 0)]);
//! g.add_self_loops(|_| true);
//! let gt = g.transposed();
//!
//! let pr = PageRank::new();
//! let result = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
//! assert!((result.ranks[0] - 0.5).abs() < 1e-9);
//! assert!((result.ranks[1] - 0.5).abs() < 1e-9);
//! ```

mod barrier_free;
mod basic;
pub mod kernels;
mod worker;

pub use worker::{FnHook, NoHook, RandomSleep, VertexHook, Worker};

use crate::graphs::csr::CsrView;
use crate::graphs::vec_graph::VecGraph;
use crate::math;
use crossbeam_utils::CachePadded;
use dsi_progress_logger::{no_logging, ProgressLog};
use std::time::{Duration, Instant};
use thiserror::Error;

/// The errors of a solve.
#[derive(Error, Debug)]
pub enum PageRankError {
    /// The seed vector does not cover the key space of the graph.
    #[error("the seed vector length ({got}) does not match the graph key space ({expected})")]
    SeedLength { expected: usize, got: usize },
    /// The thread pool could not be built.
    #[error("cannot build the thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// The norm measuring the error between successive rank vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Norm {
    /// Reserved; currently treated as [`LInf`](Norm::LInf).
    L0,
    /// Sum of absolute differences.
    L1,
    /// Euclidean norm of the differences.
    L2,
    /// Maximum absolute difference. This is the default, and the only norm
    /// the barrier-free solver supports.
    #[default]
    LInf,
}

impl std::fmt::Display for Norm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Norm::L0 => f.write_str("L0"),
            Norm::L1 => f.write_str("L1"),
            Norm::L2 => f.write_str("L2"),
            Norm::LInf => f.write_str("L∞"),
        }
    }
}

/// How new ranks are published to the other workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Update {
    /// Ranks are written to a separate buffer and published by swapping the
    /// buffers at the iteration boundary (a Jacobi-style sweep). This is the
    /// default.
    #[default]
    Swapped,
    /// Ranks are written in place and visible immediately (a
    /// Gauss–Seidel-style sweep).
    InPlace,
}

impl std::fmt::Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Update::Swapped => f.write_str("swapped"),
            Update::InPlace => f.write_str("in-place"),
        }
    }
}

/// How the rank mass of dangling nodes is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dangling {
    /// The graph is assumed to have no dead ends (the drivers add self-loops
    /// beforehand) and the teleport is the constant `(1 − damping) / n`.
    /// This is the default.
    #[default]
    Assume,
    /// The teleport redistributes the rank mass of dangling nodes uniformly,
    /// recomputing it at every iteration.
    Redistribute,
}

impl std::fmt::Display for Dangling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dangling::Assume => f.write_str("no dead ends"),
            Dangling::Redistribute => f.write_str("redistributed"),
        }
    }
}

/// The coordination strategy of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    /// Synchronous iterations on a single thread.
    BasicSeq,
    /// Synchronous iterations, each sweep dynamically scheduled over the
    /// worker threads.
    BasicPar,
    /// Asynchronous iterations: each worker owns a static slice of the nodes
    /// and never waits for its peers.
    BarrierFree,
}

impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Solver::BasicSeq => f.write_str("basic sequential"),
            Solver::BasicPar => f.write_str("basic parallel"),
            Solver::BarrierFree => f.write_str("barrier-free"),
        }
    }
}

/// The result of a solve.
#[derive(Debug, Clone, Default)]
pub struct PageRankResult {
    /// The rank of each node, indexed by node key.
    pub ranks: Vec<f64>,
    /// The number of iterations performed: the shared count for the
    /// synchronous solvers, the maximum across workers for the barrier-free
    /// one.
    pub iterations: usize,
    /// Wall-clock time of a solve, averaged over the repeats.
    pub time: Duration,
    /// Wall-clock time from the start of a solve to the completion of the
    /// earliest worker, averaged over the repeats; equal to
    /// [`time`](PageRankResult::time) when no worker recorded a completion
    /// time.
    pub corrected_time: Duration,
}

/// Everything a loop driver needs to know about a solve.
pub(crate) struct LoopCtx<'a> {
    pub(crate) csr: &'a CsrView,
    pub(crate) damping: f64,
    pub(crate) tolerance: f64,
    pub(crate) norm: Norm,
    pub(crate) max_iterations: usize,
    pub(crate) granularity: usize,
}

/// A configurable PageRank computation.
///
/// The struct is configured via setters and executed via
/// [`solve`](Self::solve), which can be called any number of times, possibly
/// with different [solvers](Solver), on possibly different graphs. Since the
/// rank updates pull from the predecessors of each node, `solve` takes the
/// *transpose* of the graph.
///
/// # Examples
///
/// Comparing the barrier-free solver against the sequential one:
///
/// ```
/// use pagerank::graphs::vec_graph::VecGraph;
/// use pagerank::rank::{PageRank, Solver, Update};
///
/// let mut g = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0), (2, 1)]);
/// g.add_self_loops(|_| true);
/// let gt = g.transposed();
///
/// let mut pr = PageRank::new();
/// pr.tolerance(1e-9).update(Update::InPlace);
/// let reference = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
/// let result = pr.solve(Solver::BarrierFree, &gt, None).unwrap();
///
/// let err: f64 = reference
///     .ranks
///     .iter()
///     .zip(&result.ranks)
///     .map(|(x, y)| (x - y).abs())
///     .sum();
/// assert!(err < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct PageRank {
    repeat: usize,
    norm: Norm,
    tolerance: f64,
    damping: f64,
    max_iterations: usize,
    num_threads: usize,
    granularity: usize,
    update: Update,
    dangling: Dangling,
}

impl Default for PageRank {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRank {
    pub const DEFAULT_TOLERANCE: f64 = 1E-10;
    pub const DEFAULT_DAMPING: f64 = 0.85;
    pub const DEFAULT_MAX_ITERATIONS: usize = 500;
    /// The default number of nodes a parallel synchronous worker grabs at a
    /// time.
    pub const DEFAULT_GRANULARITY: usize = 2048;
    /// The cap on the default number of threads.
    pub const MAX_DEFAULT_THREADS: usize = 12;

    /// Creates a new computation with default options.
    pub fn new() -> Self {
        Self {
            repeat: 1,
            norm: Norm::default(),
            tolerance: Self::DEFAULT_TOLERANCE,
            damping: Self::DEFAULT_DAMPING,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            num_threads: num_cpus::get().min(Self::MAX_DEFAULT_THREADS),
            granularity: Self::DEFAULT_GRANULARITY,
            update: Update::default(),
            dangling: Dangling::default(),
        }
    }

    /// Sets the number of timed repeats of the solve; the reported times are
    /// averages over the repeats.
    ///
    /// # Panics
    ///
    /// Panics if `repeat` is zero.
    pub fn repeat(&mut self, repeat: usize) -> &mut Self {
        assert!(repeat > 0, "The number of repeats must be positive");
        self.repeat = repeat;
        self
    }

    /// Sets the norm used by the convergence check.
    pub fn norm(&mut self, norm: Norm) -> &mut Self {
        self.norm = norm;
        self
    }

    /// Sets the convergence threshold.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance` is not positive.
    pub fn tolerance(&mut self, tolerance: f64) -> &mut Self {
        assert!(tolerance > 0.0, "The tolerance must be positive");
        self.tolerance = tolerance;
        self
    }

    /// Sets the damping factor.
    ///
    /// # Panics
    ///
    /// Panics if `damping` is not in the interval [0 . . 1).
    pub fn damping(&mut self, damping: f64) -> &mut Self {
        assert!(
            (0.0..1.0).contains(&damping),
            "The damping factor must be in [0 . . 1), got {damping}"
        );
        self.damping = damping;
        self
    }

    /// Sets the maximum number of iterations. Reaching it is not an error:
    /// the result carries the last computed ranks.
    pub fn max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the number of worker threads. The sequential solver always uses
    /// one.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is zero.
    pub fn num_threads(&mut self, num_threads: usize) -> &mut Self {
        assert!(num_threads > 0, "The number of threads must be positive");
        self.num_threads = num_threads;
        self
    }

    /// Sets the number of nodes a parallel synchronous worker grabs at a
    /// time.
    pub fn granularity(&mut self, granularity: usize) -> &mut Self {
        self.granularity = granularity;
        self
    }

    /// Sets the [publication mode](Update) of rank writes.
    pub fn update(&mut self, update: Update) -> &mut Self {
        self.update = update;
        self
    }

    /// Sets the [handling](Dangling) of dangling nodes.
    pub fn dangling(&mut self, dangling: Dangling) -> &mut Self {
        self.dangling = dangling;
        self
    }

    /// Solves with the given strategy on the transpose `xt`, starting from
    /// the given seed ranks, or from the uniform vector if `seed` is `None`.
    ///
    /// The seed is indexed by node key and must cover the whole key space of
    /// the graph. The returned ranks are indexed by node key as well.
    ///
    /// An empty graph produces an empty result, not an error. The
    /// barrier-free solver combined with a norm other than [`Norm::LInf`]
    /// reports zero iterations and leaves the seed untouched.
    pub fn solve(
        &self,
        solver: Solver,
        xt: &VecGraph,
        seed: Option<&[f64]>,
    ) -> Result<PageRankResult, PageRankError> {
        self.solve_with(solver, xt, seed, &NoHook, no_logging![])
    }

    /// Solves like [`solve`](Self::solve), invoking `hook` after every vertex
    /// update and logging one progress update per repeat to `pl`.
    pub fn solve_with<H: VertexHook + Sync>(
        &self,
        solver: Solver,
        xt: &VecGraph,
        seed: Option<&[f64]>,
        hook: &H,
        pl: &mut impl ProgressLog,
    ) -> Result<PageRankResult, PageRankError> {
        let csr = CsrView::from_transpose(xt);
        let n = csr.num_nodes();
        if n == 0 {
            return Ok(PageRankResult::default());
        }

        log::info!("Solver: {solver}");
        log::info!("Damping: {}", self.damping);
        log::info!("Tolerance: {} ({} norm)", self.tolerance, self.norm);
        log::info!("Update: {}", self.update);
        log::info!("Dangling: {}", self.dangling);
        log::info!(
            "Seed: {}",
            if seed.is_some() { "custom" } else { "uniform" }
        );

        let qc = seed.map(|q| csr.compress(q)).transpose()?;

        let num_threads = match solver {
            Solver::BasicSeq => 1,
            _ => self.num_threads,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        let mut workers: Vec<CachePadded<Worker>> =
            (0..num_threads).map(|t| CachePadded::new(Worker::new(t))).collect();

        let mut a = vec![0.0; n];
        let mut r = vec![0.0; n];
        let mut c = vec![0.0; n];
        let mut f = vec![0.0; n];
        let mut e = vec![false; n];

        let ctx = LoopCtx {
            csr: &csr,
            damping: self.damping,
            tolerance: self.tolerance,
            norm: self.norm,
            max_iterations: self.max_iterations,
            granularity: self.granularity,
        };

        pl.item_name("repeat");
        pl.expected_updates(Some(self.repeat));
        pl.start(format!("Computing PageRank ({solver})..."));

        let mut iterations = 0;
        let mut total = Duration::ZERO;
        let mut corrected = Duration::ZERO;

        for _ in 0..self.repeat {
            let start = Instant::now();
            for worker in workers.iter_mut() {
                worker.clear();
            }
            e.fill(false);
            match &qc {
                Some(q) => r.copy_from_slice(q),
                None => r.fill(1.0 / n as f64),
            }

            iterations = pool.install(|| {
                if solver == Solver::BasicSeq {
                    kernels::factors(&mut f, csr.outdegrees(), self.damping);
                    math::multiply(&mut c, &r, &f);
                } else {
                    kernels::par_factors(&mut f, csr.outdegrees(), self.damping);
                    math::par_multiply(&mut c, &r, &f);
                }
                self.dispatch(solver, &ctx, &mut a, &mut r, &mut c, &mut e, &f, &mut workers, hook)
            });

            let elapsed = start.elapsed();
            total += elapsed;
            let stopped = workers
                .iter()
                .filter_map(|w| w.stop())
                .map(|stop| stop.duration_since(start))
                .min();
            if let Some(min) = stopped {
                corrected += min;
            }
            log::info!(
                "Repeat: corrected {:.3} ms, total {:.3} ms, {} iterations",
                stopped.unwrap_or(elapsed).as_secs_f64() * 1E3,
                elapsed.as_secs_f64() * 1E3,
                iterations
            );
            pl.update();
        }
        pl.done();

        let time = total / self.repeat as u32;
        let corrected_time = if corrected > Duration::ZERO {
            corrected / self.repeat as u32
        } else {
            time
        };

        Ok(PageRankResult {
            ranks: csr.decompress(&r),
            iterations,
            time,
            corrected_time,
        })
    }

    /// Monomorphizes the loop drivers over update mode and dangling handling.
    #[allow(clippy::too_many_arguments)]
    fn dispatch<H: VertexHook + Sync>(
        &self,
        solver: Solver,
        ctx: &LoopCtx,
        a: &mut Vec<f64>,
        r: &mut Vec<f64>,
        c: &mut [f64],
        e: &mut [bool],
        f: &[f64],
        workers: &mut [CachePadded<Worker>],
        hook: &H,
    ) -> usize {
        use Dangling::*;
        use Solver::*;
        use Update::*;
        match (solver, self.update, self.dangling) {
            (BasicSeq, Swapped, Assume) => {
                basic::basic_seq::<false, false, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicSeq, Swapped, Redistribute) => {
                basic::basic_seq::<false, true, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicSeq, InPlace, Assume) => {
                basic::basic_seq::<true, false, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicSeq, InPlace, Redistribute) => {
                basic::basic_seq::<true, true, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicPar, Swapped, Assume) => {
                basic::basic_par::<false, false, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicPar, Swapped, Redistribute) => {
                basic::basic_par::<false, true, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicPar, InPlace, Assume) => {
                basic::basic_par::<true, false, H>(ctx, a, r, c, f, workers, hook)
            }
            (BasicPar, InPlace, Redistribute) => {
                basic::basic_par::<true, true, H>(ctx, a, r, c, f, workers, hook)
            }
            (BarrierFree, Swapped, Assume) => {
                barrier_free::barrier_free_par::<false, false, H>(ctx, a, r, e, f, workers, hook)
            }
            (BarrierFree, Swapped, Redistribute) => {
                barrier_free::barrier_free_par::<false, true, H>(ctx, a, r, e, f, workers, hook)
            }
            (BarrierFree, InPlace, Assume) => {
                barrier_free::barrier_free_par::<true, false, H>(ctx, a, r, e, f, workers, hook)
            }
            (BarrierFree, InPlace, Redistribute) => {
                barrier_free::barrier_free_par::<true, true, H>(ctx, a, r, e, f, workers, hook)
            }
        }
    }
}
