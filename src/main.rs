/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Runs the PageRank solver sweep on a graph file, printing for every
//! strategy its timings and the L1 error against a sequential reference run.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dsi_progress_logger::no_logging;
use pagerank::graphs::io::{read_matrix_market, read_temporal};
use pagerank::graphs::vec_graph::VecGraph;
use pagerank::math::l1_norm;
use pagerank::rank::{NoHook, Norm, PageRank, RandomSleep, Solver, Update, VertexHook};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NormArg {
    #[value(name = "l1")]
    L1,
    #[value(name = "l2")]
    L2,
    #[value(name = "linf")]
    LInf,
}

impl From<NormArg> for Norm {
    fn from(norm: NormArg) -> Self {
        match norm {
            NormArg::L1 => Norm::L1,
            NormArg::L2 => Norm::L2,
            NormArg::LInf => Norm::LInf,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Runs the PageRank solver sweep on a graph file.", version)]
struct Cli {
    /// The graph file: Matrix Market (.mtx) or SNAP temporal edge list.
    src: PathBuf,

    /// The number of timed repeats of each solve.
    #[arg(short = 'R', long, default_value_t = 5)]
    repeats: usize,

    /// The number of worker threads (default: one per core, capped at 12).
    #[arg(short = 'T', long)]
    threads: Option<usize>,

    /// The damping factor.
    #[arg(long, default_value_t = PageRank::DEFAULT_DAMPING)]
    damping: f64,

    /// The convergence threshold.
    #[arg(long, default_value_t = 1E-10)]
    tolerance: f64,

    /// The norm of the convergence check of the synchronous solvers.
    #[arg(long, value_enum, default_value = "linf")]
    norm: NormArg,

    /// The maximum number of iterations.
    #[arg(long, default_value_t = PageRank::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// On temporal inputs, grow the graph by batches of this many arcs and
    /// rerun the sweep after each batch, both unseeded and seeded with the
    /// previous ranks.
    #[arg(short, long)]
    batch: Option<usize>,

    /// Probability of a worker sleeping after each vertex update, emulating
    /// straggling workers.
    #[arg(long, default_value_t = 0.0)]
    sleep_probability: f64,

    /// Duration of each emulated straggler sleep, in milliseconds.
    #[arg(long, default_value_t = 1)]
    sleep_ms: u64,
}

pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if cli.sleep_probability > 0.0 {
        let hook = RandomSleep::new(cli.sleep_probability, Duration::from_millis(cli.sleep_ms));
        run(&cli, &hook)
    } else {
        run(&cli, &NoHook)
    }
}

fn run<H: VertexHook + Sync>(cli: &Cli, hook: &H) -> Result<()> {
    let mut pr = PageRank::new();
    pr.repeat(cli.repeats)
        .damping(cli.damping)
        .tolerance(cli.tolerance)
        .norm(cli.norm.into())
        .max_iterations(cli.max_iterations);
    if let Some(threads) = cli.threads {
        pr.num_threads(threads);
    }

    println!("Using graph {}...", cli.src.display());
    let file = File::open(&cli.src)
        .with_context(|| format!("Cannot open {}", cli.src.display()))?;
    let mut reader = BufReader::new(file);

    if cli.src.extension().is_some_and(|e| e == "mtx") {
        let graph = read_matrix_market(reader)?;
        sweep_batch(&mut pr, &graph, None, hook)?;
        return Ok(());
    }

    let batch = cli.batch.unwrap_or(usize::MAX);
    let mut grown = VecGraph::new();
    let mut previous: Option<(VecGraph, Vec<f64>)> = None;
    loop {
        let read = read_temporal(&mut reader, &mut grown, batch)?;
        if read == 0 {
            break;
        }
        println!("# Graph grown to {} arcs", grown.num_arcs());
        previous = Some(sweep_batch(&mut pr, &grown, previous.as_ref(), hook)?);
        if read < batch {
            break;
        }
    }
    Ok(())
}

/// Runs the solver sweep on a snapshot of the graph and returns the snapshot
/// (with self-loops) together with its reference ranks.
///
/// When the ranks of a previous snapshot are available, a second, seeded
/// sweep is run: the previous ranks are scaled down to make room for the new
/// nodes, which start from the uniform rank (a naive-dynamic update).
fn sweep_batch<H: VertexHook + Sync>(
    pr: &mut PageRank,
    graph: &VecGraph,
    previous: Option<&(VecGraph, Vec<f64>)>,
    hook: &H,
) -> Result<(VecGraph, Vec<f64>)> {
    let mut x = graph.clone();
    x.add_self_loops(|_| true);
    let xt = x.transposed();

    let mut reference_pr = pr.clone();
    reference_pr.repeat(1).update(Update::Swapped);
    let reference = reference_pr.solve(Solver::BasicSeq, &xt, None)?;

    sweep(pr, &xt, None, &reference.ranks, hook, "")?;
    if let Some((old_graph, old_ranks)) = previous {
        let seed = adjust_ranks(old_ranks, old_graph, &x);
        sweep(pr, &xt, Some(&seed), &reference.ranks, hook, "; seeded")?;
    }
    Ok((x, reference.ranks))
}

/// Runs every solver configuration once and prints its line.
fn sweep<H: VertexHook + Sync>(
    pr: &mut PageRank,
    xt: &VecGraph,
    seed: Option<&[f64]>,
    reference: &[f64],
    hook: &H,
    suffix: &str,
) -> Result<()> {
    let configs = [
        ("basic-seq", Solver::BasicSeq, Update::Swapped),
        ("basic-par (swapped)", Solver::BasicPar, Update::Swapped),
        ("basic-par (in-place)", Solver::BasicPar, Update::InPlace),
        ("barrier-free (in-place)", Solver::BarrierFree, Update::InPlace),
        ("barrier-free (swapped)", Solver::BarrierFree, Update::Swapped),
    ];
    for (name, solver, update) in configs {
        pr.update(update);
        let result = pr.solve_with(solver, xt, seed, hook, no_logging![])?;
        let err = l1_norm(&result.ranks, reference);
        println!(
            "[{} order; {} size; {:09.3} / {:09.3} ms; {:03} iters.] [{:.4e} err.] {name}{suffix}",
            xt.num_nodes(),
            xt.num_arcs(),
            result.corrected_time.as_secs_f64() * 1E3,
            result.time.as_secs_f64() * 1E3,
            result.iterations,
            err,
        );
    }
    Ok(())
}

/// Adapts the ranks of a previous snapshot of a growing graph to a new one:
/// ranks of surviving nodes are scaled down proportionally to the growth of
/// the node set, new nodes start from the uniform rank.
fn adjust_ranks(old: &[f64], x: &VecGraph, y: &VecGraph) -> Vec<f64> {
    let scale = x.num_nodes() as f64 / y.num_nodes() as f64;
    let fill = 1.0 / y.num_nodes() as f64;
    let mut seed = vec![0.0; y.span()];
    for u in y.nodes() {
        seed[u] = if x.has_node(u) { old[u] * scale } else { fill };
    }
    seed
}
