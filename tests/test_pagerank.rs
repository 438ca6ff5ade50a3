/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use pagerank::graphs::vec_graph::VecGraph;
use pagerank::rank::{
    Dangling, FnHook, Norm, PageRank, PageRankError, Solver, Update, Worker,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// All coordination/publication combinations.
const CONFIGS: [(Solver, Update); 6] = [
    (Solver::BasicSeq, Update::Swapped),
    (Solver::BasicSeq, Update::InPlace),
    (Solver::BasicPar, Update::Swapped),
    (Solver::BasicPar, Update::InPlace),
    (Solver::BarrierFree, Update::InPlace),
    (Solver::BarrierFree, Update::Swapped),
];

/// Returns the two-node cycle with self-loops: each node has outdegree 2.
fn two_node_cycle() -> VecGraph {
    let mut g = VecGraph::from_arcs([(0, 1), (1, 0)]);
    g.add_self_loops(|_| true);
    g
}

/// Returns the three-node chain 0 → 1 → 2 with self-loops on every node.
fn chain() -> VecGraph {
    let mut g = VecGraph::from_arcs([(0, 1), (1, 2)]);
    g.add_self_loops(|_| true);
    g
}

/// Returns a directed Erdős–Rényi graph with arc probability `p`.
fn erdos_renyi(n: usize, p: f64, seed: u64) -> VecGraph {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut g = VecGraph::empty(n);
    for u in 0..n {
        for v in 0..n {
            if u != v && rng.random::<f64>() < p {
                g.add_arc(u, v);
            }
        }
    }
    g
}

fn l1_distance(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(a, b)| (a - b).abs()).sum()
}

fn linf_distance(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
}

/// Computes PageRank by the plain power method on the original (non-transposed)
/// graph, redistributing the rank of dangling nodes uniformly.
fn power_method(g: &VecGraph, damping: f64, threshold: f64) -> Vec<f64> {
    let n = g.num_nodes() as f64;
    let mut rank = vec![0.0; g.span()];
    for u in g.nodes() {
        rank[u] = 1.0 / n;
    }
    loop {
        let mut new = vec![0.0; g.span()];
        let mut dangling = 0.0;
        for u in g.nodes() {
            let d = g.outdegree(u);
            if d == 0 {
                dangling += rank[u];
            } else {
                let w = rank[u] / d as f64;
                for &v in g.successors(u) {
                    new[v] += w;
                }
            }
        }
        for u in g.nodes() {
            new[u] = (1.0 - damping) / n + damping * (new[u] + dangling / n);
        }
        let err = l1_distance(&new, &rank);
        rank = new;
        if err < threshold {
            return rank;
        }
    }
}

#[test]
fn test_empty_graph() {
    let g = VecGraph::new();
    for (solver, update) in CONFIGS {
        let mut pr = PageRank::new();
        pr.update(update);
        let result = pr.solve(solver, &g, None).unwrap();
        assert!(result.ranks.is_empty());
        assert_eq!(result.iterations, 0);
        assert_eq!(result.time, Duration::ZERO);
        assert_eq!(result.corrected_time, Duration::ZERO);
    }
}

#[test]
fn test_two_node_cycle() {
    let gt = two_node_cycle().transposed();
    let seed = [0.5, 0.5];
    for (solver, update) in CONFIGS {
        let mut pr = PageRank::new();
        pr.update(update);
        let result = pr.solve(solver, &gt, Some(&seed)).unwrap();
        assert!(
            result.iterations <= 2,
            "{solver} ({update}): {} iterations",
            result.iterations
        );
        assert!((result.ranks[0] - 0.5).abs() <= 1E-9, "{solver} ({update})");
        assert!((result.ranks[1] - 0.5).abs() <= 1E-9, "{solver} ({update})");
    }
}

#[test]
fn test_chain_rank_ordering() {
    let gt = chain().transposed();
    let pr = PageRank::new();
    let result = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
    assert!(result.iterations >= 10);
    assert!(result.iterations <= PageRank::DEFAULT_MAX_ITERATIONS);
    assert!(result.ranks[2] > result.ranks[1]);
    assert!(result.ranks[1] > result.ranks[0]);
}

#[test]
fn test_norm_iteration_ordering() {
    // For a fixed vector L1 ≥ L2 ≥ L∞, so with the same threshold the
    // stricter norm crosses it later.
    let gt = chain().transposed();
    let mut iterations = Vec::new();
    for norm in [Norm::L1, Norm::L2, Norm::LInf] {
        let mut pr = PageRank::new();
        pr.norm(norm).tolerance(1E-3);
        let result = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
        assert!(result.iterations < PageRank::DEFAULT_MAX_ITERATIONS, "{norm}");
        iterations.push(result.iterations);
    }
    assert!(iterations[0] >= iterations[1]);
    assert!(iterations[1] >= iterations[2]);
}

#[test]
fn test_seeded_fast_path() {
    let gt = two_node_cycle().transposed();
    for (solver, update) in CONFIGS {
        let mut pr = PageRank::new();
        pr.update(update);
        let converged = pr.solve(solver, &gt, None).unwrap();
        let reseeded = pr.solve(solver, &gt, Some(&converged.ranks)).unwrap();
        assert!(
            reseeded.iterations <= 1,
            "{solver} ({update}): {} iterations",
            reseeded.iterations
        );
    }
}

#[test]
fn test_seed_length_mismatch() {
    let gt = two_node_cycle().transposed();
    let pr = PageRank::new();
    let short = [0.5];
    match pr.solve(Solver::BasicSeq, &gt, Some(&short)) {
        Err(PageRankError::SeedLength { expected, got }) => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("Expected a seed length error, got {other:?}"),
    }
}

#[test]
fn test_barrier_free_requires_linf() {
    let gt = chain().transposed();
    for norm in [Norm::L0, Norm::L1, Norm::L2] {
        let mut pr = PageRank::new();
        pr.norm(norm);
        let result = pr.solve(Solver::BarrierFree, &gt, None).unwrap();
        assert_eq!(result.iterations, 0, "{norm}");
    }
}

#[test]
fn test_rank_bounds_and_total_mass() {
    let mut g = erdos_renyi(100, 0.05, 0);
    g.add_self_loops(|_| true);
    let gt = g.transposed();
    for (solver, update) in CONFIGS {
        let mut pr = PageRank::new();
        pr.update(update);
        let result = pr.solve(solver, &gt, None).unwrap();
        for (u, &rank) in result.ranks.iter().enumerate() {
            assert!(
                (0.0..=1.0).contains(&rank),
                "{solver} ({update}): rank[{u}] = {rank}"
            );
        }
        // No dangling nodes, so the rank mass is preserved.
        let total: f64 = result.ranks.iter().sum();
        assert!(
            (total - 1.0).abs() <= 1E-9 * result.ranks.len() as f64,
            "{solver} ({update}): total mass {total}"
        );
    }
}

#[test]
fn test_matches_power_method() {
    for &(n, p, seed) in &[(10, 0.5, 0u64), (100, 0.1, 1)] {
        let mut g = erdos_renyi(n, p, seed);
        g.add_self_loops(|_| true);
        let gt = g.transposed();
        let expected = power_method(&g, 0.85, 1E-15);
        let mut pr = PageRank::new();
        pr.tolerance(1E-13);
        let result = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
        assert!(
            linf_distance(&result.ranks, &expected) < 1E-10,
            "n={n}: L∞={}",
            linf_distance(&result.ranks, &expected)
        );
    }
}

#[test]
fn test_dangling_redistribution_matches_power_method() {
    // No self-loops: the graph keeps its dangling nodes.
    let g = erdos_renyi(50, 0.05, 2);
    let gt = g.transposed();
    let expected = power_method(&g, 0.85, 1E-15);

    let mut pr = PageRank::new();
    pr.tolerance(1E-13).dangling(Dangling::Redistribute);
    let result = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
    assert!(linf_distance(&result.ranks, &expected) < 1E-10);

    pr.update(Update::InPlace);
    let barrier_free = pr.solve(Solver::BarrierFree, &gt, None).unwrap();
    assert!(l1_distance(&barrier_free.ranks, &expected) < 1E-4);
}

#[test]
fn test_parallel_matches_sequential() {
    let mut g = erdos_renyi(200, 0.05, 3);
    g.add_self_loops(|_| true);
    let gt = g.transposed();
    let pr = PageRank::new();
    let reference = pr.solve(Solver::BasicSeq, &gt, None).unwrap();

    // The double-buffered parallel sweep computes the same iterates.
    let parallel = pr.solve(Solver::BasicPar, &gt, None).unwrap();
    assert!(l1_distance(&parallel.ranks, &reference.ranks) < 10.0 * PageRank::DEFAULT_TOLERANCE);

    // Running the same solve twice yields identical ranks.
    let again = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
    assert_eq!(again.ranks, reference.ranks);

    // The in-place sweeps converge to the same fixed point.
    let mut pr = PageRank::new();
    pr.update(Update::InPlace);
    let in_place = pr.solve(Solver::BasicPar, &gt, None).unwrap();
    assert!(l1_distance(&in_place.ranks, &reference.ranks) < 1E-6);
}

#[test]
fn test_barrier_free_matches_sequential() {
    let mut g = erdos_renyi(200, 0.05, 4);
    g.add_self_loops(|_| true);
    let gt = g.transposed();
    let pr = PageRank::new();
    let reference = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
    for update in [Update::InPlace, Update::Swapped] {
        let mut pr = PageRank::new();
        pr.update(update);
        let result = pr.solve(Solver::BarrierFree, &gt, None).unwrap();
        assert!(
            l1_distance(&result.ranks, &reference.ranks) < 1E-4,
            "{update}: L1={}",
            l1_distance(&result.ranks, &reference.ranks)
        );
        assert!(result.iterations <= PageRank::DEFAULT_MAX_ITERATIONS);
        assert!(result.corrected_time <= result.time);
    }
}

#[test]
fn test_barrier_free_straggler() {
    // Thread 0 sleeps 1 ms per vertex with probability 0.2; the other workers
    // run ahead and settle their slices without ever waiting for it.
    let gt = chain().transposed();
    let pr = PageRank::new();
    let sequential = pr.solve(Solver::BasicSeq, &gt, None).unwrap();

    let straggler = FnHook(|worker: &mut Worker, _v: usize| {
        if worker.id() == 0 && worker.rng().random::<f64>() < 0.2 {
            std::thread::sleep(Duration::from_millis(1));
        }
    });
    let mut pr = PageRank::new();
    pr.update(Update::InPlace);
    let result = pr
        .solve_with(
            Solver::BarrierFree,
            &gt,
            None,
            &straggler,
            dsi_progress_logger::no_logging![],
        )
        .unwrap();
    assert!(
        result.iterations <= 2 * sequential.iterations,
        "{} barrier-free vs {} sequential iterations",
        result.iterations,
        sequential.iterations
    );
    for &rank in &result.ranks {
        assert!((0.0..=1.0).contains(&rank));
    }
    assert!(result.corrected_time <= result.time);
}

#[test]
fn test_insertion_order_invariance() {
    // The ranks of the sequential solver do not depend on the order in which
    // the graph was built.
    let arcs = [(0, 1), (1, 2), (2, 0), (2, 1), (0, 0), (1, 1), (2, 2)];
    let forward = VecGraph::from_arcs(arcs);
    let backward = VecGraph::from_arcs(arcs.iter().rev().copied());
    let pr = PageRank::new();
    let a = pr.solve(Solver::BasicSeq, &forward.transposed(), None).unwrap();
    let b = pr.solve(Solver::BasicSeq, &backward.transposed(), None).unwrap();
    assert!(linf_distance(&a.ranks, &b.ranks) < 1E-9);
}

#[test]
fn test_hook_sees_every_update() {
    let gt = chain().transposed();
    let count = AtomicUsize::new(0);
    let counter = FnHook(|_worker: &mut Worker, _v: usize| {
        count.fetch_add(1, Ordering::Relaxed);
    });
    let pr = PageRank::new();
    let result = pr
        .solve_with(
            Solver::BasicSeq,
            &gt,
            None,
            &counter,
            dsi_progress_logger::no_logging![],
        )
        .unwrap();
    assert_eq!(count.load(Ordering::Relaxed), result.iterations * 3);
}

#[test]
fn test_repeats_are_averaged() {
    let gt = two_node_cycle().transposed();
    let mut pr = PageRank::new();
    pr.repeat(3);
    let result = pr.solve(Solver::BasicSeq, &gt, None).unwrap();
    let single = PageRank::new().solve(Solver::BasicSeq, &gt, None).unwrap();
    assert_eq!(result.iterations, single.iterations);
    assert_eq!(result.ranks, single.ranks);
    // The synchronous solvers record no per-worker completion, so the
    // corrected time falls back to the wall-clock time.
    assert_eq!(result.corrected_time, result.time);
}
