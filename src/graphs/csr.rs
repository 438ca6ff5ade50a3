/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! An immutable compressed sparse row view of a transposed graph.
//!
//! The solvers pull rank from the predecessors of each node, so they work on
//! the *transpose* of the graph: row `v` of the view lists the sources of the
//! arcs pointing into `v` in the original graph. Nodes are compacted to
//! `[0, N)` following the insertion order of the transpose, and the view
//! retains the bijection with the original key space so that seed vectors can
//! be compressed into rank space and results decompressed out of it.

use crate::graphs::vec_graph::VecGraph;
use crate::rank::PageRankError;

/// A compressed sparse row view of a transposed graph.
///
/// The view is immutable for the life of a solve and contains:
/// - the cumulative in-degree offsets (`N + 1` entries, starting at 0 and
///   ending at the number of arcs);
/// - the flat array of compacted source indices, row `v` occupying
///   `offsets[v]..offsets[v + 1]`;
/// - the outdegree of each node *in the original graph*, recovered by
///   counting occurrences in the transpose (a zero marks a dangling node);
/// - the compacted-index ↔ key bijection.
///
/// # Examples
///
/// ```
/// use pagerank::graphs::vec_graph::VecGraph;
/// use pagerank::graphs::csr::CsrView;
///
/// let g = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0)]);
/// let csr = CsrView::from_transpose(&g.transposed());
/// assert_eq!(csr.num_nodes(), 3);
/// assert_eq!(csr.num_arcs(), 3);
/// // node 1 has a single in-edge, from node 0
/// assert_eq!(csr.in_edges(1), &[0]);
/// assert_eq!(csr.outdegrees(), &[1, 1, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct CsrView {
    /// Cumulative in-degree offsets.
    offsets: Box<[usize]>,
    /// Compacted source indices, rows delimited by `offsets`.
    sources: Box<[usize]>,
    /// Outdegree of each node in the original graph.
    outdegrees: Box<[usize]>,
    /// Key of each compacted index, in transpose insertion order.
    keys: Box<[usize]>,
    /// Size of the original key space.
    span: usize,
}

impl CsrView {
    /// Builds the view from the transpose of a graph.
    ///
    /// Construction is linear in the number of nodes plus the number of arcs.
    pub fn from_transpose(xt: &VecGraph) -> Self {
        let n = xt.num_nodes();
        let keys: Box<[usize]> = xt.nodes().collect();

        // Key → compacted index.
        let mut index = vec![usize::MAX; xt.span()];
        for (i, &k) in keys.iter().enumerate() {
            index[k] = i;
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut sources = Vec::with_capacity(xt.num_arcs() as usize);
        let mut outdegrees = vec![0; n];
        offsets.push(0);
        for &k in keys.iter() {
            for &u in xt.successors(k) {
                let i = index[u];
                sources.push(i);
                // An in-edge of the transpose is an out-edge of the original.
                outdegrees[i] += 1;
            }
            offsets.push(sources.len());
        }

        Self {
            offsets: offsets.into_boxed_slice(),
            sources: sources.into_boxed_slice(),
            outdegrees: outdegrees.into_boxed_slice(),
            keys,
            span: xt.span(),
        }
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the number of arcs.
    pub fn num_arcs(&self) -> usize {
        self.sources.len()
    }

    /// Returns the size of the original key space.
    pub fn span(&self) -> usize {
        self.span
    }

    /// Returns the cumulative in-degree offsets.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Returns the flat array of compacted source indices.
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Returns the original outdegrees, indexed by compacted index.
    pub fn outdegrees(&self) -> &[usize] {
        &self.outdegrees
    }

    /// Returns the node keys, indexed by compacted index.
    pub fn keys(&self) -> &[usize] {
        &self.keys
    }

    /// Returns the compacted sources of the in-edges of node `v`.
    #[inline(always)]
    pub fn in_edges(&self, v: usize) -> &[usize] {
        &self.sources[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Compresses a vector indexed by key into rank space.
    ///
    /// Returns an error if the vector does not cover the key space.
    pub fn compress(&self, q: &[f64]) -> Result<Vec<f64>, PageRankError> {
        if q.len() != self.span {
            return Err(PageRankError::SeedLength {
                expected: self.span,
                got: q.len(),
            });
        }
        Ok(self.keys.iter().map(|&k| q[k]).collect())
    }

    /// Decompresses a vector indexed by compacted index back to key space.
    ///
    /// Entries at keys of non-existing nodes are zero.
    pub fn decompress(&self, r: &[f64]) -> Vec<f64> {
        let mut q = vec![0.0; self.span];
        for (&k, &x) in self.keys.iter().zip(r.iter()) {
            q[k] = x;
        }
        q
    }
}
