/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Readers for common graph interchange formats.
//!
//! Both readers keep the node identifiers of the input file as keys, so a
//! one-based Matrix Market file produces a graph whose key space starts at 1;
//! the CSR compression takes care of the mapping to rank space.

use crate::graphs::vec_graph::VecGraph;
use anyhow::{bail, ensure, Context, Result};
use std::io::BufRead;

/// Reads a graph in Matrix Market coordinate format.
///
/// The `pattern`, `integer` and `real` field types are accepted (edge values
/// are ignored, as arcs are unweighted); the `symmetric` symmetry adds both
/// directions of each arc. Nodes are added for the whole index space declared
/// by the size header, so isolated nodes are preserved.
pub fn read_matrix_market(reader: impl BufRead) -> Result<VecGraph> {
    let mut lines = reader.lines();

    let header = lines
        .next()
        .context("Empty Matrix Market file")?
        .context("Cannot read header")?;
    let mut fields = header.split_whitespace();
    ensure!(
        fields.next() == Some("%%MatrixMarket") && fields.next() == Some("matrix"),
        "Not a Matrix Market file: {header}"
    );
    ensure!(
        fields.next() == Some("coordinate"),
        "Only the coordinate format is supported"
    );
    let _field = fields.next();
    let symmetric = matches!(fields.next(), Some("symmetric"));

    let mut g = VecGraph::new();
    let mut size: Option<(usize, usize, usize)> = None;
    let mut read = 0;
    for line in lines {
        let line = line.context("Cannot read line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let mut it = line.split_whitespace();
        let mut next = || -> Result<usize> {
            it.next()
                .with_context(|| format!("Truncated line: {line}"))?
                .parse::<usize>()
                .with_context(|| format!("Cannot parse line: {line}"))
        };
        match size {
            None => {
                let (rows, cols) = (next()?, next()?);
                size = Some((rows, cols, next()?));
                // One-based identifiers.
                for u in 1..=rows.max(cols) {
                    g.add_node(u);
                }
            }
            Some((rows, cols, nnz)) => {
                let (u, v) = (next()?, next()?);
                ensure!(
                    (1..=rows).contains(&u) && (1..=cols).contains(&v),
                    "Arc ({u}, {v}) out of bounds"
                );
                g.add_arc(u, v);
                if symmetric && u != v {
                    g.add_arc(v, u);
                }
                read += 1;
                if read > nnz {
                    bail!("More than {nnz} entries");
                }
            }
        }
    }

    match size {
        Some((_, _, nnz)) if read == nnz => Ok(g),
        Some((_, _, nnz)) => bail!("Expected {nnz} entries, found {read}"),
        None => bail!("Missing size header"),
    }
}

/// Appends up to `limit` arcs from a SNAP temporal edge list to a graph.
///
/// Each non-comment line is `src dst [timestamp]`; lines are assumed to be in
/// timestamp order and the timestamp itself is ignored. Returns the number of
/// arcs read, which is less than `limit` only at end of input. Repeated calls
/// with the same reader consume the list batch by batch, which is how the
/// driver grows a graph over time.
pub fn read_temporal(reader: &mut impl BufRead, g: &mut VecGraph, limit: usize) -> Result<usize> {
    let mut read = 0;
    let mut line = String::new();
    while read < limit {
        line.clear();
        if reader
            .read_line(&mut line)
            .context("Cannot read line")?
            == 0
        {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
            continue;
        }
        let mut it = trimmed.split_whitespace();
        let mut next = || -> Result<usize> {
            it.next()
                .with_context(|| format!("Truncated line: {trimmed}"))?
                .parse::<usize>()
                .with_context(|| format!("Cannot parse line: {trimmed}"))
        };
        let (u, v) = (next()?, next()?);
        g.add_arc(u, v);
        read += 1;
    }
    Ok(read)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_matrix_market() -> Result<()> {
        let data = "%%MatrixMarket matrix coordinate pattern general\n\
                    % a comment\n\
                    3 3 3\n\
                    1 2\n\
                    2 3\n\
                    3 1\n";
        let g = read_matrix_market(Cursor::new(data))?;
        assert_eq!(g.num_nodes(), 3);
        assert_eq!(g.span(), 4);
        assert_eq!(g.num_arcs(), 3);
        assert_eq!(g.successors(1), &[2]);
        Ok(())
    }

    #[test]
    fn test_matrix_market_symmetric() -> Result<()> {
        let data = "%%MatrixMarket matrix coordinate real symmetric\n\
                    2 2 1\n\
                    1 2 0.5\n";
        let g = read_matrix_market(Cursor::new(data))?;
        assert_eq!(g.num_arcs(), 2);
        assert_eq!(g.successors(2), &[1]);
        Ok(())
    }

    #[test]
    fn test_matrix_market_truncated() {
        let data = "%%MatrixMarket matrix coordinate pattern general\n3 3 3\n1 2\n";
        assert!(read_matrix_market(Cursor::new(data)).is_err());
    }

    #[test]
    fn test_temporal_batches() -> Result<()> {
        let mut reader = Cursor::new("# src dst t\n1 2 10\n2 3 20\n3 1 30\n");
        let mut g = VecGraph::new();
        assert_eq!(read_temporal(&mut reader, &mut g, 2)?, 2);
        assert_eq!(g.num_arcs(), 2);
        assert_eq!(read_temporal(&mut reader, &mut g, 2)?, 1);
        assert_eq!(read_temporal(&mut reader, &mut g, 2)?, 0);
        assert_eq!(g.num_nodes(), 3);
        Ok(())
    }
}
