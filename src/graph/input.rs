//! Raw graph representations accepted by [Graph](super::Graph) construction.
//!
//! Each raw shape is parsed into a list of vertex symbols and a list of weighted directed entries.
//! The vertex index map is then built by sorting symbols, see [Structure](super::Structure).

use std::collections::HashMap;

use ndarray::Array2;
use sprs::CsMat;

use super::symbol::Symbol;
use super::GraphFormat;
use crate::error::{GraphKernelError, Result};

/// The accepted raw shapes of a graph.
///
/// Entries are directed as given: an undirected graph lists both directions.
#[derive(Clone, Debug)]
pub enum GraphInput {
    /// square dense matrix, vertices are 0..n-1
    Dense(Array2<f64>),
    /// square sparse matrix (csr or csc), vertices are 0..n-1
    Sparse(CsMat<f64>),
    /// square nested adjacency list, vertices are 0..n-1
    NestedList(Vec<Vec<f64>>),
    /// vertex -> {neighbour : weight}
    WeightedDict(HashMap<Symbol, HashMap<Symbol, f64>>),
    /// vertex -> neighbours, weight 1.
    NeighborLists(HashMap<Symbol, Vec<Symbol>>),
    /// list of (u,v), weight 1.
    Edges(Vec<(Symbol, Symbol)>),
    /// list of (u,v,weight)
    WeightedEdges(Vec<(Symbol, Symbol, f64)>),
}

impl GraphInput {
    /// format in which the input is naturally expressed
    pub fn natural_format(&self) -> GraphFormat {
        match self {
            GraphInput::Dense(_) | GraphInput::Sparse(_) | GraphInput::NestedList(_) => GraphFormat::Adjacency,
            _ => GraphFormat::Dictionary,
        }
    }

    /// builds an edge list input from anything convertible to symbols
    pub fn edges<V: Into<Symbol>, I: IntoIterator<Item = (V, V)>>(edges: I) -> Self {
        GraphInput::Edges(edges.into_iter().map(|(u, v)| (u.into(), v.into())).collect())
    }

    /// builds a weighted edge list input
    pub fn weighted_edges<V: Into<Symbol>, I: IntoIterator<Item = (V, V, f64)>>(edges: I) -> Self {
        GraphInput::WeightedEdges(edges.into_iter().map(|(u, v, w)| (u.into(), v.into(), w)).collect())
    }
} // end of impl GraphInput

impl From<Array2<f64>> for GraphInput {
    fn from(mat: Array2<f64>) -> Self {
        GraphInput::Dense(mat)
    }
}

impl From<CsMat<f64>> for GraphInput {
    fn from(mat: CsMat<f64>) -> Self {
        GraphInput::Sparse(mat)
    }
}

impl From<Vec<Vec<f64>>> for GraphInput {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        GraphInput::NestedList(rows)
    }
}

//===================================================================================

/// vertices and weighted entries extracted from an input, before index assignment
pub(crate) struct RawGraph {
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) entries: Vec<(Symbol, Symbol, f64)>,
}

fn check_weight(w: f64) -> Result<f64> {
    if !w.is_finite() {
        return Err(GraphKernelError::InputFormat(format!("non finite edge weight {}", w)));
    }
    Ok(w)
}

fn check_square(nrows: usize, ncols: usize) -> Result<()> {
    if nrows != ncols {
        return Err(GraphKernelError::InputFormat(format!(
            "adjacency matrix must be square, got ({}, {})",
            nrows, ncols
        )));
    }
    Ok(())
}

fn index_symbols(n: usize) -> Vec<Symbol> {
    (0..n).map(Symbol::from).collect()
}

/// parse any input shape into symbols and entries
pub(crate) fn parse_input(input: GraphInput) -> Result<RawGraph> {
    let mut entries = Vec::<(Symbol, Symbol, f64)>::new();
    let symbols = match input {
        GraphInput::Dense(mat) => {
            let (nrows, ncols) = mat.dim();
            check_square(nrows, ncols)?;
            for ((i, j), w) in mat.indexed_iter() {
                if check_weight(*w)? != 0. {
                    entries.push((Symbol::from(i), Symbol::from(j), *w));
                }
            }
            index_symbols(nrows)
        }
        GraphInput::Sparse(mat) => {
            let (nrows, ncols) = mat.shape();
            check_square(nrows, ncols)?;
            for (w, (i, j)) in mat.iter() {
                if check_weight(*w)? != 0. {
                    entries.push((Symbol::from(i), Symbol::from(j), *w));
                }
            }
            index_symbols(nrows)
        }
        GraphInput::NestedList(rows) => {
            let n = rows.len();
            for (i, row) in rows.iter().enumerate() {
                if row.len() != n {
                    return Err(GraphKernelError::InputFormat(format!(
                        "nested list is not square, row {} has length {} for {} rows",
                        i,
                        row.len(),
                        n
                    )));
                }
                for (j, w) in row.iter().enumerate() {
                    if check_weight(*w)? != 0. {
                        entries.push((Symbol::from(i), Symbol::from(j), *w));
                    }
                }
            }
            index_symbols(n)
        }
        GraphInput::WeightedDict(dict) => {
            let mut symbols = Vec::<Symbol>::with_capacity(dict.len());
            for (u, neighbours) in dict {
                for (v, w) in neighbours {
                    symbols.push(v.clone());
                    if check_weight(w)? != 0. {
                        entries.push((u.clone(), v, w));
                    } else {
                        log::warn!("ignoring null weight edge from {}", u);
                    }
                }
                symbols.push(u);
            }
            symbols
        }
        GraphInput::NeighborLists(dict) => {
            let mut symbols = Vec::<Symbol>::with_capacity(dict.len());
            for (u, neighbours) in dict {
                for v in neighbours {
                    symbols.push(v.clone());
                    entries.push((u.clone(), v, 1.));
                }
                symbols.push(u);
            }
            symbols
        }
        GraphInput::Edges(edges) => {
            let mut symbols = Vec::<Symbol>::with_capacity(2 * edges.len());
            for (u, v) in edges {
                symbols.push(u.clone());
                symbols.push(v.clone());
                entries.push((u, v, 1.));
            }
            symbols
        }
        GraphInput::WeightedEdges(edges) => {
            let mut symbols = Vec::<Symbol>::with_capacity(2 * edges.len());
            for (u, v, w) in edges {
                symbols.push(u.clone());
                symbols.push(v.clone());
                if check_weight(w)? != 0. {
                    entries.push((u, v, w));
                } else {
                    log::warn!("ignoring null weight edge {} -> {}", u, v);
                }
            }
            symbols
        }
    };
    // vertex symbols must be mutually orderable
    let has_int = symbols.iter().any(|s| s.is_int());
    let has_str = symbols.iter().any(|s| !s.is_int());
    if has_int && has_str {
        return Err(GraphKernelError::InputFormat(
            "vertex symbols mix integers and strings, they cannot be ordered".to_string(),
        ));
    }
    Ok(RawGraph { symbols, entries })
} // end of parse_input

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn reject_non_square() {
        let res = parse_input(GraphInput::Dense(Array2::<f64>::zeros((2, 3))));
        assert!(matches!(res, Err(GraphKernelError::InputFormat(_))));
        let res = parse_input(GraphInput::NestedList(vec![vec![0., 1.], vec![1.]]));
        assert!(matches!(res, Err(GraphKernelError::InputFormat(_))));
    }

    #[test]
    fn reject_mixed_symbols() {
        let res = parse_input(GraphInput::Edges(vec![(Symbol::from(1), Symbol::from("a"))]));
        assert!(matches!(res, Err(GraphKernelError::InputFormat(_))));
    }

    #[test]
    fn reject_nan_weight() {
        let res = parse_input(GraphInput::weighted_edges([(0, 1, f64::NAN)]));
        assert!(matches!(res, Err(GraphKernelError::InputFormat(_))));
    }

    #[test]
    fn dense_entries() {
        let raw = parse_input(GraphInput::Dense(arr2(&[[0., 1.], [2., 0.]]))).unwrap();
        assert_eq!(raw.symbols.len(), 2);
        assert_eq!(raw.entries.len(), 2);
        assert!(raw.entries.contains(&(Symbol::Int(1), Symbol::Int(0), 2.)));
    }
} // end of mod tests
