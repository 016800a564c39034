//! Structural computations on a [Graph]: all pairs shortest paths and core numbers.
//!
//! Shortest paths go through petgraph, edge weights are taken as lengths.
//! Core numbers follow the bucket algorithm of Batagelj-Zaversnik, on the undirected version of the graph.

use std::collections::BTreeSet;

use ndarray::Array2;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};

use super::Graph;

impl Graph {
    /// Returns the matrix of shortest path lengths between vertices, indexed as the adjacency matrix.
    /// Unreachable pairs get f64::INFINITY, the diagonal is 0.
    pub fn build_shortest_path_matrix(&self) -> Array2<f64> {
        let n = self.nv();
        let edges = self.get_edges();
        if edges.iter().any(|(_, _, w)| *w < 0.) {
            log::warn!("negative edge weights, shortest path lengths are not reliable");
        }
        let mut pgraph = DiGraph::<(), f64>::with_capacity(n, edges.len());
        for _ in 0..n {
            pgraph.add_node(());
        }
        for (i, j, w) in edges {
            pgraph.add_edge(NodeIndex::new(i), NodeIndex::new(j), w);
        }
        let mut sp = Array2::<f64>::from_elem((n, n), f64::INFINITY);
        for source in 0..n {
            let lengths = dijkstra(&pgraph, NodeIndex::new(source), None, |e| *e.weight());
            for (node, d) in lengths {
                sp[[source, node.index()]] = d;
            }
        }
        sp
    } // end of build_shortest_path_matrix

    /// neighbours of vertex i in the undirected version of the graph, self loops excluded
    pub fn undirected_neighbors(&self) -> Vec<BTreeSet<usize>> {
        let mut neighbours = vec![BTreeSet::<usize>::new(); self.nv()];
        for (i, j, _) in self.get_edges() {
            if i != j {
                neighbours[i].insert(j);
                neighbours[j].insert(i);
            }
        }
        neighbours
    }

    /// Core number of each vertex, by index.
    /// The core number of v is the largest k such that v belongs to a subgraph of minimal degree k.
    pub fn core_numbers(&self) -> Vec<usize> {
        let neighbours = self.undirected_neighbors();
        let n = neighbours.len();
        if n == 0 {
            return Vec::new();
        }
        let mut degree: Vec<usize> = neighbours.iter().map(|s| s.len()).collect();
        let max_degree = degree.iter().copied().max().unwrap_or(0);
        // bin sort vertices by degree
        let mut bin = vec![0usize; max_degree + 1];
        for d in &degree {
            bin[*d] += 1;
        }
        let mut start = 0;
        for b in bin.iter_mut() {
            let nb = *b;
            *b = start;
            start += nb;
        }
        let mut pos = vec![0usize; n];
        let mut vert = vec![0usize; n];
        for v in 0..n {
            pos[v] = bin[degree[v]];
            vert[pos[v]] = v;
            bin[degree[v]] += 1;
        }
        for d in (1..=max_degree).rev() {
            bin[d] = bin[d - 1];
        }
        bin[0] = 0;
        //
        for i in 0..n {
            let v = vert[i];
            for u in &neighbours[v] {
                let u = *u;
                if degree[u] > degree[v] {
                    let du = degree[u];
                    let pu = pos[u];
                    let pw = bin[du];
                    let w = vert[pw];
                    if u != w {
                        pos[u] = pw;
                        vert[pu] = w;
                        pos[w] = pu;
                        vert[pw] = u;
                    }
                    bin[du] += 1;
                    degree[u] -= 1;
                }
            }
        }
        degree
    } // end of core_numbers
} // end of impl Graph

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphInput;
    use ndarray::arr2;

    #[test]
    fn path_lengths_weighted() {
        // 0 -> 1 -> 2 with weights, 3 isolated
        let graph = Graph::try_from(GraphInput::weighted_edges([
            (0, 1, 1.),
            (1, 2, 2.5),
            (0, 2, 5.),
        ]))
        .unwrap();
        let sp = graph.build_shortest_path_matrix();
        assert_eq!(sp[[0, 0]], 0.);
        assert_eq!(sp[[0, 2]], 3.5);
        assert!(sp[[2, 0]].is_infinite());
    }

    #[test]
    fn path_lengths_isolated() {
        let graph = Graph::from_adjacency(arr2(&[[0., 1., 0.], [1., 0., 0.], [0., 0., 0.]])).unwrap();
        let sp = graph.build_shortest_path_matrix();
        assert_eq!(sp[[1, 0]], 1.);
        assert!(sp[[0, 2]].is_infinite());
        assert_eq!(sp[[2, 2]], 0.);
    }

    #[test]
    fn cores_of_triangle_with_tail() {
        // triangle 0,1,2 and tail 2-3-4
        let graph = Graph::try_from(GraphInput::edges([(0, 1), (1, 2), (2, 0), (2, 3), (3, 4)])).unwrap();
        let cores = graph.core_numbers();
        assert_eq!(cores, vec![2, 2, 2, 1, 1]);
    }
} // end of mod tests
