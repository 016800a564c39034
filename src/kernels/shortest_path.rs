//! Shortest path kernel.
//!
//! Each graph is described by the counts of triplets (label(i), label(j), d(i,j)) over ordered pairs
//! of distinct vertices i, j with j reachable from i. The kernel is the dot product of these counts.
//! Without labels the triplets reduce to path lengths.
//!
//! Path lengths are computed with edge weights as lengths, see [Graph::build_shortest_path_matrix].

use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::{histogram_dot, BaseKernel, Histogram, PairwiseKernel, Stage};
use crate::error::Result;
use crate::graph::{Graph, Label};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShortestPathParams {
    /// if false vertex labels are ignored
    pub with_labels: bool,
    pub n_jobs: Option<i32>,
}

impl Default for ShortestPathParams {
    fn default() -> Self {
        ShortestPathParams {
            with_labels: true,
            n_jobs: None,
        }
    }
}

type PathKey = (Label, Label, OrderedFloat<f64>);

pub struct ShortestPath {
    with_labels: bool,
    default_label: Label,
}

impl ShortestPath {
    pub fn new(with_labels: bool) -> Self {
        ShortestPath {
            with_labels,
            default_label: Label::default(),
        }
    }

    pub fn kernel(params: &ShortestPathParams, n_jobs: Option<usize>) -> PairwiseKernel<ShortestPath> {
        PairwiseKernel::new(ShortestPath::new(params.with_labels), n_jobs)
    }

    fn path_counts(&self, graph: &Graph) -> Histogram<PathKey> {
        let labels = if self.with_labels {
            graph.vertex_labels_or_default(&self.default_label)
        } else {
            Arc::new(vec![self.default_label.clone(); graph.nv()])
        };
        let sp = graph.build_shortest_path_matrix();
        let mut counts = Histogram::<PathKey>::default();
        for ((i, j), d) in sp.indexed_iter() {
            if i != j && d.is_finite() {
                let key = (labels[i].clone(), labels[j].clone(), OrderedFloat(*d));
                *counts.entry(key).or_insert(0.) += 1.;
            }
        }
        counts
    } // end of path_counts
} // end of impl ShortestPath

impl BaseKernel for ShortestPath {
    type Features = Histogram<PathKey>;

    fn name(&self) -> &str {
        "shortest_path"
    }

    fn extract(&mut self, graphs: &[Graph], _stage: Stage) -> Result<Vec<Histogram<PathKey>>> {
        Ok(graphs.iter().map(|g| self.path_counts(g)).collect())
    }

    fn pairwise(&self, x: &Histogram<PathKey>, y: &Histogram<PathKey>) -> Result<f64> {
        Ok(histogram_dot(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{make_labels, GraphFormat, GraphInput};
    use crate::kernels::Kernel;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn h2o() -> Graph {
        Graph::new(
            GraphInput::edges([(0, 1), (1, 0), (0, 2), (2, 0)]),
            Some(make_labels([(0, "O"), (1, "H"), (2, "H")])),
            None,
            GraphFormat::Auto,
        )
        .unwrap()
    }

    fn h3o() -> Graph {
        Graph::new(
            GraphInput::edges([(0, 1), (1, 0), (0, 2), (2, 0), (0, 3), (3, 0)]),
            Some(make_labels([(0, "O"), (1, "H"), (2, "H"), (3, "H")])),
            None,
            GraphFormat::Auto,
        )
        .unwrap()
    }

    #[test]
    fn water_counts() {
        log_init_test();
        //
        let mut kernel = ShortestPath::kernel(&ShortestPathParams::default(), None);
        kernel.fit(&[h2o()]).unwrap();
        let (x_diag, _) = kernel.diagonal().unwrap();
        assert_eq!(x_diag[0], 12.);
        let km = kernel.transform(&[h3o()]).unwrap();
        assert_eq!(km[[0, 0]], 24.);
        let (_, y_diag) = kernel.diagonal().unwrap();
        assert_eq!(y_diag.unwrap()[0], 54.);
    }

    #[test]
    fn without_labels() {
        let mut kernel = ShortestPath::kernel(
            &ShortestPathParams {
                with_labels: false,
                n_jobs: None,
            },
            None,
        );
        // H2O is a path of length 2 : 4 pairs at distance 1, 2 at distance 2
        let km = kernel.fit_transform(&[h2o()]).unwrap();
        assert_eq!(km[[0, 0]], 16. + 4.);
    }
}
