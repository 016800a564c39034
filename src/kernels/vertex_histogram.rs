//! Vertex histogram kernel, also the subtree kernel used at each Weisfeiler-Lehman iteration.
//!
//! k(G, G') = sum over labels l of count_G(l) * count_G'(l)

use serde::{Deserialize, Serialize};

use super::{histogram_dot, histogram_of, BaseKernel, Histogram, PairwiseKernel, Stage};
use crate::error::Result;
use crate::graph::{Graph, Label};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VertexHistogramParams {
    pub n_jobs: Option<i32>,
}

pub struct VertexHistogram {
    default_label: Label,
}

impl VertexHistogram {
    pub fn new() -> Self {
        VertexHistogram {
            default_label: Label::default(),
        }
    }

    /// the kernel with its lifecycle
    pub fn kernel(n_jobs: Option<usize>) -> PairwiseKernel<VertexHistogram> {
        PairwiseKernel::new(VertexHistogram::new(), n_jobs)
    }
}

impl Default for VertexHistogram {
    fn default() -> Self {
        VertexHistogram::new()
    }
}

impl BaseKernel for VertexHistogram {
    type Features = Histogram<Label>;

    fn name(&self) -> &str {
        "vertex_histogram"
    }

    fn extract(&mut self, graphs: &[Graph], _stage: Stage) -> Result<Vec<Histogram<Label>>> {
        let features = graphs
            .iter()
            .map(|g| histogram_of(g.vertex_labels_or_default(&self.default_label).iter().cloned()))
            .collect();
        Ok(features)
    }

    fn pairwise(&self, x: &Histogram<Label>, y: &Histogram<Label>) -> Result<f64> {
        Ok(histogram_dot(x, y))
    }
} // end of impl BaseKernel for VertexHistogram

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{make_labels, GraphFormat, GraphInput};
    use crate::kernels::Kernel;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn label_counts() {
        log_init_test();
        //
        let g1 = Graph::new(
            GraphInput::edges([(0, 1), (1, 2)]),
            Some(make_labels([(0, "a"), (1, "a"), (2, "b")])),
            None,
            GraphFormat::Auto,
        )
        .unwrap();
        let g2 = Graph::new(
            GraphInput::edges([(0, 1)]),
            Some(make_labels([(0, "a"), (1, "c")])),
            None,
            GraphFormat::Auto,
        )
        .unwrap();
        let mut kernel = VertexHistogram::kernel(None);
        let km = kernel.fit_transform(&[g1, g2]).unwrap();
        // 2*2 + 1*1, 1*1 + 1*1, a : 2*1
        assert_eq!(km[[0, 0]], 5.);
        assert_eq!(km[[1, 1]], 2.);
        assert_eq!(km[[0, 1]], 2.);
        assert_eq!(km[[1, 0]], 2.);
    }

    #[test]
    fn unlabelled_counts_vertices() {
        let g = Graph::try_from(GraphInput::edges([(0, 1), (1, 2)])).unwrap();
        let mut kernel = VertexHistogram::kernel(None);
        let km = kernel.fit_transform(&[g]).unwrap();
        assert_eq!(km[[0, 0]], 9.);
    }
} // end of mod tests
