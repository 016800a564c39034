//! Edge histogram kernel: dot product of edge label histograms.
//! Graphs without edge labels count each directed entry with the default label.

use serde::{Deserialize, Serialize};

use super::{histogram_dot, histogram_of, BaseKernel, Histogram, PairwiseKernel, Stage};
use crate::error::Result;
use crate::graph::{Graph, Label};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeHistogramParams {
    pub n_jobs: Option<i32>,
}

#[derive(Default)]
pub struct EdgeHistogram {
    default_label: Label,
}

impl EdgeHistogram {
    pub fn kernel(n_jobs: Option<usize>) -> PairwiseKernel<EdgeHistogram> {
        PairwiseKernel::new(EdgeHistogram::default(), n_jobs)
    }
}

impl BaseKernel for EdgeHistogram {
    type Features = Histogram<Label>;

    fn name(&self) -> &str {
        "edge_histogram"
    }

    fn extract(&mut self, graphs: &[Graph], _stage: Stage) -> Result<Vec<Histogram<Label>>> {
        Ok(graphs
            .iter()
            .map(|g| histogram_of(g.edge_labels_or_default(&self.default_label).values().cloned()))
            .collect())
    }

    fn pairwise(&self, x: &Histogram<Label>, y: &Histogram<Label>) -> Result<f64> {
        Ok(histogram_dot(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{make_edge_labels, GraphFormat, GraphInput};
    use crate::kernels::Kernel;

    #[test]
    fn edge_label_counts() {
        let g1 = Graph::new(
            GraphInput::edges([(0, 1), (1, 0), (1, 2)]),
            None,
            Some(make_edge_labels([(0, 1, "x"), (1, 0, "x"), (1, 2, "y")])),
            GraphFormat::Auto,
        )
        .unwrap();
        let g2 = Graph::try_from(GraphInput::edges([(0, 1), (1, 0)])).unwrap();
        let mut kernel = EdgeHistogram::kernel(None);
        let km = kernel.fit_transform(&[g1.clone()]).unwrap();
        assert_eq!(km[[0, 0]], 5.);
        // default label Int(0) shared with no label of g1
        let km = kernel.transform(&[g2]).unwrap();
        assert_eq!(km[[0, 0]], 0.);
    }
}
