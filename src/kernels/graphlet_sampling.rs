//! Graphlet sampling kernel.
//!
//! From each graph we sample n_samples sets of k vertices (fewer if the graph has less than k vertices)
//! and record the isomorphism class of the induced subgraph (the graphlet).
//! The feature of a graph is the frequency vector of graphlet classes, the kernel is the dot product.
//!
//! The isomorphism class is the smallest adjacency code over all vertex permutations,
//! so k is limited to [MAX_GRAPHLET_SIZE].
//!
//! Sampling is done each time features are extracted: fit_transform(X) samples X once while
//! fit(X) followed by transform(X) samples X twice, so the two matrices differ in general.
//! The kernel owns its generator, seeded by random_state if given.

use rand::seq::index::sample;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::{histogram_dot, make_rng, BaseKernel, Histogram, PairwiseKernel, Stage};
use crate::error::{GraphKernelError, Result};
use crate::graph::Graph;

/// permutations are enumerated, so graphlets stay small
pub const MAX_GRAPHLET_SIZE: usize = 6;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphletSamplingParams {
    /// graphlet size
    pub k: usize,
    /// number of graphlets sampled per graph
    pub n_samples: usize,
    pub random_state: Option<u64>,
    pub n_jobs: Option<i32>,
}

impl Default for GraphletSamplingParams {
    fn default() -> Self {
        GraphletSamplingParams {
            k: 3,
            n_samples: 50,
            random_state: None,
            n_jobs: None,
        }
    }
}

impl GraphletSamplingParams {
    pub fn check(&self) -> Result<()> {
        if self.k == 0 || self.k > MAX_GRAPHLET_SIZE {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "graphlet_sampling".to_string(),
                reason: format!("k must be in 1..={}, got {}", MAX_GRAPHLET_SIZE, self.k),
            });
        }
        if self.n_samples == 0 {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "graphlet_sampling".to_string(),
                reason: "n_samples must be positive".to_string(),
            });
        }
        Ok(())
    }
} // end of impl GraphletSamplingParams

/// (graphlet size, canonical adjacency code)
type GraphletClass = (usize, u64);

pub struct GraphletSampling {
    k: usize,
    n_samples: usize,
    rng: Xoshiro256PlusPlus,
    /// permutations\[s\] : all permutations of 0..s
    permutations: Vec<Vec<Vec<usize>>>,
}

impl GraphletSampling {
    pub fn new(params: &GraphletSamplingParams) -> Result<Self> {
        params.check()?;
        let permutations = (0..=params.k).map(all_permutations).collect();
        Ok(GraphletSampling {
            k: params.k,
            n_samples: params.n_samples,
            rng: make_rng(params.random_state),
            permutations,
        })
    }

    pub fn kernel(params: &GraphletSamplingParams, n_jobs: Option<usize>) -> Result<PairwiseKernel<GraphletSampling>> {
        Ok(PairwiseKernel::new(GraphletSampling::new(params)?, n_jobs))
    }

    // smallest code of the induced subgraph on vertices, over all orderings of vertices
    fn canonical_code(&self, adjacency: &[Vec<bool>]) -> u64 {
        let s = adjacency.len();
        self.permutations[s]
            .iter()
            .map(|perm| {
                let mut code = 0u64;
                for i in 0..s {
                    for j in 0..s {
                        if adjacency[perm[i]][perm[j]] {
                            code |= 1u64 << (i * s + j);
                        }
                    }
                }
                code
            })
            .min()
            .unwrap_or(0)
    } // end of canonical_code

    fn sample_graph(&mut self, graph: &Graph) -> Histogram<GraphletClass> {
        let mut frequencies = Histogram::<GraphletClass>::default();
        let n = graph.nv();
        if n == 0 {
            return frequencies;
        }
        let size = self.k.min(n);
        let adj = graph.get_adjacency_matrix();
        let increment = 1. / self.n_samples as f64;
        for _ in 0..self.n_samples {
            let vertices = sample(&mut self.rng, n, size).into_vec();
            let induced: Vec<Vec<bool>> = vertices
                .iter()
                .map(|i| vertices.iter().map(|j| adj[[*i, *j]] != 0.).collect())
                .collect();
            let class = (size, self.canonical_code(&induced));
            *frequencies.entry(class).or_insert(0.) += increment;
        }
        frequencies
    } // end of sample_graph
} // end of impl GraphletSampling

fn all_permutations(s: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::<Vec<usize>>::new();
    let mut current: Vec<usize> = (0..s).collect();
    permute(&mut current, 0, &mut result);
    result
}

fn permute(current: &mut Vec<usize>, first: usize, result: &mut Vec<Vec<usize>>) {
    if first + 1 >= current.len() {
        result.push(current.clone());
        return;
    }
    for i in first..current.len() {
        current.swap(first, i);
        permute(current, first + 1, result);
        current.swap(first, i);
    }
}

impl BaseKernel for GraphletSampling {
    type Features = Histogram<GraphletClass>;

    fn name(&self) -> &str {
        "graphlet_sampling"
    }

    fn extract(&mut self, graphs: &[Graph], stage: Stage) -> Result<Vec<Histogram<GraphletClass>>> {
        log::debug!("graphlet sampling, {:?} stage, {} graphs", stage, graphs.len());
        Ok(graphs.iter().map(|g| self.sample_graph(g)).collect())
    }

    fn pairwise(&self, x: &Histogram<GraphletClass>, y: &Histogram<GraphletClass>) -> Result<f64> {
        Ok(histogram_dot(x, y))
    }

    fn supports_parallel(&self) -> bool {
        false
    }
} // end of impl BaseKernel for GraphletSampling

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphInput;
    use crate::kernels::Kernel;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn some_graphs() -> Vec<Graph> {
        vec![
            Graph::try_from(GraphInput::edges([(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)])).unwrap(),
            Graph::try_from(GraphInput::edges([(0, 1), (1, 2), (2, 3), (3, 4)])).unwrap(),
            Graph::try_from(GraphInput::edges([(0, 1)])).unwrap(),
        ]
    }

    #[test]
    fn permutations_count() {
        assert_eq!(all_permutations(0).len(), 1);
        assert_eq!(all_permutations(3).len(), 6);
        assert_eq!(all_permutations(4).len(), 24);
    }

    #[test]
    fn isomorphic_graphlets_share_code() {
        let kernel = GraphletSampling::new(&GraphletSamplingParams::default()).unwrap();
        // path a->b->c given in 2 vertex orders
        let p1 = vec![vec![false, true, false], vec![false, false, true], vec![false, false, false]];
        let p2 = vec![vec![false, false, false], vec![true, false, false], vec![false, true, false]];
        assert_eq!(kernel.canonical_code(&p1), kernel.canonical_code(&p2));
        let triangle = vec![vec![false, true, true], vec![true, false, true], vec![true, true, false]];
        assert_ne!(kernel.canonical_code(&p1), kernel.canonical_code(&triangle));
    }

    #[test]
    fn seeded_reproducibility() {
        log_init_test();
        //
        let params = GraphletSamplingParams {
            n_samples: 5,
            random_state: Some(42),
            ..Default::default()
        };
        let graphs = some_graphs();
        let mut k1 = GraphletSampling::kernel(&params, None).unwrap();
        let mut k2 = GraphletSampling::kernel(&params, None).unwrap();
        assert_eq!(k1.fit_transform(&graphs).unwrap(), k2.fit_transform(&graphs).unwrap());
        assert_eq!(k1.transform(&graphs).unwrap(), k2.transform(&graphs).unwrap());
    }

    #[test]
    fn small_graph_frequencies_sum_to_one() {
        let params = GraphletSamplingParams {
            random_state: Some(1),
            ..Default::default()
        };
        let mut kernel = GraphletSampling::new(&params).unwrap();
        let graphs = some_graphs();
        let features = kernel.extract(&graphs, Stage::Fit).unwrap();
        for f in &features {
            let total: f64 = f.values().sum();
            assert!((total - 1.).abs() < 1.0e-10);
        }
        // graph with 2 vertices : only graphlets of size 2
        assert!(features[2].keys().all(|(size, _)| *size == 2));
        assert!(GraphletSampling::new(&GraphletSamplingParams {
            k: 9,
            ..Default::default()
        })
        .is_err());
    }
}
