//! Neighborhood hash kernel.
//!
//! Vertex labels are first mapped to random bit strings of `bits` bits.
//! At each iteration the label of a vertex becomes ROT(l(v)) XOR (XOR of the labels of its neighbours),
//! where ROT is a 1 bit circular shift. After each iteration a graph is summarized by the multiset of its labels.
//!
//! For 2 graphs with a and b vertices sharing c labels (multiset intersection) at an iteration,
//! the iteration contributes c / (a + b - c). The kernel is the mean over iterations.
//!
//! The random bit strings assigned at fit are kept. At transform unseen labels get new bit strings
//! that are not stored in the fitted dictionary.

use std::collections::HashMap;

use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::{histogram_of, make_rng, BaseKernel, Histogram, PairwiseKernel, Stage};
use crate::error::{GraphKernelError, Result};
use crate::graph::{Graph, Label};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NeighborhoodHashParams {
    pub n_iter: usize,
    /// number of bits of hashed labels
    pub bits: u32,
    pub random_state: Option<u64>,
}

impl Default for NeighborhoodHashParams {
    fn default() -> Self {
        NeighborhoodHashParams {
            n_iter: 3,
            bits: 16,
            random_state: None,
        }
    }
}

impl NeighborhoodHashParams {
    pub fn check(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "neighborhood_hash".to_string(),
                reason: "n_iter must be positive".to_string(),
            });
        }
        if self.bits == 0 || self.bits > 63 {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "neighborhood_hash".to_string(),
                reason: format!("bits must be in 1..=63, got {}", self.bits),
            });
        }
        Ok(())
    }
}

/// label multisets at each iteration, and number of vertices
pub struct HashedGraph {
    counts: Vec<Histogram<u64>>,
    nv: usize,
}

pub struct NeighborhoodHash {
    n_iter: usize,
    bits: u32,
    rng: Xoshiro256PlusPlus,
    /// bit strings of labels seen at fit
    dictionary: HashMap<Label, u64>,
    default_label: Label,
}

impl NeighborhoodHash {
    pub fn new(params: &NeighborhoodHashParams) -> Result<Self> {
        params.check()?;
        Ok(NeighborhoodHash {
            n_iter: params.n_iter,
            bits: params.bits,
            rng: make_rng(params.random_state),
            dictionary: HashMap::new(),
            default_label: Label::default(),
        })
    }

    pub fn kernel(params: &NeighborhoodHashParams) -> Result<PairwiseKernel<NeighborhoodHash>> {
        Ok(PairwiseKernel::new(NeighborhoodHash::new(params)?, None))
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    fn rotate(&self, x: u64) -> u64 {
        ((x << 1) | (x >> (self.bits - 1))) & self.mask()
    }

    fn hash_graph(&self, graph: &Graph, dictionary: &HashMap<Label, u64>) -> HashedGraph {
        let labels = graph.vertex_labels_or_default(&self.default_label);
        // all labels are in dictionary at this point
        let mut hashed: Vec<u64> = labels.iter().map(|l| dictionary.get(l).copied().unwrap_or(0)).collect();
        let mut counts = Vec::<Histogram<u64>>::with_capacity(self.n_iter);
        for _ in 0..self.n_iter {
            hashed = (0..graph.nv())
                .map(|v| graph.neighbors(v).fold(self.rotate(hashed[v]), |acc, u| acc ^ hashed[u]))
                .collect();
            counts.push(histogram_of(hashed.iter().copied()));
        }
        HashedGraph { counts, nv: graph.nv() }
    } // end of hash_graph
} // end of impl NeighborhoodHash

impl BaseKernel for NeighborhoodHash {
    type Features = HashedGraph;

    fn name(&self) -> &str {
        "neighborhood_hash"
    }

    fn extract(&mut self, graphs: &[Graph], stage: Stage) -> Result<Vec<HashedGraph>> {
        let mut dictionary = match stage {
            Stage::Fit => HashMap::new(),
            Stage::Transform => self.dictionary.clone(),
        };
        let mask = self.mask();
        for graph in graphs {
            for label in graph.vertex_labels_or_default(&self.default_label).iter() {
                if !dictionary.contains_key(label) {
                    let bits = self.rng.gen::<u64>() & mask;
                    dictionary.insert(label.clone(), bits);
                }
            }
        }
        let features = graphs.iter().map(|g| self.hash_graph(g, &dictionary)).collect();
        if stage == Stage::Fit {
            log::debug!("neighborhood hash, {} labels in dictionary", dictionary.len());
            self.dictionary = dictionary;
        }
        Ok(features)
    } // end of extract

    fn pairwise(&self, x: &HashedGraph, y: &HashedGraph) -> Result<f64> {
        let mut total = 0.;
        for (cx, cy) in x.counts.iter().zip(y.counts.iter()) {
            let common: f64 = cx
                .iter()
                .filter_map(|(label, nx)| cy.get(label).map(|ny| nx.min(*ny)))
                .sum();
            let union = (x.nv + y.nv) as f64 - common;
            if union > 0. {
                total += common / union;
            }
        }
        Ok(total / self.n_iter as f64)
    }

    fn supports_parallel(&self) -> bool {
        false
    }
} // end of impl BaseKernel for NeighborhoodHash
