//! Weisfeiler-Lehman framework.
//!
//! The graphs are relabelled n_iter times. At each iteration the new label of a vertex is a compressed
//! form of its signature : its current label followed by the sorted labels of its neighbours.
//! Snapshot 0 carries the original labels compressed to integers.
//! A kernel built from the factory is fitted on each of the n_iter + 1 snapshots, values are summed.
//!
//! With the subtree (vertex histogram) kernel this is the Weisfeiler-Lehman subtree kernel.
//!
//! The compression dictionaries learned at fit are kept. At transform, signatures not seen at fit get
//! fresh integers that match no fitted label, and the fitted dictionaries are not extended.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{add_assign_diag, add_assign_or_init, Kernel, KernelFactory, Stage};
use crate::error::{GraphKernelError, Result};
use crate::graph::{Graph, Label, Symbol};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeisfeilerLehmanParams {
    pub n_iter: usize,
}

impl Default for WeisfeilerLehmanParams {
    fn default() -> Self {
        WeisfeilerLehmanParams { n_iter: 5 }
    }
}

impl WeisfeilerLehmanParams {
    pub fn check(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "weisfeiler_lehman".to_string(),
                reason: "n_iter must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// a vertex label and the sorted labels of its neighbours
type Signature = (i64, Vec<i64>);

/// Compression dictionaries, one for the original labels then one per iteration.
#[derive(Clone, Debug, Default)]
struct LabelDictionaries {
    original: BTreeMap<Label, i64>,
    iterations: Vec<HashMap<Signature, i64>>,
}

// gives to unseen keys integers after the fitted ones, without storing them in the fitted map
struct Compressor<'a, K: std::hash::Hash + Eq> {
    fitted: &'a HashMap<K, i64>,
    unseen: HashMap<K, i64>,
}

impl<'a, K: std::hash::Hash + Eq> Compressor<'a, K> {
    fn new(fitted: &'a HashMap<K, i64>) -> Self {
        Compressor {
            fitted,
            unseen: HashMap::new(),
        }
    }

    fn get(&mut self, key: K) -> i64 {
        if let Some(id) = self.fitted.get(&key) {
            return *id;
        }
        let next = (self.fitted.len() + self.unseen.len()) as i64;
        *self.unseen.entry(key).or_insert(next)
    }
}

pub struct WeisfeilerLehman {
    n_iter: usize,
    factory: KernelFactory,
    n_jobs: Option<usize>,
    dictionaries: Option<LabelDictionaries>,
    /// one fitted kernel per snapshot
    kernels: Vec<Box<dyn Kernel>>,
    default_label: Label,
}

impl WeisfeilerLehman {
    pub fn new(params: &WeisfeilerLehmanParams, factory: KernelFactory) -> Result<Self> {
        params.check()?;
        Ok(WeisfeilerLehman {
            n_iter: params.n_iter,
            factory,
            n_jobs: None,
            dictionaries: None,
            kernels: Vec::new(),
            default_label: Label::default(),
        })
    }

    // relabels vertices of graphs with integers, from their signatures
    fn relabel_iteration(
        graphs: &[Graph],
        labels: &[Vec<i64>],
        compress: &mut dyn FnMut(Signature) -> i64,
    ) -> Vec<Vec<i64>> {
        graphs
            .iter()
            .zip(labels.iter())
            .map(|(graph, current)| {
                (0..graph.nv())
                    .map(|v| {
                        let mut neighbours: Vec<i64> = graph.neighbors(v).map(|u| current[u]).collect();
                        neighbours.sort_unstable();
                        compress((current[v], neighbours))
                    })
                    .collect()
            })
            .collect()
    }

    /// Computes the n_iter + 1 snapshots of graphs.
    /// At fit the dictionaries are built and returned, at transform the fitted ones are used.
    fn snapshots(&self, graphs: &[Graph], stage: Stage) -> Result<(Vec<Vec<Graph>>, Option<LabelDictionaries>)> {
        if graphs.is_empty() {
            return Err(GraphKernelError::InputFormat(
                "weisfeiler_lehman got an empty graph collection".to_string(),
            ));
        }
        let original: Vec<Arc<Vec<Label>>> = graphs
            .iter()
            .map(|g| g.vertex_labels_or_default(&self.default_label))
            .collect();
        let mut new_dictionaries = LabelDictionaries::default();
        let fitted = match stage {
            Stage::Fit => None,
            Stage::Transform => Some(
                self.dictionaries
                    .as_ref()
                    .ok_or_else(|| GraphKernelError::NotFitted("weisfeiler_lehman".to_string()))?,
            ),
        };
        // snapshot 0
        let mut labels: Vec<Vec<i64>> = match fitted {
            None => {
                let mut distinct: Vec<&Label> = original.iter().flat_map(|l| l.iter()).collect();
                distinct.sort();
                distinct.dedup();
                new_dictionaries.original = distinct.into_iter().enumerate().map(|(i, l)| (l.clone(), i as i64)).collect();
                original
                    .iter()
                    .map(|l| l.iter().map(|x| new_dictionaries.original[x]).collect())
                    .collect()
            }
            Some(dicts) => {
                let mut unseen = BTreeMap::<&Label, i64>::new();
                original
                    .iter()
                    .map(|l| {
                        l.iter()
                            .map(|x| match dicts.original.get(x) {
                                Some(id) => *id,
                                None => {
                                    let next = (dicts.original.len() + unseen.len()) as i64;
                                    *unseen.entry(x).or_insert(next)
                                }
                            })
                            .collect()
                    })
                    .collect()
            }
        };
        let mut snapshots = Vec::<Vec<Graph>>::with_capacity(self.n_iter + 1);
        snapshots.push(relabelled(graphs, &labels)?);
        for it in 0..self.n_iter {
            labels = match fitted {
                None => {
                    let mut dict = HashMap::<Signature, i64>::new();
                    let new_labels = Self::relabel_iteration(graphs, &labels, &mut |sig| {
                        let next = dict.len() as i64;
                        *dict.entry(sig).or_insert(next)
                    });
                    new_dictionaries.iterations.push(dict);
                    new_labels
                }
                Some(dicts) => {
                    let mut compressor = Compressor::new(&dicts.iterations[it]);
                    Self::relabel_iteration(graphs, &labels, &mut |sig| compressor.get(sig))
                }
            };
            snapshots.push(relabelled(graphs, &labels)?);
        }
        let dictionaries = match stage {
            Stage::Fit => Some(new_dictionaries),
            Stage::Transform => None,
        };
        Ok((snapshots, dictionaries))
    } // end of snapshots

    fn build_kernel(&self) -> Result<Box<dyn Kernel>> {
        let mut kernel = (self.factory)()?;
        if self.n_jobs.is_some() {
            kernel.set_n_jobs(self.n_jobs);
        }
        Ok(kernel)
    }
} // end of impl WeisfeilerLehman

fn relabelled(graphs: &[Graph], labels: &[Vec<i64>]) -> Result<Vec<Graph>> {
    graphs
        .iter()
        .zip(labels.iter())
        .map(|(g, l)| g.relabel(l.iter().map(|x| Symbol::Int(*x)).collect()))
        .collect()
}

impl Kernel for WeisfeilerLehman {
    fn fit(&mut self, graphs: &[Graph]) -> Result<()> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let (snapshots, dictionaries) = self.snapshots(graphs, Stage::Fit)?;
        let mut kernels = Vec::<Box<dyn Kernel>>::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            let mut kernel = self.build_kernel()?;
            kernel.fit(snapshot)?;
            kernels.push(kernel);
        }
        self.kernels = kernels;
        self.dictionaries = dictionaries;
        log::info!(
            "weisfeiler_lehman fit, {} graphs {} iterations, sys time(ms) {} cpu time(ms) {}",
            graphs.len(),
            self.n_iter,
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        Ok(())
    } // end of fit

    fn fit_transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let (snapshots, dictionaries) = self.snapshots(graphs, Stage::Fit)?;
        let mut kernels = Vec::<Box<dyn Kernel>>::with_capacity(snapshots.len());
        let mut km: Option<Array2<f64>> = None;
        for snapshot in &snapshots {
            let mut kernel = self.build_kernel()?;
            add_assign_or_init(&mut km, kernel.fit_transform(snapshot)?);
            kernels.push(kernel);
        }
        self.kernels = kernels;
        self.dictionaries = dictionaries;
        log::info!(
            "weisfeiler_lehman fit_transform, {} graphs {} iterations, sys time(ms) {} cpu time(ms) {}",
            graphs.len(),
            self.n_iter,
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        km.ok_or_else(|| GraphKernelError::InputFormat("no snapshot computed".to_string()))
    } // end of fit_transform

    fn transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        if self.dictionaries.is_none() {
            return Err(GraphKernelError::NotFitted("weisfeiler_lehman".to_string()));
        }
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let (snapshots, _) = self.snapshots(graphs, Stage::Transform)?;
        let mut km: Option<Array2<f64>> = None;
        for (kernel, snapshot) in self.kernels.iter_mut().zip(snapshots.iter()) {
            add_assign_or_init(&mut km, kernel.transform(snapshot)?);
        }
        log::info!(
            "weisfeiler_lehman transform, {} graphs, sys time(ms) {} cpu time(ms) {}",
            graphs.len(),
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        km.ok_or_else(|| GraphKernelError::NotFitted("weisfeiler_lehman".to_string()))
    } // end of transform

    fn diagonal(&self) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
        if self.kernels.is_empty() {
            return Err(GraphKernelError::NotFitted("weisfeiler_lehman".to_string()));
        }
        let mut x_diag: Option<Array1<f64>> = None;
        let mut y_diag: Option<Array1<f64>> = None;
        let mut all_y = true;
        for kernel in &self.kernels {
            let (x, y) = kernel.diagonal()?;
            add_assign_diag(&mut x_diag, x);
            match y {
                Some(y) => add_assign_diag(&mut y_diag, y),
                None => all_y = false,
            }
        }
        let x_diag = x_diag.ok_or_else(|| GraphKernelError::NotFitted("weisfeiler_lehman".to_string()))?;
        Ok((x_diag, if all_y { y_diag } else { None }))
    } // end of diagonal

    fn name(&self) -> &str {
        "weisfeiler_lehman"
    }

    /// applied to kernels built for the snapshots, overriding their own setting
    /// applies to fitted snapshot kernels and to the ones built later
    fn set_n_jobs(&mut self, n_jobs: Option<usize>) {
        self.n_jobs = n_jobs;
        for kernel in self.kernels.iter_mut() {
            kernel.set_n_jobs(n_jobs);
        }
    }
} // end of impl Kernel for WeisfeilerLehman
