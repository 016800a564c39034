//! Core framework.
//!
//! For each k from min_core + 1 up to the largest core number found in the fitted graphs,
//! the k-snapshot of a graph is its subgraph induced by vertices of core number at least k.
//! A kernel built from the factory is fitted on each snapshot and values are summed.
//! Transform uses the snapshots decided at fit.

use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{add_assign_diag, add_assign_or_init, Kernel, KernelFactory};
use crate::error::{GraphKernelError, Result};
use crate::graph::Graph;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreFrameworkParams {
    /// only cores of number strictly greater than min_core are considered
    pub min_core: i64,
}

impl Default for CoreFrameworkParams {
    fn default() -> Self {
        CoreFrameworkParams { min_core: -1 }
    }
}

impl CoreFrameworkParams {
    pub fn check(&self) -> Result<()> {
        if self.min_core < -1 {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "core_framework".to_string(),
                reason: format!("min_core must be >= -1, got {}", self.min_core),
            });
        }
        Ok(())
    }
}

pub struct CoreFramework {
    min_core: i64,
    factory: KernelFactory,
    n_jobs: Option<usize>,
    /// core numbers of snapshots, decided at fit
    levels: Vec<usize>,
    kernels: Vec<Box<dyn Kernel>>,
    /// number of fitted graphs
    nb_fitted: Option<usize>,
}

impl CoreFramework {
    pub fn new(params: &CoreFrameworkParams, factory: KernelFactory) -> Result<Self> {
        params.check()?;
        Ok(CoreFramework {
            min_core: params.min_core,
            factory,
            n_jobs: None,
            levels: Vec::new(),
            kernels: Vec::new(),
            nb_fitted: None,
        })
    }

    fn check_input(graphs: &[Graph]) -> Result<Vec<Vec<usize>>> {
        if graphs.is_empty() {
            return Err(GraphKernelError::InputFormat(
                "core_framework got an empty graph collection".to_string(),
            ));
        }
        Ok(graphs.iter().map(|g| g.core_numbers()).collect())
    }

    fn fit_levels(&self, cores: &[Vec<usize>]) -> Vec<usize> {
        let max_core = cores.iter().flat_map(|c| c.iter()).copied().max().unwrap_or(0);
        let first = (self.min_core + 1).max(0) as usize;
        (first..=max_core).collect()
    }

    fn snapshot(graphs: &[Graph], cores: &[Vec<usize>], level: usize) -> Result<Vec<Graph>> {
        graphs
            .iter()
            .zip(cores.iter())
            .map(|(g, c)| {
                let kept: Vec<usize> = (0..g.nv()).filter(|v| c[*v] >= level).collect();
                g.get_subgraph(&kept)
            })
            .collect()
    }

    fn build_kernel(&self) -> Result<Box<dyn Kernel>> {
        let mut kernel = (self.factory)()?;
        if self.n_jobs.is_some() {
            kernel.set_n_jobs(self.n_jobs);
        }
        Ok(kernel)
    }
} // end of impl CoreFramework

impl Kernel for CoreFramework {
    fn fit(&mut self, graphs: &[Graph]) -> Result<()> {
        let cores = Self::check_input(graphs)?;
        let levels = self.fit_levels(&cores);
        let mut kernels = Vec::<Box<dyn Kernel>>::with_capacity(levels.len());
        for level in &levels {
            let mut kernel = self.build_kernel()?;
            kernel.fit(&Self::snapshot(graphs, &cores, *level)?)?;
            kernels.push(kernel);
        }
        log::debug!("core_framework fit, levels : {:?}", levels);
        self.levels = levels;
        self.kernels = kernels;
        self.nb_fitted = Some(graphs.len());
        Ok(())
    }

    fn fit_transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let cores = Self::check_input(graphs)?;
        let levels = self.fit_levels(&cores);
        let mut kernels = Vec::<Box<dyn Kernel>>::with_capacity(levels.len());
        let mut km: Option<Array2<f64>> = None;
        for level in &levels {
            let mut kernel = self.build_kernel()?;
            add_assign_or_init(&mut km, kernel.fit_transform(&Self::snapshot(graphs, &cores, *level)?)?);
            kernels.push(kernel);
        }
        log::info!(
            "core_framework fit_transform, levels {:?}, sys time(ms) {} cpu time(ms) {}",
            levels,
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        self.levels = levels;
        self.kernels = kernels;
        self.nb_fitted = Some(graphs.len());
        // no level when min_core is above all core numbers
        Ok(km.unwrap_or_else(|| Array2::zeros((graphs.len(), graphs.len()))))
    }

    fn transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        let nb_fitted = self
            .nb_fitted
            .ok_or_else(|| GraphKernelError::NotFitted("core_framework".to_string()))?;
        let cores = Self::check_input(graphs)?;
        let mut km: Option<Array2<f64>> = None;
        for (kernel, level) in self.kernels.iter_mut().zip(self.levels.iter()) {
            add_assign_or_init(&mut km, kernel.transform(&Self::snapshot(graphs, &cores, *level)?)?);
        }
        Ok(km.unwrap_or_else(|| Array2::zeros((graphs.len(), nb_fitted))))
    }

    fn diagonal(&self) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
        let nb_fitted = self
            .nb_fitted
            .ok_or_else(|| GraphKernelError::NotFitted("core_framework".to_string()))?;
        if self.kernels.is_empty() {
            return Ok((Array1::zeros(nb_fitted), None));
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
        let x_diag = x_diag.ok_or_else(|| GraphKernelError::NotFitted("core_framework".to_string()))?;
        Ok((x_diag, if all_y { y_diag } else { None }))
    }

    fn name(&self) -> &str {
        "core_framework"
    }

    /// applies to fitted snapshot kernels and to the ones built later
    fn set_n_jobs(&mut self, n_jobs: Option<usize>) {
        self.n_jobs = n_jobs;
        for kernel in self.kernels.iter_mut() {
            kernel.set_n_jobs(n_jobs);
        }
    }
} // end of impl Kernel for CoreFramework

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphInput;
    use crate::kernels::make_factory;
    use crate::kernels::vertex_histogram::VertexHistogram;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn vh_factory() -> KernelFactory {
        make_factory(|| Ok(Box::new(VertexHistogram::kernel(None))))
    }

    fn undirected(edges: &[(i64, i64)]) -> Graph {
        let all: Vec<(i64, i64)> = edges.iter().flat_map(|(u, v)| [(*u, *v), (*v, *u)]).collect();
        Graph::try_from(GraphInput::edges(all)).unwrap()
    }

    #[test]
    fn core_levels_sum() {
        log_init_test();
        // triangle with tail : cores 2,2,2,1,1 ; path : cores 1,1,1
        let g1 = undirected(&[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4)]);
        let g2 = undirected(&[(0, 1), (1, 2)]);
        let mut kernel = CoreFramework::new(&CoreFrameworkParams::default(), vh_factory()).unwrap();
        let km = kernel.fit_transform(&[g1.clone(), g2.clone()]).unwrap();
        assert_eq!(kernel.levels, vec![0, 1, 2]);
        // vertex counts products : level 0 and 1 keep all vertices, level 2 keeps the triangle of g1
        assert_eq!(km[[0, 0]], 25. + 25. + 9.);
        assert_eq!(km[[0, 1]], 15. + 15.);
        assert_eq!(km[[1, 1]], 9. + 9.);
        //
        let km_t = kernel.transform(&[g2]).unwrap();
        assert_eq!(km_t[[0, 0]], 30.);
        assert_eq!(km_t[[0, 1]], 18.);
    }

    #[test]
    fn min_core_skips_levels() {
        let g1 = undirected(&[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4)]);
        let mut kernel = CoreFramework::new(&CoreFrameworkParams { min_core: 1 }, vh_factory()).unwrap();
        let km = kernel.fit_transform(&[g1]).unwrap();
        assert_eq!(km[[0, 0]], 9.);
        // no level above the largest core number
        let g2 = undirected(&[(0, 1), (1, 2)]);
        let mut kernel = CoreFramework::new(&CoreFrameworkParams { min_core: 4 }, vh_factory()).unwrap();
        assert_eq!(kernel.fit_transform(&[g2.clone()]).unwrap()[[0, 0]], 0.);
        assert_eq!(kernel.transform(&[g2]).unwrap().dim(), (1, 1));
        assert!(CoreFramework::new(&CoreFrameworkParams { min_core: -3 }, vh_factory()).is_err());
    }
}
