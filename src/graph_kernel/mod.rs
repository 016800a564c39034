//! Generic graph kernel.
//!
//! [GraphKernel] composes a pipeline of kernels given by name (see [crate::kernels::registry]),
//! and adds on top of it:
//! - normalization of kernel values : k(x,y) / sqrt(k(x,x) k(y,y)),
//! - Nystroem approximation of rank q, see [nystroem],
//! - routing of n_jobs to kernels of the pipeline.
//!
//! The pipeline is checked and composed at construction, each fit builds a new kernel from it.
//! A failed fit leaves the previous fit in place.
//!
//! ```ignore
//! let mut gk = GraphKernel::new(
//!     vec![KernelSpec::new("WL").with("n_iter", 5), KernelSpec::new("subtree_wl")],
//!     GraphKernelParams::default().with_normalize(true),
//! )?;
//! let k_train = gk.fit_transform(&train)?;
//! let k_test = gk.transform(&test)?;
//! ```

pub mod nystroem;
pub mod params;

pub use params::GraphKernelParams;

use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::{Array1, Array2};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{GraphKernelError, Result};
use crate::graph::Graph;
use crate::kernels::registry::{compose, BuildContext};
use crate::kernels::{make_rng, normalize_matrix, Kernel, KernelFactory, KernelSpec};

use nystroem::{choose_components, NystroemMap};

pub struct GraphKernel {
    specs: Vec<KernelSpec>,
    params: GraphKernelParams,
    factory: KernelFactory,
    /// built by the factory at each fit
    kernel: Option<Box<dyn Kernel>>,
    rng: Xoshiro256PlusPlus,
    nystroem: Option<NystroemMap>,
    fitted: bool,
} // end of struct GraphKernel

impl GraphKernel {
    /// kernels : a pipeline, frameworks first and a base kernel last. A single base kernel is a valid pipeline.
    pub fn new<S: Into<Vec<KernelSpec>>>(kernels: S, params: GraphKernelParams) -> Result<Self> {
        let specs: Vec<KernelSpec> = kernels.into();
        let factory = compose(&specs, &BuildContext::new(params.n_jobs))?;
        if params.verbose {
            log::warn!("verbose is accepted but has no effect");
        }
        if let Some(0) = params.nystroem {
            return Err(GraphKernelError::InvalidRank { rank: 0, n_samples: 0 });
        }
        log::debug!("graph kernel created, pipeline : {:?}", specs.iter().map(|s| &s.name).collect::<Vec<_>>());
        Ok(GraphKernel {
            specs,
            rng: make_rng(params.random_state),
            params,
            factory,
            kernel: None,
            nystroem: None,
            fitted: false,
        })
    } // end of new

    /// a pipeline decoded from json, a single spec or a list of specs
    pub fn from_json(json: &str, params: GraphKernelParams) -> Result<Self> {
        GraphKernel::new(KernelSpec::from_json(json)?, params)
    }

    pub fn get_kernel_specs(&self) -> &[KernelSpec] {
        &self.specs
    }

    pub fn get_params(&self) -> &GraphKernelParams {
        &self.params
    }

    /// indices, in the fitted collection, of graphs chosen as Nystroem components
    pub fn nystroem_components(&self) -> Option<&[usize]> {
        self.nystroem.as_ref().map(|n| n.get_components())
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn normalize_fitted(&self, kernel: &dyn Kernel, km: Array2<f64>) -> Result<Array2<f64>> {
        if !self.params.normalize {
            return Ok(km);
        }
        let (x_diag, _) = kernel.diagonal()?;
        Ok(normalize_matrix(&km, &x_diag, &x_diag))
    }

    fn fit_nystroem(
        &self,
        graphs: &[Graph],
        rank: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<(Box<dyn Kernel>, NystroemMap)> {
        let components = choose_components(graphs.len(), rank, rng)?;
        let basis: Vec<Graph> = components.iter().map(|i| graphs[*i].clone()).collect();
        let mut kernel = (self.factory)()?;
        let k_qq = kernel.fit_transform(&basis)?;
        let k_qq = self.normalize_fitted(kernel.as_ref(), k_qq)?;
        let map = NystroemMap::new(components, &k_qq)?;
        Ok((kernel, map))
    }

    // Fits a new kernel from the factory. Kernel, Nystroem map, generator and fitted flag
    // are replaced together on success, left as they were on error.
    // Without Nystroem the kernel matrix is computed only if with_matrix.
    fn fit_inner(&mut self, graphs: &[Graph], with_matrix: bool) -> Result<Option<Array2<f64>>> {
        if graphs.is_empty() {
            return Err(GraphKernelError::InputFormat("empty graph collection".to_string()));
        }
        let mut rng = self.rng.clone();
        let (kernel, nystroem, km) = match self.params.nystroem {
            Some(rank) => {
                let (kernel, map) = self.fit_nystroem(graphs, rank, &mut rng)?;
                (kernel, Some(map), None)
            }
            None if with_matrix => {
                let mut kernel = (self.factory)()?;
                let km = kernel.fit_transform(graphs)?;
                let km = self.normalize_fitted(kernel.as_ref(), km)?;
                (kernel, None, Some(km))
            }
            None => {
                // exact kernel : only the reference is needed
                let mut kernel = (self.factory)()?;
                kernel.fit(graphs)?;
                (kernel, None, None)
            }
        };
        self.kernel = Some(kernel);
        self.nystroem = nystroem;
        self.rng = rng;
        self.fitted = true;
        Ok(km)
    } // end of fit_inner
} // end of impl GraphKernel

// normalizes a (n_test, n_fitted) matrix with the diagonals of the last transform
fn normalize_transformed(kernel: &dyn Kernel, km: Array2<f64>) -> Result<Array2<f64>> {
    let (x_diag, y_diag) = kernel.diagonal()?;
    let y_diag = y_diag.ok_or_else(|| GraphKernelError::NotFitted(kernel.name().to_string()))?;
    Ok(normalize_matrix(&km, &y_diag, &x_diag))
}

impl Kernel for GraphKernel {
    fn fit(&mut self, graphs: &[Graph]) -> Result<()> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        self.fit_inner(graphs, false)?;
        log::info!(
            "graph kernel fit on {} graphs, sys time(ms) {} cpu time(ms) {}",
            graphs.len(),
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        Ok(())
    } // end of fit

    /// with Nystroem returns the (n, q) projection of the fitted graphs, else the (n, n) kernel matrix
    fn fit_transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let km = match self.fit_inner(graphs, true)? {
            Some(km) => km,
            None => self.transform(graphs)?,
        };
        log::info!(
            "graph kernel fit_transform on {} graphs, sys time(ms) {} cpu time(ms) {}",
            graphs.len(),
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        Ok(km)
    } // end of fit_transform

    /// with Nystroem returns the (n_test, q) projection, else the (n_test, n_fitted) kernel matrix
    fn transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        let kernel = match self.kernel.as_mut() {
            Some(kernel) if self.fitted => kernel,
            _ => return Err(GraphKernelError::NotFitted("graph_kernel".to_string())),
        };
        let km = kernel.transform(graphs)?;
        let km = if self.params.normalize {
            normalize_transformed(&**kernel, km)?
        } else {
            km
        };
        match &self.nystroem {
            Some(map) => Ok(map.project(&km)),
            None => Ok(km),
        }
    } // end of transform

    /// diagonal of the composed kernel, before normalization
    fn diagonal(&self) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
        match &self.kernel {
            Some(kernel) if self.fitted => kernel.diagonal(),
            _ => Err(GraphKernelError::NotFitted("graph_kernel".to_string())),
        }
    }

    fn name(&self) -> &str {
        "graph_kernel"
    }

    /// overrides n_jobs of every kernel of the pipeline, including n_jobs given in specs.
    /// Applies to the fitted kernel and to kernels built by later fits.
    fn set_n_jobs(&mut self, n_jobs: Option<usize>) {
        self.params.n_jobs = n_jobs.map(|n| n as i32);
        match compose(&self.specs, &BuildContext::overriding(self.params.n_jobs)) {
            Ok(factory) => self.factory = factory,
            Err(e) => log::error!("could not recompose pipeline with n_jobs {:?} : {}", n_jobs, e),
        }
        if let Some(kernel) = self.kernel.as_mut() {
            kernel.set_n_jobs(n_jobs);
        }
    }
} // end of impl Kernel for GraphKernel
