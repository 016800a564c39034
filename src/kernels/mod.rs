//! Kernel protocol, the pairwise driver of base kernels, and the kernels themselves.
//!
//! A [Kernel] goes through the lifecycle fit / fit_transform / transform:
//! - fit stores a reference computed from the fitted graphs,
//! - transform returns the (n_test, n_fitted) matrix of kernel values between new graphs and fitted ones,
//!   the reference is not modified.
//!
//! Base kernels only describe how to extract features from a graph and how to compare 2 features,
//! see [BaseKernel]. The lifecycle is implemented once in [PairwiseKernel].
//!
//! Frameworks ([weisfeiler_lehman], [core_framework]) wrap a [KernelFactory] and sum the values of
//! kernels built on a sequence of snapshots of the graphs.

pub mod params;
pub mod registry;

pub mod core_framework;
pub mod edge_histogram;
pub mod graphlet_sampling;
pub mod neighborhood_hash;
pub mod random_walk;
pub mod shortest_path;
pub mod vertex_histogram;
pub mod weisfeiler_lehman;

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use ahash::AHashMap;
use cpu_time::ProcessTime;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::error::{GraphKernelError, Result};
use crate::graph::Graph;

pub use params::KernelSpec;

/// The lifecycle shared by all kernels.
pub trait Kernel: Send {
    /// stores the reference of the graphs. Re-fitting replaces the reference.
    fn fit(&mut self, graphs: &[Graph]) -> Result<()>;

    /// fit and return the (n, n) matrix between fitted graphs
    fn fit_transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>>;

    /// returns matrix (n_test, n_fitted), entry (i,j) is k(graphs\[i\], fitted\[j\])
    fn transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>>;

    /// self kernel values of the fitted graphs and, if a transform occurred, of the last transformed graphs
    fn diagonal(&self) -> Result<(Array1<f64>, Option<Array1<f64>>)>;

    fn name(&self) -> &str;

    /// number of threads to use, None or Some(1) means sequential
    fn set_n_jobs(&mut self, n_jobs: Option<usize>);
} // end of trait Kernel

/// A shared constructor of kernels, used by frameworks to build one kernel per snapshot
pub type KernelFactory = Arc<dyn Fn() -> Result<Box<dyn Kernel>> + Send + Sync>;

/// wraps a constructor closure in a [KernelFactory]
pub fn make_factory<F>(build: F) -> KernelFactory
where
    F: Fn() -> Result<Box<dyn Kernel>> + Send + Sync + 'static,
{
    Arc::new(build)
}

/// Whether features are extracted for fitting or for transforming.
/// Kernels learning dictionaries at fit must not extend them at transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Fit,
    Transform,
}

/// What a base kernel must provide to be driven by [PairwiseKernel]
pub trait BaseKernel: Send + Sync {
    type Features: Send + Sync;

    /// canonical name
    fn name(&self) -> &str;

    /// extracts features from graphs. Graph order is preserved.
    fn extract(&mut self, graphs: &[Graph], stage: Stage) -> Result<Vec<Self::Features>>;

    /// kernel value between 2 features, an error if no finite value exists
    fn pairwise(&self, x: &Self::Features, y: &Self::Features) -> Result<f64>;

    /// true if pairwise values can be computed on a thread pool
    fn supports_parallel(&self) -> bool {
        true
    }
} // end of trait BaseKernel

//=====================================================================================

/// Implements the [Kernel] lifecycle for a [BaseKernel]
pub struct PairwiseKernel<B: BaseKernel> {
    base: B,
    n_jobs: Option<usize>,
    /// features of fitted graphs
    fitted: Option<Vec<B::Features>>,
    x_diag: Option<Array1<f64>>,
    y_diag: Option<Array1<f64>>,
    /// set once the n_jobs ignored warning is logged, can be shared between kernels of a pipeline
    parallel_warned: Arc<AtomicBool>,
} // end of struct PairwiseKernel

impl<B: BaseKernel> PairwiseKernel<B> {
    pub fn new(base: B, n_jobs: Option<usize>) -> Self {
        PairwiseKernel {
            base,
            n_jobs,
            fitted: None,
            x_diag: None,
            y_diag: None,
            parallel_warned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// kernels sharing a flag log the n_jobs ignored warning once between them
    pub fn with_warning_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.parallel_warned = flag;
        self
    }

    pub fn get_base(&self) -> &B {
        &self.base
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    // number of threads to use for this computation, 1 if base kernel is sequential
    fn nb_threads(&self) -> usize {
        match self.n_jobs {
            Some(n) if n > 1 => {
                if self.base.supports_parallel() {
                    n
                } else {
                    if !self.parallel_warned.swap(true, Ordering::Relaxed) {
                        log::warn!("kernel {} is sequential, n_jobs {} ignored", self.base.name(), n);
                    }
                    1
                }
            }
            _ => 1,
        }
    }

    fn self_values(&self, features: &[B::Features]) -> Result<Array1<f64>> {
        let values = features
            .iter()
            .map(|f| self.base.pairwise(f, f))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from(values))
    }

    fn extract_checked(&mut self, graphs: &[Graph], stage: Stage) -> Result<Vec<B::Features>> {
        if graphs.is_empty() {
            return Err(GraphKernelError::InputFormat(format!(
                "kernel {} got an empty graph collection",
                self.base.name()
            )));
        }
        self.base.extract(graphs, stage)
    }
} // end of impl PairwiseKernel

/// Fills the matrix of pairwise values between rows and cols features.
/// If symmetric, rows and cols are the same collection and only the upper triangle is computed.
fn pairwise_matrix<B: BaseKernel>(
    base: &B,
    rows: &[B::Features],
    cols: &[B::Features],
    symmetric: bool,
    nb_threads: usize,
) -> Result<Array2<f64>> {
    let compute_row = |i: usize| -> Result<Vec<f64>> {
        let first = if symmetric { i } else { 0 };
        (first..cols.len()).map(|j| base.pairwise(&rows[i], &cols[j])).collect()
    };
    let values: Vec<Vec<f64>> = if nb_threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(nb_threads)
            .build()
            .map_err(GraphKernelError::ThreadPool)?;
        pool.install(|| (0..rows.len()).into_par_iter().map(compute_row).collect::<Result<Vec<_>>>())?
    } else {
        (0..rows.len()).map(compute_row).collect::<Result<Vec<_>>>()?
    };
    let mut mat = Array2::<f64>::zeros((rows.len(), cols.len()));
    for (i, row) in values.into_iter().enumerate() {
        let first = if symmetric { i } else { 0 };
        for (k, v) in row.into_iter().enumerate() {
            let j = first + k;
            mat[[i, j]] = v;
            if symmetric {
                mat[[j, i]] = v;
            }
        }
    }
    Ok(mat)
} // end of pairwise_matrix

impl<B: BaseKernel> Kernel for PairwiseKernel<B> {
    fn fit(&mut self, graphs: &[Graph]) -> Result<()> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let features = self.extract_checked(graphs, Stage::Fit)?;
        self.x_diag = Some(self.self_values(&features)?);
        self.fitted = Some(features);
        self.y_diag = None;
        log::debug!(
            "{} fit on {} graphs, sys time(ms) {} cpu time(ms) {}",
            self.base.name(),
            graphs.len(),
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        Ok(())
    } // end of fit

    fn fit_transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let features = self.extract_checked(graphs, Stage::Fit)?;
        let nb_threads = self.nb_threads();
        let km = pairwise_matrix(&self.base, &features, &features, true, nb_threads)?;
        self.x_diag = Some(km.diag().to_owned());
        self.fitted = Some(features);
        self.y_diag = None;
        log::debug!(
            "{} fit_transform on {} graphs, sys time(ms) {} cpu time(ms) {}",
            self.base.name(),
            graphs.len(),
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        Ok(km)
    } // end of fit_transform

    fn transform(&mut self, graphs: &[Graph]) -> Result<Array2<f64>> {
        if self.fitted.is_none() {
            return Err(GraphKernelError::NotFitted(self.base.name().to_string()));
        }
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let features = self.extract_checked(graphs, Stage::Transform)?;
        let nb_threads = self.nb_threads();
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| GraphKernelError::NotFitted(self.base.name().to_string()))?;
        let km = pairwise_matrix(&self.base, &features, fitted, false, nb_threads)?;
        self.y_diag = Some(self.self_values(&features)?);
        log::debug!(
            "{} transform of {} graphs, sys time(ms) {} cpu time(ms) {}",
            self.base.name(),
            graphs.len(),
            sys_start.elapsed().unwrap_or_default().as_millis(),
            cpu_start.elapsed().as_millis()
        );
        Ok(km)
    } // end of transform

    fn diagonal(&self) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
        match &self.x_diag {
            Some(x_diag) => Ok((x_diag.clone(), self.y_diag.clone())),
            None => Err(GraphKernelError::NotFitted(self.base.name().to_string())),
        }
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn set_n_jobs(&mut self, n_jobs: Option<usize>) {
        self.n_jobs = n_jobs;
    }
} // end of impl Kernel for PairwiseKernel

//=====================================================================================

/// Sparse histogram, the feature of counting kernels
pub type Histogram<K> = AHashMap<K, f64>;

/// dot product of 2 sparse histograms
pub fn histogram_dot<K: Eq + Hash>(x: &Histogram<K>, y: &Histogram<K>) -> f64 {
    let (small, big) = if x.len() <= y.len() { (x, y) } else { (y, x) };
    small
        .iter()
        .filter_map(|(key, vx)| big.get(key).map(|vy| vx * vy))
        .sum()
}

/// counts occurrences of keys
pub fn histogram_of<K: Eq + Hash, I: IntoIterator<Item = K>>(keys: I) -> Histogram<K> {
    let mut histo = Histogram::<K>::default();
    for key in keys {
        *histo.entry(key).or_insert(0.) += 1.;
    }
    histo
}

/// converts a n_jobs value as given by user, -1 (or any negative value) means all cpus
pub fn resolve_n_jobs(n_jobs: Option<i32>) -> Option<usize> {
    match n_jobs {
        None => None,
        Some(n) if n < 0 => Some(num_cpus::get()),
        Some(0) => Some(1),
        Some(n) => Some(n as usize),
    }
}

/// generator seeded by a given seed, or from entropy
pub fn make_rng(random_state: Option<u64>) -> Xoshiro256PlusPlus {
    match random_state {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Divides entry (i,j) by sqrt(diag_y\[i\] * diag_x\[j\]). Entries with a null denominator are set to 0.
pub fn normalize_matrix(km: &Array2<f64>, diag_y: &Array1<f64>, diag_x: &Array1<f64>) -> Array2<f64> {
    let mut normalized = km.clone();
    for ((i, j), v) in normalized.indexed_iter_mut() {
        let denom = (diag_y[i] * diag_x[j]).sqrt();
        *v = if denom > 0. && denom.is_finite() { *v / denom } else { 0. };
    }
    normalized
}

/// element wise sum of kernel outputs of snapshots, used by frameworks
pub(crate) fn add_assign_or_init(acc: &mut Option<Array2<f64>>, km: Array2<f64>) {
    match acc {
        Some(sum) => *sum += &km,
        None => *acc = Some(km),
    }
}

pub(crate) fn add_assign_diag(acc: &mut Option<Array1<f64>>, diag: Array1<f64>) {
    match acc {
        Some(sum) => *sum += &diag,
        None => *acc = Some(diag),
    }
}

//=====================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // counts vertices, value is product of counts
    struct CountKernel {
        parallel: bool,
    }

    impl BaseKernel for CountKernel {
        type Features = f64;

        fn name(&self) -> &str {
            "count"
        }

        fn extract(&mut self, graphs: &[Graph], _stage: Stage) -> Result<Vec<f64>> {
            Ok(graphs.iter().map(|g| g.nv() as f64).collect())
        }

        fn pairwise(&self, x: &f64, y: &f64) -> Result<f64> {
            Ok(x * y)
        }

        fn supports_parallel(&self) -> bool {
            self.parallel
        }
    }

    fn graphs_of_sizes(sizes: &[usize]) -> Vec<Graph> {
        sizes
            .iter()
            .map(|n| Graph::from_adjacency(Array2::<f64>::zeros((*n, *n))).unwrap())
            .collect()
    }

    #[test]
    fn lifecycle() {
        log_init_test();
        //
        let mut kernel = PairwiseKernel::new(CountKernel { parallel: true }, None);
        let graphs = graphs_of_sizes(&[1, 2, 3]);
        assert!(matches!(kernel.transform(&graphs), Err(GraphKernelError::NotFitted(_))));
        assert!(kernel.diagonal().is_err());
        //
        let km = kernel.fit_transform(&graphs).unwrap();
        assert_eq!(km, arr2(&[[1., 2., 3.], [2., 4., 6.], [3., 6., 9.]]));
        let (x_diag, y_diag) = kernel.diagonal().unwrap();
        assert_eq!(x_diag.to_vec(), vec![1., 4., 9.]);
        assert!(y_diag.is_none());
        //
        let test = graphs_of_sizes(&[4, 5]);
        let km_t = kernel.transform(&test).unwrap();
        assert_eq!(km_t.dim(), (2, 3));
        assert_eq!(km_t[[1, 2]], 15.);
        let (_, y_diag) = kernel.diagonal().unwrap();
        assert_eq!(y_diag.unwrap().to_vec(), vec![16., 25.]);
        //
        assert!(matches!(kernel.fit(&[]), Err(GraphKernelError::InputFormat(_))));
        assert!(matches!(kernel.transform(&[]), Err(GraphKernelError::InputFormat(_))));
    } // end of lifecycle

    #[test]
    fn parallel_equals_sequential() {
        log_init_test();
        //
        let graphs = graphs_of_sizes(&[1, 2, 3, 4, 5, 6, 7]);
        let mut seq = PairwiseKernel::new(CountKernel { parallel: true }, None);
        let mut par = PairwiseKernel::new(CountKernel { parallel: true }, Some(3));
        assert_eq!(seq.fit_transform(&graphs).unwrap(), par.fit_transform(&graphs).unwrap());
        // a sequential kernel ignores n_jobs
        let mut ignoring = PairwiseKernel::new(CountKernel { parallel: false }, Some(4));
        assert_eq!(seq.fit_transform(&graphs).unwrap(), ignoring.fit_transform(&graphs).unwrap());
        assert!(ignoring.parallel_warned.load(Ordering::Relaxed));
    }

    #[test]
    fn shared_warning_flag() {
        log_init_test();
        //
        let graphs = graphs_of_sizes(&[1, 2, 3]);
        let flag = Arc::new(AtomicBool::new(false));
        let mut first = PairwiseKernel::new(CountKernel { parallel: false }, Some(2)).with_warning_flag(Arc::clone(&flag));
        let second = PairwiseKernel::new(CountKernel { parallel: false }, Some(2)).with_warning_flag(Arc::clone(&flag));
        assert!(!second.parallel_warned.load(Ordering::Relaxed));
        first.fit_transform(&graphs).unwrap();
        assert!(flag.load(Ordering::Relaxed));
        // the second kernel sees the warning as already logged
        assert!(second.parallel_warned.load(Ordering::Relaxed));
        // a parallel kernel never sets it
        let parallel = PairwiseKernel::new(CountKernel { parallel: true }, Some(2));
        assert_eq!(parallel.nb_threads(), 2);
        assert!(!parallel.parallel_warned.load(Ordering::Relaxed));
    }

    // fails on graphs with more than 2 vertices
    struct BoundedKernel;

    impl BaseKernel for BoundedKernel {
        type Features = f64;

        fn name(&self) -> &str {
            "bounded"
        }

        fn extract(&mut self, graphs: &[Graph], _stage: Stage) -> Result<Vec<f64>> {
            Ok(graphs.iter().map(|g| g.nv() as f64).collect())
        }

        fn pairwise(&self, x: &f64, y: &f64) -> Result<f64> {
            if *x > 2. || *y > 2. {
                return Err(GraphKernelError::InvalidParameter {
                    kernel: "bounded".to_string(),
                    reason: "too many vertices".to_string(),
                });
            }
            Ok(x * y)
        }
    }

    #[test]
    fn pairwise_error_keeps_reference() {
        log_init_test();
        //
        let mut kernel = PairwiseKernel::new(BoundedKernel, Some(2));
        kernel.fit(&graphs_of_sizes(&[1, 2])).unwrap();
        assert!(kernel.fit_transform(&graphs_of_sizes(&[1, 3])).is_err());
        assert!(kernel.transform(&graphs_of_sizes(&[4])).is_err());
        let km = kernel.transform(&graphs_of_sizes(&[2])).unwrap();
        assert_eq!(km, arr2(&[[2., 4.]]));
    }

    #[test]
    fn normalization_null_denominator() {
        let km = arr2(&[[4., 0.], [0., 0.]]);
        let diag = Array1::from(vec![4., 0.]);
        let normalized = normalize_matrix(&km, &diag, &diag);
        assert_eq!(normalized, arr2(&[[1., 0.], [0., 0.]]));
    }

    #[test]
    fn histograms() {
        let x = histogram_of(vec![1, 1, 2]);
        let y = histogram_of(vec![1, 2, 2, 3]);
        assert_eq!(histogram_dot(&x, &y), 2. + 2.);
        assert_eq!(resolve_n_jobs(Some(-1)), Some(num_cpus::get()));
        assert_eq!(resolve_n_jobs(None), None);
    }
} // end of mod tests
