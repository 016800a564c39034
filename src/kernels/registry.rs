//! Name table of kernels and composition of pipelines.
//!
//! A pipeline is a list of [KernelSpec]: zero or more frameworks followed by exactly one base kernel.
//! [compose] checks the chain, decodes every spec's parameters, and returns a [KernelFactory]
//! building the composed kernel. Nothing is computed until the factory is called.
//!
//! Parameter precedence: a `n_jobs` key in a spec wins over the default given in [BuildContext],
//! unless the context is built with [BuildContext::overriding].
//! A `random_state` key seeds its own kernel only, kernels without it draw their seed from entropy.
//!
//! All kernels built by one base kernel factory share the flag of the n_jobs ignored warning,
//! so a framework building one kernel per snapshot logs it once.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::core_framework::{CoreFramework, CoreFrameworkParams};
use super::edge_histogram::{EdgeHistogram, EdgeHistogramParams};
use super::graphlet_sampling::{GraphletSampling, GraphletSamplingParams};
use super::neighborhood_hash::{NeighborhoodHash, NeighborhoodHashParams};
use super::random_walk::{RandomWalk, RandomWalkParams};
use super::shortest_path::{ShortestPath, ShortestPathParams};
use super::vertex_histogram::{VertexHistogram, VertexHistogramParams};
use super::weisfeiler_lehman::{WeisfeilerLehman, WeisfeilerLehmanParams};
use super::{make_factory, resolve_n_jobs, BaseKernel, Kernel, KernelFactory, KernelSpec, PairwiseKernel};
use crate::error::{GraphKernelError, Result};

/// A framework wraps another kernel, a base kernel ends a pipeline
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KernelRole {
    Framework,
    Base,
}

/// n_jobs given by the wrapper to every kernel of a pipeline
#[derive(Copy, Clone, Debug, Default)]
pub struct BuildContext {
    pub n_jobs: Option<i32>,
    /// if true n_jobs replaces the one of specs, else it is a default
    pub override_specs: bool,
}

impl BuildContext {
    /// n_jobs as a default for specs not giving one
    pub fn new(n_jobs: Option<i32>) -> Self {
        BuildContext {
            n_jobs,
            override_specs: false,
        }
    }

    /// n_jobs replacing the one of every spec
    pub fn overriding(n_jobs: Option<i32>) -> Self {
        BuildContext {
            n_jobs,
            override_specs: true,
        }
    }

    /// resolved number of threads of a kernel whose spec gives spec_n_jobs
    pub fn n_jobs_for(&self, spec_n_jobs: Option<i32>) -> Option<usize> {
        if self.override_specs {
            resolve_n_jobs(self.n_jobs)
        } else {
            resolve_n_jobs(spec_n_jobs.or(self.n_jobs))
        }
    }
}

type BaseBuilder = fn(&KernelSpec, &BuildContext) -> Result<KernelFactory>;
type FrameworkBuilder = fn(&KernelSpec, &BuildContext, KernelFactory) -> Result<KernelFactory>;

#[derive(Copy, Clone)]
enum Builder {
    Base(BaseBuilder),
    Framework(FrameworkBuilder),
}

#[derive(Copy, Clone)]
struct RegistryEntry {
    canonical: &'static str,
    builder: Builder,
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, RegistryEntry> = {
        let entries: [(&'static str, &[&'static str], Builder); 8] = [
            ("vertex_histogram", &["subtree_wl", "VH"], Builder::Base(build_vertex_histogram)),
            ("edge_histogram", &["EH"], Builder::Base(build_edge_histogram)),
            ("shortest_path", &["SP"], Builder::Base(build_shortest_path)),
            ("graphlet_sampling", &["GR"], Builder::Base(build_graphlet_sampling)),
            ("random_walk", &["RW"], Builder::Base(build_random_walk)),
            ("neighborhood_hash", &["NH"], Builder::Base(build_neighborhood_hash)),
            ("weisfeiler_lehman", &["WL"], Builder::Framework(build_weisfeiler_lehman)),
            ("core_framework", &["CORE"], Builder::Framework(build_core_framework)),
        ];
        let mut registry = HashMap::<&'static str, RegistryEntry>::new();
        for (canonical, aliases, builder) in entries {
            let entry = RegistryEntry { canonical, builder };
            registry.insert(canonical, entry);
            for alias in aliases {
                registry.insert(*alias, entry);
            }
        }
        registry
    };
}

fn lookup(name: &str) -> Result<&'static RegistryEntry> {
    REGISTRY
        .get(name)
        .ok_or_else(|| GraphKernelError::UnknownKernel(name.to_string()))
}

/// canonical name of a kernel name or alias
pub fn canonical_name(name: &str) -> Result<&'static str> {
    Ok(lookup(name)?.canonical)
}

pub fn kernel_role(name: &str) -> Result<KernelRole> {
    Ok(match lookup(name)?.builder {
        Builder::Base(_) => KernelRole::Base,
        Builder::Framework(_) => KernelRole::Framework,
    })
}

/// all accepted names, aliases included, sorted
pub fn kernel_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Checks a pipeline and returns the factory of the composed kernel.
pub fn compose(specs: &[KernelSpec], context: &BuildContext) -> Result<KernelFactory> {
    let (last, frameworks) = specs
        .split_last()
        .ok_or_else(|| GraphKernelError::InvalidPipeline("empty kernel list".to_string()))?;
    // resolve all names before reporting on roles
    let entries = specs.iter().map(|s| lookup(&s.name)).collect::<Result<Vec<_>>>()?;
    for (spec, entry) in frameworks.iter().zip(entries.iter()) {
        if let Builder::Base(_) = entry.builder {
            return Err(GraphKernelError::InvalidPipeline(format!(
                "base kernel {} must be the last of the pipeline",
                spec.name
            )));
        }
    }
    let mut factory = match entries[entries.len() - 1].builder {
        Builder::Base(build) => build(last, context)?,
        Builder::Framework(_) => {
            return Err(GraphKernelError::InvalidPipeline(format!(
                "pipeline ends with framework {}, a base kernel is needed",
                last.name
            )));
        }
    };
    for (spec, entry) in frameworks.iter().zip(entries.iter()).rev() {
        if let Builder::Framework(build) = entry.builder {
            factory = build(spec, context, factory)?;
        }
    }
    log::debug!(
        "composed pipeline : {:?}",
        entries.iter().map(|e| e.canonical).collect::<Vec<&str>>()
    );
    Ok(factory)
} // end of compose

//==================================================================================

fn boxed<K: Kernel + 'static>(kernel: K) -> Box<dyn Kernel> {
    Box::new(kernel)
}

// boxes a kernel built by a factory, with the warning flag of the factory
fn shared<B: BaseKernel + 'static>(kernel: PairwiseKernel<B>, warned: &Arc<AtomicBool>) -> Box<dyn Kernel> {
    boxed(kernel.with_warning_flag(Arc::clone(warned)))
}

fn warning_flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

fn build_vertex_histogram(spec: &KernelSpec, context: &BuildContext) -> Result<KernelFactory> {
    let params: VertexHistogramParams = spec.decode()?;
    let n_jobs = context.n_jobs_for(params.n_jobs);
    let warned = warning_flag();
    Ok(make_factory(move || Ok(shared(VertexHistogram::kernel(n_jobs), &warned))))
}

fn build_edge_histogram(spec: &KernelSpec, context: &BuildContext) -> Result<KernelFactory> {
    let params: EdgeHistogramParams = spec.decode()?;
    let n_jobs = context.n_jobs_for(params.n_jobs);
    let warned = warning_flag();
    Ok(make_factory(move || Ok(shared(EdgeHistogram::kernel(n_jobs), &warned))))
}

fn build_shortest_path(spec: &KernelSpec, context: &BuildContext) -> Result<KernelFactory> {
    let params: ShortestPathParams = spec.decode()?;
    let n_jobs = context.n_jobs_for(params.n_jobs);
    let warned = warning_flag();
    Ok(make_factory(move || Ok(shared(ShortestPath::kernel(&params, n_jobs), &warned))))
}

fn build_graphlet_sampling(spec: &KernelSpec, context: &BuildContext) -> Result<KernelFactory> {
    let params: GraphletSamplingParams = spec.decode()?;
    params.check()?;
    let n_jobs = context.n_jobs_for(params.n_jobs);
    let warned = warning_flag();
    Ok(make_factory(move || Ok(shared(GraphletSampling::kernel(&params, n_jobs)?, &warned))))
}

fn build_random_walk(spec: &KernelSpec, context: &BuildContext) -> Result<KernelFactory> {
    let params: RandomWalkParams = spec.decode()?;
    params.check()?;
    let n_jobs = context.n_jobs_for(params.n_jobs);
    let warned = warning_flag();
    Ok(make_factory(move || Ok(shared(RandomWalk::kernel(&params, n_jobs)?, &warned))))
}

fn build_neighborhood_hash(spec: &KernelSpec, context: &BuildContext) -> Result<KernelFactory> {
    let params: NeighborhoodHashParams = spec.decode()?;
    params.check()?;
    // sequential kernel, a wrapper n_jobs is passed so that it is reported as ignored
    let n_jobs = context.n_jobs_for(None);
    let warned = warning_flag();
    Ok(make_factory(move || {
        let mut kernel = NeighborhoodHash::kernel(&params)?;
        kernel.set_n_jobs(n_jobs);
        Ok(shared(kernel, &warned))
    }))
}

fn build_weisfeiler_lehman(spec: &KernelSpec, _context: &BuildContext, inner: KernelFactory) -> Result<KernelFactory> {
    let params: WeisfeilerLehmanParams = spec.decode()?;
    params.check()?;
    Ok(make_factory(move || Ok(boxed(WeisfeilerLehman::new(&params, Arc::clone(&inner))?))))
}

fn build_core_framework(spec: &KernelSpec, _context: &BuildContext, inner: KernelFactory) -> Result<KernelFactory> {
    let params: CoreFrameworkParams = spec.decode()?;
    params.check()?;
    Ok(make_factory(move || Ok(boxed(CoreFramework::new(&params, Arc::clone(&inner))?))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{make_labels, Graph, GraphFormat, GraphInput};

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn names_and_aliases() {
        assert_eq!(canonical_name("subtree_wl").unwrap(), "vertex_histogram");
        assert_eq!(canonical_name("WL").unwrap(), "weisfeiler_lehman");
        assert_eq!(kernel_role("CORE").unwrap(), KernelRole::Framework);
        assert_eq!(kernel_role("SP").unwrap(), KernelRole::Base);
        assert!(matches!(canonical_name("pyramid"), Err(GraphKernelError::UnknownKernel(_))));
        assert_eq!(kernel_names().len(), 8 + 9);
    }

    #[test]
    fn pipeline_errors() {
        let context = BuildContext::default();
        let res = compose(&[], &context);
        assert!(matches!(res, Err(GraphKernelError::InvalidPipeline(_))));
        let res = compose(&[KernelSpec::new("WL")], &context);
        assert!(matches!(res, Err(GraphKernelError::InvalidPipeline(_))));
        let res = compose(&[KernelSpec::new("SP"), KernelSpec::new("WL")], &context);
        assert!(matches!(res, Err(GraphKernelError::InvalidPipeline(_))));
        let res = compose(&[KernelSpec::new("SP"), KernelSpec::new("VH")], &context);
        assert!(matches!(res, Err(GraphKernelError::InvalidPipeline(_))));
        let res = compose(&[KernelSpec::new("WL"), KernelSpec::new("nope")], &context);
        assert!(matches!(res, Err(GraphKernelError::UnknownKernel(_))));
        let res = compose(&[KernelSpec::new("WL").with("n_iter", 0), KernelSpec::new("VH")], &context);
        assert!(matches!(res, Err(GraphKernelError::InvalidParameter { .. })));
        let res = compose(&[KernelSpec::new("SP").with("with_label", true)], &context);
        assert!(matches!(res, Err(GraphKernelError::InvalidParameter { .. })));
    }

    #[test]
    fn composed_chain_computes() {
        log_init_test();
        //
        let specs = vec![
            KernelSpec::new("CORE"),
            KernelSpec::new("WL").with("n_iter", 2),
            KernelSpec::new("subtree_wl"),
        ];
        let factory = compose(&specs, &BuildContext::new(Some(2))).unwrap();
        let mut kernel = factory().unwrap();
        assert_eq!(kernel.name(), "core_framework");
        let graph = Graph::new(
            GraphInput::edges([(0, 1), (1, 0), (1, 2), (2, 1), (2, 0), (0, 2)]),
            Some(make_labels([(0, "a"), (1, "b"), (2, "a")])),
            None,
            GraphFormat::Auto,
        )
        .unwrap();
        let km = kernel.fit_transform(&[graph.clone(), graph]).unwrap();
        assert_eq!(km.dim(), (2, 2));
        assert_eq!(km[[0, 1]], km[[0, 0]]);
        assert!(km[[0, 0]] > 0.);
    }

    #[test]
    fn n_jobs_precedence() {
        let default = BuildContext::new(Some(4));
        assert_eq!(default.n_jobs_for(Some(2)), Some(2));
        assert_eq!(default.n_jobs_for(None), Some(4));
        assert_eq!(BuildContext::default().n_jobs_for(None), None);
        let forced = BuildContext::overriding(Some(4));
        assert_eq!(forced.n_jobs_for(Some(2)), Some(4));
        assert_eq!(forced.n_jobs_for(None), Some(4));
        // overriding with None makes every kernel sequential
        assert_eq!(BuildContext::overriding(None).n_jobs_for(Some(3)), None);
    }

    #[test]
    fn snapshots_share_warning_flag() {
        log_init_test();
        //
        let specs = vec![
            KernelSpec::new("WL").with("n_iter", 3),
            KernelSpec::new("GR").with("random_state", 1).with("n_samples", 5),
        ];
        let graph = Graph::new(
            GraphInput::edges([(0, 1), (1, 0), (1, 2), (2, 1)]),
            Some(make_labels([(0, "a"), (1, "b"), (2, "a")])),
            None,
            GraphFormat::Auto,
        )
        .unwrap();
        // kernels boxed with one flag see each other's warning
        let warned = warning_flag();
        let params = GraphletSamplingParams {
            n_samples: 5,
            random_state: Some(1),
            ..Default::default()
        };
        let mut first = shared(GraphletSampling::kernel(&params, Some(2)).unwrap(), &warned);
        let mut second = shared(GraphletSampling::kernel(&params, Some(2)).unwrap(), &warned);
        first.fit_transform(&[graph.clone()]).unwrap();
        assert!(warned.load(std::sync::atomic::Ordering::Relaxed));
        assert_eq!(second.fit_transform(&[graph.clone()]).unwrap().dim(), (1, 1));
        // a framework over a sequential kernel still computes with n_jobs given
        let factory = compose(&specs, &BuildContext::new(Some(2))).unwrap();
        let mut kernel = factory().unwrap();
        let km = kernel.fit_transform(&[graph.clone(), graph]).unwrap();
        assert_eq!(km.dim(), (2, 2));
    }
}
