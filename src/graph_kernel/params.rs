//! defines parameters of the generic graph kernel wrapper

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphKernelParams {
    /// divide kernel values by sqrt(k(x,x) * k(y,y))
    pub normalize: bool,
    /// rank of the Nystroem approximation, None for the exact kernel
    pub nystroem: Option<usize>,
    /// number of threads given to kernels of the pipeline that do not set their own. -1 means all cpus
    pub n_jobs: Option<i32>,
    /// seed of the generator used to choose Nystroem components
    pub random_state: Option<u64>,
    /// accepted for compatibility, no effect
    pub verbose: bool,
} // end of GraphKernelParams

impl GraphKernelParams {
    pub fn new(normalize: bool, nystroem: Option<usize>, n_jobs: Option<i32>, random_state: Option<u64>) -> Self {
        GraphKernelParams {
            normalize,
            nystroem,
            n_jobs,
            random_state,
            verbose: false,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_nystroem(mut self, rank: usize) -> Self {
        self.nystroem = Some(rank);
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    ///
    pub fn get_normalize(&self) -> bool {
        self.normalize
    }

    ///
    pub fn get_nystroem(&self) -> Option<usize> {
        self.nystroem
    }

    ///
    pub fn get_n_jobs(&self) -> Option<i32> {
        self.n_jobs
    }

    ///
    pub fn get_random_state(&self) -> Option<u64> {
        self.random_state
    }
} // end of impl GraphKernelParams

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_json() {
        let params = GraphKernelParams::default().with_normalize(true).with_nystroem(10).with_random_state(3);
        assert!(params.get_normalize());
        assert_eq!(params.get_nystroem(), Some(10));
        assert_eq!(params.get_n_jobs(), None);
        //
        let decoded: GraphKernelParams = serde_json::from_str(r#"{"normalize": true, "nystroem": 10, "random_state": 3}"#).unwrap();
        assert_eq!(decoded, params);
        assert!(serde_json::from_str::<GraphKernelParams>(r#"{"normalise": true}"#).is_err());
    }
}
