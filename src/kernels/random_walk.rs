//! Random walk kernel, counting common walks of 2 graphs in their direct product graph.
//!
//! k(G1, G2) = sum over t of c_t * 1ᵀ (A1 ⊗ A2)^t 1
//!
//! with c_t = λ^t (geometric) or λ^t / t! (exponential).
//! The product graph is never formed: with X_0 the all ones (n1, n2) matrix and X_t = A1 X_{t-1} A2ᵀ,
//! the term of order t is the sum of entries of X_t.
//!
//! The series is truncated at order p if given, otherwise at convergence of the terms.
//! A series that does not converge within [MAX_ORDER] terms is reported with a warning,
//! a series overflowing f64 is an error naming lambda.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{BaseKernel, PairwiseKernel, Stage};
use crate::error::{GraphKernelError, Result};
use crate::graph::Graph;

/// maximal order of the series when p is not given
pub const MAX_ORDER: usize = 100;

const CONVERGENCE_TOL: f64 = 1.0e-10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomWalkType {
    Geometric,
    Exponential,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomWalkParams {
    /// decay factor of walk lengths
    pub lambda: f64,
    pub kernel_type: RandomWalkType,
    /// maximal walk length, None for convergence
    pub p: Option<usize>,
    pub n_jobs: Option<i32>,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        RandomWalkParams {
            lambda: 0.1,
            kernel_type: RandomWalkType::Geometric,
            p: None,
            n_jobs: None,
        }
    }
}

impl RandomWalkParams {
    pub fn check(&self) -> Result<()> {
        if !(self.lambda > 0. && self.lambda.is_finite()) {
            return Err(GraphKernelError::InvalidParameter {
                kernel: "random_walk".to_string(),
                reason: format!("lambda must be positive, got {}", self.lambda),
            });
        }
        Ok(())
    }
}

#[cfg_attr(doc, katexit::katexit)]
/// Computes $k(G_1, G_2) = \sum_{t \ge 0} c_t \, \mathbf{1}^T (A_1 \otimes A_2)^t \mathbf{1}$
/// with $c_t = \lambda^t$ (geometric) or $c_t = \lambda^t / t!$ (exponential).
///
/// The geometric series converges when $\lambda$ is smaller than the inverse of the largest
/// eigenvalue of $A_1 \otimes A_2$.
pub struct RandomWalk {
    lambda: f64,
    kernel_type: RandomWalkType,
    p: Option<usize>,
    divergence_warned: AtomicBool,
}

impl RandomWalk {
    pub fn new(params: &RandomWalkParams) -> Result<Self> {
        params.check()?;
        Ok(RandomWalk {
            lambda: params.lambda,
            kernel_type: params.kernel_type,
            p: params.p,
            divergence_warned: AtomicBool::new(false),
        })
    }

    pub fn kernel(params: &RandomWalkParams, n_jobs: Option<usize>) -> Result<PairwiseKernel<RandomWalk>> {
        Ok(PairwiseKernel::new(RandomWalk::new(params)?, n_jobs))
    }

    /// coefficient of order t given coefficient of order t-1
    fn next_coefficient(&self, previous: f64, t: usize) -> f64 {
        match self.kernel_type {
            RandomWalkType::Geometric => previous * self.lambda,
            RandomWalkType::Exponential => previous * self.lambda / t as f64,
        }
    }

    fn walk_sum(&self, a1: &Array2<f64>, a2: &Array2<f64>) -> Result<f64> {
        let (n1, n2) = (a1.nrows(), a2.nrows());
        if n1 == 0 || n2 == 0 {
            return Ok(0.);
        }
        let a2t = a2.t();
        let mut x = Array2::<f64>::ones((n1, n2));
        let mut coeff = 1.;
        let mut total = x.sum();
        let max_order = self.p.unwrap_or(MAX_ORDER);
        let mut converged = self.p.is_some();
        for t in 1..=max_order {
            x = a1.dot(&x).dot(&a2t);
            coeff = self.next_coefficient(coeff, t);
            let term = coeff * x.sum();
            total += term;
            if !total.is_finite() {
                return Err(GraphKernelError::InvalidParameter {
                    kernel: "random_walk".to_string(),
                    reason: format!("walk series overflows at order {}, lambda {} is too large", t, self.lambda),
                });
            }
            if self.p.is_none() && term.abs() <= CONVERGENCE_TOL * total.abs().max(1.) {
                converged = true;
                break;
            }
        }
        if !converged && !self.divergence_warned.swap(true, Ordering::Relaxed) {
            log::warn!(
                "random walk series not converged after {} terms, lambda {} may be too large",
                max_order,
                self.lambda
            );
        }
        Ok(total)
    } // end of walk_sum
} // end of impl RandomWalk

impl BaseKernel for RandomWalk {
    type Features = Arc<Array2<f64>>;

    fn name(&self) -> &str {
        "random_walk"
    }

    fn extract(&mut self, graphs: &[Graph], _stage: Stage) -> Result<Vec<Arc<Array2<f64>>>> {
        Ok(graphs.iter().map(|g| g.get_adjacency_matrix()).collect())
    }

    fn pairwise(&self, x: &Arc<Array2<f64>>, y: &Arc<Array2<f64>>) -> Result<f64> {
        self.walk_sum(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Kernel;
    use ndarray::arr2;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn single_edge_geometric() {
        log_init_test();
        // A = [[0,1],[1,0]], A⊗A has 4 walks of each length over 4 vertices: sum(X_t) = 4
        let g = Graph::from_adjacency(arr2(&[[0., 1.], [1., 0.]])).unwrap();
        let params = RandomWalkParams {
            lambda: 0.5,
            p: Some(2),
            ..Default::default()
        };
        let mut kernel = RandomWalk::kernel(&params, None).unwrap();
        let km = kernel.fit_transform(&[g.clone()]).unwrap();
        assert!((km[[0, 0]] - (4. + 0.5 * 4. + 0.25 * 4.)).abs() < 1.0e-12);
        // converged geometric series : 4 / (1 - 0.5)
        let params = RandomWalkParams {
            lambda: 0.5,
            ..Default::default()
        };
        let mut kernel = RandomWalk::kernel(&params, None).unwrap();
        let km = kernel.fit_transform(&[g]).unwrap();
        assert!((km[[0, 0]] - 8.).abs() < 1.0e-6);
    }

    #[test]
    fn exponential_series() {
        let g = Graph::from_adjacency(arr2(&[[0., 1.], [1., 0.]])).unwrap();
        let params = RandomWalkParams {
            lambda: 1.,
            kernel_type: RandomWalkType::Exponential,
            ..Default::default()
        };
        let mut kernel = RandomWalk::kernel(&params, None).unwrap();
        let km = kernel.fit_transform(&[g]).unwrap();
        // 4 * e
        assert!((km[[0, 0]] - 4. * std::f64::consts::E).abs() < 1.0e-6);
    }

    #[test]
    fn overflowing_series_is_an_error() {
        log_init_test();
        // complete graph on 10 vertices, walk counts grow as 9^t
        let mut adjacency = Array2::<f64>::ones((10, 10));
        adjacency.diag_mut().fill(0.);
        let g = Graph::from_adjacency(adjacency).unwrap();
        let params = RandomWalkParams {
            lambda: 1000.,
            ..Default::default()
        };
        let mut kernel = RandomWalk::kernel(&params, None).unwrap();
        let res = kernel.fit_transform(&[g.clone()]);
        assert!(
            matches!(&res, Err(GraphKernelError::InvalidParameter { reason, .. }) if reason.contains("lambda")),
            "got {:?}",
            res
        );
        assert!(kernel.diagonal().is_err());
        // the same overflow with an exponential series and a truncated one
        let params = RandomWalkParams {
            lambda: 1.0e300,
            kernel_type: RandomWalkType::Exponential,
            p: Some(3),
            ..Default::default()
        };
        let mut kernel = RandomWalk::kernel(&params, None).unwrap();
        assert!(kernel.fit(&[g]).is_err());
    }

    #[test]
    fn bad_lambda() {
        let params = RandomWalkParams {
            lambda: -1.,
            ..Default::default()
        };
        assert!(RandomWalk::new(&params).is_err());
    }
}
