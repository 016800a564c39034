//! Nystroem low rank approximation of a kernel matrix.
//!
//! q landmark graphs are chosen among the fitted ones. With K_qq the kernel matrix between landmarks
//! and its thin svd K_qq = U S Vᵀ, we store N = U S^{-1/2} Vᵀ.
//! A graph y is then mapped to the row k(y, landmarks) Nᵀ of dimension q, so that dot products of
//! mapped graphs approximate the kernel.
//!
//! Singular values are clamped at [SINGULAR_FLOOR] before inversion.

use faer::Mat;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{GraphKernelError, Result};

pub const SINGULAR_FLOOR: f64 = 1.0e-12;

/// landmarks and normalization matrix of a fitted approximation
#[derive(Clone, Debug)]
pub struct NystroemMap {
    /// indices of landmarks in the fitted collection
    components: Vec<usize>,
    /// (q, q) matrix N
    normalization: Array2<f64>,
}

impl NystroemMap {
    /// builds the map from the kernel matrix between landmarks
    pub fn new(components: Vec<usize>, k_qq: &Array2<f64>) -> Result<Self> {
        let normalization = normalization_matrix(k_qq)?;
        Ok(NystroemMap {
            components,
            normalization,
        })
    }

    pub fn get_components(&self) -> &[usize] {
        &self.components
    }

    pub fn rank(&self) -> usize {
        self.components.len()
    }

    /// maps rows of k_yq (n, q) to K_yq Nᵀ
    pub fn project(&self, k_yq: &Array2<f64>) -> Array2<f64> {
        k_yq.dot(&self.normalization.t())
    }
} // end of impl NystroemMap

/// chooses q indices among 0..n with rng. Fails if q is 0 or greater than n
pub fn choose_components(n: usize, rank: usize, rng: &mut Xoshiro256PlusPlus) -> Result<Vec<usize>> {
    if rank == 0 || rank > n {
        return Err(GraphKernelError::InvalidRank { rank, n_samples: n });
    }
    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(rng);
    permutation.truncate(rank);
    Ok(permutation)
}

/// N = U S^{-1/2} Vᵀ with K = U S Vᵀ
pub fn normalization_matrix(k_qq: &Array2<f64>) -> Result<Array2<f64>> {
    let (nrows, ncols) = k_qq.dim();
    if nrows != ncols || nrows == 0 {
        return Err(GraphKernelError::Decomposition(format!(
            "nystroem basis kernel must be square and non empty, got ({}, {})",
            nrows, ncols
        )));
    }
    let q = nrows;
    let mat = Mat::<f64>::from_fn(q, q, |i, j| k_qq[[i, j]]);
    let svd = mat
        .thin_svd()
        .map_err(|e| GraphKernelError::Decomposition(format!("{:?}", e)))?;
    let u = svd.U();
    let v = svd.V();
    let s = svd.S().column_vector();
    let inv_sqrt: Vec<f64> = (0..q).map(|k| 1. / s[k].max(SINGULAR_FLOOR).sqrt()).collect();
    log::debug!(
        "nystroem basis, rank {}, largest singular value {:.3e}, smallest {:.3e}",
        q,
        s[0],
        s[q - 1]
    );
    let normalization = Array2::<f64>::from_shape_fn((q, q), |(i, j)| {
        (0..q).map(|k| u[(i, k)] * inv_sqrt[k] * v[(j, k)]).sum()
    });
    Ok(normalization)
} // end of normalization_matrix

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use rand::SeedableRng;

    #[test]
    fn inverse_square_root_of_spd() {
        // N Nᵀ = K^{-1} for K symmetric positive definite, and N K Nᵀ = I
        let k = arr2(&[[4., 1., 0.], [1., 3., 1.], [0., 1., 2.]]);
        let n = normalization_matrix(&k).unwrap();
        let check = n.dot(&k).dot(&n.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1. } else { 0. };
                assert!((check[[i, j]] - expected).abs() < 1.0e-8, "({},{}) : {}", i, j, check[[i, j]]);
            }
        }
    }

    #[test]
    fn projection_reproduces_kernel_on_landmarks() {
        let k = arr2(&[[2., 1.], [1., 2.]]);
        let map = NystroemMap::new(vec![0, 1], &k).unwrap();
        let features = map.project(&k);
        let approx = features.dot(&features.t());
        for ((i, j), v) in approx.indexed_iter() {
            assert!((v - k[[i, j]]).abs() < 1.0e-8);
        }
    }

    #[test]
    fn components_choice() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let components = choose_components(10, 4, &mut rng).unwrap();
        assert_eq!(components.len(), 4);
        assert!(components.iter().all(|c| *c < 10));
        let mut rng2 = Xoshiro256PlusPlus::seed_from_u64(42);
        assert_eq!(components, choose_components(10, 4, &mut rng2).unwrap());
        assert!(matches!(
            choose_components(3, 4, &mut rng),
            Err(GraphKernelError::InvalidRank { rank: 4, n_samples: 3 })
        ));
        assert!(choose_components(3, 0, &mut rng).is_err());
    }
}
