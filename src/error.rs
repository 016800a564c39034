//! Errors returned by graph construction, kernel lifecycle and pipeline building.
//!
//! IO and the binary use anyhow, the library core returns [GraphKernelError].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphKernelError {
    /// raw graph object matches none of the accepted shapes, or collection is empty
    #[error("invalid graph input : {0}")]
    InputFormat(String),
    /// label keys do not cover discovered vertices or edges
    #[error("labels do not match graph : {0}")]
    LabelMismatch(String),
    /// asked representation cannot be derived
    #[error("format unavailable : {0}")]
    FormatUnavailable(String),
    #[error("unknown kernel name : {0}")]
    UnknownKernel(String),
    #[error("invalid kernel pipeline : {0}")]
    InvalidPipeline(String),
    #[error("invalid parameter for kernel {kernel} : {reason}")]
    InvalidParameter { kernel: String, reason: String },
    #[error("nystroem rank {rank} is invalid for {n_samples} fitted graphs")]
    InvalidRank { rank: usize, n_samples: usize },
    #[error("kernel {0} must be fitted before transform")]
    NotFitted(String),
    #[error("decomposition failed : {0}")]
    Decomposition(String),
    #[error("could not build thread pool")]
    ThreadPool(#[source] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, GraphKernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rank_display() {
        let err = GraphKernelError::InvalidRank { rank: 12, n_samples: 5 };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("5"));
    }

    #[test]
    fn invalid_parameter_display() {
        let err = GraphKernelError::InvalidParameter {
            kernel: "shortest_path".to_string(),
            reason: "unknown field `foo`".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("shortest_path"));
        assert!(msg.contains("foo"));
    }
} // end of mod tests
