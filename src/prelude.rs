//! To ease access to most frequently items
//!

pub use crate::error::{GraphKernelError, Result};

pub use crate::graph::{make_edge_labels, make_labels, Graph, GraphFormat, GraphInput, Label, Symbol};

pub use crate::kernels::registry::{compose, kernel_names, BuildContext};
pub use crate::kernels::{make_factory, Kernel, KernelFactory, KernelSpec};

pub use crate::graph_kernel::{GraphKernel, GraphKernelParams};

pub use crate::io::output::{dump_kernel_matrix, Format, Output};
pub use crate::io::tudataset::{read_tudataset, Dataset};
