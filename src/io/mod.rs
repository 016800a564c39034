//! Dataset reading and kernel matrix dump.

pub mod output;
pub mod tudataset;
