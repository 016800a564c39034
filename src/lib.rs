//! Graph kernels : similarity matrices between collections of labelled graphs.
//!
//! - [graph] : the graph structure, built from matrices, dictionaries or edge lists, with labels.
//! - [kernels] : base kernels (vertex and edge histograms, shortest path, graphlet sampling, random walk,
//!   neighborhood hash) and frameworks wrapping them (Weisfeiler-Lehman, core framework),
//!   composed by name through the registry.
//! - [graph_kernel] : the user facing estimator with normalization and Nystroem approximation.
//! - [io] : TU dataset reading and kernel matrix dump.

#[macro_use]
extern crate lazy_static;

pub mod error;

pub mod graph;

pub mod kernels;

pub mod graph_kernel;

pub mod io;

pub mod prelude;
