//! The Graph structure on which kernels operate.
//!
//! A [Graph] is built from any [GraphInput] (dense or sparse matrix, nested list, edge dictionary,
//! neighbour lists, edge list with or without weights) with optional vertex and edge labels.
//!
//! The graph stores an immutable core:
//! - the vertex index map : vertex symbols sorted, the rank of a symbol is its index in matrix form.
//!   Matrix inputs have symbols 0..n-1.
//! - the weighted directed entries by index, and labels by index.
//!
//! On top of the core two representations are materialized on demand and cached:
//! the adjacency matrix and the edge dictionary (keyed by symbols).
//! The [GraphFormat] flag records which representations the holder asked for.
//! Asking labels for a representation not in the flag escalates the flag to [GraphFormat::All]
//! with a warning, [Graph::set_format] and [Graph::desired_format] are the explicit ways to change it.
//!
//! Caches are behind a RwLock so a graph can be read concurrently by independent kernels.

pub mod input;
pub mod paths;
pub mod symbol;

pub use input::GraphInput;
pub use symbol::{make_edge_labels, make_labels, Label, Symbol};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use ndarray::Array2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{GraphKernelError, Result};

/// vertex symbol -> {neighbour symbol : weight}
pub type EdgeDictionary = BTreeMap<Symbol, BTreeMap<Symbol, f64>>;

/// Which representations a graph holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    Dictionary,
    Adjacency,
    All,
    /// resolves to the natural format of the input at construction, means "keep" afterwards
    Auto,
}

impl GraphFormat {
    /// smallest format containing both
    pub fn union(self, other: GraphFormat) -> GraphFormat {
        match (self, other) {
            (GraphFormat::Auto, f) | (f, GraphFormat::Auto) => f,
            (a, b) if a == b => a,
            _ => GraphFormat::All,
        }
    }

    /// true if format provides the representation needed for purpose
    pub fn contains(self, purpose: Purpose) -> bool {
        match (self, purpose) {
            (_, Purpose::Any) => true,
            (GraphFormat::All, _) => true,
            (GraphFormat::Adjacency, Purpose::Adjacency) => true,
            (GraphFormat::Dictionary, Purpose::Dictionary) => true,
            _ => false,
        }
    }
} // end of impl GraphFormat

/// representation for which labels are asked
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Purpose {
    /// labels keyed by vertex index
    Adjacency,
    /// labels keyed by vertex symbol
    Dictionary,
    /// whatever the graph currently holds, adjacency preferred
    Any,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LabelType {
    Vertex,
    Edge,
}

/// labels as returned by [Graph::get_labels]
#[derive(Clone, Debug, PartialEq)]
pub enum LabelMap {
    VertexByIndex(BTreeMap<usize, Label>),
    VertexBySymbol(BTreeMap<Symbol, Label>),
    EdgeByIndex(BTreeMap<(usize, usize), Label>),
    EdgeBySymbol(BTreeMap<(Symbol, Symbol), Label>),
}

impl LabelMap {
    pub fn len(&self) -> usize {
        match self {
            LabelMap::VertexByIndex(m) => m.len(),
            LabelMap::VertexBySymbol(m) => m.len(),
            LabelMap::EdgeByIndex(m) => m.len(),
            LabelMap::EdgeBySymbol(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// all labels, in key order
    pub fn labels(&self) -> Vec<&Label> {
        match self {
            LabelMap::VertexByIndex(m) => m.values().collect(),
            LabelMap::VertexBySymbol(m) => m.values().collect(),
            LabelMap::EdgeByIndex(m) => m.values().collect(),
            LabelMap::EdgeBySymbol(m) => m.values().collect(),
        }
    }
} // end of impl LabelMap

//==================================================================================

/// vertices and edges of a graph, with the cached representations.
/// Shared between a graph and its relabelled versions.
pub(crate) struct Structure {
    /// sorted vertex symbols, rank is the index
    vertices: IndexSet<Symbol>,
    /// out_edges[i] : (j, weight) sorted by j
    out_edges: Vec<Vec<(usize, f64)>>,
    nb_edges: usize,
    adjacency: RwLock<Option<Arc<Array2<f64>>>>,
    dictionary: RwLock<Option<Arc<EdgeDictionary>>>,
} // end of struct Structure

impl Structure {
    fn new(vertices: IndexSet<Symbol>, out_edges: Vec<Vec<(usize, f64)>>) -> Self {
        let nb_edges = out_edges.iter().map(|row| row.len()).sum();
        Structure {
            vertices,
            out_edges,
            nb_edges,
            adjacency: RwLock::new(None),
            dictionary: RwLock::new(None),
        }
    }

    fn from_raw(raw: input::RawGraph) -> Self {
        let mut symbols = raw.symbols;
        symbols.sort();
        symbols.dedup();
        let vertices: IndexSet<Symbol> = symbols.into_iter().collect();
        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); vertices.len()];
        for (u, v, w) in raw.entries {
            // all endpoints were pushed in symbols while parsing
            if let (Some(i), Some(j)) = (vertices.get_index_of(&u), vertices.get_index_of(&v)) {
                rows[i].insert(j, w);
            }
        }
        let out_edges = rows.into_iter().map(|row| row.into_iter().collect()).collect();
        Structure::new(vertices, out_edges)
    } // end of from_raw

    fn compute_adjacency(&self) -> Array2<f64> {
        let n = self.vertices.len();
        let mut mat = Array2::<f64>::zeros((n, n));
        for (i, row) in self.out_edges.iter().enumerate() {
            for (j, w) in row {
                mat[[i, *j]] = *w;
            }
        }
        mat
    }

    fn compute_dictionary(&self) -> EdgeDictionary {
        let mut dict = EdgeDictionary::new();
        for (i, row) in self.out_edges.iter().enumerate() {
            let neighbours = row
                .iter()
                .map(|(j, w)| (self.vertices[*j].clone(), *w))
                .collect::<BTreeMap<Symbol, f64>>();
            dict.insert(self.vertices[i].clone(), neighbours);
        }
        dict
    }

    fn adjacency(&self) -> Arc<Array2<f64>> {
        if let Some(adj) = self.adjacency.read().as_ref() {
            return Arc::clone(adj);
        }
        log::trace!("materializing adjacency matrix, nv : {}", self.vertices.len());
        let mut guard = self.adjacency.write();
        let adj = guard.get_or_insert_with(|| Arc::new(self.compute_adjacency()));
        Arc::clone(adj)
    }

    fn dictionary(&self) -> Arc<EdgeDictionary> {
        if let Some(dict) = self.dictionary.read().as_ref() {
            return Arc::clone(dict);
        }
        log::trace!("materializing edge dictionary, nv : {}", self.vertices.len());
        let mut guard = self.dictionary.write();
        let dict = guard.get_or_insert_with(|| Arc::new(self.compute_dictionary()));
        Arc::clone(dict)
    }
} // end of impl Structure

//==================================================================================

/// One graph instance. See module documentation.
pub struct Graph {
    structure: Arc<Structure>,
    vertex_labels: Option<Arc<Vec<Label>>>,
    edge_labels: Option<Arc<BTreeMap<(usize, usize), Label>>>,
    format: RwLock<GraphFormat>,
} // end of struct Graph

impl Graph {
    /// Builds a graph from a raw input.
    ///
    /// - vertex_labels, if given, must have a label for every vertex found in input.
    /// - edge_labels, if given, must have a label for every edge (as ordered pair of symbols).
    /// - format [GraphFormat::Auto] resolves to the natural format of the input.
    pub fn new(
        input: GraphInput,
        vertex_labels: Option<HashMap<Symbol, Label>>,
        edge_labels: Option<HashMap<(Symbol, Symbol), Label>>,
        format: GraphFormat,
    ) -> Result<Self> {
        let natural = input.natural_format();
        let raw = input::parse_input(input)?;
        let structure = Structure::from_raw(raw);
        let vertex_labels = match vertex_labels {
            Some(labels) => Some(Arc::new(index_vertex_labels(&structure, labels)?)),
            None => None,
        };
        let edge_labels = match edge_labels {
            Some(labels) => Some(Arc::new(index_edge_labels(&structure, labels)?)),
            None => None,
        };
        let format = match format {
            GraphFormat::Auto => natural,
            f => f,
        };
        let graph = Graph {
            structure: Arc::new(structure),
            vertex_labels,
            edge_labels,
            format: RwLock::new(format),
        };
        graph.materialize(format);
        log::trace!("graph built, nv : {}, ne : {}, format : {:?}", graph.nv(), graph.n_edges(), format);
        Ok(graph)
    } // end of new

    /// unlabelled graph from a dense adjacency matrix
    pub fn from_adjacency(mat: Array2<f64>) -> Result<Self> {
        Graph::new(GraphInput::Dense(mat), None, None, GraphFormat::Auto)
    }

    /// dense adjacency matrix with vertex labels
    pub fn from_adjacency_labelled(mat: Array2<f64>, vertex_labels: HashMap<Symbol, Label>) -> Result<Self> {
        Graph::new(GraphInput::Dense(mat), Some(vertex_labels), None, GraphFormat::Auto)
    }

    /// unlabelled graph from a list of weighted edges
    pub fn from_edges(edges: Vec<(Symbol, Symbol, f64)>) -> Result<Self> {
        Graph::new(GraphInput::WeightedEdges(edges), None, None, GraphFormat::Auto)
    }

    fn from_parts(
        structure: Structure,
        vertex_labels: Option<Arc<Vec<Label>>>,
        edge_labels: Option<Arc<BTreeMap<(usize, usize), Label>>>,
        format: GraphFormat,
    ) -> Self {
        Graph {
            structure: Arc::new(structure),
            vertex_labels,
            edge_labels,
            format: RwLock::new(format),
        }
    }

    fn materialize(&self, format: GraphFormat) {
        match format {
            GraphFormat::Adjacency => {
                self.structure.adjacency();
            }
            GraphFormat::Dictionary => {
                self.structure.dictionary();
            }
            GraphFormat::All => {
                self.structure.adjacency();
                self.structure.dictionary();
            }
            GraphFormat::Auto => {}
        }
    }

    /// number of vertices
    pub fn nv(&self) -> usize {
        self.structure.vertices.len()
    }

    /// number of directed entries
    pub fn n_edges(&self) -> usize {
        self.structure.nb_edges
    }

    /// vertex symbols, in index order
    pub fn get_vertices(&self) -> &IndexSet<Symbol> {
        &self.structure.vertices
    }

    /// index of a vertex symbol
    pub fn vertex_index(&self, symbol: &Symbol) -> Option<usize> {
        self.structure.vertices.get_index_of(symbol)
    }

    /// out going entries (neighbour index, weight) of vertex of index i, sorted by neighbour
    pub fn out_edges(&self, i: usize) -> &[(usize, f64)] {
        &self.structure.out_edges[i]
    }

    /// out going neighbours of vertex of index i
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.structure.out_edges[i].iter().map(|(j, _)| *j)
    }

    /// all entries as (i, j, weight)
    pub fn get_edges(&self) -> Vec<(usize, usize, f64)> {
        let mut edges = Vec::<(usize, usize, f64)>::with_capacity(self.n_edges());
        for (i, row) in self.structure.out_edges.iter().enumerate() {
            edges.extend(row.iter().map(|(j, w)| (i, *j, *w)));
        }
        edges
    }

    /// current format flag
    pub fn format(&self) -> GraphFormat {
        *self.format.read()
    }

    /// adjacency matrix, vertex i corresponds to the i-th symbol of [Graph::get_vertices]
    pub fn get_adjacency_matrix(&self) -> Arc<Array2<f64>> {
        self.structure.adjacency()
    }

    /// edge dictionary keyed by symbols. Isolated vertices have an empty neighbour map
    pub fn get_edge_dictionary(&self) -> Arc<EdgeDictionary> {
        self.structure.dictionary()
    }

    /// converts immediately to format, dropping representations not in format.
    /// Auto keeps the current format.
    pub fn set_format(&self, format: GraphFormat) {
        if format == GraphFormat::Auto {
            return;
        }
        self.materialize(format);
        if !format.contains(Purpose::Adjacency) {
            *self.structure.adjacency.write() = None;
        }
        if !format.contains(Purpose::Dictionary) {
            *self.structure.dictionary.write() = None;
        }
        log::debug!("graph format set to {:?}", format);
        *self.format.write() = format;
    } // end of set_format

    /// adds format to the current one without materializing. Adjacency + Dictionary gives All.
    pub fn desired_format(&self, format: GraphFormat) {
        let mut current = self.format.write();
        *current = current.union(format);
    }

    pub fn has_vertex_labels(&self) -> bool {
        self.vertex_labels.is_some()
    }

    pub fn has_edge_labels(&self) -> bool {
        self.edge_labels.is_some()
    }

    /// Returns labels keyed according to purpose.
    ///
    /// If the representation of purpose is not in the current format, format escalates to All
    /// and a warning is emitted.
    /// Returns FormatUnavailable if the graph was not given labels of that type.
    pub fn get_labels(&self, purpose: Purpose, label_type: LabelType) -> Result<LabelMap> {
        let current = self.format();
        let resolved = match purpose {
            Purpose::Any => {
                if current.contains(Purpose::Adjacency) {
                    Purpose::Adjacency
                } else {
                    Purpose::Dictionary
                }
            }
            p => p,
        };
        if !current.contains(resolved) {
            log::warn!(
                "graph format {:?} does not provide {:?} labels, format escalated to All",
                current,
                resolved
            );
            self.materialize(GraphFormat::All);
            *self.format.write() = GraphFormat::All;
        }
        let vertices = &self.structure.vertices;
        match label_type {
            LabelType::Vertex => {
                let labels = self
                    .vertex_labels
                    .as_ref()
                    .ok_or_else(|| GraphKernelError::FormatUnavailable("graph has no vertex labels".to_string()))?;
                match resolved {
                    Purpose::Dictionary => Ok(LabelMap::VertexBySymbol(
                        labels.iter().enumerate().map(|(i, l)| (vertices[i].clone(), l.clone())).collect(),
                    )),
                    _ => Ok(LabelMap::VertexByIndex(labels.iter().cloned().enumerate().collect())),
                }
            }
            LabelType::Edge => {
                let labels = self
                    .edge_labels
                    .as_ref()
                    .ok_or_else(|| GraphKernelError::FormatUnavailable("graph has no edge labels".to_string()))?;
                match resolved {
                    Purpose::Dictionary => Ok(LabelMap::EdgeBySymbol(
                        labels
                            .iter()
                            .map(|((i, j), l)| ((vertices[*i].clone(), vertices[*j].clone()), l.clone()))
                            .collect(),
                    )),
                    _ => Ok(LabelMap::EdgeByIndex(labels.as_ref().clone())),
                }
            }
        }
    } // end of get_labels

    /// vertex labels by index, read from the core without touching the format.
    pub fn index_vertex_labels(&self) -> Option<Arc<Vec<Label>>> {
        self.vertex_labels.clone()
    }

    /// vertex labels by index, a constant default label for each vertex if graph has no labels
    pub fn vertex_labels_or_default(&self, default: &Label) -> Arc<Vec<Label>> {
        match &self.vertex_labels {
            Some(labels) => Arc::clone(labels),
            None => Arc::new(vec![default.clone(); self.nv()]),
        }
    }

    /// edge labels by index pair, the default label for each edge if graph has no edge labels
    pub fn edge_labels_or_default(&self, default: &Label) -> Arc<BTreeMap<(usize, usize), Label>> {
        match &self.edge_labels {
            Some(labels) => Arc::clone(labels),
            None => Arc::new(self.get_edges().into_iter().map(|(i, j, _)| ((i, j), default.clone())).collect()),
        }
    }

    /// returns a graph with the same structure and new vertex labels (by index)
    pub fn relabel(&self, labels: Vec<Label>) -> Result<Graph> {
        if labels.len() != self.nv() {
            return Err(GraphKernelError::LabelMismatch(format!(
                "relabel got {} labels for {} vertices",
                labels.len(),
                self.nv()
            )));
        }
        Ok(Graph {
            structure: Arc::clone(&self.structure),
            vertex_labels: Some(Arc::new(labels)),
            edge_labels: self.edge_labels.clone(),
            format: RwLock::new(self.format()),
        })
    }

    /// subgraph induced by a set of vertex indices. Symbols and labels are kept.
    pub fn get_subgraph(&self, indices: &[usize]) -> Result<Graph> {
        let mut kept = indices.to_vec();
        kept.sort_unstable();
        kept.dedup();
        if let Some(last) = kept.last() {
            if *last >= self.nv() {
                return Err(GraphKernelError::InputFormat(format!(
                    "subgraph vertex index {} out of range, nv : {}",
                    last,
                    self.nv()
                )));
            }
        }
        let mut new_index = vec![usize::MAX; self.nv()];
        for (rank, i) in kept.iter().enumerate() {
            new_index[*i] = rank;
        }
        // original indices are sorted so symbols stay sorted
        let vertices: IndexSet<Symbol> = kept.iter().map(|i| self.structure.vertices[*i].clone()).collect();
        let out_edges: Vec<Vec<(usize, f64)>> = kept
            .iter()
            .map(|i| {
                self.structure.out_edges[*i]
                    .iter()
                    .filter(|(j, _)| new_index[*j] != usize::MAX)
                    .map(|(j, w)| (new_index[*j], *w))
                    .collect()
            })
            .collect();
        let vertex_labels = self
            .vertex_labels
            .as_ref()
            .map(|labels| Arc::new(kept.iter().map(|i| labels[*i].clone()).collect::<Vec<Label>>()));
        let edge_labels = self.edge_labels.as_ref().map(|labels| {
            Arc::new(
                labels
                    .iter()
                    .filter(|((i, j), _)| new_index[*i] != usize::MAX && new_index[*j] != usize::MAX)
                    .map(|((i, j), l)| ((new_index[*i], new_index[*j]), l.clone()))
                    .collect::<BTreeMap<(usize, usize), Label>>(),
            )
        });
        Ok(Graph::from_parts(
            Structure::new(vertices, out_edges),
            vertex_labels,
            edge_labels,
            self.format(),
        ))
    } // end of get_subgraph
} // end of impl Graph

impl Clone for Graph {
    fn clone(&self) -> Self {
        Graph {
            structure: Arc::clone(&self.structure),
            vertex_labels: self.vertex_labels.clone(),
            edge_labels: self.edge_labels.clone(),
            format: RwLock::new(self.format()),
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nv", &self.nv())
            .field("n_edges", &self.n_edges())
            .field("format", &self.format())
            .field("vertex_labels", &self.has_vertex_labels())
            .field("edge_labels", &self.has_edge_labels())
            .finish()
    }
}

impl TryFrom<GraphInput> for Graph {
    type Error = GraphKernelError;

    fn try_from(input: GraphInput) -> Result<Self> {
        Graph::new(input, None, None, GraphFormat::Auto)
    }
}

//==================================================================================

fn index_vertex_labels(structure: &Structure, mut labels: HashMap<Symbol, Label>) -> Result<Vec<Label>> {
    let mut indexed = Vec::<Label>::with_capacity(structure.vertices.len());
    for symbol in &structure.vertices {
        match labels.remove(symbol) {
            Some(label) => indexed.push(label),
            None => {
                return Err(GraphKernelError::LabelMismatch(format!("vertex {} has no label", symbol)));
            }
        }
    }
    if !labels.is_empty() {
        log::warn!("ignoring {} vertex labels not corresponding to a vertex", labels.len());
    }
    Ok(indexed)
} // end of index_vertex_labels

fn index_edge_labels(
    structure: &Structure,
    mut labels: HashMap<(Symbol, Symbol), Label>,
) -> Result<BTreeMap<(usize, usize), Label>> {
    let vertices = &structure.vertices;
    let mut indexed = BTreeMap::<(usize, usize), Label>::new();
    for (i, row) in structure.out_edges.iter().enumerate() {
        for (j, _) in row {
            let key = (vertices[i].clone(), vertices[*j].clone());
            match labels.remove(&key) {
                Some(label) => {
                    indexed.insert((i, *j), label);
                }
                None => {
                    return Err(GraphKernelError::LabelMismatch(format!(
                        "edge ({}, {}) has no label",
                        key.0, key.1
                    )));
                }
            }
        }
    }
    if !labels.is_empty() {
        log::warn!("ignoring {} edge labels not corresponding to an edge", labels.len());
    }
    Ok(indexed)
} // end of index_edge_labels

//==================================================================================

// end of mod tests
