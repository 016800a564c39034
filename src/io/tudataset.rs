//! Reading graph collections stored in the TU benchmark text format.
//!
//! A dataset NAME in directory dir is made of comma separated files:
//! - NAME_A.txt : one line "u, v" per directed edge, vertices numbered from 1 over the whole dataset
//! - NAME_graph_indicator.txt : line i gives the graph (numbered from 1) of vertex i
//! - NAME_graph_labels.txt (optional) : class of each graph
//! - NAME_node_labels.txt (optional) : label of each vertex
//! - NAME_edge_labels.txt (optional) : label of each edge, in the order of NAME_A.txt
//!
//! Graphs are built in dictionary form keyed by the global vertex numbers, so isolated vertices are kept.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use csv::{ReaderBuilder, Trim};

use crate::graph::{Graph, GraphFormat, GraphInput, Label, Symbol};

/// graphs of a dataset and their classes if present
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data: Vec<Graph>,
    pub target: Option<Vec<i64>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn dataset_file(dir: &Path, name: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{}_{}.txt", name, suffix))
}

// reads all records of a headerless comma separated file of integers
fn read_int_records(filepath: &Path) -> anyhow::Result<Vec<Vec<i64>>> {
    let file = OpenOptions::new()
        .read(true)
        .open(filepath)
        .with_context(|| format!("could not open file {:?}", filepath.as_os_str()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);
    let mut records = Vec::<Vec<i64>>::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("{:?} line {}", filepath, line + 1))?;
        let values = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(|field| field.parse::<i64>())
            .collect::<Result<Vec<i64>, _>>()
            .with_context(|| format!("{:?} line {} : not an integer", filepath, line + 1))?;
        if !values.is_empty() {
            records.push(values);
        }
    }
    log::debug!("read {} records from {:?}", records.len(), filepath);
    Ok(records)
} // end of read_int_records

fn read_column(filepath: &Path) -> anyhow::Result<Vec<i64>> {
    read_int_records(filepath)?.into_iter().map(|r| Ok(r[0])).collect()
}

fn read_optional_column(filepath: &Path) -> anyhow::Result<Option<Vec<i64>>> {
    if filepath.exists() {
        Ok(Some(read_column(filepath)?))
    } else {
        Ok(None)
    }
}

/// reads dataset name from directory dir
pub fn read_tudataset(dir: &Path, name: &str) -> anyhow::Result<Dataset> {
    log::info!("reading dataset {} in {:?}", name, dir);
    let indicator = read_column(&dataset_file(dir, name, "graph_indicator"))?;
    let edges = read_int_records(&dataset_file(dir, name, "A"))?;
    let node_labels = read_optional_column(&dataset_file(dir, name, "node_labels"))?;
    let edge_labels = read_optional_column(&dataset_file(dir, name, "edge_labels"))?;
    let target = read_optional_column(&dataset_file(dir, name, "graph_labels"))?;
    //
    let nb_graphs = indicator.iter().copied().max().unwrap_or(0);
    if nb_graphs <= 0 {
        return Err(anyhow!("dataset {} has no graph", name));
    }
    let nb_graphs = nb_graphs as usize;
    if let Some(labels) = &node_labels {
        if labels.len() != indicator.len() {
            return Err(anyhow!("{} node labels for {} vertices", labels.len(), indicator.len()));
        }
    }
    if let Some(labels) = &edge_labels {
        if labels.len() != edges.len() {
            return Err(anyhow!("{} edge labels for {} edges", labels.len(), edges.len()));
        }
    }
    // graph rank of each vertex (vertices numbered from 1)
    let graph_of = |v: i64| -> anyhow::Result<usize> {
        if v < 1 || v as usize > indicator.len() {
            return Err(anyhow!("vertex {} out of range 1..={}", v, indicator.len()));
        }
        let g = indicator[(v - 1) as usize];
        if g < 1 {
            return Err(anyhow!("vertex {} has invalid graph number {}", v, g));
        }
        Ok((g - 1) as usize)
    };
    //
    let mut dicts = vec![HashMap::<Symbol, HashMap<Symbol, f64>>::new(); nb_graphs];
    let mut vlabels = vec![HashMap::<Symbol, Label>::new(); nb_graphs];
    let mut elabels = vec![HashMap::<(Symbol, Symbol), Label>::new(); nb_graphs];
    for v in 1..=indicator.len() as i64 {
        let g = graph_of(v)?;
        dicts[g].entry(Symbol::Int(v)).or_default();
        if let Some(labels) = &node_labels {
            vlabels[g].insert(Symbol::Int(v), Symbol::Int(labels[(v - 1) as usize]));
        }
    }
    for (rank, edge) in edges.iter().enumerate() {
        if edge.len() < 2 {
            return Err(anyhow!("edge line {} has less than 2 vertices", rank + 1));
        }
        let (u, v) = (edge[0], edge[1]);
        let g = graph_of(u)?;
        if graph_of(v)? != g {
            return Err(anyhow!("edge ({}, {}) joins 2 graphs", u, v));
        }
        dicts[g].entry(Symbol::Int(u)).or_default().insert(Symbol::Int(v), 1.);
        if let Some(labels) = &edge_labels {
            elabels[g].insert((Symbol::Int(u), Symbol::Int(v)), Symbol::Int(labels[rank]));
        }
    }
    //
    let mut data = Vec::<Graph>::with_capacity(nb_graphs);
    for (g, ((dict, vl), el)) in dicts.into_iter().zip(vlabels).zip(elabels).enumerate() {
        let vl = node_labels.as_ref().map(|_| vl);
        let el = edge_labels.as_ref().map(|_| el);
        let graph = Graph::new(GraphInput::WeightedDict(dict), vl, el, GraphFormat::Dictionary)
            .with_context(|| format!("building graph {} of dataset {}", g + 1, name))?;
        data.push(graph);
    }
    if let Some(target) = &target {
        if target.len() != nb_graphs {
            return Err(anyhow!("{} graph labels for {} graphs", target.len(), nb_graphs));
        }
    }
    log::info!("dataset {} : {} graphs, {} vertices, {} edges", name, nb_graphs, indicator.len(), edges.len());
    Ok(Dataset { data, target })
} // end of read_tudataset

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // 2 graphs : a triangle (vertices 1,2,3) and an edge plus an isolated vertex (4,5,6)
    fn write_toy_dataset(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("TOY_A.txt"),
            "1, 2\n2, 1\n2, 3\n3, 2\n1, 3\n3, 1\n4, 5\n5, 4\n",
        )
        .unwrap();
        fs::write(dir.join("TOY_graph_indicator.txt"), "1\n1\n1\n2\n2\n2\n").unwrap();
        fs::write(dir.join("TOY_graph_labels.txt"), "1\n-1\n").unwrap();
        fs::write(dir.join("TOY_node_labels.txt"), "0\n1\n0\n2\n2\n3\n").unwrap();
    }

    #[test]
    fn read_toy() {
        log_init_test();
        //
        let dir = std::env::temp_dir().join(format!("graphkern_toy_{}", std::process::id()));
        write_toy_dataset(&dir);
        let dataset = read_tudataset(&dir, "TOY").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.target, Some(vec![1, -1]));
        let g1 = &dataset.data[0];
        assert_eq!(g1.nv(), 3);
        assert_eq!(g1.n_edges(), 6);
        let g2 = &dataset.data[1];
        assert_eq!(g2.nv(), 3);
        assert_eq!(g2.n_edges(), 2);
        assert!(g2.get_edge_dictionary()[&Symbol::Int(6)].is_empty());
        assert_eq!(g2.index_vertex_labels().unwrap()[2], Symbol::Int(3));
        assert!(!g2.has_edge_labels());
        //
        assert!(read_tudataset(&dir, "MISSING").is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
