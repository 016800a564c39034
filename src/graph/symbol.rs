//! Vertex symbols and labels.
//!
//! A vertex is identified by a [Symbol], an integer or a string. Labels are symbols too.
//! Integer symbols and string symbols are not comparable between each other, so a graph
//! must not mix them for its vertices (it is checked at graph construction).
//! Labels can mix both kinds, they are only hashed and compared for equality.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Symbol {
    Int(i64),
    Str(String),
}

/// Labels attached to vertices or edges.
pub type Label = Symbol;

impl Symbol {
    pub fn is_int(&self) -> bool {
        matches!(self, Symbol::Int(_))
    }

    /// returns the integer value if symbol is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Symbol::Int(i) => Some(*i),
            Symbol::Str(_) => None,
        }
    }
} // end of impl Symbol

impl Default for Symbol {
    fn default() -> Self {
        Symbol::Int(0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Int(i) => write!(f, "{}", i),
            Symbol::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Symbol {
    fn from(i: i64) -> Self {
        Symbol::Int(i)
    }
}

impl From<i32> for Symbol {
    fn from(i: i32) -> Self {
        Symbol::Int(i as i64)
    }
}

impl From<u32> for Symbol {
    fn from(i: u32) -> Self {
        Symbol::Int(i as i64)
    }
}

impl From<usize> for Symbol {
    fn from(i: usize) -> Self {
        Symbol::Int(i as i64)
    }
}

impl From<u64> for Symbol {
    fn from(i: u64) -> Self {
        Symbol::Int(i as i64)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::Str(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::Str(s)
    }
}

/// builds a vertex label map from (vertex, label) couples.
///
/// `make_labels([(0, "O"), (1, "H"), (2, "H")])`
pub fn make_labels<V, L, I>(pairs: I) -> HashMap<Symbol, Label>
where
    V: Into<Symbol>,
    L: Into<Label>,
    I: IntoIterator<Item = (V, L)>,
{
    pairs
        .into_iter()
        .map(|(v, l)| (v.into(), l.into()))
        .collect()
}

/// builds an edge label map from (source, target, label) triplets.
pub fn make_edge_labels<V, L, I>(triplets: I) -> HashMap<(Symbol, Symbol), Label>
where
    V: Into<Symbol>,
    L: Into<Label>,
    I: IntoIterator<Item = (V, V, L)>,
{
    triplets
        .into_iter()
        .map(|(u, v, l)| ((u.into(), v.into()), l.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_order_inside_kind() {
        assert!(Symbol::from(2) < Symbol::from(10));
        assert!(Symbol::from("a") < Symbol::from("b"));
        assert_eq!(Symbol::from(3usize).as_int(), Some(3));
        assert_eq!(Symbol::from("x").as_int(), None);
    }

    #[test]
    fn labels_from_pairs() {
        let labels = make_labels([(0, "O"), (1, "H"), (2, "H")]);
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[&Symbol::Int(1)], Symbol::from("H"));
        //
        let elabels = make_edge_labels([(0, 1, 7), (1, 0, 7)]);
        assert_eq!(elabels[&(Symbol::Int(1), Symbol::Int(0))], Symbol::Int(7));
    }
} // end of mod tests
