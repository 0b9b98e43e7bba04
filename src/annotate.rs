//! Per-node structural annotations for display encoding.
//!
//! Degree (plain or weighted) per node, used by render adapters for e.g. a
//! color scale. Isolated nodes score 0.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Whether degree counts edges or sums their absolute weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeMode {
    #[default]
    Plain,
    /// Sum of `|weight|` over incident edges.
    Weighted,
}

/// Node identifier → non-negative score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    scores: HashMap<String, f64>,
}

impl Annotation {
    pub fn get(&self, node: &str) -> Option<f64> {
        self.scores.get(node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(n, s)| (n.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Score every node of the graph.
pub fn annotate(graph: &Graph, mode: DegreeMode) -> Annotation {
    let scores = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let score = match mode {
                DegreeMode::Plain => graph.degree(i) as f64,
                DegreeMode::Weighted => graph.incident(i).map(|e| e.weight.abs()).sum(),
            };
            (name.clone(), score)
        })
        .collect();
    Annotation { scores }
}
