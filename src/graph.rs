//! Graph assembly and invariants.
//!
//! `Graph::assemble` is the checkpoint between edge estimation and the rest
//! of the pipeline: a duplicate pair, self-loop, or unknown endpoint here is
//! an upstream bug and fails loudly with `Error::Graph` instead of being
//! silently repaired.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::estimator::Edge;
use crate::{Error, Result};

/// An undirected weighted graph over named nodes.
///
/// Node identifiers are the selected column names, in selection order.
/// Construction is deterministic: the same node ordering and edge set
/// always produce an identical structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<String>,
    edges: Vec<Edge>,
    /// node index → indices into `edges`.
    adjacency: Vec<SmallVec<[usize; 4]>>,
}

impl Graph {
    /// Assemble a graph, enforcing the structural invariants.
    ///
    /// Rejects with `Error::Graph`: an edge endpoint outside the node list,
    /// a self-loop, or a duplicate unordered pair.
    pub fn assemble(nodes: Vec<String>, edges: Vec<Edge>) -> Result<Self> {
        let k = nodes.len();
        let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(edges.len());
        let mut adjacency: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); k];

        for (idx, edge) in edges.iter().enumerate() {
            if edge.a >= k || edge.b >= k {
                return Err(Error::Graph(format!(
                    "edge ({}, {}) references an unknown node (graph has {k} nodes)",
                    edge.a, edge.b
                )));
            }
            if edge.a == edge.b {
                return Err(Error::Graph(format!(
                    "self-loop on node '{}'",
                    nodes[edge.a]
                )));
            }
            if !seen.insert((edge.a, edge.b)) {
                return Err(Error::Graph(format!(
                    "duplicate edge ('{}', '{}')",
                    nodes[edge.a], nodes[edge.b]
                )));
            }
            adjacency[edge.a].push(idx);
            adjacency[edge.b].push(idx);
        }

        Ok(Self { nodes, edges, adjacency })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node identifiers in their stable order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_name(&self, i: usize) -> &str {
        &self.nodes[i]
    }

    /// Number of incident edges.
    pub fn degree(&self, i: usize) -> usize {
        self.adjacency[i].len()
    }

    /// Edges incident to node `i`.
    pub fn incident(&self, i: usize) -> impl Iterator<Item = &Edge> {
        self.adjacency[i].iter().map(|&e| &self.edges[e])
    }

    /// Neighbor indices of node `i`.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.incident(i)
            .map(move |e| if e.a == i { e.b } else { e.a })
    }

    /// Connected components as sorted lists of node indices, ordered by
    /// their smallest member. Isolated nodes form singleton components.
    pub(crate) fn components(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.node_count()];
        let mut components = Vec::new();
        for start in 0..self.node_count() {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(node) = stack.pop() {
                component.push(node);
                for next in self.neighbors(node) {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Map from node name to index, for callers resolving names.
    pub fn node_index(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assemble_and_degree() {
        let g = Graph::assemble(
            names(&["a", "b", "c", "d"]),
            vec![Edge::new(0, 1, 0.5), Edge::new(1, 2, -0.3)],
        )
        .unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.degree(1), 2);
        assert_eq!(g.degree(3), 0);
        let n: Vec<usize> = g.neighbors(1).collect();
        assert_eq!(n, vec![0, 2]);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let err = Graph::assemble(names(&["a", "b"]), vec![Edge::new(0, 5, 0.4)]).unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
        assert!(err.to_string().contains("unknown node"));
    }

    #[test]
    fn test_self_loop_rejected() {
        let err = Graph::assemble(
            names(&["a", "b"]),
            vec![Edge { a: 1, b: 1, weight: 0.4 }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
        assert!(err.to_string().contains("self-loop"));
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let err = Graph::assemble(
            names(&["a", "b"]),
            vec![Edge::new(0, 1, 0.4), Edge::new(1, 0, 0.9)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_components() {
        let g = Graph::assemble(
            names(&["a", "b", "c", "d", "e"]),
            vec![Edge::new(0, 1, 1.0), Edge::new(3, 4, 1.0)],
        )
        .unwrap();
        assert_eq!(g.components(), vec![vec![0, 1], vec![2], vec![3, 4]]);
    }

    #[test]
    fn test_deterministic_assembly() {
        let edges = vec![Edge::new(0, 2, 0.7), Edge::new(1, 2, 0.3)];
        let g1 = Graph::assemble(names(&["x", "y", "z"]), edges.clone()).unwrap();
        let g2 = Graph::assemble(names(&["x", "y", "z"]), edges).unwrap();
        assert_eq!(g1, g2);
    }
}
