//! Render-adapter export — serialize a network for external drawing tools.
//!
//! The core returns the (graph, layout, annotation) triple in memory; these
//! sinks flatten it into formats a render adapter can consume directly:
//!
//! ```text
//! netviz Network → export_json() → {nodes: [...], edges: [...]}
//!                → export_dot()  → Graphviz source with pinned positions
//! ```

use std::io::Write;

use serde::Serialize;

use crate::estimator::ConvergenceWarning;
use crate::layout::Point;
use crate::{Network, Result};

#[derive(Serialize)]
struct JsonNode<'a> {
    id: &'a str,
    x: f64,
    y: f64,
    score: f64,
}

#[derive(Serialize)]
struct JsonEdge<'a> {
    source: &'a str,
    target: &'a str,
    weight: f64,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    nodes: Vec<JsonNode<'a>>,
    edges: Vec<JsonEdge<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'a ConvergenceWarning>,
}

/// Export a network as a flat JSON document.
///
/// One entry per node with its position and annotation score, one entry per
/// edge with endpoint names and weight.
pub fn export_json(network: &Network, writer: &mut dyn Write) -> Result<()> {
    let doc = JsonDocument {
        nodes: network
            .graph
            .nodes()
            .iter()
            .map(|name| {
                // Layout and annotation cover every graph node by invariant.
                let p = network.layout.get(name).unwrap_or(Point { x: 0.0, y: 0.0 });
                JsonNode {
                    id: name,
                    x: p.x,
                    y: p.y,
                    score: network.annotation.get(name).unwrap_or(0.0),
                }
            })
            .collect(),
        edges: network
            .graph
            .edges()
            .iter()
            .map(|e| JsonEdge {
                source: network.graph.node_name(e.a),
                target: network.graph.node_name(e.b),
                weight: e.weight,
            })
            .collect(),
        warning: network.warning.as_ref(),
    };
    serde_json::to_writer_pretty(&mut *writer, &doc).map_err(std::io::Error::from)?;
    writeln!(writer)?;
    Ok(())
}

/// Export a network as Graphviz DOT with pinned node positions.
pub fn export_dot(network: &Network, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "graph network {{")?;
    writeln!(writer, "  node [shape=circle];")?;

    for name in network.graph.nodes() {
        let p = network.layout.get(name).unwrap_or(Point { x: 0.0, y: 0.0 });
        let score = network.annotation.get(name).unwrap_or(0.0);
        writeln!(
            writer,
            "  {} [pos=\"{:.4},{:.4}!\", score={score}];",
            dot_id(name),
            p.x,
            p.y,
        )?;
    }
    for e in network.graph.edges() {
        writeln!(
            writer,
            "  {} -- {} [weight={:.4}];",
            dot_id(network.graph.node_name(e.a)),
            dot_id(network.graph.node_name(e.b)),
            e.weight,
        )?;
    }
    writeln!(writer, "}}")?;
    Ok(())
}

/// Quote an identifier for DOT, escaping embedded quotes.
fn dot_id(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}
