//! Force-directed (spring) layout.
//!
//! Fruchterman–Reingold relaxation: every node pair repels with force
//! `k²/d`, connected pairs attract with `d²/k`, displacement is capped by a
//! linearly cooling temperature. Connected components are laid out
//! independently and then shelf-packed left to right with padding, so the
//! bounding regions of two components never coincide — a zero-edge graph
//! degenerates to a row of singletons and still lays out fine.
//!
//! Coordinates have no absolute reference frame; only relative positions
//! are meaningful.

use hashbrown::HashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::estimator::Edge;
use crate::graph::Graph;
use crate::{Error, Result};

/// Horizontal padding between packed components.
const COMPONENT_GAP: f64 = 1.0;

/// Early-stop threshold on the largest per-iteration displacement.
const SETTLE_TOL: f64 = 1e-4;

/// A finite 2-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Node identifier → coordinate, one entry per graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    positions: HashMap<String, Point>,
}

impl Layout {
    pub fn get(&self, node: &str) -> Option<Point> {
        self.positions.get(node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> {
        self.positions.iter().map(|(n, p)| (n.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Compute a layout for every node of the graph.
///
/// An explicit `seed` makes the result bit-identical across runs; with
/// `None` the initial placement is seeded from entropy and the layout is
/// non-deterministic. Non-finite coordinates (a relaxation blow-up) are
/// retried once with a perturbed seed before surfacing `Error::Layout`.
pub fn layout(graph: &Graph, iterations: usize, seed: Option<u64>) -> Result<Layout> {
    let seed_value = seed.unwrap_or_else(rand::random::<u64>);

    let points = match relax(graph, iterations, seed_value) {
        Some(points) => points,
        None => {
            let retry_seed = seed_value ^ 0x9e37_79b9_7f4a_7c15;
            tracing::warn!(seed = seed_value, retry_seed, "non-finite layout, retrying");
            relax(graph, iterations, retry_seed).ok_or_else(|| {
                Error::Layout(format!(
                    "non-finite coordinates after retry \
                     (nodes: {}, edges: {}, iterations: {iterations}, seed: {seed_value})",
                    graph.node_count(),
                    graph.edge_count(),
                ))
            })?
        }
    };

    let positions = graph
        .nodes()
        .iter()
        .zip(points)
        .map(|(name, (x, y))| (name.clone(), Point { x, y }))
        .collect();
    Ok(Layout { positions })
}

/// One relaxation attempt. `None` if any coordinate came out non-finite.
fn relax(graph: &Graph, iterations: usize, seed: u64) -> Option<Vec<(f64, f64)>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = vec![(0.0, 0.0); graph.node_count()];
    let mut cursor_x = 0.0;

    for component in graph.components() {
        let local = relax_component(graph, &component, iterations, &mut rng);

        // Normalize the component to its bounding box origin, then shelf it.
        let min_x = local.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let min_y = local.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_x = local.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);

        for (&node, &(x, y)) in component.iter().zip(&local) {
            points[node] = (x - min_x + cursor_x, y - min_y);
        }
        cursor_x += (max_x - min_x) + COMPONENT_GAP;
    }

    points
        .iter()
        .all(|p| p.0.is_finite() && p.1.is_finite())
        .then_some(points)
}

/// Fruchterman–Reingold on a single connected component.
fn relax_component(
    graph: &Graph,
    component: &[usize],
    iterations: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<(f64, f64)> {
    let m = component.len();
    if m == 1 {
        return vec![(0.0, 0.0)];
    }

    let local_index: HashMap<usize, usize> =
        component.iter().enumerate().map(|(l, &g)| (g, l)).collect();
    let edges: Vec<&Edge> = graph
        .edges()
        .iter()
        .filter(|e| local_index.contains_key(&e.a))
        .collect();

    // Unit area per node; the ideal spring length k comes out as 1.
    let side = (m as f64).sqrt();
    let k = 1.0f64;

    let mut pos: Vec<(f64, f64)> = (0..m)
        .map(|_| (rng.gen_range(0.0..side), rng.gen_range(0.0..side)))
        .collect();
    let mut disp = vec![(0.0, 0.0); m];

    for it in 0..iterations {
        let temp = side * 0.1 * (1.0 - it as f64 / iterations as f64);
        disp.iter_mut().for_each(|d| *d = (0.0, 0.0));

        // Repulsion between all pairs.
        for i in 0..m {
            for j in (i + 1)..m {
                let (dx, dy) = separation(pos[i], pos[j], rng);
                let d = (dx * dx + dy * dy).sqrt();
                let f = k * k / d;
                disp[i].0 += dx / d * f;
                disp[i].1 += dy / d * f;
                disp[j].0 -= dx / d * f;
                disp[j].1 -= dy / d * f;
            }
        }

        // Attraction along edges.
        for edge in &edges {
            let i = local_index[&edge.a];
            let j = local_index[&edge.b];
            let (dx, dy) = separation(pos[i], pos[j], rng);
            let d = (dx * dx + dy * dy).sqrt();
            let f = d * d / k;
            disp[i].0 -= dx / d * f;
            disp[i].1 -= dy / d * f;
            disp[j].0 += dx / d * f;
            disp[j].1 += dy / d * f;
        }

        // Move, capped by temperature.
        let mut max_step = 0.0f64;
        for i in 0..m {
            let (dx, dy) = disp[i];
            let len = (dx * dx + dy * dy).sqrt();
            if len > 0.0 {
                let step = len.min(temp);
                pos[i].0 += dx / len * step;
                pos[i].1 += dy / len * step;
                max_step = max_step.max(step);
            }
        }
        if max_step < SETTLE_TOL {
            break;
        }
    }

    pos
}

/// Vector from `b` to `a`, jittered when the nodes coincide so force
/// directions stay defined.
fn separation(a: (f64, f64), b: (f64, f64), rng: &mut ChaCha8Rng) -> (f64, f64) {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    if dx * dx + dy * dy < 1e-18 {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        (1e-6 * angle.cos(), 1e-6 * angle.sin())
    } else {
        (dx, dy)
    }
}
