//! Fixed-cutoff edge estimator.

use super::{Edge, EdgeEstimator, EdgeSet};
use crate::assoc::AssociationMatrix;

/// Default absolute-correlation cutoff.
///
/// Acceptable sparsity is domain-dependent (values in the 0.2–0.29 range
/// are all in common use), so treat this as a starting point, not an
/// authority.
pub const DEFAULT_CUTOFF: f64 = 0.2;

/// Includes edge `(i, j)` iff `|matrix[i, j]| > cutoff`.
///
/// The inequality is strict: entries exactly equal to the cutoff are
/// excluded, deterministically and independent of iteration order. Edge
/// weights are the raw matrix entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEstimator {
    pub cutoff: f64,
}

impl ThresholdEstimator {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }
}

impl Default for ThresholdEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

impl EdgeEstimator for ThresholdEstimator {
    fn estimate(&self, matrix: &AssociationMatrix) -> EdgeSet {
        let k = matrix.k();
        let mut edges = Vec::new();
        for i in 0..k {
            for j in (i + 1)..k {
                let w = matrix.get(i, j);
                if w.abs() > self.cutoff {
                    edges.push(Edge::new(i, j, w));
                }
            }
        }
        tracing::debug!(cutoff = self.cutoff, edges = edges.len(), "threshold estimate");
        EdgeSet::converged(edges)
    }
}
