//! # Edge estimation
//!
//! Strategies that turn an association matrix into a sparse weighted edge
//! set. Two interchangeable estimators:
//!
//! | Estimator | Module | Selection rule |
//! |-----------|--------|----------------|
//! | Threshold | `threshold` | `\|m[i,j]\| > cutoff`, strict |
//! | Regularized | `glasso` | graphical lasso + EBIC model selection |
//!
//! Estimation never fails the pipeline: an estimator that cannot converge
//! reports an empty edge set with a [`ConvergenceWarning`] attached.

pub mod glasso;
pub mod threshold;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assoc::AssociationMatrix;

pub use glasso::RegularizedEstimator;
pub use threshold::ThresholdEstimator;

/// An undirected weighted edge between two node indices.
///
/// Endpoints are kept in canonical order (`a < b`) so an unordered pair has
/// a single representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

impl Edge {
    /// Build an edge, normalizing endpoint order. Self-loops are not
    /// representable here; `Graph::assemble` still rejects them defensively.
    pub fn new(i: usize, j: usize, weight: f64) -> Self {
        if i <= j {
            Self { a: i, b: j, weight }
        } else {
            Self { a: j, b: i, weight }
        }
    }
}

/// Estimation outcome: the selected edges plus an optional warning.
///
/// Weights are exactly the matrix entries used for inclusion (threshold) or
/// the fitted partial correlations (regularized) — nothing downstream
/// transforms them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSet {
    pub edges: Vec<Edge>,
    pub warning: Option<ConvergenceWarning>,
}

impl EdgeSet {
    pub fn converged(edges: Vec<Edge>) -> Self {
        Self { edges, warning: None }
    }

    pub fn failed(warning: ConvergenceWarning) -> Self {
        Self { edges: Vec::new(), warning: Some(warning) }
    }
}

/// Non-fatal estimation failure, surfaced alongside the (empty) result
/// rather than raised. Carries the estimator parameters and matrix
/// dimensions so the failure can be reproduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    pub reason: String,
    pub k: usize,
    pub n_obs: usize,
    pub gamma: f64,
    pub tuning_ratio: f64,
}

/// Strategy interface: association matrix in, weighted edge set out.
pub trait EdgeEstimator {
    fn estimate(&self, matrix: &AssociationMatrix) -> EdgeSet;
}

/// Estimator selection plus its parameters, as carried by the pipeline
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorConfig {
    Threshold {
        cutoff: f64,
    },
    Regularized {
        /// Scale on the penalty path; 1.0 uses the data-driven maximum.
        #[serde(default = "default_sparsity_penalty")]
        sparsity_penalty: f64,
        gamma: f64,
        tuning_ratio: f64,
        refit: bool,
        /// Upper bound on estimation wall time, in milliseconds. Expiry
        /// degrades to an empty edge set with a warning.
        #[serde(default)]
        deadline_ms: Option<u64>,
    },
}

fn default_sparsity_penalty() -> f64 {
    1.0
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::Threshold { cutoff: threshold::DEFAULT_CUTOFF }
    }
}

impl EstimatorConfig {
    /// Instantiate the configured strategy.
    pub fn build(&self) -> Box<dyn EdgeEstimator> {
        match *self {
            Self::Threshold { cutoff } => Box::new(ThresholdEstimator::new(cutoff)),
            Self::Regularized { sparsity_penalty, gamma, tuning_ratio, refit, deadline_ms } => {
                Box::new(RegularizedEstimator {
                    sparsity_penalty,
                    gamma,
                    tuning_ratio,
                    refit,
                    deadline: deadline_ms.map(Duration::from_millis),
                })
            }
        }
    }
}
