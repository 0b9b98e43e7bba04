//! # netviz — Association Networks from Numeric Tables
//!
//! Turns a rectangular numeric dataset into a sparse relational graph ready
//! for visual inspection: pairwise associations, sparsified edges, a spring
//! layout, and per-node importance scores.
//!
//! ## Design Principles
//!
//! 1. **Strategy-first**: `EdgeEstimator` is the contract between the
//!    association matrix and the graph
//! 2. **Clean artifacts**: `Graph`, `Layout`, `Annotation` cross all
//!    boundaries; rendering is the caller's concern
//! 3. **Pure stages**: every stage is a transformation with no shared state;
//!    nothing is mutated after its producing stage completes
//! 4. **Loud failures**: bad data and broken invariants are typed errors,
//!    never a NaN smuggled downstream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netviz::{Pipeline, PipelineConfig, TableSlice, Column};
//!
//! # fn example() -> netviz::Result<()> {
//! let table = TableSlice::new(vec![
//!     Column::new("anxiety", vec![2.0, 4.0, 1.0, 3.0]),
//!     Column::new("mood", vec![3.5, 2.5, 4.0, 3.0]),
//!     Column::new("sleep", vec![7.1, 6.0, 8.2, 7.5]),
//! ])?;
//!
//! let network = Pipeline::new(PipelineConfig::default())
//!     .run(&table, &["anxiety", "mood", "sleep"])?;
//!
//! for (node, point) in network.layout.iter() {
//!     println!("{node}: ({:.2}, {:.2})", point.x, point.y);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Estimators
//!
//! | Estimator | Config | Description |
//! |-----------|--------|-------------|
//! | Threshold | `EstimatorConfig::Threshold` | keep `\|r\| > cutoff` |
//! | Regularized | `EstimatorConfig::Regularized` | graphical lasso + EBIC |

// ============================================================================
// Modules
// ============================================================================

pub mod annotate;
pub mod assoc;
pub mod estimator;
pub mod export;
pub mod graph;
pub mod layout;
pub mod table;

#[cfg(feature = "csv")]
pub mod loader;

// ============================================================================
// Re-exports: Data model
// ============================================================================

pub use annotate::{Annotation, DegreeMode};
pub use assoc::{AssociationMatrix, AssociationMeasure};
pub use graph::Graph;
pub use layout::{Layout, Point};
pub use table::{Column, TableSlice};

// ============================================================================
// Re-exports: Estimation
// ============================================================================

pub use estimator::{
    ConvergenceWarning, Edge, EdgeEstimator, EdgeSet, EstimatorConfig,
    RegularizedEstimator, ThresholdEstimator,
};

// ============================================================================
// Configuration
// ============================================================================

use serde::{Deserialize, Serialize};

/// All recognized pipeline options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which pairwise statistic to compute.
    pub measure: AssociationMeasure,
    /// Edge-selection strategy and its parameters.
    pub estimator: EstimatorConfig,
    /// When the regularized estimator fails to converge, re-estimate with a
    /// threshold strategy at this cutoff instead of returning an empty
    /// graph. `None` keeps the degraded (empty) edge set.
    pub fallback_to_threshold: Option<f64>,
    /// Spring-relaxation iterations.
    pub layout_iterations: usize,
    /// Seed for the initial placement. `None` means entropy-seeded and the
    /// layout is not reproducible.
    pub layout_seed: Option<u64>,
    /// Plain or weighted degree annotation.
    pub degree_mode: DegreeMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            measure: AssociationMeasure::Pearson,
            estimator: EstimatorConfig::default(),
            fallback_to_threshold: None,
            layout_iterations: 50,
            layout_seed: None,
            degree_mode: DegreeMode::Plain,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The annotated, positioned graph — everything a render adapter needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub graph: Graph,
    pub layout: Layout,
    pub annotation: Annotation,
    /// Set when the regularized estimator failed to converge and the result
    /// degraded (empty edges or threshold fallback).
    pub warning: Option<ConvergenceWarning>,
}

/// The primary entry point: a configured run of the pipeline stages.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run table slice → association matrix → edges → graph → layout →
    /// annotation for the selected columns.
    ///
    /// Fails with `Error::Data` before any matrix computation when fewer
    /// than 2 columns are selected. Estimator non-convergence is not an
    /// error; it surfaces as `Network::warning`.
    pub fn run(&self, table: &TableSlice, selected_columns: &[&str]) -> Result<Network> {
        if selected_columns.len() < 2 {
            return Err(Error::Data(format!(
                "need at least 2 selected columns, got {}",
                selected_columns.len()
            )));
        }

        // Phase 1: Project the selection
        let slice = table.select(selected_columns)?;

        // Phase 2: Association matrix
        let matrix = assoc::build_matrix(&slice, self.config.measure)?;

        // Phase 3: Edge estimation (never fatal; degrades with a warning)
        let mut estimate = self.config.estimator.build().estimate(&matrix);
        if estimate.warning.is_some() {
            if let Some(cutoff) = self.config.fallback_to_threshold {
                tracing::warn!(cutoff, "estimation did not converge, falling back to threshold");
                let fallback = ThresholdEstimator::new(cutoff).estimate(&matrix);
                estimate.edges = fallback.edges;
            }
        }

        // Phase 4: Graph assembly
        let graph = Graph::assemble(matrix.names().to_vec(), estimate.edges)?;

        // Phase 5: Layout
        let layout =
            layout::layout(&graph, self.config.layout_iterations, self.config.layout_seed)?;

        // Phase 6: Annotation
        let annotation = annotate::annotate(&graph, self.config.degree_mode);

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            degraded = estimate.warning.is_some(),
            "pipeline complete"
        );
        Ok(Network { graph, layout, annotation, warning: estimate.warning })
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input data: too few columns or rows, zero-variance or
    /// non-finite columns, unknown column names. Caller-visible, not
    /// retried.
    #[error("data error: {0}")]
    Data(String),

    /// Structural invariant violation (duplicate edge, self-loop, unknown
    /// node). Indicates a bug upstream of `Graph::assemble`, not bad user
    /// input.
    #[error("graph invariant violated: {0}")]
    Graph(String),

    /// Layout produced non-finite coordinates even after a perturbed retry.
    #[error("layout error: {0}")]
    Layout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
