//! Table slice — the numeric input to the pipeline.
//!
//! A `TableSlice` is an ordered sequence of named numeric columns of equal
//! length. It is the only data the core ever sees: file parsing, previews,
//! and column pickers live with the caller.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single named numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self { name: name.into(), values }
    }
}

/// An ordered collection of equal-length numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSlice {
    columns: Vec<Column>,
}

impl TableSlice {
    /// Build a slice from columns, validating shape.
    ///
    /// All columns must have the same length and distinct names. Content
    /// checks (finiteness, variance) happen later, when the association
    /// matrix is built.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let n = first.values.len();
            for col in &columns {
                if col.values.len() != n {
                    return Err(Error::Data(format!(
                        "column '{}' has {} rows but column '{}' has {}",
                        col.name,
                        col.values.len(),
                        first.name,
                        n,
                    )));
                }
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::Data(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Project the named columns into a new slice, preserving request order.
    pub fn select(&self, names: &[&str]) -> Result<TableSlice> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let col = self
                .columns
                .iter()
                .find(|c| c.name == *name)
                .ok_or_else(|| Error::Data(format!("unknown column '{name}'")))?;
            selected.push(col.clone());
        }
        TableSlice::new(selected)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (0 for an empty slice).
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }
}
