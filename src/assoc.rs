//! Pairwise association matrix.
//!
//! `build_matrix` turns a validated table slice into a symmetric matrix of
//! pairwise association strengths. Pure function — no I/O, no state.
//!
//! Two measures are supported: Pearson product-moment correlation and
//! Spearman rank correlation (Pearson on average ranks, for ordinal or
//! monotone-nonlinear data).

use serde::{Deserialize, Serialize};

use crate::table::TableSlice;
use crate::{Error, Result};

/// Which pairwise statistic to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationMeasure {
    Pearson,
    Spearman,
}

/// Variance below this is treated as zero (correlation undefined).
const VARIANCE_FLOOR: f64 = 1e-12;

/// A symmetric k×k matrix of pairwise association strengths.
///
/// Immutable once produced. Carries the node (column) names in slice order
/// and the number of observations the matrix was computed from, which the
/// regularized estimator needs for its information criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationMatrix {
    names: Vec<String>,
    n_obs: usize,
    /// Row-major k×k values.
    values: Vec<f64>,
}

impl AssociationMatrix {
    /// Construct from raw row-major values.
    ///
    /// Validates shape and symmetry (within 1e-9). Intended for callers that
    /// bring their own association measure; `build_matrix` is the usual path.
    pub fn from_values(names: Vec<String>, n_obs: usize, values: Vec<f64>) -> Result<Self> {
        let k = names.len();
        if values.len() != k * k {
            return Err(Error::Data(format!(
                "expected {k}×{k} = {} values, got {}",
                k * k,
                values.len()
            )));
        }
        for i in 0..k {
            for j in (i + 1)..k {
                let d = (values[i * k + j] - values[j * k + i]).abs();
                if d > 1e-9 {
                    return Err(Error::Data(format!(
                        "matrix not symmetric at ('{}', '{}'): {} vs {}",
                        names[i],
                        names[j],
                        values[i * k + j],
                        values[j * k + i]
                    )));
                }
            }
        }
        Ok(Self { names, n_obs, values })
    }

    /// Matrix dimension (number of variables).
    pub fn k(&self) -> usize {
        self.names.len()
    }

    /// Number of observations the matrix was computed from.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.k() + j]
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Compute the pairwise association matrix for a table slice.
///
/// Input constraints: at least 2 columns, at least 2 rows, all values
/// finite, no zero-variance column. Violations are `Error::Data` naming the
/// offending columns — zero variance makes correlation undefined and must be
/// reported, never silently propagated as NaN.
pub fn build_matrix(slice: &TableSlice, measure: AssociationMeasure) -> Result<AssociationMatrix> {
    let k = slice.width();
    let n = slice.height();
    if k < 2 {
        return Err(Error::Data(format!(
            "association matrix needs at least 2 columns, got {k}"
        )));
    }
    if n < 2 {
        return Err(Error::Data(format!(
            "association matrix needs at least 2 rows, got {n}"
        )));
    }

    for col in slice.columns() {
        if let Some(row) = col.values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Data(format!(
                "column '{}' has a non-finite value at row {row}",
                col.name
            )));
        }
    }

    // Materialize the series the chosen measure correlates over.
    let series: Vec<Vec<f64>> = match measure {
        AssociationMeasure::Pearson => {
            slice.columns().iter().map(|c| c.values.clone()).collect()
        }
        AssociationMeasure::Spearman => {
            slice.columns().iter().map(|c| average_ranks(&c.values)).collect()
        }
    };

    let degenerate: Vec<&str> = slice
        .columns()
        .iter()
        .zip(&series)
        .filter(|(_, s)| variance(s) < VARIANCE_FLOOR)
        .map(|(c, _)| c.name.as_str())
        .collect();
    if !degenerate.is_empty() {
        return Err(Error::Data(format!(
            "zero-variance column(s) {:?}: correlation is undefined",
            degenerate
        )));
    }

    let mut values = vec![0.0; k * k];
    for i in 0..k {
        values[i * k + i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&series[i], &series[j]);
            values[i * k + j] = r;
            values[j * k + i] = r;
        }
    }

    tracing::debug!(k, n, ?measure, "association matrix built");
    AssociationMatrix::from_values(
        slice.column_names().map(String::from).collect(),
        n,
        values,
    )
}

fn variance(xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

/// Pearson product-moment correlation of two equal-length series.
fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    // Zero-variance columns are rejected upstream; the clamp only guards
    // floating-point overshoot.
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Ranks 1..=n with ties receiving the average of their rank range.
fn average_ranks(xs: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..xs.len()).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let mut ranks = vec![0.0; xs.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && xs[order[j + 1]] == xs[order[i]] {
            j += 1;
        }
        // Positions i..=j hold tied values; average their 1-based ranks.
        let avg = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn slice(cols: Vec<(&str, Vec<f64>)>) -> TableSlice {
        TableSlice::new(
            cols.into_iter()
                .map(|(n, v)| Column::new(n, v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_perfect_linear_correlation() {
        let s = slice(vec![
            ("a", vec![1.0, 2.0, 3.0, 4.0]),
            ("b", vec![3.0, 5.0, 7.0, 9.0]),
        ]);
        let m = build_matrix(&s, AssociationMeasure::Pearson).unwrap();
        assert!((m.get(0, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_anticorrelation() {
        let s = slice(vec![
            ("a", vec![1.0, 2.0, 3.0]),
            ("b", vec![6.0, 4.0, 2.0]),
        ]);
        let m = build_matrix(&s, AssociationMeasure::Pearson).unwrap();
        assert!((m.get(0, 1) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_diagonal_and_symmetry() {
        let s = slice(vec![
            ("a", vec![1.0, 5.0, 2.0, 8.0]),
            ("b", vec![3.0, 1.0, 4.0, 1.0]),
            ("c", vec![2.0, 2.0, 9.0, 4.0]),
        ]);
        let m = build_matrix(&s, AssociationMeasure::Pearson).unwrap();
        for i in 0..3 {
            assert!((m.get(i, i) - 1.0).abs() < 1e-9);
            for j in 0..3 {
                assert!((m.get(i, j) - m.get(j, i)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_variance_rejected_by_name() {
        let s = slice(vec![
            ("flat", vec![5.0, 5.0, 5.0]),
            ("b", vec![1.0, 2.0, 3.0]),
        ]);
        let err = build_matrix(&s, AssociationMeasure::Pearson).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
        assert!(err.to_string().contains("flat"));
    }

    #[test]
    fn test_too_few_columns() {
        let s = slice(vec![("a", vec![1.0, 2.0])]);
        let err = build_matrix(&s, AssociationMeasure::Pearson).unwrap_err();
        assert!(err.to_string().contains("2 columns"));
    }

    #[test]
    fn test_too_few_rows() {
        let s = slice(vec![("a", vec![1.0]), ("b", vec![2.0])]);
        let err = build_matrix(&s, AssociationMeasure::Pearson).unwrap_err();
        assert!(err.to_string().contains("2 rows"));
    }

    #[test]
    fn test_non_finite_rejected() {
        let s = slice(vec![
            ("a", vec![1.0, f64::NAN, 3.0]),
            ("b", vec![1.0, 2.0, 3.0]),
        ]);
        let err = build_matrix(&s, AssociationMeasure::Pearson).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_spearman_invariant_under_monotone_transform() {
        let a: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let cubed: Vec<f64> = a.iter().map(|x| x.powi(3)).collect();
        let s = slice(vec![("a", a), ("a3", cubed)]);
        let m = build_matrix(&s, AssociationMeasure::Spearman).unwrap();
        assert!((m.get(0, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_ranks_with_ties() {
        assert_eq!(
            average_ranks(&[10.0, 20.0, 20.0, 30.0]),
            vec![1.0, 2.5, 2.5, 4.0]
        );
    }

    proptest! {
        #[test]
        fn prop_symmetric_unit_diagonal(
            rows in proptest::collection::vec(
                (0.0f64..100.0, 0.0f64..100.0, 0.0f64..100.0),
                3..20,
            )
        ) {
            let (mut a, mut b, mut c) = (vec![], vec![], vec![]);
            for (x, y, z) in rows {
                a.push(x);
                b.push(y);
                c.push(z);
            }
            let s = TableSlice::new(vec![
                Column::new("a", a),
                Column::new("b", b),
                Column::new("c", c),
            ]).unwrap();
            // Random columns can still collapse to zero variance; only the
            // successful builds carry the invariant.
            if let Ok(m) = build_matrix(&s, AssociationMeasure::Pearson) {
                for i in 0..3 {
                    prop_assert!((m.get(i, i) - 1.0).abs() < 1e-9);
                    for j in 0..3 {
                        prop_assert!((m.get(i, j) - m.get(j, i)).abs() < 1e-9);
                        prop_assert!(m.get(i, j).abs() <= 1.0 + 1e-9);
                    }
                }
            }
        }
    }
}
