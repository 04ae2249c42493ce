//! Correlation analysis.
//!
//! Builds one correlation matrix per enabled method, each paired with a
//! same-shape p-value matrix, and optionally the variance inflation factor
//! of every column.
//!
//! Each pair is evaluated on the rows where both columns are valid. A pair
//! the method cannot evaluate (fewer than 3 shared rows, zero variance) is
//! reported as `None`, which serializes as JSON `null`.
//!
//! # Example
//!
//! ```
//! use u_eda::backend::NumflowBackend;
//! use u_eda::config::AnalysisOptions;
//! use u_eda::correlation::analyze_correlations;
//! use u_eda::dataframe::DataFrame;
//!
//! let df = DataFrame::from_numeric(vec![
//!     ("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
//!     ("y", vec![Some(2.1), Some(3.9), Some(6.2), Some(7.8), Some(10.1)]),
//! ]).unwrap();
//! let cols = vec!["x".to_string(), "y".to_string()];
//! let result = analyze_correlations(&NumflowBackend, &df, &cols, &AnalysisOptions::default()).unwrap();
//!
//! let pearson = result.pearson.unwrap();
//! assert!(pearson.matrix[0][1].unwrap() > 0.99);
//! assert!(result.kendall.is_none());
//! ```

use crate::backend::{CorrelationMethod, StatsBackend};
use crate::config::{AnalysisOptions, OrderedMap};
use crate::dataframe::{Column, DataFrame};
use crate::error::EdaError;
use serde::Serialize;

/// Reported in place of an infinite VIF (perfect multicollinearity).
pub const VIF_INFINITE_SENTINEL: f64 = 999.0;

/// VIF above which a column is flagged as collinear.
pub const VIF_HIGH_THRESHOLD: f64 = 10.0;

// ── Result Types ────────────────────────────────────────────────────

/// Correlation and p-value matrices for one method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// `matrix[i][j]` correlates `labels[i]` with `labels[j]`.
    pub matrix: Vec<Vec<Option<f64>>>,
    pub pvalues: Vec<Vec<Option<f64>>>,
    pub labels: Vec<String>,
}

impl CorrelationMatrix {
    /// Correlation between two labelled columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.matrix[i][j]
    }
}

/// All correlation outputs. Disabled methods are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationResults {
    pub pearson: Option<CorrelationMatrix>,
    pub spearman: Option<CorrelationMatrix>,
    pub kendall: Option<CorrelationMatrix>,
    /// Column → VIF; `None` entries could not be computed.
    pub vif: Option<OrderedMap<Option<f64>>>,
}

impl CorrelationResults {
    /// Matrices of the enabled methods, in reporting order.
    pub fn matrices(&self) -> impl Iterator<Item = (CorrelationMethod, &CorrelationMatrix)> {
        [
            (CorrelationMethod::Pearson, self.pearson.as_ref()),
            (CorrelationMethod::Spearman, self.spearman.as_ref()),
            (CorrelationMethod::Kendall, self.kendall.as_ref()),
        ]
        .into_iter()
        .filter_map(|(m, c)| c.map(|c| (m, c)))
    }
}

// ── Matrices ────────────────────────────────────────────────────────

/// Values of two columns restricted to rows where both are valid.
fn pairwise_complete(a: &Column, b: &Column) -> (Vec<f64>, Vec<f64>) {
    (0..a.len())
        .filter_map(|i| Some((a.numeric_at(i)?, b.numeric_at(i)?)))
        .unzip()
}

/// Computes the correlation and p-value matrix of `columns` for `method`.
///
/// Diagonal entries are 1.0 with p-value 0.0.
pub fn correlation_matrix<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    columns: &[String],
    method: CorrelationMethod,
) -> Result<CorrelationMatrix, EdaError> {
    let cols = columns
        .iter()
        .map(|name| df.numeric_column(name))
        .collect::<Result<Vec<_>, _>>()?;
    let k = cols.len();

    let mut matrix = vec![vec![None; k]; k];
    let mut pvalues = vec![vec![None; k]; k];

    for i in 0..k {
        matrix[i][i] = Some(1.0);
        pvalues[i][i] = Some(0.0);
        for j in (i + 1)..k {
            let (x, y) = pairwise_complete(cols[i], cols[j]);
            let test = backend.correlation(method, &x, &y);
            if test.is_none() {
                tracing::debug!(
                    method = %method,
                    a = %columns[i],
                    b = %columns[j],
                    "correlation undefined"
                );
            }
            let r = test.map(|t| t.statistic);
            let p = test.map(|t| t.p_value);
            matrix[i][j] = r;
            matrix[j][i] = r;
            pvalues[i][j] = p;
            pvalues[j][i] = p;
        }
    }

    Ok(CorrelationMatrix {
        matrix,
        pvalues,
        labels: columns.to_vec(),
    })
}

// ── VIF ─────────────────────────────────────────────────────────────

/// Variance inflation factor of every column against all the others.
///
/// Uses rows complete in every column. Each column is regressed on the
/// others without a constant term, so R² is the uncentered
/// `1 − RSS/Σx²` and columns with large means score high even when their
/// deviations are unrelated. `VIF = 1/(1 − R²)`; an infinite VIF is
/// reported as 999.0, and a regression that cannot be fitted (or an
/// all-zero column) yields `None` for that column only.
pub fn variance_inflation<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    columns: &[String],
) -> Result<OrderedMap<Option<f64>>, EdaError> {
    let data = df.complete_cases(columns)?;
    let mut out = OrderedMap::new();

    for (j, name) in columns.iter().enumerate() {
        let others: Vec<&[f64]> = data
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != j)
            .map(|(_, v)| v.as_slice())
            .collect();

        let vif = backend
            .least_squares(&others, &data[j], false)
            .map(|fit| fit.uncentered_r_squared(&data[j]))
            .filter(|r2| !r2.is_nan())
            .map(|r2| {
                let vif = 1.0 / (1.0 - r2);
                if vif.is_finite() && vif >= 0.0 {
                    vif
                } else {
                    VIF_INFINITE_SENTINEL
                }
            });
        if vif.is_none() {
            tracing::warn!(column = %name, "VIF could not be computed");
        }
        out.insert(name.clone(), vif);
    }
    Ok(out)
}

// ── Stage ───────────────────────────────────────────────────────────

/// Runs every enabled correlation method and, when requested and more than
/// one column is selected, the VIF computation.
pub fn analyze_correlations<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    columns: &[String],
    options: &AnalysisOptions,
) -> Result<CorrelationResults, EdaError> {
    let methods = &options.correlation_methods;
    let run = |enabled: bool, method| -> Result<Option<CorrelationMatrix>, EdaError> {
        if enabled {
            correlation_matrix(backend, df, columns, method).map(Some)
        } else {
            Ok(None)
        }
    };

    let vif = if options.calculate_vif && columns.len() > 1 {
        Some(variance_inflation(backend, df, columns)?)
    } else {
        None
    };

    Ok(CorrelationResults {
        pearson: run(methods.pearson, CorrelationMethod::Pearson)?,
        spearman: run(methods.spearman, CorrelationMethod::Spearman)?,
        kendall: run(methods.kendall, CorrelationMethod::Kendall)?,
        vif,
    })
}

// ── Tests ───────────────────────────────────────────────────────────
