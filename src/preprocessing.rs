//! Data cleaning.
//!
//! Produces the cleaned table every later stage consumes: the selected
//! columns only, with missing-value strategies and outlier decisions
//! applied one column at a time in configuration order.
//!
//! The steps are sequential, not batched: a `drop` on one column changes
//! the rows a later `median` is computed over, and outlier fences are
//! recomputed on the partially cleaned data at the moment each `remove`
//! decision is applied.
//!
//! # Example
//!
//! ```
//! use u_eda::backend::NumflowBackend;
//! use u_eda::config::{MissingStrategy, OrderedMap};
//! use u_eda::dataframe::DataFrame;
//! use u_eda::preprocessing::preprocess;
//!
//! let df = DataFrame::from_numeric(vec![
//!     ("x", vec![Some(1.0), None, Some(3.0)]),
//! ]).unwrap();
//! let mut strategies = OrderedMap::new();
//! strategies.insert("x".to_string(), MissingStrategy::Median);
//!
//! let clean = preprocess(&NumflowBackend, &df, &["x".to_string()], &strategies, &OrderedMap::new()).unwrap();
//! assert_eq!(clean.column_by_name("x").unwrap().as_numeric().unwrap(), &[1.0, 2.0, 3.0]);
//! ```

use crate::backend::StatsBackend;
use crate::config::{MissingStrategy, OrderedMap, OutlierDecision};
use crate::dataframe::DataFrame;
use crate::error::EdaError;
use crate::quality::iqr_bounds;

/// Applies missing-value strategies, then outlier decisions, to a copy of
/// the selected columns.
///
/// Every key of either mapping must name a selected column.
pub fn preprocess<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    columns: &[String],
    missing: &OrderedMap<MissingStrategy>,
    outliers: &OrderedMap<OutlierDecision>,
) -> Result<DataFrame, EdaError> {
    let mut clean = df.select(columns)?;

    for name in missing.keys().chain(outliers.keys()) {
        if clean.column_index(name).is_none() {
            return Err(EdaError::ColumnNotFound {
                name: name.to_string(),
            });
        }
    }

    for (name, strategy) in missing.iter() {
        clean = apply_missing_strategy(backend, clean, name, strategy)?;
    }

    for (name, decision) in outliers.iter() {
        if *decision == OutlierDecision::Remove {
            clean = remove_outliers(backend, clean, name)?;
        }
    }

    tracing::debug!(
        original_rows = df.row_count(),
        cleaned_rows = clean.row_count(),
        "preprocessing complete"
    );
    Ok(clean)
}

fn apply_missing_strategy<B: StatsBackend>(
    backend: &B,
    df: DataFrame,
    name: &str,
    strategy: &MissingStrategy,
) -> Result<DataFrame, EdaError> {
    let col = df.numeric_column(name)?;
    if col.null_count() == 0 {
        return Ok(df);
    }

    match strategy {
        MissingStrategy::Drop => {
            let keep: Vec<usize> = col.validity().valid_indices().collect();
            tracing::debug!(column = name, dropped = col.null_count(), "dropped missing rows");
            Ok(df.take_rows(&keep))
        }
        MissingStrategy::Median | MissingStrategy::Mean => {
            let valid = col.valid_numeric_values().unwrap_or_default();
            let fill = match strategy {
                MissingStrategy::Median => backend.median(&valid),
                _ => backend.mean(&valid),
            };
            // an all-null column has no statistic to fill with
            let Some(fill) = fill else {
                return Ok(df);
            };
            let filled = col.fill_nulls(fill);
            let mut df = df;
            df.replace_column(name, filled)?;
            tracing::debug!(column = name, fill, "imputed missing values");
            Ok(df)
        }
        MissingStrategy::Ignore => Ok(df),
    }
}

/// Keeps rows whose value in `name` lies within the IQR fences of the
/// current data. Null values are never within the fences.
fn remove_outliers<B: StatsBackend>(
    backend: &B,
    df: DataFrame,
    name: &str,
) -> Result<DataFrame, EdaError> {
    let col = df.numeric_column(name)?;
    let valid = col.valid_numeric_values().unwrap_or_default();
    let bounds = iqr_bounds(backend, &valid);

    let keep: Vec<usize> = (0..df.row_count())
        .filter(|&i| match (col.numeric_at(i), bounds) {
            (Some(v), Some(b)) => b.contains(v),
            _ => false,
        })
        .collect();

    tracing::debug!(
        column = name,
        removed = df.row_count() - keep.len(),
        "removed outlier rows"
    );
    Ok(df.take_rows(&keep))
}

// ── Tests ─────────────────────────────────────────────────────────────
