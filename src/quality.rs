//! Data quality assessment.
//!
//! Reports missing values and IQR outliers for the selected columns before
//! any cleaning happens. The report is observational: it lets a user pick a
//! missing-data strategy (median and mean are reported next to the counts)
//! and decide which outliers to remove.
//!
//! # Example
//!
//! ```
//! use u_eda::backend::NumflowBackend;
//! use u_eda::dataframe::DataFrame;
//! use u_eda::quality::assess_quality;
//!
//! let df = DataFrame::from_numeric(vec![(
//!     "x",
//!     vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(100.0)],
//! )]).unwrap();
//! let report = assess_quality(&NumflowBackend, &df, &["x".to_string()]).unwrap();
//! assert_eq!(report.get("x").unwrap().outlier_count, Some(1));
//! ```

use crate::backend::StatsBackend;
use crate::config::OrderedMap;
use crate::dataframe::DataFrame;
use crate::error::EdaError;
use serde::Serialize;

/// Multiplier applied to the IQR to place the outlier fences.
pub const IQR_FENCE: f64 = 1.5;

// ── IQR fences ────────────────────────────────────────────────────────

/// Tukey fences `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Returns `true` when `value` lies within the closed fence interval.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Computes the IQR fences of `values`. `None` when `values` is empty.
pub fn iqr_bounds<B: StatsBackend>(backend: &B, values: &[f64]) -> Option<IqrBounds> {
    let q1 = backend.quantile(values, 0.25)?;
    let q3 = backend.quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrBounds {
        q1,
        q3,
        lower: q1 - IQR_FENCE * iqr,
        upper: q3 + IQR_FENCE * iqr,
    })
}

// ── Report ────────────────────────────────────────────────────────────

/// Issues found in one column. Absent groups are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_count: Option<usize>,
    /// `missing_count / rows * 100`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_percent: Option<f64>,
    /// Median of the valid values, reported with missing counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    /// Mean of the valid values, reported with missing counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
}

impl QualityIssue {
    /// Returns `true` when neither missing values nor outliers were found.
    pub fn is_empty(&self) -> bool {
        self.missing_count.is_none() && self.outlier_count.is_none()
    }
}

/// Assesses missing values and IQR outliers of `columns`.
///
/// Only columns with at least one issue appear in the result, in the order
/// given.
pub fn assess_quality<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    columns: &[String],
) -> Result<OrderedMap<QualityIssue>, EdaError> {
    let rows = df.row_count();
    let mut report = OrderedMap::new();

    for name in columns {
        let col = df.numeric_column(name)?;
        let valid = col.valid_numeric_values().unwrap_or_default();
        let mut issue = QualityIssue::default();

        let missing = col.null_count();
        if missing > 0 {
            issue.missing_count = Some(missing);
            issue.missing_percent = Some(missing as f64 / rows as f64 * 100.0);
            issue.median = backend.median(&valid);
            issue.mean = backend.mean(&valid);
        }

        if let Some(bounds) = iqr_bounds(backend, &valid) {
            let outliers = valid.iter().filter(|&&v| !bounds.contains(v)).count();
            if outliers > 0 {
                issue.outlier_count = Some(outliers);
                issue.lower_bound = Some(bounds.lower);
                issue.upper_bound = Some(bounds.upper);
            }
        }

        if !issue.is_empty() {
            tracing::debug!(
                column = %name,
                missing = issue.missing_count.unwrap_or(0),
                outliers = issue.outlier_count.unwrap_or(0),
                "quality issue"
            );
            report.insert(name.clone(), issue);
        }
    }
    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NumflowBackend;
    use proptest::prelude::*;

    fn frame(values: Vec<Option<f64>>) -> DataFrame {
        DataFrame::from_numeric(vec![("x", values)]).unwrap()
    }

    #[test]
    fn single_extreme_value_is_flagged() {
        let df = frame(vec![
            Some(1.0),
            Some(1.0),
            Some(1.0),
            Some(1.0),
            Some(1.0),
            Some(100.0),
        ]);
        let report = assess_quality(&NumflowBackend, &df, &["x".into()]).unwrap();
        let issue = report.get("x").unwrap();
        assert_eq!(issue.outlier_count, Some(1));
        assert_eq!(issue.lower_bound, Some(1.0));
        assert_eq!(issue.upper_bound, Some(1.0));
        assert_eq!(issue.missing_count, None);
    }

    #[test]
    fn missing_values_report_imputation_stats() {
        let df = frame(vec![Some(1.0), None, Some(3.0), Some(5.0)]);
        let report = assess_quality(&NumflowBackend, &df, &["x".into()]).unwrap();
        let issue = report.get("x").unwrap();
        assert_eq!(issue.missing_count, Some(1));
        assert!((issue.missing_percent.unwrap() - 25.0).abs() < 1e-10);
        assert!((issue.median.unwrap() - 3.0).abs() < 1e-10);
        assert!((issue.mean.unwrap() - 3.0).abs() < 1e-10);
        assert_eq!(issue.outlier_count, None);
    }

    #[test]
    fn clean_column_is_omitted() {
        let df = frame(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        let report = assess_quality(&NumflowBackend, &df, &["x".into()]).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn all_null_column_reports_missing_only() {
        let df = frame(vec![None, None]);
        let report = assess_quality(&NumflowBackend, &df, &["x".into()]).unwrap();
        let issue = report.get("x").unwrap();
        assert_eq!(issue.missing_count, Some(2));
        assert_eq!(issue.median, None);
        assert_eq!(issue.outlier_count, None);
    }

    #[test]
    fn unknown_column_is_error() {
        let df = frame(vec![Some(1.0)]);
        let err = assess_quality(&NumflowBackend, &df, &["nope".into()]).unwrap_err();
        assert!(matches!(err, EdaError::ColumnNotFound { .. }));
    }

    #[test]
    fn omitted_fields_are_not_serialized() {
        let issue = QualityIssue {
            outlier_count: Some(2),
            lower_bound: Some(0.0),
            upper_bound: Some(1.0),
            ..QualityIssue::default()
        };
        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("missing_count"));
        assert!(json.contains("\"outlier_count\":2"));
    }

    proptest! {
        #[test]
        fn fences_bracket_quartiles(values in prop::collection::vec(-1e6f64..1e6, 1..200)) {
            let b = iqr_bounds(&NumflowBackend, &values).unwrap();
            prop_assert!(b.lower <= b.q1);
            prop_assert!(b.q1 <= b.q3);
            prop_assert!(b.q3 <= b.upper);
        }

        #[test]
        fn outlier_count_matches_fences(values in prop::collection::vec(-1e3f64..1e3, 4..100)) {
            let df = frame(values.iter().copied().map(Some).collect());
            let report = assess_quality(&NumflowBackend, &df, &["x".into()]).unwrap();
            let b = iqr_bounds(&NumflowBackend, &values).unwrap();
            let expected = values.iter().filter(|&&v| v < b.lower || v > b.upper).count();
            let reported = report.get("x").and_then(|i| i.outlier_count).unwrap_or(0);
            prop_assert_eq!(reported, expected);
        }
    }
}
