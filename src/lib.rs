//! # u-eda
//!
//! Exploratory data analysis engine with C FFI bindings.
//!
//! u-eda takes a numeric table and an analysis configuration, and runs a
//! fixed sequence of stages over the selected columns:
//!
//! - **Quality**: missing values and IQR outliers on the raw data
//! - **Cleaning**: per-column missing-value strategies and outlier decisions
//! - **Analysis**: distributions, correlations, regression and its diagnostics
//! - **Reporting**: confidence scores and a self-contained HTML report
//!
//! ## Modules
//!
//! - [`dataframe`]: Column-major tabular data model (DataFrame, Column, DataType)
//! - [`csv_parser`]: CSV parsing with numeric type inference
//! - [`config`]: Analysis configuration (variable selection, strategies, method toggles)
//! - [`backend`]: `StatsBackend` trait isolating the numerical routines
//! - [`quality`]: Missing-value counts and IQR outlier bounds
//! - [`preprocessing`]: Drop/median/mean imputation and outlier removal
//! - [`distribution`]: Descriptive statistics and normality (Shapiro-Wilk, Anderson-Darling)
//! - [`correlation`]: Pearson/Spearman/Kendall matrices and VIF
//! - [`regression`]: Linear OLS and polynomial (degree 2, 3) model comparison
//! - [`assumptions`]: Linearity, Durbin-Watson, Breusch-Pagan, residual normality
//! - [`confidence`]: 0–100 confidence score per regression coefficient
//! - [`report`]: HTML report rendering
//! - [`pipeline`]: `run_full_analysis` orchestration
//! - [`ffi`]: C FFI bindings (auto-generated C header via cbindgen)
//! - [`error`]: Error types
//!
//! ## Quick Start
//!
//! ```
//! use u_eda::csv_parser::CsvParser;
//! use u_eda::run_full_analysis;
//!
//! let mut csv = String::from("hours,score\n");
//! for i in 0..30 {
//!     let h = i as f64 * 0.5;
//!     csv.push_str(&format!("{},{}\n", h, 40.0 + 4.0 * h + (h * 2.0).cos()));
//! }
//! let df = CsvParser::new().parse_str(&csv).unwrap();
//!
//! let config = r#"{
//!     "selectedIVs": ["hours"],
//!     "selectedDVs": ["score"],
//!     "config": { "correlationMethods": { "kendall": true } }
//! }"#;
//! let result = run_full_analysis(&df, config).unwrap();
//!
//! let pearson = result.correlations.pearson.as_ref().unwrap();
//! assert!(pearson.get("hours", "score").unwrap() > 0.95);
//! assert!(result.correlations.kendall.is_some());
//! ```

pub mod assumptions;
pub mod backend;
pub mod confidence;
pub mod config;
pub mod correlation;
pub mod csv_parser;
pub mod dataframe;
pub mod distribution;
pub mod error;
pub mod ffi;
pub mod pipeline;
pub mod preprocessing;
pub mod quality;
pub mod regression;
pub mod report;

pub use backend::{NumflowBackend, StatsBackend};
pub use config::AnalysisConfig;
pub use dataframe::DataFrame;
pub use error::EdaError;
pub use pipeline::{run_full_analysis, run_full_analysis_with, AnalysisResult};

/// Longest raw-value, residual or prediction array kept in a result.
pub const MAX_SERIES_LEN: usize = 1000;

/// First [`MAX_SERIES_LEN`] values, in their original order.
pub(crate) fn truncate_series(values: &[f64]) -> Vec<f64> {
    values[..values.len().min(MAX_SERIES_LEN)].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_prefix() {
        let long: Vec<f64> = (0..2500).map(f64::from).collect();
        let cut = truncate_series(&long);
        assert_eq!(cut.len(), MAX_SERIES_LEN);
        assert_eq!(cut[999], 999.0);

        let short = [3.0, 1.0, 2.0];
        assert_eq!(truncate_series(&short), short.to_vec());
        assert!(truncate_series(&[]).is_empty());
    }
}
