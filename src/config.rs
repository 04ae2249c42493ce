//! Analysis configuration.
//!
//! The configuration arrives as JSON (the format exported by the browser
//! front end) and is deserialized into [`AnalysisConfig`]. Every key is
//! optional; defaults are documented on each field.
//!
//! ```
//! use u_eda::config::{AnalysisConfig, MissingStrategy};
//!
//! let config = AnalysisConfig::from_json(r#"{
//!     "selectedIVs": ["x"],
//!     "selectedDVs": ["y"],
//!     "missingDataStrategy": {"x": "median"},
//!     "config": {"correlationMethods": {"kendall": true}}
//! }"#).unwrap();
//!
//! assert_eq!(config.missing_data_strategy.get("x"), Some(&MissingStrategy::Median));
//! assert!(config.options.correlation_methods.pearson);
//! assert!(config.options.correlation_methods.kendall);
//! assert!(!config.options.regression_models.polynomial);
//! ```

use crate::error::EdaError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Only configuration version the exporter has ever produced.
pub const CONFIG_VERSION: &str = "1.0.0";

// ── OrderedMap ────────────────────────────────────────────────────────

/// String-keyed map that remembers insertion order.
///
/// Deserializes keeping JSON document order, which matters for
/// preprocessing (columns are cleaned in the order the user listed them)
/// and keeps result objects in selection order.
pub type OrderedMap<V> = IndexMap<String, V>;

// ── Per-column decisions ──────────────────────────────────────────────

/// How missing values of one column are handled during cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingStrategy {
    /// Remove rows where the column is null.
    Drop,
    /// Replace nulls with the column median.
    Median,
    /// Replace nulls with the column mean.
    Mean,
    /// Any other value: leave the column untouched.
    #[serde(other)]
    Ignore,
}

/// What to do with IQR outliers of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierDecision {
    /// Remove rows outside the IQR fences.
    Remove,
    /// Keep every row.
    #[serde(other)]
    Keep,
}

// ── Toggles ───────────────────────────────────────────────────────────

fn enabled() -> bool {
    true
}

fn default_alpha() -> f64 {
    0.05
}

/// Which correlation methods to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMethods {
    /// Default: true.
    #[serde(default = "enabled")]
    pub pearson: bool,
    /// Default: true.
    #[serde(default = "enabled")]
    pub spearman: bool,
    /// Default: false.
    #[serde(default)]
    pub kendall: bool,
}

impl Default for CorrelationMethods {
    fn default() -> Self {
        Self {
            pearson: true,
            spearman: true,
            kendall: false,
        }
    }
}

/// Which regression model families to fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModels {
    /// Ordinary least squares on the IVs. Default: true.
    #[serde(default = "enabled")]
    pub linear: bool,
    /// Degree 2 and 3 polynomial expansions. Default: false.
    #[serde(default)]
    pub polynomial: bool,
}

impl Default for RegressionModels {
    fn default() -> Self {
        Self {
            linear: true,
            polynomial: false,
        }
    }
}

/// Which optional assumption checks to run. Linearity always runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionTests {
    /// Breusch-Pagan. Default: true.
    #[serde(default = "enabled")]
    pub homoscedasticity: bool,
    /// Durbin-Watson. Default: true.
    #[serde(default = "enabled")]
    pub independence: bool,
    /// Shapiro-Wilk / Anderson-Darling on residuals. Default: true.
    #[serde(default = "enabled")]
    pub normality_residuals: bool,
}

impl Default for AssumptionTests {
    fn default() -> Self {
        Self {
            homoscedasticity: true,
            independence: true,
            normality_residuals: true,
        }
    }
}

/// The nested `config` object: method toggles and report options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    #[serde(default)]
    pub correlation_methods: CorrelationMethods,
    /// Variance inflation factors. Default: true.
    #[serde(default = "enabled", rename = "calculateVIF")]
    pub calculate_vif: bool,
    #[serde(default)]
    pub regression_models: RegressionModels,
    #[serde(default)]
    pub assumption_tests: AssumptionTests,
    /// Significance level used for report annotations. Default: 0.05.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            correlation_methods: CorrelationMethods::default(),
            calculate_vif: true,
            regression_models: RegressionModels::default(),
            assumption_tests: AssumptionTests::default(),
            alpha: default_alpha(),
        }
    }
}

// ── AnalysisConfig ────────────────────────────────────────────────────

/// Complete configuration for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Exporter version; when present it must equal [`CONFIG_VERSION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Independent variables. Default: empty.
    #[serde(default, rename = "selectedIVs")]
    pub selected_ivs: Vec<String>,
    /// Dependent variables. Default: empty.
    #[serde(default, rename = "selectedDVs")]
    pub selected_dvs: Vec<String>,
    /// Column → missing-value strategy, applied in document order.
    #[serde(default)]
    pub missing_data_strategy: OrderedMap<MissingStrategy>,
    /// Column → outlier decision, applied in document order.
    #[serde(default)]
    pub outlier_decisions: OrderedMap<OutlierDecision>,
    /// Method toggles.
    #[serde(default, rename = "config")]
    pub options: AnalysisOptions,
}

impl AnalysisConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, EdaError> {
        let config: Self = serde_json::from_str(json)?;
        if let Some(version) = &config.version {
            if version != CONFIG_VERSION {
                return Err(EdaError::InvalidConfig(format!(
                    "unsupported configuration version '{version}'"
                )));
            }
        }
        Ok(config)
    }

    /// IVs followed by DVs, the column order every stage uses.
    pub fn selected_columns(&self) -> Vec<String> {
        self.selected_ivs
            .iter()
            .chain(self.selected_dvs.iter())
            .cloned()
            .collect()
    }

    /// Checks that the run has something to analyze.
    pub fn validate(&self) -> Result<(), EdaError> {
        if self.selected_ivs.is_empty() {
            return Err(EdaError::InvalidConfig(
                "at least one independent variable must be selected".into(),
            ));
        }
        if self.selected_dvs.is_empty() {
            return Err(EdaError::InvalidConfig(
                "at least one dependent variable must be selected".into(),
            ));
        }
        if !(self.options.alpha > 0.0 && self.options.alpha < 1.0) {
            return Err(EdaError::InvalidConfig(format!(
                "alpha must lie in (0, 1), got {}",
                self.options.alpha
            )));
        }
        Ok(())
    }
}

impl TryFrom<&str> for AnalysisConfig {
    type Error = EdaError;

    fn try_from(json: &str) -> Result<Self, Self::Error> {
        Self::from_json(json)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
