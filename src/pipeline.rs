//! End-to-end analysis pipeline.
//!
//! Runs the stages in a fixed order on one dataset:
//!
//! 1. quality assessment on the raw selection
//! 2. preprocessing (missing-value strategies, outlier decisions)
//! 3. distribution analysis
//! 4. correlation analysis
//! 5. regression modeling
//! 6. assumption testing
//!
//! then scores every linear coefficient and renders the HTML report. Each
//! stage after preprocessing reads the cleaned table. Progress is reported
//! through `tracing` events inside an `eda_analysis` span.
//!
//! # Example
//!
//! ```
//! use u_eda::csv_parser::CsvParser;
//! use u_eda::pipeline::run_full_analysis;
//!
//! let mut csv = String::from("x,y\n");
//! for i in 0..20 {
//!     let x = i as f64;
//!     csv.push_str(&format!("{},{}\n", x, 3.0 * x + (x * 1.7).sin()));
//! }
//! let df = CsvParser::new().parse_str(&csv).unwrap();
//!
//! let result = run_full_analysis(&df, r#"{"selectedIVs": ["x"], "selectedDVs": ["y"]}"#).unwrap();
//! assert_eq!(result.metadata.cleaned_rows, 20);
//! let linear = result.regressions.get("y").unwrap().linear.as_ref().unwrap();
//! assert!(linear.r_squared > 0.99);
//! assert!(result.report_html.contains("EDA Analysis Report"));
//! ```

use crate::assumptions::{test_assumptions, DvAssumptions};
use crate::backend::{CorrelationMethod, NumflowBackend, StatsBackend};
use crate::confidence::{Confidence, ConfidenceInputs};
use crate::config::{AnalysisConfig, OrderedMap, OutlierDecision};
use crate::correlation::{analyze_correlations, CorrelationResults};
use crate::dataframe::DataFrame;
use crate::distribution::{analyze_distributions, DistributionSummary};
use crate::error::EdaError;
use crate::preprocessing::preprocess;
use crate::quality::{assess_quality, QualityIssue};
use crate::regression::{fit_models, DvModels};
use crate::report::{render_report_now, ReportInput};
use serde::Serialize;

// ── Stages ────────────────────────────────────────────────────────────

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocessing,
    Distributions,
    Correlations,
    Regression,
    Assumptions,
    Scoring,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Preprocessing,
        Stage::Distributions,
        Stage::Correlations,
        Stage::Regression,
        Stage::Assumptions,
        Stage::Scoring,
        Stage::Report,
    ];

    /// Share of the run completed when the stage starts.
    pub fn progress(self) -> u8 {
        match self {
            Stage::Preprocessing => 10,
            Stage::Distributions => 25,
            Stage::Correlations => 45,
            Stage::Regression => 60,
            Stage::Assumptions => 75,
            Stage::Scoring => 85,
            Stage::Report => 95,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Stage::Preprocessing => "Preprocessing data",
            Stage::Distributions => "Analyzing distributions",
            Stage::Correlations => "Calculating correlations",
            Stage::Regression => "Fitting regression models",
            Stage::Assumptions => "Testing assumptions",
            Stage::Scoring => "Scoring findings",
            Stage::Report => "Generating report",
        }
    }

    fn enter(self) {
        tracing::info!(progress = self.progress(), "{}", self.message());
    }
}

// ── Configuration input ───────────────────────────────────────────────

/// Anything the pipeline accepts as its configuration: a parsed
/// [`AnalysisConfig`] or its JSON text.
pub trait IntoAnalysisConfig {
    fn into_analysis_config(self) -> Result<AnalysisConfig, EdaError>;
}

impl IntoAnalysisConfig for AnalysisConfig {
    fn into_analysis_config(self) -> Result<AnalysisConfig, EdaError> {
        Ok(self)
    }
}

impl IntoAnalysisConfig for &AnalysisConfig {
    fn into_analysis_config(self) -> Result<AnalysisConfig, EdaError> {
        Ok(self.clone())
    }
}

impl IntoAnalysisConfig for &str {
    fn into_analysis_config(self) -> Result<AnalysisConfig, EdaError> {
        AnalysisConfig::from_json(self)
    }
}

impl IntoAnalysisConfig for &String {
    fn into_analysis_config(self) -> Result<AnalysisConfig, EdaError> {
        AnalysisConfig::from_json(self)
    }
}

// ── Result ────────────────────────────────────────────────────────────

/// Dataset shape before and after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub original_rows: usize,
    pub cleaned_rows: usize,
    /// Number of selected columns (IVs plus DVs).
    pub n_variables: usize,
    pub independent_vars: Vec<String>,
    pub dependent_vars: Vec<String>,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub metadata: Metadata,
    pub quality_issues: OrderedMap<QualityIssue>,
    pub distributions: OrderedMap<DistributionSummary>,
    pub correlations: CorrelationResults,
    pub regressions: OrderedMap<DvModels>,
    pub assumptions: OrderedMap<DvAssumptions>,
    /// DV → IV → confidence in that coefficient.
    pub confidence: OrderedMap<OrderedMap<Confidence>>,
    pub report_html: String,
}

impl AnalysisResult {
    /// Serializes the result as a single JSON object.
    pub fn to_json(&self) -> Result<String, EdaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, EdaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Confidence scoring ────────────────────────────────────────────────

fn score_coefficients<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    config: &AnalysisConfig,
    regressions: &OrderedMap<DvModels>,
    assumptions: &OrderedMap<DvAssumptions>,
) -> Result<OrderedMap<OrderedMap<Confidence>>, EdaError> {
    let outliers_removed = config
        .outlier_decisions
        .iter()
        .any(|(_, d)| *d == OutlierDecision::Remove);

    let mut scores = OrderedMap::new();
    for (dv, models) in regressions.iter() {
        let Some(linear) = &models.linear else {
            continue;
        };
        let checks = assumptions.get(dv);
        let assumptions_met = checks.map_or(true, DvAssumptions::all_passed);
        let normality_ok = checks
            .and_then(|a| a.normality_residuals.as_ref())
            .and_then(|n| n.passed)
            != Some(false);

        let mut per_iv = OrderedMap::new();
        for (iv, _) in linear.coefficients.iter() {
            let pair = df.complete_cases(&[iv.to_string(), dv.to_string()])?;
            let effect_size = backend
                .correlation(CorrelationMethod::Pearson, &pair[0], &pair[1])
                .map_or(f64::NAN, |t| t.statistic);
            let inputs = ConfidenceInputs {
                p_value: linear.p_values.get(iv).copied().unwrap_or(f64::NAN),
                effect_size,
                sample_size: df.row_count(),
                assumptions_met,
                normality_ok,
                outliers_removed,
            };
            let confidence = Confidence::from(inputs);
            tracing::debug!(dv = dv.as_str(), iv = iv.as_str(), score = confidence.score, "scored coefficient");
            per_iv.insert(iv.clone(), confidence);
        }
        scores.insert(dv.clone(), per_iv);
    }
    Ok(scores)
}

// ── Entry points ──────────────────────────────────────────────────────

/// Runs the full analysis with the default numerical backend.
pub fn run_full_analysis(
    df: &DataFrame,
    config: impl IntoAnalysisConfig,
) -> Result<AnalysisResult, EdaError> {
    run_full_analysis_with(&NumflowBackend, df, config)
}

/// Runs the full analysis with a caller-supplied backend.
///
/// The first stage error aborts the run. Breusch-Pagan and per-column VIF
/// failures are recorded in the result instead.
pub fn run_full_analysis_with<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    config: impl IntoAnalysisConfig,
) -> Result<AnalysisResult, EdaError> {
    let config = config.into_analysis_config()?;
    config.validate()?;

    let span = tracing::info_span!(
        "eda_analysis",
        rows = df.row_count(),
        ivs = config.selected_ivs.len(),
        dvs = config.selected_dvs.len()
    );
    let _guard = span.enter();

    let columns = config.selected_columns();
    let ivs = &config.selected_ivs;
    let dvs = &config.selected_dvs;
    let options = &config.options;

    Stage::Preprocessing.enter();
    let quality_issues = assess_quality(backend, df, &columns)?;
    let clean = preprocess(
        backend,
        df,
        &columns,
        &config.missing_data_strategy,
        &config.outlier_decisions,
    )?;
    tracing::info!(
        original_rows = df.row_count(),
        cleaned_rows = clean.row_count(),
        "preprocessing complete"
    );

    Stage::Distributions.enter();
    let distributions = analyze_distributions(backend, &clean, &columns)?;

    Stage::Correlations.enter();
    let correlations = analyze_correlations(backend, &clean, &columns, options)?;

    Stage::Regression.enter();
    let regressions = fit_models(backend, &clean, ivs, dvs, &options.regression_models)?;

    Stage::Assumptions.enter();
    let assumptions = test_assumptions(backend, &clean, ivs, dvs, &options.assumption_tests)?;

    Stage::Scoring.enter();
    let confidence = score_coefficients(backend, &clean, &config, &regressions, &assumptions)?;

    Stage::Report.enter();
    let report_html = render_report_now(&ReportInput {
        rows: clean.row_count(),
        columns: clean.column_count(),
        alpha: options.alpha,
        quality: &quality_issues,
        distributions: &distributions,
        correlations: &correlations,
        regressions: &regressions,
        assumptions: &assumptions,
        confidence: &confidence,
    });

    tracing::info!(progress = 100u8, "analysis complete");

    Ok(AnalysisResult {
        metadata: Metadata {
            original_rows: df.row_count(),
            cleaned_rows: clean.row_count(),
            n_variables: columns.len(),
            independent_vars: ivs.clone(),
            dependent_vars: dvs.clone(),
        },
        quality_issues,
        distributions,
        correlations,
        regressions,
        assumptions,
        confidence,
        report_html,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
