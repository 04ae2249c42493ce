//! Regression assumption diagnostics.
//!
//! Each dependent variable gets its own least squares fit on all
//! independent variables, separate from the regression stage, and its
//! residuals are checked for:
//!
//! - **Linearity**: correlation of fitted values with residuals, `|r| < 0.1`
//! - **Independence**: Durbin-Watson in `(1.5, 2.5)`
//! - **Homoscedasticity**: Breusch-Pagan p-value above 0.05
//! - **Normality**: Shapiro-Wilk p above 0.05, or Anderson-Darling A²
//!   below its 5% critical value for samples of 5000 or more
//!
//! The checks are independent of one another. A Breusch-Pagan test that
//! cannot be computed is recorded with an error message and an
//! undetermined outcome instead of aborting the run.

use crate::backend::{CorrelationMethod, StatsBackend};
use crate::config::{AssumptionTests, OrderedMap};
use crate::dataframe::DataFrame;
use crate::distribution::SHAPIRO_MAX_N;
use crate::error::EdaError;
use serde::Serialize;

/// Largest `|r(fitted, residuals)|` accepted as linear.
pub const LINEARITY_MAX_CORRELATION: f64 = 0.1;
/// Open interval of Durbin-Watson values accepted as independent.
pub const DURBIN_WATSON_RANGE: (f64, f64) = (1.5, 2.5);
/// Significance level of the Breusch-Pagan and Shapiro-Wilk checks.
pub const ASSUMPTION_ALPHA: f64 = 0.05;

const BREUSCH_PAGAN_ERROR: &str = "Could not compute Breusch-Pagan test";

// ── Result Types ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearityCheck {
    /// Pearson r of fitted values against residuals; `None` if undefined.
    pub correlation: Option<f64>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndependenceCheck {
    pub durbin_watson: Option<f64>,
    pub passed: bool,
}

/// Breusch-Pagan outcome, or the reason it is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomoscedasticityCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breusch_pagan_stat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breusch_pagan_pvalue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `None` when the test could not be computed.
    pub passed: Option<bool>,
}

/// Residual normality via Shapiro-Wilk (n < 5000) or Anderson-Darling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shapiro_wilk_stat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shapiro_wilk_pvalue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anderson_stat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anderson_critical: Option<f64>,
    /// `None` when the test statistic is undefined.
    pub passed: Option<bool>,
}

/// All checks for one DV. Checks switched off in the configuration are
/// omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DvAssumptions {
    pub linearity: LinearityCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub independence: Option<IndependenceCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homoscedasticity: Option<HomoscedasticityCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normality_residuals: Option<NormalityCheck>,
}

impl DvAssumptions {
    /// Pass flags of every check that ran, in reporting order.
    pub fn outcomes(&self) -> Vec<(&'static str, Option<bool>)> {
        let mut out = vec![("Linearity", Some(self.linearity.passed))];
        if let Some(c) = &self.independence {
            out.push(("Independence", Some(c.passed)));
        }
        if let Some(c) = &self.homoscedasticity {
            out.push(("Homoscedasticity", c.passed));
        }
        if let Some(c) = &self.normality_residuals {
            out.push(("Normality of Residuals", c.passed));
        }
        out
    }

    /// `true` when no check that ran reported a failure.
    pub fn all_passed(&self) -> bool {
        self.outcomes().iter().all(|(_, p)| *p != Some(false))
    }
}

// ── Checks ──────────────────────────────────────────────────────────

/// 5% critical value of the Anderson-Darling normality test for sample
/// size `n` (Stephens' finite-sample adjustment, rounded to 3 decimals).
pub fn anderson_critical_5pct(n: usize) -> f64 {
    let n = n as f64;
    let raw = 0.787 / (1.0 + 4.0 / n - 25.0 / (n * n));
    (raw * 1000.0).round() / 1000.0
}

fn linearity<B: StatsBackend>(backend: &B, fitted: &[f64], residuals: &[f64]) -> LinearityCheck {
    let correlation = backend
        .correlation(CorrelationMethod::Pearson, fitted, residuals)
        .map(|t| t.statistic);
    LinearityCheck {
        correlation,
        passed: correlation.is_some_and(|r| r.abs() < LINEARITY_MAX_CORRELATION),
    }
}

fn independence<B: StatsBackend>(backend: &B, residuals: &[f64]) -> IndependenceCheck {
    let dw = backend.durbin_watson(residuals);
    let (lo, hi) = DURBIN_WATSON_RANGE;
    IndependenceCheck {
        durbin_watson: dw,
        passed: dw.is_some_and(|d| d > lo && d < hi),
    }
}

fn homoscedasticity<B: StatsBackend>(
    backend: &B,
    dv: &str,
    residuals: &[f64],
    predictors: &[&[f64]],
) -> HomoscedasticityCheck {
    match backend.breusch_pagan(residuals, predictors) {
        Some(bp) => HomoscedasticityCheck {
            breusch_pagan_stat: Some(bp.statistic),
            breusch_pagan_pvalue: Some(bp.p_value),
            error: None,
            passed: Some(bp.p_value > ASSUMPTION_ALPHA),
        },
        None => {
            tracing::warn!(dv, "Breusch-Pagan test could not be computed");
            HomoscedasticityCheck {
                breusch_pagan_stat: None,
                breusch_pagan_pvalue: None,
                error: Some(BREUSCH_PAGAN_ERROR.to_string()),
                passed: None,
            }
        }
    }
}

fn residual_normality<B: StatsBackend>(backend: &B, residuals: &[f64]) -> NormalityCheck {
    let n = residuals.len();
    if n < SHAPIRO_MAX_N {
        let sw = backend.shapiro_wilk(residuals);
        NormalityCheck {
            shapiro_wilk_stat: sw.map(|t| t.statistic),
            shapiro_wilk_pvalue: sw.map(|t| t.p_value),
            anderson_stat: None,
            anderson_critical: None,
            passed: sw.map(|t| t.p_value > ASSUMPTION_ALPHA),
        }
    } else {
        let critical = anderson_critical_5pct(n);
        let ad = backend.anderson_darling(residuals).map(|t| t.statistic);
        NormalityCheck {
            shapiro_wilk_stat: None,
            shapiro_wilk_pvalue: None,
            anderson_stat: ad,
            anderson_critical: Some(critical),
            passed: ad.map(|a| a < critical),
        }
    }
}

// ── Stage ───────────────────────────────────────────────────────────

/// Refits `dv` on `ivs` and runs the enabled checks on its residuals.
///
/// # Errors
///
/// - [`EdaError::MissingValues`] if any IV or the DV has nulls
/// - [`EdaError::InsufficientData`] if no rows remain
/// - [`EdaError::SingularDesign`] if the fit cannot be computed
///
/// Collinear or constant IVs do not fail: the refit is rank tolerant.
pub fn check_dv<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    ivs: &[String],
    dv: &str,
    tests: &AssumptionTests,
) -> Result<DvAssumptions, EdaError> {
    let predictors = df.complete_columns(ivs)?;
    let target = df
        .complete_columns(&[dv.to_string()])?
        .pop()
        .unwrap_or_default();
    if target.is_empty() {
        return Err(EdaError::InsufficientData {
            min_required: 1,
            actual: 0,
        });
    }
    let refs: Vec<&[f64]> = predictors.iter().map(Vec::as_slice).collect();
    let fit = backend
        .least_squares(&refs, &target, true)
        .ok_or_else(|| EdaError::SingularDesign {
            target: dv.to_string(),
        })?;
    let residuals = &fit.residuals;

    Ok(DvAssumptions {
        linearity: linearity(backend, &fit.fitted, residuals),
        independence: tests
            .independence
            .then(|| independence(backend, residuals)),
        homoscedasticity: tests
            .homoscedasticity
            .then(|| homoscedasticity(backend, dv, residuals, &refs)),
        normality_residuals: tests
            .normality_residuals
            .then(|| residual_normality(backend, residuals)),
    })
}

/// Runs [`check_dv`] for every DV.
pub fn test_assumptions<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    ivs: &[String],
    dvs: &[String],
    tests: &AssumptionTests,
) -> Result<OrderedMap<DvAssumptions>, EdaError> {
    let mut results = OrderedMap::new();
    for dv in dvs {
        let checks = check_dv(backend, df, ivs, dv, tests)?;
        tracing::debug!(dv = %dv, all_passed = checks.all_passed(), "assumptions checked");
        results.insert(dv.clone(), checks);
    }
    Ok(results)
}

// ── Tests ───────────────────────────────────────────────────────────
