//! Regression modeling.
//!
//! For every dependent variable, fits an ordinary least squares model on
//! all independent variables and, when requested, degree 2 and 3
//! polynomial expansions of them.
//!
//! Fits require complete data: a null in any IV or DV aborts with
//! [`EdaError::MissingValues`]. Coefficients come from a rank-tolerant
//! least squares fit, so a constant or duplicated IV does not stop the
//! run. Slope standard errors use `(XᵀX)⁻¹` of the IV-only design and
//! `n − p − 1` residual degrees of freedom; a linear model whose IV-only
//! `XᵀX` is singular aborts with [`EdaError::SingularDesign`].
//!
//! # Example
//!
//! ```
//! use u_eda::backend::NumflowBackend;
//! use u_eda::dataframe::DataFrame;
//! use u_eda::regression::fit_linear;
//!
//! let df = DataFrame::from_numeric(vec![
//!     ("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
//!     ("y", vec![Some(2.0), Some(4.0), Some(6.0), Some(8.0)]),
//! ]).unwrap();
//! let model = fit_linear(&NumflowBackend, &df, &["x".to_string()], "y").unwrap();
//! assert!(model.intercept.abs() < 1e-8);
//! assert!((model.coefficients.get("x").unwrap() - 2.0).abs() < 1e-8);
//! assert!((model.r_squared - 1.0).abs() < 1e-10);
//! ```

use crate::backend::{LeastSquaresFit, StatsBackend};
use crate::config::{OrderedMap, RegressionModels};
use crate::dataframe::DataFrame;
use crate::error::EdaError;
use crate::truncate_series;
use serde::Serialize;

/// Polynomial degrees fitted when polynomial models are enabled.
pub const POLYNOMIAL_DEGREES: [usize; 2] = [2, 3];

// ── Result Types ────────────────────────────────────────────────────

/// Linear model of one DV on all IVs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearModel {
    pub intercept: f64,
    /// IV → slope.
    pub coefficients: OrderedMap<f64>,
    /// IV → two-sided p-value of its slope.
    pub p_values: OrderedMap<f64>,
    pub r_squared: f64,
    /// `1 − (1−R²)(n−1)/(n−p−1)`.
    pub adj_r_squared: f64,
    /// `sqrt(SSE/n)`.
    pub rmse: f64,
    pub f_statistic: f64,
    pub f_pvalue: f64,
    /// First 1000 residuals.
    pub residuals: Vec<f64>,
    /// First 1000 fitted values.
    pub predictions: Vec<f64>,
}

/// Polynomial model summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolynomialModel {
    pub degree: usize,
    pub r_squared: f64,
    /// Adjusted with p = number of expanded features.
    pub adj_r_squared: f64,
    pub rmse: f64,
    /// `n·ln(RSS/n) + 2p`.
    pub aic: f64,
    /// `n·ln(RSS/n) + p·ln(n)`.
    pub bic: f64,
}

/// Models fitted for one DV. Disabled families are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DvModels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear: Option<LinearModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polynomial: Option<Vec<PolynomialModel>>,
}

// ── Fitting ─────────────────────────────────────────────────────────

/// Fits with an intercept and maps a failed fit to the error that explains it.
fn solve<B: StatsBackend>(
    backend: &B,
    predictors: &[&[f64]],
    target: &[f64],
    target_name: &str,
) -> Result<LeastSquaresFit, EdaError> {
    if target.is_empty() {
        return Err(EdaError::InsufficientData {
            min_required: 1,
            actual: 0,
        });
    }
    backend
        .least_squares(predictors, target, true)
        .ok_or_else(|| EdaError::SingularDesign {
            target: target_name.to_string(),
        })
}

/// Goodness-of-fit figures shared by linear and polynomial models.
struct FitSummary {
    r_squared: f64,
    adj_r_squared: f64,
    rmse: f64,
    /// `n − p − 1`.
    df_resid: f64,
}

impl FitSummary {
    fn new(fit: &LeastSquaresFit, target: &[f64], p: usize) -> Self {
        let n = target.len() as f64;
        let df_resid = n - p as f64 - 1.0;
        let r_squared = fit.r_squared(target);
        Self {
            r_squared,
            adj_r_squared: 1.0 - (1.0 - r_squared) * (n - 1.0) / df_resid,
            rmse: (fit.rss() / n).sqrt(),
            df_resid,
        }
    }
}

/// Fits `dv` on all `ivs` by ordinary least squares.
///
/// With `n ≤ p + 1` the fit still completes; the statistics that need
/// residual degrees of freedom come out non-finite and serialize as
/// `null`.
///
/// # Errors
///
/// - [`EdaError::MissingValues`] if any IV or the DV has nulls
/// - [`EdaError::InsufficientData`] if no rows remain
/// - [`EdaError::SingularDesign`] if `XᵀX` of the IVs is singular
pub fn fit_linear<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    ivs: &[String],
    dv: &str,
) -> Result<LinearModel, EdaError> {
    let predictors = df.complete_columns(ivs)?;
    let target = df
        .complete_columns(&[dv.to_string()])?
        .pop()
        .unwrap_or_default();
    let refs: Vec<&[f64]> = predictors.iter().map(Vec::as_slice).collect();
    let fit = solve(backend, &refs, &target, dv)?;
    let gram_diagonal =
        backend
            .gram_inverse_diagonal(&refs)
            .ok_or_else(|| EdaError::SingularDesign {
                target: dv.to_string(),
            })?;

    let p = ivs.len() as f64;
    let summary = FitSummary::new(&fit, &target, ivs.len());
    let df_resid = summary.df_resid;
    let r2 = summary.r_squared;
    let f_statistic = (r2 / p) / ((1.0 - r2) / df_resid);
    let f_pvalue = if df_resid > 0.0 {
        backend.f_sf(f_statistic, p, df_resid)
    } else {
        f64::NAN
    };

    let mse = fit.rss() / df_resid;
    let coefficients = ivs
        .iter()
        .zip(&fit.coefficients)
        .map(|(name, &c)| (name.clone(), c))
        .collect();
    let p_values = ivs
        .iter()
        .zip(fit.coefficients.iter().zip(&gram_diagonal))
        .map(|(name, (&c, &g))| {
            let t = c / (g * mse).sqrt();
            (name.clone(), 2.0 * backend.t_sf(t.abs(), df_resid))
        })
        .collect();

    Ok(LinearModel {
        intercept: fit.intercept,
        coefficients,
        p_values,
        r_squared: r2,
        adj_r_squared: summary.adj_r_squared,
        rmse: summary.rmse,
        f_statistic,
        f_pvalue,
        residuals: truncate_series(&fit.residuals),
        predictions: truncate_series(&fit.fitted),
    })
}

/// Every monomial of `columns` with total degree 1..=`degree`.
///
/// Ordered by degree, then lexicographically by column index, so two
/// columns `a, b` at degree 2 expand to `a, b, a², ab, b²`.
pub fn polynomial_features(columns: &[Vec<f64>], degree: usize) -> Vec<Vec<f64>> {
    let k = columns.len();
    if k == 0 {
        return Vec::new();
    }
    let n = columns[0].len();
    let mut features = Vec::new();

    for d in 1..=degree {
        // non-decreasing index tuples of length d
        let mut combo = vec![0usize; d];
        loop {
            let feature = (0..n)
                .map(|row| combo.iter().map(|&c| columns[c][row]).product())
                .collect();
            features.push(feature);

            let Some(pos) = (0..d).rev().find(|&i| combo[i] + 1 < k) else {
                break;
            };
            combo[pos] += 1;
            let start = combo[pos];
            for slot in combo.iter_mut().skip(pos + 1) {
                *slot = start;
            }
        }
    }
    features
}

/// Fits `dv` on the degree-`degree` polynomial expansion of `ivs`.
///
/// Needs no residual degrees of freedom: an expansion with more features
/// than rows still reports its metrics, with a non-finite adjusted R².
///
/// # Errors
///
/// - [`EdaError::MissingValues`] if any IV or the DV has nulls
/// - [`EdaError::InsufficientData`] if no rows remain
pub fn fit_polynomial<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    ivs: &[String],
    dv: &str,
    degree: usize,
) -> Result<PolynomialModel, EdaError> {
    let predictors = df.complete_columns(ivs)?;
    let target = df
        .complete_columns(&[dv.to_string()])?
        .pop()
        .unwrap_or_default();
    let expanded = polynomial_features(&predictors, degree);
    let refs: Vec<&[f64]> = expanded.iter().map(Vec::as_slice).collect();
    let fit = solve(backend, &refs, &target, dv)?;
    let summary = FitSummary::new(&fit, &target, expanded.len());

    let n = target.len() as f64;
    let p = expanded.len() as f64;
    let log_mse = (fit.rss() / n).ln();

    Ok(PolynomialModel {
        degree,
        r_squared: summary.r_squared,
        adj_r_squared: summary.adj_r_squared,
        rmse: summary.rmse,
        aic: n * log_mse + 2.0 * p,
        bic: n * log_mse + p * n.ln(),
    })
}

// ── Stage ───────────────────────────────────────────────────────────

/// Fits the enabled model families for every DV.
pub fn fit_models<B: StatsBackend>(
    backend: &B,
    df: &DataFrame,
    ivs: &[String],
    dvs: &[String],
    models: &RegressionModels,
) -> Result<OrderedMap<DvModels>, EdaError> {
    let mut results = OrderedMap::new();
    for dv in dvs {
        let mut entry = DvModels::default();
        if models.linear {
            let model = fit_linear(backend, df, ivs, dv)?;
            tracing::debug!(dv = %dv, r_squared = model.r_squared, "linear model fitted");
            entry.linear = Some(model);
        }
        if models.polynomial {
            let fits = POLYNOMIAL_DEGREES
                .iter()
                .map(|&degree| fit_polynomial(backend, df, ivs, dv, degree))
                .collect::<Result<Vec<_>, _>>()?;
            entry.polynomial = Some(fits);
        }
        results.insert(dv.clone(), entry);
    }
    Ok(results)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FaultyBackend, NumflowBackend};
    use crate::MAX_SERIES_LEN;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    fn noisy_frame() -> DataFrame {
        let x1: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let x2: Vec<f64> = (0..30).map(|i| ((i * 7) % 11) as f64).collect();
        let noise: Vec<f64> = (0..30).map(|i| ((i * 13) % 5) as f64 - 2.0).collect();
        let y: Vec<f64> = (0..30)
            .map(|i| 1.0 + 0.5 * x1[i] - 0.3 * x2[i] + noise[i])
            .collect();
        DataFrame::from_numeric(vec![
            ("x1", x1.into_iter().map(Some).collect()),
            ("x2", x2.into_iter().map(Some).collect()),
            ("y", y.into_iter().map(Some).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn perfect_line() {
        let df = DataFrame::from_numeric(vec![
            ("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ("y", vec![Some(2.0), Some(4.0), Some(6.0), Some(8.0)]),
        ])
        .unwrap();
        let m = fit_linear(&NumflowBackend, &df, &names(&["x"]), "y").unwrap();
        assert!(m.intercept.abs() < 1e-8);
        assert!((m.coefficients.get("x").unwrap() - 2.0).abs() < 1e-8);
        assert!((m.r_squared - 1.0).abs() < 1e-10);
        assert!(m.rmse < 1e-8);
        assert_eq!(m.residuals.len(), 4);
    }

    #[test]
    fn noisy_fit_metrics() {
        let m = fit_linear(&NumflowBackend, &noisy_frame(), &names(&["x1", "x2"]), "y").unwrap();
        assert!(m.r_squared > 0.0 && m.r_squared <= 1.0);
        assert!(m.adj_r_squared <= m.r_squared);
        assert!(m.p_values.get("x1").unwrap() < &0.001);
        assert!(m.f_statistic > 0.0);
        assert!(m.f_pvalue < 0.001);
        let keys: Vec<&str> = m.coefficients.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x1", "x2"]);
        // rmse uses n, not n - p - 1
        let sse: f64 = m.residuals.iter().map(|e| e * e).sum();
        assert!((m.rmse - (sse / 30.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn nulls_abort() {
        let df = DataFrame::from_numeric(vec![
            ("x", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
            ("y", vec![Some(2.0), Some(4.0), Some(6.0), Some(8.0)]),
        ])
        .unwrap();
        let err = fit_linear(&NumflowBackend, &df, &names(&["x"]), "y").unwrap_err();
        assert!(matches!(err, EdaError::MissingValues { count: 1, .. }));
    }

    #[test]
    fn failed_solve_is_singular_design() {
        let backend = FaultyBackend {
            fail_least_squares: true,
            ..FaultyBackend::default()
        };
        let err = fit_linear(&backend, &noisy_frame(), &names(&["x1", "x2"]), "y").unwrap_err();
        assert_eq!(
            err,
            EdaError::SingularDesign {
                target: "y".into()
            }
        );
    }

    #[test]
    fn duplicated_iv_is_singular_design() {
        let x: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let x2: Vec<Option<f64>> = (0..10).map(|i| Some(2.0 * i as f64)).collect();
        let y: Vec<Option<f64>> = (0..10).map(|i| Some(1.0 + i as f64 + (i % 3) as f64)).collect();
        let df = DataFrame::from_numeric(vec![("x", x), ("x2", x2), ("y", y)]).unwrap();
        let err = fit_linear(&NumflowBackend, &df, &names(&["x", "x2"]), "y").unwrap_err();
        assert!(matches!(err, EdaError::SingularDesign { .. }));
    }

    #[test]
    fn constant_iv_still_fits() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 + 0.5 * v + [0.2, -0.1, 0.0, -0.3, 0.25][i % 5])
            .collect();
        let df = DataFrame::from_numeric(vec![
            ("x", x.into_iter().map(Some).collect()),
            ("c", vec![Some(5.0); 20]),
            ("y", y.into_iter().map(Some).collect()),
        ])
        .unwrap();
        let m = fit_linear(&NumflowBackend, &df, &names(&["x", "c"]), "y").unwrap();
        assert!((m.coefficients.get("x").unwrap() - 0.5).abs() < 0.05);
        assert!(m.coefficients.get("c").unwrap().abs() < 1e-8);
        assert!(*m.p_values.get("x").unwrap() < 0.001);
        assert!(*m.p_values.get("c").unwrap() > 0.99);
        assert!(m.r_squared > 0.99);
    }

    #[test]
    fn slope_p_value_uses_iv_only_gram() {
        // standard error from the raw Σx², not the centered one
        let x: Vec<f64> = (1..=6).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let df = DataFrame::from_numeric(vec![
            ("x", x.iter().copied().map(Some).collect()),
            ("y", y.iter().copied().map(Some).collect()),
        ])
        .unwrap();
        let m = fit_linear(&NumflowBackend, &df, &names(&["x"]), "y").unwrap();
        let slope = *m.coefficients.get("x").unwrap();
        let sse: f64 = m.residuals.iter().map(|e| e * e).sum();
        let sum_x2: f64 = x.iter().map(|v| v * v).sum();
        let t = slope / (sse / 4.0 / sum_x2).sqrt();
        let expected = 2.0 * NumflowBackend.t_sf(t.abs(), 4.0);
        assert!((m.p_values.get("x").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn saturated_fit_reports_null_statistics() {
        let df = DataFrame::from_numeric(vec![
            ("x", vec![Some(1.0), Some(2.0)]),
            ("y", vec![Some(2.0), Some(4.0)]),
        ])
        .unwrap();
        let m = fit_linear(&NumflowBackend, &df, &names(&["x"]), "y").unwrap();
        assert!((m.coefficients.get("x").unwrap() - 2.0).abs() < 1e-8);
        assert!(m.p_values.get("x").unwrap().is_nan());
        assert!(m.f_pvalue.is_nan());
        let json = serde_json::to_value(&m).unwrap();
        assert!(json["p_values"]["x"].is_null());
        assert!(json["f_pvalue"].is_null());
    }

    #[test]
    fn polynomial_needs_no_spare_rows() {
        let df = DataFrame::from_numeric(vec![
            ("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ("y", vec![Some(1.0), Some(3.0), Some(2.0), Some(5.0)]),
        ])
        .unwrap();
        let out = fit_models(
            &NumflowBackend,
            &df,
            &names(&["x"]),
            &names(&["y"]),
            &RegressionModels {
                linear: true,
                polynomial: true,
            },
        )
        .unwrap();
        let poly = out.get("y").unwrap().polynomial.as_ref().unwrap();
        assert_eq!(poly.len(), 2);
        // the cubic interpolates all four points
        assert!(poly[1].r_squared > 0.999_999);
        assert!(!poly[1].adj_r_squared.is_finite());
    }

    #[test]
    fn long_series_truncated() {
        let x: Vec<Option<f64>> = (0..1500).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..1500)
            .map(|i| Some(3.0 * i as f64 + ((i * 17) % 7) as f64))
            .collect();
        let df = DataFrame::from_numeric(vec![("x", x), ("y", y)]).unwrap();
        let m = fit_linear(&NumflowBackend, &df, &names(&["x"]), "y").unwrap();
        assert_eq!(m.residuals.len(), MAX_SERIES_LEN);
        assert_eq!(m.predictions.len(), MAX_SERIES_LEN);
    }

    #[test]
    fn feature_expansion_order() {
        let cols = vec![vec![2.0], vec![3.0]];
        let f2: Vec<f64> = polynomial_features(&cols, 2).into_iter().map(|c| c[0]).collect();
        assert_eq!(f2, vec![2.0, 3.0, 4.0, 6.0, 9.0]);
        let f3 = polynomial_features(&cols, 3);
        // 2 + 3 + 4 monomials
        assert_eq!(f3.len(), 9);
        assert_eq!(f3[8][0], 27.0);
    }

    #[test]
    fn polynomial_fits_quadratic() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 / 2.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v - 0.5 * v * v).collect();
        let noisy: Vec<f64> = y
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let df = DataFrame::from_numeric(vec![
            ("x", x.into_iter().map(Some).collect()),
            ("y", noisy.into_iter().map(Some).collect()),
        ])
        .unwrap();
        let quad = fit_polynomial(&NumflowBackend, &df, &names(&["x"]), "y", 2).unwrap();
        let lin = fit_linear(&NumflowBackend, &df, &names(&["x"]), "y").unwrap();
        assert_eq!(quad.degree, 2);
        assert!(quad.r_squared > 0.999);
        assert!(quad.r_squared > lin.r_squared);
        assert!(quad.aic < quad.bic);
    }

    #[test]
    fn stage_respects_toggles() {
        let x: Vec<Option<f64>> = (0..30).map(|i| Some(i as f64 / 10.0)).collect();
        let y: Vec<Option<f64>> = (0..30)
            .map(|i| Some((i as f64 / 10.0).sin() + ((i * 3) % 4) as f64 * 0.05))
            .collect();
        let df = DataFrame::from_numeric(vec![("x1", x), ("y", y)]).unwrap();
        let models = RegressionModels {
            linear: true,
            polynomial: true,
        };
        let out = fit_models(&NumflowBackend, &df, &names(&["x1"]), &names(&["y"]), &models)
            .unwrap();
        let entry = out.get("y").unwrap();
        assert!(entry.linear.is_some());
        let poly = entry.polynomial.as_ref().unwrap();
        assert_eq!(poly.iter().map(|m| m.degree).collect::<Vec<_>>(), vec![2, 3]);

        let out = fit_models(
            &NumflowBackend,
            &df,
            &names(&["x1"]),
            &names(&["y"]),
            &RegressionModels::default(),
        )
        .unwrap();
        let json = serde_json::to_string(out.get("y").unwrap()).unwrap();
        assert!(!json.contains("polynomial"));
    }
}
