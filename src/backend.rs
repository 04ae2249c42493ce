//! Statistics backend.
//!
//! Every stage reaches the numerical routines it needs through the
//! [`StatsBackend`] trait. [`NumflowBackend`] is the production
//! implementation and delegates to `u-numflow` (descriptive statistics,
//! distribution functions, matrix decompositions) and `u-analytics`
//! (normality tests, correlation tests).
//!
//! Following the `u-analytics` convention, backend methods return `None`
//! when a routine cannot produce a result (too few observations, zero
//! variance, singular system). Stages decide whether `None` is fatal.
//!
//! Least squares is rank tolerant: collinear or constant predictors get
//! the minimum-norm solution instead of failing, so only the explicit
//! [`StatsBackend::gram_inverse_diagonal`] call reports singularity.

use serde::{Deserialize, Serialize};
use u_numflow::matrix::Matrix;

/// Eigenvalues of the scaled normal matrix below this fraction of the
/// largest are treated as zero.
const RANK_TOLERANCE: f64 = 1e-12;

// ── Types ─────────────────────────────────────────────────────────────

/// Bivariate correlation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    Pearson,
    /// Spearman rank correlation.
    Spearman,
    /// Kendall tau-b.
    Kendall,
}

impl CorrelationMethod {
    /// Lowercase name used as a result key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
            Self::Kendall => "kendall",
        }
    }
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistic and p-value of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// Least squares fit, optionally with an intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    /// `0.0` for fits without an intercept.
    pub intercept: f64,
    /// One slope per predictor. Directions the data cannot identify get 0.
    pub coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl LeastSquaresFit {
    /// Residual sum of squares.
    pub fn rss(&self) -> f64 {
        self.residuals.iter().map(|e| e * e).sum()
    }

    /// Centered R², `1 − RSS/Σ(y − ȳ)²`.
    ///
    /// A constant target scores 1 when fitted exactly and 0 otherwise.
    pub fn r_squared(&self, target: &[f64]) -> f64 {
        let n = target.len() as f64;
        let mean = target.iter().sum::<f64>() / n;
        let ss_tot: f64 = target.iter().map(|y| (y - mean).powi(2)).sum();
        let rss = self.rss();
        if ss_tot == 0.0 {
            return if rss == 0.0 { 1.0 } else { 0.0 };
        }
        1.0 - rss / ss_tot
    }

    /// Uncentered R², `1 − RSS/Σy²`. NaN for an all-zero target.
    pub fn uncentered_r_squared(&self, target: &[f64]) -> f64 {
        let ss: f64 = target.iter().map(|y| y * y).sum();
        1.0 - self.rss() / ss
    }
}

// ── Trait ─────────────────────────────────────────────────────────────

/// Numerical routines used by the analysis stages.
pub trait StatsBackend {
    /// Arithmetic mean.
    fn mean(&self, data: &[f64]) -> Option<f64>;
    /// Median.
    fn median(&self, data: &[f64]) -> Option<f64>;
    /// Sample standard deviation (n − 1 denominator).
    fn std_dev(&self, data: &[f64]) -> Option<f64>;
    /// Smallest value.
    fn min(&self, data: &[f64]) -> Option<f64>;
    /// Largest value.
    fn max(&self, data: &[f64]) -> Option<f64>;
    /// Sample skewness.
    fn skewness(&self, data: &[f64]) -> Option<f64>;
    /// Excess kurtosis (normal = 0).
    fn kurtosis(&self, data: &[f64]) -> Option<f64>;
    /// Linear-interpolated quantile, `q` in `[0, 1]`.
    fn quantile(&self, data: &[f64], q: f64) -> Option<f64>;

    /// Shapiro-Wilk W and p-value.
    fn shapiro_wilk(&self, data: &[f64]) -> Option<TestOutcome>;
    /// Anderson-Darling for normality; `statistic` is the raw A².
    fn anderson_darling(&self, data: &[f64]) -> Option<TestOutcome>;
    /// Bivariate correlation coefficient and two-sided p-value.
    fn correlation(&self, method: CorrelationMethod, x: &[f64], y: &[f64]) -> Option<TestOutcome>;

    /// Least squares of `target` on `predictors` (one slice per predictor).
    ///
    /// Rank deficiency is tolerated. `None` only for empty, ragged or
    /// non-finite input.
    fn least_squares(
        &self,
        predictors: &[&[f64]],
        target: &[f64],
        intercept: bool,
    ) -> Option<LeastSquaresFit>;

    /// Diagonal of `(XᵀX)⁻¹` for the predictor-only design `X`.
    /// `None` if `XᵀX` is singular.
    fn gram_inverse_diagonal(&self, predictors: &[&[f64]]) -> Option<Vec<f64>>;

    /// Upper-tail probability of Student's t distribution.
    fn t_sf(&self, t: f64, df: f64) -> f64;

    /// Upper-tail probability of the χ² distribution.
    fn chi_squared_sf(&self, x: f64, df: f64) -> f64;

    /// Upper-tail probability of the F distribution.
    fn f_sf(&self, f: f64, d1: f64, d2: f64) -> f64;

    /// Breusch-Pagan test (Koenker's studentized form).
    ///
    /// Regresses the squared residuals on the predictors plus a constant;
    /// the statistic is `n·R²`, compared against χ² with one degree of
    /// freedom per non-constant predictor. A constant predictor stands in
    /// for the intercept rather than adding a second one.
    fn breusch_pagan(&self, residuals: &[f64], predictors: &[&[f64]]) -> Option<TestOutcome> {
        let df = predictors
            .iter()
            .filter(|c| c.iter().any(|&v| v != c[0]))
            .count();
        if df == 0 {
            return None;
        }
        let squared: Vec<f64> = residuals.iter().map(|e| e * e).collect();
        if squared.iter().all(|&v| v == squared[0]) {
            return None;
        }
        let aux = self.least_squares(predictors, &squared, true)?;
        let statistic = residuals.len() as f64 * aux.r_squared(&squared);
        if !statistic.is_finite() {
            return None;
        }
        Some(TestOutcome {
            statistic,
            p_value: self.chi_squared_sf(statistic, df as f64),
        })
    }

    /// Durbin-Watson statistic `Σ(eₜ − eₜ₋₁)² / Σeₜ²`.
    fn durbin_watson(&self, residuals: &[f64]) -> Option<f64> {
        if residuals.len() < 2 {
            return None;
        }
        let denom: f64 = residuals.iter().map(|e| e * e).sum();
        if denom <= 0.0 {
            return None;
        }
        let num: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
        Some(num / denom)
    }
}

// ── NumflowBackend ────────────────────────────────────────────────────

/// Production backend over `u-numflow` and `u-analytics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumflowBackend;

impl StatsBackend for NumflowBackend {
    fn mean(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::mean(data)
    }

    fn median(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::median(data)
    }

    fn std_dev(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::std_dev(data)
    }

    fn min(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::min(data)
    }

    fn max(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::max(data)
    }

    fn skewness(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::skewness(data)
    }

    fn kurtosis(&self, data: &[f64]) -> Option<f64> {
        u_numflow::stats::kurtosis(data)
    }

    fn quantile(&self, data: &[f64], q: f64) -> Option<f64> {
        u_numflow::stats::quantile(data, q)
    }

    fn shapiro_wilk(&self, data: &[f64]) -> Option<TestOutcome> {
        u_analytics::testing::shapiro_wilk_test(data).map(|r| TestOutcome {
            statistic: r.w,
            p_value: r.p_value,
        })
    }

    fn anderson_darling(&self, data: &[f64]) -> Option<TestOutcome> {
        u_analytics::testing::anderson_darling_test(data).map(|r| TestOutcome {
            statistic: r.statistic,
            p_value: r.p_value,
        })
    }

    fn correlation(&self, method: CorrelationMethod, x: &[f64], y: &[f64]) -> Option<TestOutcome> {
        let result = match method {
            CorrelationMethod::Pearson => u_analytics::correlation::pearson(x, y),
            CorrelationMethod::Spearman => u_analytics::correlation::spearman(x, y),
            CorrelationMethod::Kendall => u_analytics::correlation::kendall_tau_b(x, y),
        }?;
        if !result.r.is_finite() {
            return None;
        }
        Some(TestOutcome {
            statistic: result.r,
            p_value: result.p_value,
        })
    }

    fn least_squares(
        &self,
        predictors: &[&[f64]],
        target: &[f64],
        intercept: bool,
    ) -> Option<LeastSquaresFit> {
        let n = target.len();
        if n == 0
            || predictors.iter().any(|c| c.len() != n)
            || !target
                .iter()
                .chain(predictors.iter().copied().flatten())
                .all(|v| v.is_finite())
        {
            return None;
        }

        // With an intercept, solve on centered data and recover β₀ from the means.
        let x_means: Vec<f64> = if intercept {
            predictors.iter().copied().map(column_mean).collect()
        } else {
            vec![0.0; predictors.len()]
        };
        let y_mean = if intercept { column_mean(target) } else { 0.0 };
        let columns: Vec<Vec<f64>> = predictors
            .iter()
            .zip(&x_means)
            .map(|(c, m)| c.iter().map(|v| v - m).collect())
            .collect();
        let y: Vec<f64> = target.iter().map(|v| v - y_mean).collect();

        let coefficients = min_norm_solve(&columns, &y)?;
        let offset = y_mean
            - x_means
                .iter()
                .zip(&coefficients)
                .map(|(m, b)| m * b)
                .sum::<f64>();
        let fitted: Vec<f64> = (0..n)
            .map(|i| {
                offset
                    + predictors
                        .iter()
                        .zip(&coefficients)
                        .map(|(c, b)| c[i] * b)
                        .sum::<f64>()
            })
            .collect();
        let residuals = target.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        Some(LeastSquaresFit {
            intercept: offset,
            coefficients,
            fitted,
            residuals,
        })
    }

    fn gram_inverse_diagonal(&self, predictors: &[&[f64]]) -> Option<Vec<f64>> {
        let p = predictors.len();
        if p == 0 {
            return Some(Vec::new());
        }
        let mut gram = vec![0.0; p * p];
        for i in 0..p {
            for j in i..p {
                let g = dot(predictors[i], predictors[j]);
                gram[i * p + j] = g;
                gram[j * p + i] = g;
            }
        }
        let diagonal = Matrix::new(p, p, gram).ok()?.inverse().ok()?.diag();
        diagonal.iter().all(|v| v.is_finite()).then_some(diagonal)
    }

    fn t_sf(&self, t: f64, df: f64) -> f64 {
        if t.is_nan() || df <= 0.0 {
            return f64::NAN;
        }
        if t.is_infinite() {
            return if t > 0.0 { 0.0 } else { 1.0 };
        }
        (1.0 - u_numflow::special::t_distribution_cdf(t, df)).clamp(0.0, 1.0)
    }

    fn chi_squared_sf(&self, x: f64, df: f64) -> f64 {
        (1.0 - u_numflow::special::chi_squared_cdf(x, df)).clamp(0.0, 1.0)
    }

    fn f_sf(&self, f: f64, d1: f64, d2: f64) -> f64 {
        if f.is_infinite() {
            return 0.0;
        }
        (1.0 - u_numflow::special::f_distribution_cdf(f, d1, d2)).clamp(0.0, 1.0)
    }
}

// ── Least squares helpers ─────────────────────────────────────────────

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn column_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Minimum-norm solution of `min ‖Xβ − y‖` through the eigendecomposition
/// of the column-scaled normal matrix.
///
/// Directions with eigenvalue below [`RANK_TOLERANCE`] of the largest are
/// dropped, so a zero or duplicated column gets coefficient 0 (or shares
/// the weight) instead of making the system singular.
fn min_norm_solve(columns: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let p = columns.len();
    if p == 0 {
        return Some(Vec::new());
    }
    let scales: Vec<f64> = columns
        .iter()
        .map(|c| {
            let norm = dot(c, c).sqrt();
            if norm > 0.0 {
                norm
            } else {
                1.0
            }
        })
        .collect();

    let mut gram = vec![0.0; p * p];
    for i in 0..p {
        for j in i..p {
            let g = dot(&columns[i], &columns[j]) / (scales[i] * scales[j]);
            gram[i * p + j] = g;
            gram[j * p + i] = g;
        }
    }
    let xty: Vec<f64> = columns
        .iter()
        .zip(&scales)
        .map(|(c, s)| dot(c, y) / s)
        .collect();

    let (eigenvalues, eigenvectors) = Matrix::new(p, p, gram).ok()?.eigen_symmetric().ok()?;
    let largest = eigenvalues.iter().copied().fold(0.0, f64::max);

    let mut beta = vec![0.0; p];
    for (k, &lambda) in eigenvalues.iter().enumerate() {
        if lambda <= largest * RANK_TOLERANCE {
            continue;
        }
        let weight = (0..p)
            .map(|j| eigenvectors.get(j, k) * xty[j])
            .sum::<f64>()
            / lambda;
        for (j, b) in beta.iter_mut().enumerate() {
            *b += weight * eigenvectors.get(j, k);
        }
    }
    let beta: Vec<f64> = beta.iter().zip(&scales).map(|(b, s)| b / s).collect();
    beta.iter().all(|b| b.is_finite()).then_some(beta)
}

// ── Test support ──────────────────────────────────────────────────────

/// Backend that delegates to [`NumflowBackend`] but can be told to fail
/// selected routines, for exercising error paths.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FaultyBackend {
    pub fail_least_squares: bool,
    pub fail_breusch_pagan: bool,
}

#[cfg(test)]
impl StatsBackend for FaultyBackend {
    fn mean(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.mean(data)
    }

    fn median(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.median(data)
    }

    fn std_dev(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.std_dev(data)
    }

    fn min(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.min(data)
    }

    fn max(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.max(data)
    }

    fn skewness(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.skewness(data)
    }

    fn kurtosis(&self, data: &[f64]) -> Option<f64> {
        NumflowBackend.kurtosis(data)
    }

    fn quantile(&self, data: &[f64], q: f64) -> Option<f64> {
        NumflowBackend.quantile(data, q)
    }

    fn shapiro_wilk(&self, data: &[f64]) -> Option<TestOutcome> {
        NumflowBackend.shapiro_wilk(data)
    }

    fn anderson_darling(&self, data: &[f64]) -> Option<TestOutcome> {
        NumflowBackend.anderson_darling(data)
    }

    fn correlation(&self, method: CorrelationMethod, x: &[f64], y: &[f64]) -> Option<TestOutcome> {
        NumflowBackend.correlation(method, x, y)
    }

    fn least_squares(
        &self,
        predictors: &[&[f64]],
        target: &[f64],
        intercept: bool,
    ) -> Option<LeastSquaresFit> {
        if self.fail_least_squares {
            return None;
        }
        NumflowBackend.least_squares(predictors, target, intercept)
    }

    fn gram_inverse_diagonal(&self, predictors: &[&[f64]]) -> Option<Vec<f64>> {
        NumflowBackend.gram_inverse_diagonal(predictors)
    }

    fn t_sf(&self, t: f64, df: f64) -> f64 {
        NumflowBackend.t_sf(t, df)
    }

    fn chi_squared_sf(&self, x: f64, df: f64) -> f64 {
        NumflowBackend.chi_squared_sf(x, df)
    }

    fn f_sf(&self, f: f64, d1: f64, d2: f64) -> f64 {
        NumflowBackend.f_sf(f, d1, d2)
    }

    fn breusch_pagan(&self, residuals: &[f64], predictors: &[&[f64]]) -> Option<TestOutcome> {
        if self.fail_breusch_pagan {
            return None;
        }
        NumflowBackend.breusch_pagan(residuals, predictors)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_stats() {
        let b = NumflowBackend;
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((b.mean(&data).unwrap() - 3.0).abs() < 1e-10);
        assert!((b.median(&data).unwrap() - 3.0).abs() < 1e-10);
        assert!((b.quantile(&data, 0.25).unwrap() - 2.0).abs() < 1e-10);
        assert!((b.std_dev(&data).unwrap() - 2.5_f64.sqrt()).abs() < 1e-10);
        assert_eq!(b.min(&data), Some(1.0));
        assert_eq!(b.max(&data), Some(5.0));
    }

    #[test]
    fn quantile_interpolates() {
        let b = NumflowBackend;
        let q = b.quantile(&[1.0, 2.0, 3.0, 4.0], 0.25).unwrap();
        assert!((q - 1.75).abs() < 1e-10);
    }

    // ── Least squares ──

    #[test]
    fn least_squares_perfect_line() {
        let b = NumflowBackend;
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let fit = b.least_squares(&[&x], &y, true).unwrap();
        assert!((fit.intercept - 1.0).abs() < 1e-8);
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-8);
        assert!((fit.r_squared(&y) - 1.0).abs() < 1e-10);
        assert!(fit.rss() < 1e-12);
    }

    #[test]
    fn least_squares_two_predictors() {
        let b = NumflowBackend;
        let x1: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let x2: Vec<f64> = (0..12).map(|i| ((i * 5) % 7) as f64).collect();
        let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, c)| 4.0 + 1.5 * a - 0.5 * c).collect();
        let fit = b.least_squares(&[&x1, &x2], &y, true).unwrap();
        assert!((fit.intercept - 4.0).abs() < 1e-8);
        assert!((fit.coefficients[0] - 1.5).abs() < 1e-8);
        assert!((fit.coefficients[1] + 0.5).abs() < 1e-8);
    }

    #[test]
    fn least_squares_tolerates_constant_predictor() {
        let b = NumflowBackend;
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let c = vec![5.0; 10];
        let y: Vec<f64> = x.iter().map(|v| 2.0 + 3.0 * v).collect();
        let fit = b.least_squares(&[&x, &c], &y, true).unwrap();
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-8);
        assert!(fit.coefficients[1].abs() < 1e-8);
        assert!((fit.intercept - 2.0).abs() < 1e-8);
    }

    #[test]
    fn least_squares_splits_duplicated_column() {
        let b = NumflowBackend;
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let fit = b.least_squares(&[&x, &x], &y, false).unwrap();
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-8);
        assert!((fit.coefficients[1] - 1.0).abs() < 1e-8);
        assert!(fit.rss() < 1e-12);
    }

    #[test]
    fn least_squares_without_intercept_passes_through_origin() {
        let b = NumflowBackend;
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 3.0, 7.0];
        let fit = b.least_squares(&[&x], &y, false).unwrap();
        // β = Σxy / Σx² = 29 / 14
        assert_eq!(fit.intercept, 0.0);
        assert!((fit.coefficients[0] - 29.0 / 14.0).abs() < 1e-10);
        let rss = fit.rss();
        assert!((fit.uncentered_r_squared(&y) - (1.0 - rss / 62.0)).abs() < 1e-12);
    }

    #[test]
    fn least_squares_rejects_bad_input() {
        let b = NumflowBackend;
        assert!(b.least_squares(&[&[1.0, 2.0]], &[1.0], true).is_none());
        assert!(b.least_squares(&[&[1.0, f64::NAN]], &[1.0, 2.0], true).is_none());
        assert!(b.least_squares(&[], &[], true).is_none());
    }

    #[test]
    fn r_squared_of_constant_target() {
        let b = NumflowBackend;
        let y = [3.0, 3.0, 3.0];
        let fit = b.least_squares(&[&[1.0, 2.0, 4.0]], &y, true).unwrap();
        assert_eq!(fit.r_squared(&y), 1.0);
    }

    #[test]
    fn gram_inverse_diagonal_of_orthogonal_columns() {
        let b = NumflowBackend;
        let d = b
            .gram_inverse_diagonal(&[&[1.0, 0.0, 0.0], &[0.0, 2.0, 0.0]])
            .unwrap();
        assert!((d[0] - 1.0).abs() < 1e-12);
        assert!((d[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn gram_inverse_diagonal_singular_is_none() {
        let b = NumflowBackend;
        let x = [1.0, 2.0, 3.0];
        let x2 = [2.0, 4.0, 6.0];
        assert!(b.gram_inverse_diagonal(&[&x, &x2]).is_none());
    }

    #[test]
    fn t_sf_tails() {
        let b = NumflowBackend;
        assert!((b.t_sf(0.0, 10.0) - 0.5).abs() < 1e-10);
        assert!(b.t_sf(10.0, 30.0) < 1e-6);
        assert_eq!(b.t_sf(f64::INFINITY, 5.0), 0.0);
        assert!(b.t_sf(1.0, 0.0).is_nan());
    }

    // ── Diagnostics ──

    #[test]
    fn correlation_zero_variance_is_none() {
        let b = NumflowBackend;
        let x = [1.0, 1.0, 1.0, 1.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert!(b.correlation(CorrelationMethod::Pearson, &x, &y).is_none());
    }

    #[test]
    fn correlation_methods_agree_on_monotone_data() {
        let b = NumflowBackend;
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
        for method in [
            CorrelationMethod::Pearson,
            CorrelationMethod::Spearman,
            CorrelationMethod::Kendall,
        ] {
            let r = b.correlation(method, &x, &y).unwrap();
            assert!(r.statistic > 0.9, "{method}: {}", r.statistic);
        }
    }

    #[test]
    fn durbin_watson_extremes() {
        let b = NumflowBackend;
        // alternating residuals: strong negative autocorrelation, DW near 4
        let alt: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(b.durbin_watson(&alt).unwrap() > 3.5);
        // slowly drifting residuals: strong positive autocorrelation, DW near 0
        let drift: Vec<f64> = (0..20).map(|i| i as f64 - 9.5).collect();
        assert!(b.durbin_watson(&drift).unwrap() < 0.5);
        assert!(b.durbin_watson(&[0.0, 0.0]).is_none());
        assert!(b.durbin_watson(&[1.0]).is_none());
    }

    #[test]
    fn breusch_pagan_detects_fanning_variance() {
        let b = NumflowBackend;
        let x: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let resid: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| if i % 2 == 0 { v } else { -v })
            .collect();
        let bp = b.breusch_pagan(&resid, &[&x]).unwrap();
        assert!(bp.statistic > 0.0);
        assert!(bp.p_value < 0.05);
    }

    #[test]
    fn breusch_pagan_without_predictors_is_none() {
        assert!(NumflowBackend.breusch_pagan(&[1.0, -1.0, 1.0], &[]).is_none());
        let c = [4.0, 4.0, 4.0];
        assert!(NumflowBackend.breusch_pagan(&[1.0, -2.0, 1.0], &[&c]).is_none());
    }

    #[test]
    fn breusch_pagan_constant_predictor_is_not_counted() {
        let b = NumflowBackend;
        let x: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let c = vec![5.0; 40];
        let resid: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| if i % 2 == 0 { v } else { -v })
            .collect();
        let alone = b.breusch_pagan(&resid, &[&x]).unwrap();
        let with_constant = b.breusch_pagan(&resid, &[&x, &c]).unwrap();
        assert!((alone.statistic - with_constant.statistic).abs() < 1e-8);
        assert!((alone.p_value - with_constant.p_value).abs() < 1e-10);
    }

    #[test]
    fn chi_squared_sf_bounds() {
        let b = NumflowBackend;
        assert!((b.chi_squared_sf(0.0, 2.0) - 1.0).abs() < 1e-10);
        assert!(b.chi_squared_sf(100.0, 1.0) < 1e-10);
        assert_eq!(b.f_sf(f64::INFINITY, 1.0, 5.0), 0.0);
        assert!(b.f_sf(1000.0, 1.0, 20.0) < 1e-6);
    }

    #[test]
    fn method_names() {
        assert_eq!(CorrelationMethod::Kendall.to_string(), "kendall");
        assert_eq!(
            serde_json::to_string(&CorrelationMethod::Spearman).unwrap(),
            "\"spearman\""
        );
    }
}
