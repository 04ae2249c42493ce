//! HTML report rendering.
//!
//! Turns the stage results into one self-contained HTML fragment with an
//! inline stylesheet: a header, a short executive summary and seven
//! collapsible sections (data quality, distributions, correlations,
//! regression, assumption tests, an interpretation guide and
//! recommendations). Every column name is HTML-escaped.

use crate::assumptions::DvAssumptions;
use crate::backend::CorrelationMethod;
use crate::confidence::Confidence;
use crate::config::OrderedMap;
use crate::correlation::{CorrelationResults, VIF_HIGH_THRESHOLD};
use crate::distribution::DistributionSummary;
use crate::quality::QualityIssue;
use crate::regression::DvModels;
use chrono::NaiveDateTime;
use std::borrow::Cow;

/// Everything the report draws from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Rows of the cleaned dataset.
    pub rows: usize,
    /// Columns of the cleaned dataset.
    pub columns: usize,
    /// Level below which a coefficient earns a `*`.
    pub alpha: f64,
    pub quality: &'a OrderedMap<QualityIssue>,
    pub distributions: &'a OrderedMap<DistributionSummary>,
    pub correlations: &'a CorrelationResults,
    pub regressions: &'a OrderedMap<DvModels>,
    pub assumptions: &'a OrderedMap<DvAssumptions>,
    /// DV → IV → confidence of that coefficient.
    pub confidence: &'a OrderedMap<OrderedMap<Confidence>>,
}

// ── Formatting helpers ──────────────────────────────────────────────

fn esc(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

/// Fixed-point number, or `N/A` when missing or not finite.
fn num(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "N/A".to_string(),
    }
}

/// `p < 0.001`, `p < 0.01`, otherwise `p = x.xxx`.
pub fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        "p = N/A".to_string()
    } else if p < 0.001 {
        "p < 0.001".to_string()
    } else if p < 0.01 {
        "p < 0.01".to_string()
    } else {
        format!("p = {p:.3}")
    }
}

/// `***` below 0.001, `**` below 0.01, `*` below `alpha`.
pub fn significance_stars(p: f64, alpha: f64) -> &'static str {
    if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < alpha {
        "*"
    } else {
        ""
    }
}

/// Status cell for a tri-state check outcome.
pub fn status_icon(passed: Option<bool>) -> &'static str {
    match passed {
        Some(true) => "✓ Pass",
        Some(false) => "❌ Fail",
        None => "⚠️ Warning",
    }
}

/// Status cell for a VIF value.
pub fn vif_status(vif: Option<f64>) -> &'static str {
    match vif {
        Some(v) if v > VIF_HIGH_THRESHOLD => "❌ High",
        _ => "✓ Acceptable",
    }
}

fn method_blurb(method: CorrelationMethod) -> (&'static str, &'static str) {
    match method {
        CorrelationMethod::Pearson => (
            "Pearson Correlation (Linear relationships)",
            "Measures the strength of straight-line association.",
        ),
        CorrelationMethod::Spearman => (
            "Spearman Correlation (Monotonic relationships)",
            "Recommended for non-normally distributed variables.",
        ),
        CorrelationMethod::Kendall => (
            "Kendall Correlation (Rank concordance)",
            "Robust for small samples and many tied values.",
        ),
    }
}

// ── Sections ────────────────────────────────────────────────────────

fn executive_summary() -> &'static str {
    r#"<p><strong>Key Findings:</strong></p>
<div class="finding">
<h4>✓ Analysis Complete</h4>
<p>Comprehensive exploratory data analysis has been performed on your dataset. Below are the main insights discovered:</p>
<ul>
<li>Correlation analysis reveals relationships between variables</li>
<li>Regression models quantify predictive relationships</li>
<li>Assumption tests validate the reliability of findings</li>
</ul>
<p><strong>Bottom Line:</strong> Review detailed sections below for specific findings and confidence levels for each relationship.</p>
</div>
"#
}

fn quality_section(input: &ReportInput<'_>) -> String {
    let mut html = format!(
        "<p><strong>Sample Size:</strong> {} observations</p>\n\
         <p><strong>Variables Analyzed:</strong> {}</p>\n",
        input.rows, input.columns
    );
    if !input.quality.is_empty() {
        html.push_str(
            "<p>Issues found before cleaning:</p>\n<table class='stat-table'><thead><tr>\
             <th>Variable</th><th>Missing</th><th>Missing %</th><th>Outliers</th><th>IQR Bounds</th>\
             </tr></thead><tbody>\n",
        );
        for (name, issue) in input.quality.iter() {
            let bounds = match (issue.lower_bound, issue.upper_bound) {
                (Some(lo), Some(hi)) => format!("[{}, {}]", num(Some(lo), 2), num(Some(hi), 2)),
                _ => "-".to_string(),
            };
            html.push_str(&format!(
                "<tr><td><strong>{}</strong></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                esc(name),
                issue.missing_count.unwrap_or(0),
                num(issue.missing_percent.or(Some(0.0)), 1),
                issue.outlier_count.unwrap_or(0),
                bounds
            ));
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str(
        "<div class=\"success\">✓ Data preprocessing complete. Analysis performed on cleaned dataset.</div>\n",
    );
    html
}

fn distribution_section(distributions: &OrderedMap<DistributionSummary>) -> String {
    if distributions.is_empty() {
        return "<p>No distribution analysis available.</p>\n".to_string();
    }
    let mut html = String::from(
        "<table class='stat-table'><thead><tr><th>Variable</th><th>Mean</th><th>Std Dev</th>\
         <th>Normality</th><th>Skewness</th></tr></thead><tbody>\n",
    );
    for (name, d) in distributions.iter() {
        let normality = if d.is_normal { "✓ Normal" } else { "❌ Non-normal" };
        html.push_str(&format!(
            "<tr><td><strong>{}</strong></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            esc(name),
            num(Some(d.mean), 2),
            num(Some(d.std), 2),
            normality,
            num(d.skewness, 2)
        ));
    }
    html.push_str("</tbody></table>\n");
    html
}

fn correlation_section(correlations: &CorrelationResults, alpha: f64) -> String {
    let mut html = String::new();
    let mut any = false;

    for (method, m) in correlations.matrices() {
        any = true;
        let (title, blurb) = method_blurb(method);
        html.push_str(&format!("<h4>{title}</h4>\n<p>{blurb}</p>\n"));
        html.push_str("<table class='stat-table'><thead><tr><th></th>");
        for label in &m.labels {
            html.push_str(&format!("<th>{}</th>", esc(label)));
        }
        html.push_str("</tr></thead><tbody>\n");
        for (i, label) in m.labels.iter().enumerate() {
            html.push_str(&format!("<tr><td><strong>{}</strong></td>", esc(label)));
            for (j, r) in m.matrix[i].iter().enumerate() {
                let stars = match m.pvalues[i][j] {
                    Some(p) if i != j => significance_stars(p, alpha),
                    _ => "",
                };
                html.push_str(&format!("<td>{}{stars}</td>", num(*r, 3)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody></table>\n");
    }

    if let Some(vif) = &correlations.vif {
        any = true;
        html.push_str(
            "<h4>Multicollinearity (VIF Scores)</h4>\n<table class='stat-table'><thead><tr>\
             <th>Variable</th><th>VIF</th><th>Status</th></tr></thead><tbody>\n",
        );
        for (name, value) in vif.iter() {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                esc(name),
                num(*value, 2),
                vif_status(*value)
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    if !any {
        return "<p>No correlation analysis available.</p>\n".to_string();
    }
    format!("<p>Correlation matrices calculated using multiple methods:</p>\n{html}")
}

fn confidence_bar(c: &Confidence) -> String {
    format!(
        "<div class=\"confidence-bar\"><div class=\"confidence-fill\" style=\"width: {score:.0}%; background: {color};\"></div></div>\
         <small>{label} ({score:.0}%)</small>",
        score = c.score,
        color = c.level.color(),
        label = c.level.label()
    )
}

fn regression_section(input: &ReportInput<'_>) -> String {
    if input.regressions.is_empty() {
        return "<p>No regression analysis available.</p>\n".to_string();
    }
    let mut html = String::new();
    for (dv, models) in input.regressions.iter() {
        html.push_str(&format!("<h4>Predicting: {}</h4>\n", esc(dv)));

        if let Some(linear) = &models.linear {
            html.push_str(&format!(
                "<div class=\"finding\">\n<p><strong>R² = {}</strong> (Adjusted R² = {})</p>\n\
                 <p><strong>F-statistic:</strong> {}, {}</p>\n<p><strong>RMSE:</strong> {}</p>\n\
                 <p><strong>Coefficients:</strong></p>\n<ul>\n",
                num(Some(linear.r_squared), 3),
                num(Some(linear.adj_r_squared), 3),
                num(Some(linear.f_statistic), 2),
                format_p_value(linear.f_pvalue),
                num(Some(linear.rmse), 3)
            ));
            let scores = input.confidence.get(dv);
            for (iv, coef) in linear.coefficients.iter() {
                let p = linear.p_values.get(iv).copied().unwrap_or(f64::NAN);
                html.push_str(&format!(
                    "<li>{}: {} {} ({})",
                    esc(iv),
                    num(Some(*coef), 3),
                    significance_stars(p, input.alpha),
                    format_p_value(p)
                ));
                if let Some(c) = scores.and_then(|s| s.get(iv)) {
                    html.push_str(&confidence_bar(c));
                }
                html.push_str("</li>\n");
            }
            html.push_str("</ul>\n</div>\n");
        }

        if let Some(poly) = &models.polynomial {
            html.push_str(
                "<table class='stat-table'><thead><tr><th>Polynomial Degree</th><th>R²</th>\
                 <th>Adjusted R²</th><th>RMSE</th><th>AIC</th><th>BIC</th></tr></thead><tbody>\n",
            );
            for m in poly {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    m.degree,
                    num(Some(m.r_squared), 3),
                    num(Some(m.adj_r_squared), 3),
                    num(Some(m.rmse), 3),
                    num(Some(m.aic), 1),
                    num(Some(m.bic), 1)
                ));
            }
            html.push_str("</tbody></table>\n");
        }
    }
    html.push_str("<p><small>*** p &lt; 0.001, ** p &lt; 0.01, * p &lt; α</small></p>\n");
    html
}

fn assumptions_section(assumptions: &OrderedMap<DvAssumptions>) -> String {
    if assumptions.is_empty() {
        return "<p>No assumption tests available.</p>\n".to_string();
    }
    let mut html = String::new();
    for (dv, a) in assumptions.iter() {
        html.push_str(&format!(
            "<h4>{}</h4>\n<table class='stat-table'><thead><tr><th>Assumption</th><th>Test</th>\
             <th>Result</th><th>Status</th></tr></thead><tbody>\n",
            esc(dv)
        ));
        let mut row = |name: &str, test: &str, result: String, passed: Option<bool>| {
            html.push_str(&format!(
                "<tr><td>{name}</td><td>{test}</td><td>{result}</td><td>{}</td></tr>\n",
                status_icon(passed)
            ));
        };

        row(
            "Linearity",
            "Residuals vs fitted",
            format!("r = {}", num(a.linearity.correlation, 3)),
            Some(a.linearity.passed),
        );
        if let Some(c) = &a.independence {
            row(
                "Independence",
                "Durbin-Watson",
                format!("DW = {}", num(c.durbin_watson, 3)),
                Some(c.passed),
            );
        }
        if let Some(c) = &a.homoscedasticity {
            let result = match (&c.error, c.breusch_pagan_pvalue) {
                (Some(err), _) => esc(err).into_owned(),
                (None, p) => format!(
                    "LM = {}, {}",
                    num(c.breusch_pagan_stat, 3),
                    format_p_value(p.unwrap_or(f64::NAN))
                ),
            };
            row("Homoscedasticity", "Breusch-Pagan", result, c.passed);
        }
        if let Some(c) = &a.normality_residuals {
            let (test, result) = match (c.shapiro_wilk_pvalue, c.anderson_stat) {
                (_, Some(stat)) => (
                    "Anderson-Darling",
                    format!("A² = {} (critical {})", num(Some(stat), 3), num(c.anderson_critical, 3)),
                ),
                (Some(p), None) => (
                    "Shapiro-Wilk",
                    format!("W = {}, {}", num(c.shapiro_wilk_stat, 3), format_p_value(p)),
                ),
                (None, None) => ("Shapiro-Wilk", "N/A".to_string()),
            };
            row("Normality of Residuals", test, result, c.passed);
        }
        html.push_str("</tbody></table>\n");
    }
    html
}

fn interpretation_guide() -> &'static str {
    r#"<p><strong>How to interpret your results:</strong></p>
<ul>
<li><strong>Correlation (ρ):</strong> -1 to +1. Closer to ±1 = stronger relationship</li>
<li><strong>P-value:</strong> &lt; 0.05 = statistically significant</li>
<li><strong>R²:</strong> Proportion of variance explained (0-1)</li>
<li><strong>VIF:</strong> &gt; 10 indicates problematic multicollinearity</li>
<li><strong>Confidence levels:</strong> Higher = more reliable finding</li>
</ul>
<div class="warning">⚠️ <strong>Important:</strong> Statistical significance does not equal practical importance. Always consider effect sizes and real-world context.</div>
"#
}

fn recommendations(input: &ReportInput<'_>) -> String {
    let mut html = String::from(
        "<p><strong>Recommended next steps:</strong></p>\n<ol>\n\
         <li>Review flagged assumption violations and consider robust alternatives</li>\n\
         <li>Investigate variables with high VIF scores for potential multicollinearity</li>\n\
         <li>Consider transformations for non-normally distributed variables</li>\n\
         <li>Validate findings with domain expertise and theoretical frameworks</li>\n\
         <li>For causal claims, consider experimental or quasi-experimental designs</li>\n\
         </ol>\n",
    );

    let failed: Vec<String> = input
        .assumptions
        .iter()
        .flat_map(|(dv, a)| {
            a.outcomes()
                .into_iter()
                .filter(|(_, p)| *p == Some(false))
                .map(move |(check, _)| format!("{} ({})", check, esc(dv)))
        })
        .collect();
    if !failed.is_empty() {
        html.push_str(&format!(
            "<div class=\"warning\">⚠️ Failed assumption checks: {}</div>\n",
            failed.join(", ")
        ));
    }

    let high_vif: Vec<String> = input
        .correlations
        .vif
        .iter()
        .flat_map(|v| v.iter())
        .filter(|(_, v)| v.is_some_and(|x| x > VIF_HIGH_THRESHOLD))
        .map(|(name, _)| esc(name).into_owned())
        .collect();
    if !high_vif.is_empty() {
        html.push_str(&format!(
            "<div class=\"warning\">⚠️ High multicollinearity: {}</div>\n",
            high_vif.join(", ")
        ));
    }

    html.push_str(
        "<div class=\"success\">✓ For publication, cite this tool and report all analysis parameters used.</div>\n",
    );
    html
}

const STYLE: &str = r#"<style>
.analysis-report { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; }
.report-header { background: linear-gradient(135deg, #2563eb 0%, #1e40af 100%); color: white; padding: 2rem; border-radius: 12px; margin-bottom: 2rem; }
.report-meta { opacity: 0.9; margin-top: 1rem; }
.executive-summary { background: #eff6ff; padding: 2rem; border-radius: 12px; border-left: 4px solid #2563eb; margin-bottom: 2rem; }
.finding { background: white; padding: 1.5rem; border-radius: 8px; margin: 1rem 0; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }
.confidence-bar { height: 8px; background: #e5e7eb; border-radius: 4px; overflow: hidden; margin: 0.5rem 0; }
.confidence-fill { height: 100%; transition: width 0.3s ease; }
details { background: white; padding: 1.5rem; border-radius: 12px; margin: 1rem 0; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
summary { cursor: pointer; font-weight: 600; font-size: 1.25rem; padding: 0.5rem; }
summary:hover { color: #2563eb; }
.stat-table { width: 100%; border-collapse: collapse; margin: 1rem 0; }
.stat-table th { background: #f3f4f6; padding: 0.75rem; text-align: left; border-bottom: 2px solid #e5e7eb; }
.stat-table td { padding: 0.75rem; border-bottom: 1px solid #e5e7eb; }
.section-divider { height: 2px; background: #e5e7eb; margin: 2rem 0; }
.warning { background: #fef3c7; border-left: 4px solid #f59e0b; padding: 1rem; margin: 1rem 0; }
.success { background: #d1fae5; border-left: 4px solid #10b981; padding: 1rem; margin: 1rem 0; }
</style>
"#;

// ── Public API ──────────────────────────────────────────────────────

/// Renders the report, stamping it with `generated_at`.
pub fn render_report(input: &ReportInput<'_>, generated_at: NaiveDateTime) -> String {
    let sections: [(&str, String, bool); 7] = [
        ("1. Data Quality Report", quality_section(input), true),
        ("2. Distribution Analysis", distribution_section(input.distributions), false),
        ("3. Correlation Analysis", correlation_section(input.correlations, input.alpha), false),
        ("4. Regression Analysis", regression_section(input), false),
        ("5. Assumption Testing", assumptions_section(input.assumptions), false),
        ("6. Interpretation Guide", interpretation_guide().to_string(), false),
        ("7. Recommendations &amp; Next Steps", recommendations(input), false),
    ];

    let mut html = format!(
        "<div class=\"analysis-report\">\n<div class=\"report-header\">\n<h2>📊 EDA Analysis Report</h2>\n\
         <p class=\"report-meta\">Generated: {}<br>Dataset: {} rows, {} columns</p>\n</div>\n\
         <div class=\"executive-summary\">\n<h3>🔍 Executive Summary</h3>\n{}</div>\n\
         <div class=\"section-divider\"></div>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        input.rows,
        input.columns,
        executive_summary()
    );
    for (title, body, open) in sections {
        let open = if open { " open" } else { "" };
        html.push_str(&format!(
            "<details{open}>\n<summary><h3>{title}</h3></summary>\n{body}</details>\n"
        ));
    }
    html.push_str("</div>\n");
    html.push_str(STYLE);
    html
}

/// Renders the report stamped with the current local time.
pub fn render_report_now(input: &ReportInput<'_>) -> String {
    render_report(input, chrono::Local::now().naive_local())
}

// ── Tests ───────────────────────────────────────────────────────────
