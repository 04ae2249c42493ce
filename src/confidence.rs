//! Confidence scoring for regression findings.
//!
//! Condenses the evidence behind one coefficient into a 0–100 score: the
//! coefficient's p-value, the strength of the underlying relationship, the
//! sample size and the health of the model's assumptions. The score maps
//! to one of four labels used by the report.
//!
//! ```
//! use u_eda::confidence::{ConfidenceInputs, ConfidenceLevel};
//!
//! let inputs = ConfidenceInputs {
//!     p_value: 0.0001,
//!     effect_size: 0.8,
//!     sample_size: 250,
//!     assumptions_met: true,
//!     normality_ok: true,
//!     outliers_removed: false,
//! };
//! assert_eq!(inputs.score(), 100.0);
//! assert_eq!(ConfidenceLevel::from_score(inputs.score()), ConfidenceLevel::High);
//! ```

use serde::Serialize;

/// Evidence about one finding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub p_value: f64,
    /// Correlation-scale effect size; only its magnitude matters.
    pub effect_size: f64,
    pub sample_size: usize,
    /// No model assumption check failed.
    pub assumptions_met: bool,
    /// Residuals passed (or were not tested for) normality.
    pub normality_ok: bool,
    /// Rows were removed as outliers during cleaning.
    pub outliers_removed: bool,
}

impl ConfidenceInputs {
    /// Score in `[0, 100]`, starting from 100 and subtracting penalties.
    ///
    /// An undefined p-value or effect size takes the largest penalty.
    pub fn score(&self) -> f64 {
        let mut score: f64 = 100.0;

        let p = self.p_value;
        if !(p <= 0.05) {
            score -= 50.0;
        } else if p > 0.01 {
            score -= 10.0;
        } else if p > 0.001 {
            score -= 5.0;
        }

        let effect = self.effect_size.abs();
        if !(effect >= 0.2) {
            score -= 20.0;
        } else if effect < 0.4 {
            score -= 10.0;
        }

        if self.sample_size < 30 {
            score -= 20.0;
        } else if self.sample_size < 100 {
            score -= 10.0;
        }

        if !self.normality_ok {
            score -= 10.0;
        }
        if self.outliers_removed {
            score -= 5.0;
        }
        if !self.assumptions_met {
            score -= 15.0;
        }

        score.clamp(0.0, 100.0)
    }
}

/// Confidence band of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Moderate,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    /// `≥ 80` high, `≥ 60` moderate, `≥ 40` low, else very low.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::High
        } else if score >= 60.0 {
            Self::Moderate
        } else if score >= 40.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "HIGH CONFIDENCE",
            Self::Moderate => "MODERATE CONFIDENCE",
            Self::Low => "LOW CONFIDENCE",
            Self::VeryLow => "VERY LOW CONFIDENCE",
        }
    }

    /// Hex color used for the confidence bar.
    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "#10b981",
            Self::Moderate => "#f59e0b",
            Self::Low => "#ef4444",
            Self::VeryLow => "#dc2626",
        }
    }
}

/// Scored finding as it appears in the analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
    pub score: f64,
    pub level: ConfidenceLevel,
}

impl From<ConfidenceInputs> for Confidence {
    fn from(inputs: ConfidenceInputs) -> Self {
        let score = inputs.score();
        Self {
            score,
            level: ConfidenceLevel::from_score(score),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn strong() -> ConfidenceInputs {
        ConfidenceInputs {
            p_value: 0.0001,
            effect_size: 0.9,
            sample_size: 500,
            assumptions_met: true,
            normality_ok: true,
            outliers_removed: false,
        }
    }

    #[test]
    fn p_value_bands() {
        let at = |p| ConfidenceInputs { p_value: p, ..strong() }.score();
        assert_eq!(at(0.0005), 100.0);
        assert_eq!(at(0.005), 95.0);
        assert_eq!(at(0.03), 90.0);
        assert_eq!(at(0.2), 50.0);
        assert_eq!(at(f64::NAN), 50.0);
    }

    #[test]
    fn effect_and_sample_bands() {
        assert_eq!(ConfidenceInputs { effect_size: -0.3, ..strong() }.score(), 90.0);
        assert_eq!(ConfidenceInputs { effect_size: 0.1, ..strong() }.score(), 80.0);
        assert_eq!(ConfidenceInputs { sample_size: 50, ..strong() }.score(), 90.0);
        assert_eq!(ConfidenceInputs { sample_size: 10, ..strong() }.score(), 80.0);
    }

    #[test]
    fn penalties_accumulate_and_clamp() {
        let worst = ConfidenceInputs {
            p_value: 0.5,
            effect_size: 0.0,
            sample_size: 5,
            assumptions_met: false,
            normality_ok: false,
            outliers_removed: true,
        };
        // 100 - 50 - 20 - 20 - 10 - 5 - 15 = -20
        assert_eq!(worst.score(), 0.0);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(ConfidenceLevel::from_score(80.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(79.9), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_score(40.0), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(39.0), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::VeryLow.label(), "VERY LOW CONFIDENCE");
        assert_eq!(ConfidenceLevel::High.color(), "#10b981");
    }

    #[test]
    fn serializes_level_name() {
        let c = Confidence::from(strong());
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"score":100.0,"level":"HIGH"}"#);
    }
}
