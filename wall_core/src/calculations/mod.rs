//! # Characteristic Value Calculations
//!
//! The numeric pipeline from envelope to allowable strength. Each stage
//! follows the pattern used across this crate:
//!
//! - plain serializable inputs and outputs
//! - `solve(...) -> CalcResult<...>` pure functions
//! - recoverable substitutions reported as [`Degeneracy`] values instead of errors
//!
//! ## Stages
//!
//! - [`line_method`] - yield point (Py, δy) from three reference lines
//! - [`energy`] - bilinear elasto-plastic model (K, Pu, δv, δu, μ) by equal energy
//! - [`characteristic`] - two-pass orchestration, P0 criteria, Pa and magnification

pub mod characteristic;
pub mod energy;
pub mod line_method;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use characteristic::{evaluate, AnalysisResult, P0Criterion};
pub use energy::EnergyEquivalentResult;
pub use line_method::LineMethodResult;

/// A straight line `load = slope · deformation + intercept` in
/// (|deformation|, |load|) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    /// Line through two points given as (deformation, load).
    ///
    /// Returns `None` when both points share a deformation.
    pub fn through(p1: (f64, f64), p2: (f64, f64)) -> Option<Line> {
        let run = p2.0 - p1.0;
        if run == 0.0 {
            return None;
        }
        let slope = (p2.1 - p1.1) / run;
        Some(Line {
            slope,
            intercept: p1.1 - slope * p1.0,
        })
    }

    /// Load on the line at `deformation`
    pub fn at(&self, deformation: f64) -> f64 {
        self.slope * deformation + self.intercept
    }

    /// Intersection point (deformation, load); `None` for parallel lines.
    pub fn intersect(&self, other: &Line) -> Option<(f64, f64)> {
        let denom = self.slope - other.slope;
        if denom == 0.0 {
            return None;
        }
        let x = (other.intercept - self.intercept) / denom;
        Some((x, self.at(x)))
    }
}

/// A recoverable substitution made while computing a result.
///
/// The result stays numerically consistent; these explain which documented
/// fallback produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degeneracy {
    /// No segment crossed the load fraction; the last envelope point was used
    CrossingFallback { load_fraction: f64 },

    /// Energy area too large for the bilinear model; Pu = Py, δv = δy
    NegativeDiscriminant { discriminant: f64 },

    /// 2μ − 1 ≤ 0, so the ductility criterion P0(b) uses Py
    DuctilityOutOfDomain { mu: f64 },

    /// Fewer than 3 points up to δu; first-pass values retained
    RestrictedEnvelopeTooShort { points: usize },

    /// The refinement pass failed; first-pass values retained
    RefinementFailed { reason: String },

    /// Specific deformation not bracketed by the envelope; P0(d) uses Pmax
    SpecificDeformationOutOfRange { target: f64 },
}

impl Degeneracy {
    /// Human-readable description for logs and reports
    pub fn message(&self) -> String {
        match self {
            Degeneracy::CrossingFallback { load_fraction } => {
                format!("No envelope segment crosses {} Pmax; last point used", load_fraction)
            }
            Degeneracy::NegativeDiscriminant { discriminant } => format!(
                "Energy discriminant is negative ({:.6}); Pu falls back to Py",
                discriminant
            ),
            Degeneracy::DuctilityOutOfDomain { mu } => {
                format!("2μ-1 ≤ 0 (μ = {:.4}); P0(b) falls back to Py", mu)
            }
            Degeneracy::RestrictedEnvelopeTooShort { points } => format!(
                "Only {} envelope points up to δu; first-pass values retained",
                points
            ),
            Degeneracy::RefinementFailed { reason } => {
                format!("Refinement pass failed ({}); first-pass values retained", reason)
            }
            Degeneracy::SpecificDeformationOutOfRange { target } => format!(
                "Specific deformation {:.6} rad is outside the envelope; P0(d) uses Pmax",
                target
            ),
        }
    }

    pub(crate) fn log(&self) {
        tracing::warn!(degeneracy = ?self, "{}", self.message());
    }
}

/// Outcome of a full evaluation, tagged by whether any fallback was taken.
///
/// ## JSON Example
///
/// ```json
/// { "status": "degenerate", "result": { "p0": 4.73, "...": "..." },
///   "reasons": [ { "kind": "specific_deformation_out_of_range", "target": 0.0083 } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis {
    Ok { result: AnalysisResult },
    Degenerate {
        result: AnalysisResult,
        reasons: Vec<Degeneracy>,
    },
}

impl Analysis {
    pub(crate) fn from_parts(result: AnalysisResult, reasons: Vec<Degeneracy>) -> Analysis {
        if reasons.is_empty() {
            Analysis::Ok { result }
        } else {
            Analysis::Degenerate { result, reasons }
        }
    }

    /// The computed values, regardless of tag
    pub fn result(&self) -> &AnalysisResult {
        match self {
            Analysis::Ok { result } | Analysis::Degenerate { result, .. } => result,
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            Analysis::Ok { result } | Analysis::Degenerate { result, .. } => result,
        }
    }

    /// Fallbacks taken, empty for a clean result
    pub fn reasons(&self) -> &[Degeneracy] {
        match self {
            Analysis::Ok { .. } => &[],
            Analysis::Degenerate { reasons, .. } => reasons,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Analysis::Degenerate { .. })
    }
}
