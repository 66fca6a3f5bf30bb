//! # Energy-Equivalent Bilinear Model
//!
//! Replaces the envelope up to the ultimate deformation δu with a perfectly
//! elasto-plastic curve of equal area: an elastic branch of slope K from the
//! origin to (δv, Pu), then a plateau at Pu out to δu.
//!
//! Equal area gives `S = Pu·δu − Pu²/(2K)`, solved for the smaller root
//! `Pu = K·δu − √((K·δu)² − 2·K·S)`.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::calculations::energy;
//! use wall_core::envelope::EnvelopePoint;
//!
//! let envelope = vec![
//!     EnvelopePoint::new(0.0, 0.0),
//!     EnvelopePoint::new(0.001, 5.0),
//!     EnvelopePoint::new(0.002, 8.0),
//!     EnvelopePoint::new(0.004, 9.0),
//!     EnvelopePoint::new(0.008, 6.0),
//! ];
//! let result = energy::solve(&envelope, 5.0, 9.0, 1.0 / 15.0).unwrap();
//! assert!((result.delta_u - 0.008).abs() < 1e-15);
//! assert!((result.pu - (40.0 - 1040.0_f64.sqrt())).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use super::{Degeneracy, Line};
use crate::envelope::{area_under, deformation_at_post_peak_drop, find_point_at_load, EnvelopePoint};
use crate::errors::{CalcError, CalcResult};

/// Parameters of the equivalent bilinear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyEquivalentResult {
    /// Envelope deformation where |load| = Py
    pub delta_y: f64,
    /// Initial stiffness K = Py/δy
    pub k: f64,
    /// Ultimate deformation δu
    pub delta_u: f64,
    /// Area under the envelope up to δu
    pub area: f64,
    /// Plateau load Pu
    pub pu: f64,
    /// Virtual yield deformation δv = Pu/K
    pub delta_v: f64,
    /// Ductility μ = δu/δv
    pub mu: f64,
    /// Substitutions made (discriminant fallback, δy crossing fallback)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degeneracies: Vec<Degeneracy>,
}

impl EnergyEquivalentResult {
    /// Elastic branch of the bilinear model (through the origin)
    pub fn elastic_line(&self) -> Line {
        Line {
            slope: self.k,
            intercept: 0.0,
        }
    }

    /// Plastic plateau of the bilinear model
    pub fn plateau_line(&self) -> Line {
        Line {
            slope: 0.0,
            intercept: self.pu,
        }
    }

    /// Residual of the equal-energy identity, `Pu·δu − Pu²/(2K) − S`
    pub fn energy_residual(&self) -> f64 {
        self.pu * self.delta_u - self.pu * self.pu / (2.0 * self.k) - self.area
    }

    /// Whether the bilinear fit fell back to the yield point
    pub fn used_yield_fallback(&self) -> bool {
        self.degeneracies
            .iter()
            .any(|d| matches!(d, Degeneracy::NegativeDiscriminant { .. }))
    }
}

/// Fit the bilinear model.
///
/// * `py` - yield load from the line method
/// * `pmax` - peak load governing the post-peak drop search
/// * `delta_u_max` - configured ceiling on δu (rad)
///
/// A negative discriminant is not an error: Pu falls back to Py, δv to δy and
/// the substitution is reported as [`Degeneracy::NegativeDiscriminant`].
///
/// # Errors
///
/// [`CalcError::InsufficientResolution`] when the envelope has no segment to
/// locate δy on, and [`CalcError::CalculationFailed`] when the initial
/// stiffness is not a positive finite number (Py or δy zero).
pub fn solve(
    envelope: &[EnvelopePoint],
    py: f64,
    pmax: f64,
    delta_u_max: f64,
) -> CalcResult<EnergyEquivalentResult> {
    let mut degeneracies = Vec::new();

    let lookup = find_point_at_load(envelope, py).ok_or_else(|| {
        CalcError::insufficient_resolution(
            py / pmax,
            format!("envelope has {} point(s), δy cannot be located", envelope.len()),
        )
    })?;
    if lookup.is_fallback() {
        let degeneracy = Degeneracy::CrossingFallback { load_fraction: py / pmax };
        degeneracy.log();
        degeneracies.push(degeneracy);
    }
    let delta_y = lookup.point().abs_deformation();

    let k = py / delta_y;
    if !k.is_finite() || k <= 0.0 {
        return Err(CalcError::calculation_failed(
            "energy_equivalent",
            format!("initial stiffness K = Py/δy = {}/{} is not positive and finite", py, delta_y),
        ));
    }

    let delta_u = deformation_at_post_peak_drop(envelope, pmax).min(delta_u_max);
    let area = area_under(envelope, delta_u);

    let discriminant = (k * delta_u).powi(2) - 2.0 * k * area;
    if discriminant < 0.0 {
        let degeneracy = Degeneracy::NegativeDiscriminant { discriminant };
        degeneracy.log();
        degeneracies.push(degeneracy);
        return Ok(EnergyEquivalentResult {
            delta_y,
            k,
            delta_u,
            area,
            pu: py,
            delta_v: delta_y,
            mu: delta_u / delta_y,
            degeneracies,
        });
    }

    let pu = k * delta_u - discriminant.sqrt();
    let delta_v = pu / k;
    let mu = delta_u / delta_v;

    tracing::debug!(k, delta_u, area, pu, delta_v, mu, "energy-equivalent model solved");

    Ok(EnergyEquivalentResult {
        delta_y,
        k,
        delta_u,
        area,
        pu,
        delta_v,
        mu,
        degeneracies,
    })
}
