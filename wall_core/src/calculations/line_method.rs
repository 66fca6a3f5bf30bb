//! # Line Method (Yield Point)
//!
//! Derives the yield load Py and its deformation from three reference lines
//! fitted to the envelope in (|deformation|, |load|) space:
//!
//! - **Line I** through the 0.1·Pmax and 0.4·Pmax crossings
//! - **Line II** through the 0.4·Pmax and 0.9·Pmax crossings
//! - **Line III** parallel to Line II and tangent to the envelope from above
//!
//! Py is the load at the intersection of Line I and Line III.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::calculations::line_method;
//! use wall_core::envelope::EnvelopePoint;
//!
//! let envelope = vec![
//!     EnvelopePoint::new(0.0, 0.0),
//!     EnvelopePoint::new(0.001, 5.0),
//!     EnvelopePoint::new(0.002, 8.0),
//!     EnvelopePoint::new(0.004, 9.0),
//!     EnvelopePoint::new(0.008, 6.0),
//! ];
//! let result = line_method::solve(&envelope, 9.0).unwrap();
//! assert!((result.py - 5.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use super::{Degeneracy, Line};
use crate::envelope::{find_point_at_load, EnvelopePoint};
use crate::errors::{CalcError, CalcResult};

/// Load fractions of Pmax used to fit Lines I and II.
pub const LOAD_FRACTIONS: [f64; 3] = [0.1, 0.4, 0.9];

/// Yield point and the three fitted lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMethodResult {
    /// Yield load Py
    pub py: f64,
    /// Deformation at the Line I / Line III intersection
    pub py_deformation: f64,
    pub line_i: Line,
    pub line_ii: Line,
    pub line_iii: Line,
    /// Crossings that fell back to the last envelope point
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degeneracies: Vec<Degeneracy>,
}

/// Supporting line of the envelope with the given slope.
///
/// The intercept is the maximum of `|load| − slope·|deformation|` over all
/// points, so no point lies above the line.
pub fn tangent_line(envelope: &[EnvelopePoint], slope: f64) -> Line {
    let intercept = envelope
        .iter()
        .map(|p| p.abs_load() - slope * p.abs_deformation())
        .fold(f64::NEG_INFINITY, f64::max);
    Line { slope, intercept }
}

/// Run the line method against `pmax`.
///
/// # Errors
///
/// [`CalcError::InsufficientResolution`] when the envelope has no segment to
/// interpolate, when two crossings share a deformation (no line through
/// them), or when Lines I and III do not meet at a finite point.
pub fn solve(envelope: &[EnvelopePoint], pmax: f64) -> CalcResult<LineMethodResult> {
    if !pmax.is_finite() || pmax <= 0.0 {
        return Err(CalcError::insufficient_resolution(
            LOAD_FRACTIONS[0],
            format!("Pmax must be positive, got {}", pmax),
        ));
    }

    let mut degeneracies = Vec::new();
    let mut crossings = [(0.0, 0.0); 3];
    for (slot, fraction) in crossings.iter_mut().zip(LOAD_FRACTIONS) {
        let lookup = find_point_at_load(envelope, fraction * pmax).ok_or_else(|| {
            CalcError::insufficient_resolution(
                fraction,
                format!("envelope has {} point(s), at least 2 are needed", envelope.len()),
            )
        })?;
        if lookup.is_fallback() {
            let degeneracy = Degeneracy::CrossingFallback { load_fraction: fraction };
            degeneracy.log();
            degeneracies.push(degeneracy);
        }
        let point = lookup.point();
        *slot = (point.abs_deformation(), point.abs_load());
    }
    let [p01, p04, p09] = crossings;

    let line_i = Line::through(p01, p04).ok_or_else(|| {
        CalcError::insufficient_resolution(0.4, "0.1 Pmax and 0.4 Pmax crossings share a deformation")
    })?;
    let line_ii = Line::through(p04, p09).ok_or_else(|| {
        CalcError::insufficient_resolution(0.9, "0.4 Pmax and 0.9 Pmax crossings share a deformation")
    })?;
    let line_iii = tangent_line(envelope, line_ii.slope);

    let (py_deformation, py) = line_i
        .intersect(&line_iii)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .ok_or_else(|| {
            CalcError::insufficient_resolution(0.9, "Line I and Line III do not intersect")
        })?;

    tracing::debug!(py, py_deformation, slope_i = line_i.slope, slope_ii = line_ii.slope, "line method solved");

    Ok(LineMethodResult {
        py,
        py_deformation,
        line_i,
        line_ii,
        line_iii,
        degeneracies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Vec<EnvelopePoint> {
        vec![
            EnvelopePoint::new(0.0, 0.0),
            EnvelopePoint::new(0.001, 5.0),
            EnvelopePoint::new(0.002, 8.0),
            EnvelopePoint::new(0.004, 9.0),
            EnvelopePoint::new(0.008, 6.0),
        ]
    }

    #[test]
    fn test_scenario_lines() {
        let result = solve(&scenario(), 9.0).unwrap();

        // 0.9 and 3.6 lie on the first segment (slope 5000), 8.1 on the third
        // Line I: (0.00018, 0.9) - (0.00072, 3.6)
        assert!((result.line_i.slope - 5000.0).abs() < 1e-6);
        assert!(result.line_i.intercept.abs() < 1e-9);

        // Line II: (0.00072, 3.6) - (0.0022, 8.1)
        let slope_ii = 4.5 / 0.00148;
        assert!((result.line_ii.slope - slope_ii).abs() < 1e-6);

        // Line III touches the envelope at (0.001, 5)
        assert_eq!(result.line_iii.slope, result.line_ii.slope);
        assert!((result.line_iii.intercept - (5.0 - slope_ii * 0.001)).abs() < 1e-9);

        assert!(result.degeneracies.is_empty());
    }

    #[test]
    fn test_scenario_yield_point() {
        let result = solve(&scenario(), 9.0).unwrap();
        // Line I passes through the tangent point, so the intersection is that point
        assert!((result.py - 5.0).abs() < 1e-9);
        assert!((result.py_deformation - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_tangent_line_supports_envelope() {
        let envelope = scenario();
        let line = tangent_line(&envelope, 2000.0);
        for p in &envelope {
            assert!(p.abs_load() <= line.at(p.abs_deformation()) + 1e-12);
        }
        assert!(envelope
            .iter()
            .any(|p| (p.abs_load() - line.at(p.abs_deformation())).abs() < 1e-12));
    }

    #[test]
    fn test_negative_side_matches_positive() {
        let negative: Vec<EnvelopePoint> = scenario()
            .into_iter()
            .map(|p| EnvelopePoint::new(-p.deformation, -p.load))
            .collect();
        let pos = solve(&scenario(), 9.0).unwrap();
        let neg = solve(&negative, 9.0).unwrap();
        assert!((pos.py - neg.py).abs() < 1e-12);
        assert!((pos.py_deformation - neg.py_deformation).abs() < 1e-15);
    }

    #[test]
    fn test_single_point_is_fatal() {
        let err = solve(&[EnvelopePoint::new(0.001, 5.0)], 5.0).unwrap_err();
        match err {
            CalcError::InsufficientResolution { load_fraction, .. } => assert_eq!(load_fraction, 0.1),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_pmax_is_fatal() {
        let err = solve(&scenario(), 0.0).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_RESOLUTION");
    }

    #[test]
    fn test_coincident_crossings_are_fatal() {
        // every crossing falls back to the last point, so Line I has no run
        let envelope = vec![EnvelopePoint::new(0.0, 9.0), EnvelopePoint::new(0.001, 9.0)];
        let err = solve(&envelope, 20.0).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_RESOLUTION");
    }

    #[test]
    fn test_crossing_fallback_is_reported() {
        // 0.9·Pmax = 9.45 exceeds every load on the envelope
        let result = solve(&scenario(), 10.5).unwrap();
        assert_eq!(
            result.degeneracies,
            vec![Degeneracy::CrossingFallback { load_fraction: 0.9 }]
        );
    }
}
