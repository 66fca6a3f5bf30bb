//! # Unit Types
//!
//! Lightweight wrappers for the quantities that cross the evaluation boundary.
//!
//! Shear wall tests report deformation as a story drift angle in radians,
//! which engineers read as a reciprocal (`1/120 rad`). [`Radians`] converts
//! in both directions so configuration can be entered the way it is quoted
//! and results can be printed the same way.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::units::Radians;
//!
//! let specific = Radians::from_reciprocal(120.0);
//! assert!((specific.0 - 1.0 / 120.0).abs() < 1e-15);
//! assert_eq!(specific.reciprocal_label(), "1/120");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Drift angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Radians(pub f64);

impl Radians {
    /// Build an angle from its reciprocal denominator (`N` in `1/N rad`).
    pub fn from_reciprocal(denominator: f64) -> Self {
        Radians(1.0 / denominator)
    }

    /// Denominator `N` such that the angle is `1/N`, rounded to the nearest integer.
    ///
    /// Returns `None` for non-positive or non-finite angles.
    pub fn reciprocal(&self) -> Option<u64> {
        if !self.0.is_finite() || self.0 <= 0.0 {
            return None;
        }
        let denominator = (1.0 / self.0).round();
        if !denominator.is_finite() || denominator <= 0.0 {
            return None;
        }
        Some(denominator as u64)
    }

    /// Render as `1/N`, or `-` when the angle has no meaningful reciprocal.
    pub fn reciprocal_label(&self) -> String {
        match self.reciprocal() {
            Some(n) => format!("1/{}", n),
            None => "-".to_string(),
        }
    }
}

impl From<f64> for Radians {
    fn from(value: f64) -> Self {
        Radians(value)
    }
}

impl fmt::Display for Radians {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} rad", self.0)
    }
}

/// Round down to one decimal place, never returning a value above `value`.
///
/// Stricter than a plain `floor(value * 10) / 10`, whose product can round up
/// to an integer (`0.8999999999999999 * 10 == 9.0`) and give a result above
/// `value`; such a step is dropped. The next step up is taken whenever it
/// still does not exceed `value`.
pub fn floor_to_tenth(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let steps = (value * 10.0).floor();
    let mut rounded = steps / 10.0;
    if rounded > value {
        rounded = (steps - 1.0) / 10.0;
    }
    let next = (steps + 1.0) / 10.0;
    if next <= value {
        rounded = next;
    }
    rounded
}
