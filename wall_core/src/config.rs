//! # Analysis Configuration
//!
//! The scalar inputs that, together with an envelope, fully determine an
//! [`AnalysisResult`](crate::calculations::AnalysisResult).
//!
//! Deformation limits are entered as reciprocal denominators, matching how
//! wall test standards quote them (`1/120 rad`), and converted on demand.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "wall_length": 1.82,
//!   "specific_deformation_denominator": 120.0,
//!   "ultimate_deformation_denominator": 15.0,
//!   "c0": 0.2,
//!   "alpha": 1.0,
//!   "side": "positive",
//!   "specific_basis": "primary"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::units::Radians;

/// Which half of the hysteresis loop the envelope is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeSide {
    /// Deformation ≥ 0 and load ≥ 0
    #[default]
    Positive,
    /// Deformation ≤ 0 and load ≤ 0
    Negative,
}

impl EnvelopeSide {
    /// Whether a raw sample belongs to this side.
    pub fn contains(&self, deformation: f64, load: f64) -> bool {
        match self {
            EnvelopeSide::Positive => deformation >= 0.0 && load >= 0.0,
            EnvelopeSide::Negative => deformation <= 0.0 && load <= 0.0,
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            EnvelopeSide::Positive => "positive",
            EnvelopeSide::Negative => "negative",
        }
    }
}

/// Deformation column used when reading the envelope at the specific deformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeformationBasis {
    /// The measured drift angle
    #[default]
    Primary,
    /// The alternate (reference gauge) drift angle
    Reference,
}

/// Standard wall categories and the limits each one is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallPreset {
    /// Wood-framed wall, loaded (vertical load) test method
    WoodLoaded,
    /// Wood-framed wall, tie-rod test method
    #[serde(rename = "wood_tierod")]
    WoodTieRod,
    /// Light-gauge steel wall, true shear deformation
    LgsTrue,
    /// Light-gauge steel wall, apparent shear deformation
    LgsApparent,
}

/// Limits carried by a [`WallPreset`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetValues {
    pub specific_deformation_denominator: f64,
    pub ultimate_deformation_denominator: f64,
    pub c0: f64,
}

impl WallPreset {
    /// All presets, in display order
    pub fn all() -> &'static [WallPreset] {
        &[
            WallPreset::WoodLoaded,
            WallPreset::WoodTieRod,
            WallPreset::LgsTrue,
            WallPreset::LgsApparent,
        ]
    }

    /// Short code used on the command line and in saved files
    pub fn code(&self) -> &'static str {
        match self {
            WallPreset::WoodLoaded => "wood_loaded",
            WallPreset::WoodTieRod => "wood_tierod",
            WallPreset::LgsTrue => "lgs_true",
            WallPreset::LgsApparent => "lgs_apparent",
        }
    }

    /// Look a preset up by its short code
    pub fn from_code(code: &str) -> Option<WallPreset> {
        WallPreset::all().iter().copied().find(|p| p.code() == code)
    }

    pub fn values(&self) -> PresetValues {
        let (specific, ultimate, c0) = match self {
            WallPreset::WoodLoaded => (120.0, 15.0, 0.2),
            WallPreset::WoodTieRod => (150.0, 15.0, 0.2),
            WallPreset::LgsTrue => (200.0, 30.0, 0.3),
            WallPreset::LgsApparent => (120.0, 30.0, 0.3),
        };
        PresetValues {
            specific_deformation_denominator: specific,
            ultimate_deformation_denominator: ultimate,
            c0,
        }
    }
}

/// Scalar inputs to the characteristic value calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Wall length L (m)
    pub wall_length: f64,

    /// N in the specific deformation 1/N (rad)
    pub specific_deformation_denominator: f64,

    /// N in the ultimate deformation ceiling 1/N (rad)
    pub ultimate_deformation_denominator: f64,

    /// Energy coefficient C0 used in the ductility criterion
    pub c0: f64,

    /// Amplification (reduction) factor α applied to P0
    pub alpha: f64,

    /// Envelope side selector
    #[serde(default)]
    pub side: EnvelopeSide,

    /// Deformation column used for the specific-deformation criterion
    #[serde(default)]
    pub specific_basis: DeformationBasis,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            wall_length: 1.0,
            specific_deformation_denominator: 120.0,
            ultimate_deformation_denominator: 15.0,
            c0: 0.2,
            alpha: 1.0,
            side: EnvelopeSide::Positive,
            specific_basis: DeformationBasis::Primary,
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with a preset's limits applied.
    pub fn with_preset(preset: WallPreset) -> Self {
        let mut config = AnalysisConfig::default();
        config.apply_preset(preset);
        config
    }

    /// Overwrite the two deformation limits and C0 with a preset's values.
    pub fn apply_preset(&mut self, preset: WallPreset) {
        let values = preset.values();
        self.specific_deformation_denominator = values.specific_deformation_denominator;
        self.ultimate_deformation_denominator = values.ultimate_deformation_denominator;
        self.c0 = values.c0;
        tracing::debug!(
            preset = preset.code(),
            specific = values.specific_deformation_denominator,
            ultimate = values.ultimate_deformation_denominator,
            c0 = values.c0,
            "applied wall preset"
        );
    }

    /// Validate every field. Nothing is computed from an invalid configuration.
    pub fn validate(&self) -> CalcResult<()> {
        if !self.wall_length.is_finite() || self.wall_length <= 0.0 {
            return Err(CalcError::invalid_input(
                "wall_length",
                self.wall_length.to_string(),
                "Wall length must be a positive finite number",
            ));
        }
        if !self.specific_deformation_denominator.is_finite() || self.specific_deformation_denominator <= 0.0 {
            return Err(CalcError::invalid_input(
                "specific_deformation_denominator",
                self.specific_deformation_denominator.to_string(),
                "Specific deformation denominator must be a positive finite number",
            ));
        }
        if !self.ultimate_deformation_denominator.is_finite() || self.ultimate_deformation_denominator <= 0.0 {
            return Err(CalcError::invalid_input(
                "ultimate_deformation_denominator",
                self.ultimate_deformation_denominator.to_string(),
                "Ultimate deformation denominator must be a positive finite number",
            ));
        }
        if !self.c0.is_finite() || self.c0 < 0.0 {
            return Err(CalcError::invalid_input(
                "c0",
                self.c0.to_string(),
                "C0 must be a finite number ≥ 0",
            ));
        }
        if !self.alpha.is_finite() {
            return Err(CalcError::invalid_input(
                "alpha",
                self.alpha.to_string(),
                "Alpha must be finite",
            ));
        }
        Ok(())
    }

    /// Specific deformation γ = 1/N_specific
    pub fn gamma_specific(&self) -> Radians {
        Radians::from_reciprocal(self.specific_deformation_denominator)
    }

    /// Ultimate deformation ceiling δu,max = 1/N_ultimate
    pub fn delta_u_max(&self) -> Radians {
        Radians::from_reciprocal(self.ultimate_deformation_denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_derived_limits() {
        let config = AnalysisConfig::default();
        assert!((config.gamma_specific().0 - 1.0 / 120.0).abs() < 1e-15);
        assert!((config.delta_u_max().0 - 1.0 / 15.0).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_out_of_domain_values() {
        let bad = [
            AnalysisConfig { wall_length: 0.0, ..Default::default() },
            AnalysisConfig { wall_length: f64::NAN, ..Default::default() },
            AnalysisConfig { c0: -0.1, ..Default::default() },
            AnalysisConfig { specific_deformation_denominator: 0.0, ..Default::default() },
            AnalysisConfig { ultimate_deformation_denominator: -15.0, ..Default::default() },
            AnalysisConfig { alpha: f64::INFINITY, ..Default::default() },
        ];
        for config in bad {
            let err = config.validate().unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }
    }

    #[test]
    fn test_c0_of_zero_is_allowed() {
        let config = AnalysisConfig { c0: 0.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let config = AnalysisConfig::with_preset(WallPreset::LgsTrue);
        assert_eq!(config.specific_deformation_denominator, 200.0);
        assert_eq!(config.ultimate_deformation_denominator, 30.0);
        assert_eq!(config.c0, 0.3);
        // untouched fields keep their defaults
        assert_eq!(config.wall_length, 1.0);

        for preset in WallPreset::all() {
            assert_eq!(WallPreset::from_code(preset.code()), Some(*preset));
        }
        assert_eq!(WallPreset::from_code("concrete"), None);
    }

    #[test]
    fn test_side_membership() {
        assert!(EnvelopeSide::Positive.contains(0.0, 0.0));
        assert!(EnvelopeSide::Positive.contains(0.01, 3.0));
        assert!(!EnvelopeSide::Positive.contains(0.01, -3.0));
        assert!(EnvelopeSide::Negative.contains(-0.01, -3.0));
        assert!(!EnvelopeSide::Negative.contains(-0.01, 3.0));
    }

    #[test]
    fn test_serialization() {
        let config = AnalysisConfig { side: EnvelopeSide::Negative, ..Default::default() };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"side\":\"negative\""));
        let roundtrip: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, roundtrip);

        let preset_json = serde_json::to_string(&WallPreset::WoodTieRod).unwrap();
        assert_eq!(preset_json, "\"wood_tierod\"");
    }
}
