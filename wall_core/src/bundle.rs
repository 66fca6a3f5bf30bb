//! # Session Bundles
//!
//! A `SessionBundle` is everything needed to reproduce an evaluation: the
//! raw record, the configuration and, when the envelope was edited by hand,
//! the edited envelope. Bundles serialize to `.swb` files as human-readable
//! JSON (see [`crate::file_io`] for atomic saves).
//!
//! ## Structure
//!
//! ```text
//! SessionBundle
//! ├── meta: BundleMetadata (version, id, specimen name, timestamps)
//! ├── config: AnalysisConfig
//! ├── raw_samples: Vec<Sample>
//! └── edited_envelope: Option<Vec<EnvelopePoint>>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use wall_core::bundle::SessionBundle;
//! use wall_core::config::AnalysisConfig;
//! use wall_core::envelope::Sample;
//!
//! let samples = vec![
//!     Sample::new(0.0, 0.0),
//!     Sample::new(0.001, 5.0),
//!     Sample::new(0.002, 8.0),
//!     Sample::new(0.004, 9.0),
//!     Sample::new(0.008, 6.0),
//! ];
//! let bundle = SessionBundle::new("W-01", samples, AnalysisConfig::default());
//! let analysis = bundle.replay().unwrap();
//! assert!(analysis.result().p0 > 0.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::{evaluate, Analysis};
use crate::config::AnalysisConfig;
use crate::engine::EngineState;
use crate::envelope::{build_envelope, EnvelopePoint, Sample};
use crate::errors::CalcResult;

/// Current schema version for .swb files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Serializable session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub meta: BundleMetadata,

    pub config: AnalysisConfig,

    /// Recorded (deformation, load) pairs in test order
    pub raw_samples: Vec<Sample>,

    /// Hand-edited envelope; `None` means "rebuild from `raw_samples`"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_envelope: Option<Vec<EnvelopePoint>>,
}

/// Bundle header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub id: Uuid,

    /// Specimen or test name
    pub specimen_name: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

impl SessionBundle {
    pub fn new(specimen_name: impl Into<String>, raw_samples: Vec<Sample>, config: AnalysisConfig) -> Self {
        let now = Utc::now();
        SessionBundle {
            meta: BundleMetadata {
                version: SCHEMA_VERSION.to_string(),
                id: Uuid::new_v4(),
                specimen_name: specimen_name.into(),
                created: now,
                modified: now,
            },
            config,
            raw_samples,
            edited_envelope: None,
        }
    }

    /// Capture an engine's state. The envelope is stored only when it
    /// differs from the one rebuilt from the raw record.
    pub fn from_engine(engine: &EngineState, specimen_name: impl Into<String>) -> Self {
        let mut bundle = SessionBundle::new(specimen_name, engine.raw_samples().to_vec(), *engine.config());
        let rebuilt = build_envelope(engine.raw_samples(), engine.config().side);
        if rebuilt.as_slice() != engine.envelope() {
            bundle.edited_envelope = Some(engine.envelope().to_vec());
        }
        bundle
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// The envelope this bundle evaluates.
    pub fn envelope(&self) -> Vec<EnvelopePoint> {
        match &self.edited_envelope {
            Some(points) => points.clone(),
            None => build_envelope(&self.raw_samples, self.config.side),
        }
    }

    /// Rebuild the envelope and evaluate it.
    ///
    /// Deterministic: the same bundle always yields the same [`Analysis`].
    pub fn replay(&self) -> CalcResult<Analysis> {
        self.config.validate()?;
        evaluate(&self.envelope(), &self.config)
    }

    /// Restore an editable session with a fresh history.
    pub fn into_engine(self) -> CalcResult<EngineState> {
        self.config.validate()?;
        let mut engine = EngineState::new(self.config);
        match self.edited_envelope {
            Some(points) => engine.load_envelope(self.raw_samples, points)?,
            None => engine.load_samples(self.raw_samples)?,
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(0.0, 0.0),
            Sample::new(0.001, 5.0),
            Sample::new(0.0005, 1.0),
            Sample::new(0.002, 8.0),
            Sample::new(0.004, 9.0),
            Sample::new(0.008, 6.0),
        ]
    }

    #[test]
    fn test_bundle_creation() {
        let bundle = SessionBundle::new("W-01", samples(), AnalysisConfig::default());
        assert_eq!(bundle.meta.specimen_name, "W-01");
        assert_eq!(bundle.meta.version, SCHEMA_VERSION);
        assert_eq!(bundle.meta.created, bundle.meta.modified);
        assert!(bundle.edited_envelope.is_none());
        assert_eq!(bundle.envelope().len(), 5);
    }

    #[test]
    fn test_bundle_serialization() {
        let bundle = SessionBundle::new("W-02", samples(), AnalysisConfig::default());
        let json = serde_json::to_string_pretty(&bundle).unwrap();
        assert!(json.contains("W-02"));
        assert!(json.contains("\"side\": \"positive\""));
        assert!(!json.contains("edited_envelope"));

        let roundtrip: SessionBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, bundle);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let bundle = SessionBundle::new("W-03", samples(), AnalysisConfig::default());
        let json = serde_json::to_string(&bundle).unwrap();
        let restored: SessionBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(bundle.replay().unwrap(), restored.replay().unwrap());
    }

    #[test]
    fn test_from_engine_keeps_edits() {
        let mut engine = EngineState::new(AnalysisConfig::default());
        engine.load_samples(samples()).unwrap();

        let untouched = SessionBundle::from_engine(&engine, "W-04");
        assert!(untouched.edited_envelope.is_none());

        engine.delete_point(2).unwrap();
        let edited = SessionBundle::from_engine(&engine, "W-04");
        assert_eq!(edited.edited_envelope.as_ref().map(Vec::len), Some(4));

        let restored = edited.clone().into_engine().unwrap();
        assert_eq!(restored.envelope(), engine.envelope());
        assert_eq!(restored.history_depth(), 1);
        assert_eq!(
            edited.replay().unwrap(),
            engine.analysis().cloned().unwrap()
        );
    }

    #[test]
    fn test_invalid_config_is_rejected_on_replay() {
        let config = AnalysisConfig {
            ultimate_deformation_denominator: 0.0,
            ..Default::default()
        };
        let bundle = SessionBundle::new("W-05", samples(), config);
        assert_eq!(bundle.replay().unwrap_err().error_code(), "INVALID_INPUT");
        assert!(bundle.into_engine().is_err());
    }
}
