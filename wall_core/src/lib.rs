//! # wall_core - Shear Wall Cyclic Test Evaluation
//!
//! `wall_core` turns a cyclic load-deformation record of a shear wall into
//! its short-term base strength P0, allowable strength Pa and wall
//! magnification. All inputs and outputs are JSON-serializable so results
//! can be handed to any renderer or report generator.
//!
//! ## Pipeline
//!
//! ```text
//! raw samples ──▶ envelope ──▶ line method ──▶ energy model ──▶ P0 / Pa / magnification
//!                    ▲                  (two passes, see calculations::characteristic)
//!                    └── manual edits with undo/redo (engine)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use wall_core::config::AnalysisConfig;
//! use wall_core::engine::EngineState;
//! use wall_core::envelope::Sample;
//!
//! let mut engine = EngineState::new(AnalysisConfig::default());
//! engine.load_samples(vec![
//!     Sample::new(0.0, 0.0),
//!     Sample::new(0.001, 5.0),
//!     Sample::new(0.002, 8.0),
//!     Sample::new(0.004, 9.0),
//!     Sample::new(0.008, 6.0),
//! ]).unwrap();
//!
//! let analysis = engine.analysis().unwrap();
//! let json = serde_json::to_string_pretty(analysis).unwrap();
//! assert!(json.contains("\"magnification_rounded\""));
//! ```
//!
//! ## Modules
//!
//! - [`envelope`] - Envelope construction and polyline queries
//! - [`calculations`] - Line method, energy-equivalent model, characteristic values
//! - [`engine`] - Session state, edit lifecycle and recomputation
//! - [`history`] - Undo/redo snapshots
//! - [`debounce`] - Coalescing of rapid parameter changes
//! - [`config`] - Analysis configuration and wall presets
//! - [`bundle`] - Serializable session bundles
//! - [`file_io`] - Bundle files with atomic saves and locking
//! - [`units`] - Deformation units and rounding
//! - [`errors`] - Structured error types

pub mod bundle;
pub mod calculations;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod envelope;
pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod history;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use bundle::{BundleMetadata, SessionBundle};
pub use calculations::{evaluate, Analysis, AnalysisResult, Degeneracy};
pub use config::{AnalysisConfig, EnvelopeSide, WallPreset};
pub use engine::EngineState;
pub use envelope::{build_envelope, EnvelopePoint, Sample};
pub use errors::{CalcError, CalcResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_bundle, save_bundle, FileLock};
