//! # Engine State
//!
//! [`EngineState`] owns everything a session mutates: the raw record, the
//! editable envelope, the configuration, the edit history and the latest
//! analysis. Every change goes through one of its methods, each of which
//! mutates the envelope first and then re-runs the characteristic value
//! evaluation synchronously on the finished envelope.
//!
//! ## Edit lifecycle
//!
//! ```text
//!            begin_edit(i)
//!   Idle ─────────────────────▶ Editing { index, original }
//!    ▲                            │ update_edit(d, p)  (preview only)
//!    │      commit_edit()         │
//!    ├────────────────────────────┤  record + recompute
//!    │      cancel_edit()         │
//!    └────────────────────────────┘  restore original
//! ```
//!
//! One-shot edits (delete, add, insert, drag) and undo/redo are only
//! accepted while `Idle`.
//!
//! ## Error policy
//!
//! A method returning `Err` rejected the request and changed nothing. A
//! fatal evaluation failure after an accepted change does not clear the
//! previous analysis; it is kept alongside [`EngineState::last_error`].
//!
//! ## Example
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
//! engine.delete_point(2).unwrap();
//! assert_eq!(engine.envelope().len(), 4);
//! engine.undo().unwrap();
//! assert_eq!(engine.envelope().len(), 5);
//! ```

use std::time::Instant;

use crate::calculations::{evaluate, Analysis};
use crate::config::AnalysisConfig;
use crate::debounce::Debouncer;
use crate::envelope::{build_envelope, envelope_ranges, EnvelopePoint, PlotRanges, Sample};
use crate::errors::{CalcError, CalcResult};
use crate::history::EditHistory;

/// Fewest raw samples accepted by [`EngineState::load_samples`]
pub const MIN_RAW_SAMPLES: usize = 3;

/// Fewest envelope points an edit may leave behind
pub const MIN_ENVELOPE_POINTS: usize = 2;

/// Whether a point is being adjusted interactively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditState {
    Idle,
    Editing {
        index: usize,
        /// Values captured at `begin_edit`, restored on cancel
        original: EnvelopePoint,
    },
}

/// The session: data, configuration, history and latest result.
#[derive(Debug, Clone)]
pub struct EngineState {
    raw_samples: Vec<Sample>,
    envelope: Vec<EnvelopePoint>,
    config: AnalysisConfig,
    history: EditHistory,
    edit: EditState,
    analysis: Option<Analysis>,
    last_error: Option<CalcError>,
    debouncer: Debouncer,
    staged_config: Option<AnalysisConfig>,
}

impl EngineState {
    pub fn new(config: AnalysisConfig) -> Self {
        EngineState {
            raw_samples: Vec::new(),
            envelope: Vec::new(),
            config,
            history: EditHistory::new(),
            edit: EditState::Idle,
            analysis: None,
            last_error: None,
            debouncer: Debouncer::default(),
            staged_config: None,
        }
    }

    /// Replace the debouncer used by [`EngineState::stage_config`].
    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    // === Accessors ===

    pub fn raw_samples(&self) -> &[Sample] {
        &self.raw_samples
    }

    pub fn envelope(&self) -> &[EnvelopePoint] {
        &self.envelope
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Latest successful analysis; survives a later fatal failure
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Error from the most recent evaluation, cleared by the next success
    pub fn last_error(&self) -> Option<&CalcError> {
        self.last_error.as_ref()
    }

    pub fn edit_state(&self) -> EditState {
        self.edit
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.edit, EditState::Editing { .. })
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    /// Plot extents of the current envelope
    pub fn ranges(&self) -> PlotRanges {
        envelope_ranges(&self.envelope)
    }

    // === Data and configuration ===

    /// Load a new record: rebuild the envelope, reset history and analyse.
    ///
    /// # Errors
    ///
    /// [`CalcError::InsufficientData`] for fewer than 3 samples; the engine
    /// is left as it was.
    pub fn load_samples(&mut self, samples: Vec<Sample>) -> CalcResult<()> {
        if samples.len() < MIN_RAW_SAMPLES {
            return Err(CalcError::insufficient_data("raw samples", MIN_RAW_SAMPLES, samples.len()));
        }
        let envelope = build_envelope(&samples, self.config.side);
        tracing::info!(samples = samples.len(), envelope = envelope.len(), "loaded record");
        self.raw_samples = samples;
        self.replace_envelope(envelope);
        Ok(())
    }

    /// Load an already edited envelope alongside its raw record.
    ///
    /// # Errors
    ///
    /// [`CalcError::InsufficientData`] for fewer than 2 envelope points.
    pub fn load_envelope(&mut self, samples: Vec<Sample>, envelope: Vec<EnvelopePoint>) -> CalcResult<()> {
        if envelope.len() < MIN_ENVELOPE_POINTS {
            return Err(CalcError::insufficient_data(
                "envelope points",
                MIN_ENVELOPE_POINTS,
                envelope.len(),
            ));
        }
        self.raw_samples = samples;
        self.replace_envelope(envelope);
        Ok(())
    }

    fn replace_envelope(&mut self, envelope: Vec<EnvelopePoint>) {
        self.envelope = envelope;
        self.edit = EditState::Idle;
        self.history.reset(&self.envelope);
        self.analysis = None;
        self.recompute();
    }

    /// Apply a configuration immediately.
    ///
    /// A changed envelope side rebuilds the envelope from the raw record and
    /// resets history; any other change re-evaluates the current envelope and
    /// leaves history alone.
    ///
    /// # Errors
    ///
    /// [`CalcError::InvalidInput`] from [`AnalysisConfig::validate`]; the
    /// previous configuration stays in force.
    pub fn set_config(&mut self, config: AnalysisConfig) -> CalcResult<()> {
        config.validate()?;
        let side_changed = config.side != self.config.side;
        self.config = config;

        if side_changed && !self.raw_samples.is_empty() {
            let envelope = build_envelope(&self.raw_samples, self.config.side);
            tracing::debug!(side = self.config.side.display_name(), points = envelope.len(), "envelope side changed");
            self.replace_envelope(envelope);
        } else if !self.envelope.is_empty() {
            self.recompute();
        }
        Ok(())
    }

    /// Stage a configuration to apply once input has been quiet for the
    /// debounce delay. A later call replaces a staged one.
    ///
    /// # Errors
    ///
    /// Invalid configurations are rejected here, before anything is staged.
    pub fn stage_config(&mut self, config: AnalysisConfig, now: Instant) -> CalcResult<()> {
        config.validate()?;
        self.staged_config = Some(config);
        self.debouncer.trigger(now);
        Ok(())
    }

    /// Apply the staged configuration if its quiet period has elapsed.
    ///
    /// Returns whether a configuration was applied.
    pub fn flush(&mut self, now: Instant) -> CalcResult<bool> {
        if !self.debouncer.take_due(now) {
            return Ok(false);
        }
        match self.staged_config.take() {
            Some(config) => self.set_config(config).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn has_staged_config(&self) -> bool {
        self.staged_config.is_some()
    }

    // === Interactive edit ===

    /// Start adjusting the point at `index`. No snapshot is taken yet.
    pub fn begin_edit(&mut self, index: usize) -> CalcResult<()> {
        self.ensure_idle("begin_edit")?;
        self.check_index("begin_edit", index)?;
        self.edit = EditState::Editing {
            index,
            original: self.envelope[index],
        };
        Ok(())
    }

    /// Live preview: move the point being edited without evaluating.
    pub fn update_edit(&mut self, deformation: f64, load: f64) -> CalcResult<()> {
        let index = match self.edit {
            EditState::Editing { index, .. } => index,
            EditState::Idle => return Err(CalcError::edit_rejected("update_edit", "no edit in progress")),
        };
        check_finite("update_edit", deformation, load)?;
        place(&mut self.envelope[index], deformation, load);
        Ok(())
    }

    /// Keep the previewed values: record a snapshot and re-evaluate.
    pub fn commit_edit(&mut self) -> CalcResult<()> {
        let index = match self.edit {
            EditState::Editing { index, .. } => index,
            EditState::Idle => return Err(CalcError::edit_rejected("commit_edit", "no edit in progress")),
        };
        self.edit = EditState::Idle;
        tracing::debug!(index, "edit committed");
        self.record_and_recompute();
        Ok(())
    }

    /// Restore the point's values from before `begin_edit`.
    ///
    /// Returns `false` when no edit was in progress.
    pub fn cancel_edit(&mut self) -> bool {
        match self.edit {
            EditState::Editing { index, original } => {
                if let Some(point) = self.envelope.get_mut(index) {
                    *point = original;
                }
                self.edit = EditState::Idle;
                tracing::debug!(index, "edit cancelled");
                true
            }
            EditState::Idle => false,
        }
    }

    /// Numeric edit of one point, as a begin/update/commit sequence.
    pub fn set_point(&mut self, index: usize, deformation: f64, load: f64) -> CalcResult<()> {
        check_finite("set_point", deformation, load)?;
        self.begin_edit(index)?;
        if let Err(err) = self.update_edit(deformation, load) {
            self.cancel_edit();
            return Err(err);
        }
        self.commit_edit()
    }

    // === One-shot edits ===

    /// Move a point and commit in one step.
    pub fn drag_move_point(&mut self, index: usize, deformation: f64, load: f64) -> CalcResult<()> {
        self.ensure_idle("drag_move_point")?;
        self.check_index("drag_move_point", index)?;
        check_finite("drag_move_point", deformation, load)?;
        place(&mut self.envelope[index], deformation, load);
        tracing::debug!(index, deformation, load, "point moved");
        self.record_and_recompute();
        Ok(())
    }

    /// Remove one point. Rejected when it would leave fewer than 2 points.
    pub fn delete_point(&mut self, index: usize) -> CalcResult<()> {
        self.ensure_idle("delete_point")?;
        self.check_index("delete_point", index)?;
        if self.envelope.len() <= MIN_ENVELOPE_POINTS {
            return Err(CalcError::edit_rejected(
                "delete_point",
                format!("the envelope needs at least {} points", MIN_ENVELOPE_POINTS),
            ));
        }
        self.envelope.remove(index);
        tracing::debug!(index, remaining = self.envelope.len(), "point deleted");
        self.record_and_recompute();
        Ok(())
    }

    /// Remove several points as one history entry.
    ///
    /// Duplicate indices count once. An empty selection is a no-op.
    pub fn delete_points(&mut self, indices: &[usize]) -> CalcResult<()> {
        self.ensure_idle("delete_points")?;
        let mut selected = indices.to_vec();
        selected.sort_unstable();
        selected.dedup();
        if selected.is_empty() {
            return Ok(());
        }
        for &index in &selected {
            self.check_index("delete_points", index)?;
        }
        if self.envelope.len() - selected.len() < MIN_ENVELOPE_POINTS {
            return Err(CalcError::edit_rejected(
                "delete_points",
                format!(
                    "deleting {} of {} points would leave fewer than {}",
                    selected.len(),
                    self.envelope.len(),
                    MIN_ENVELOPE_POINTS
                ),
            ));
        }
        for &index in selected.iter().rev() {
            self.envelope.remove(index);
        }
        tracing::debug!(deleted = selected.len(), remaining = self.envelope.len(), "points deleted");
        self.record_and_recompute();
        Ok(())
    }

    /// Insert the midpoint of the segment starting at `index`.
    ///
    /// Returns the index of the new point.
    pub fn add_point_between(&mut self, index: usize) -> CalcResult<usize> {
        self.ensure_idle("add_point_between")?;
        if index + 1 >= self.envelope.len() {
            return Err(CalcError::edit_rejected(
                "add_point_between",
                format!("point {} has no following point", index),
            ));
        }
        let (a, b) = (self.envelope[index], self.envelope[index + 1]);
        let midpoint = EnvelopePoint::new(
            (a.deformation + b.deformation) / 2.0,
            (a.load + b.load) / 2.0,
        );
        self.envelope.insert(index + 1, midpoint);
        tracing::debug!(index = index + 1, deformation = midpoint.deformation, "midpoint added");
        self.record_and_recompute();
        Ok(index + 1)
    }

    /// Insert a point before the first one with a larger deformation
    /// (appended when there is none). Returns its index.
    pub fn insert_point(&mut self, deformation: f64, load: f64) -> CalcResult<usize> {
        self.ensure_idle("insert_point")?;
        check_finite("insert_point", deformation, load)?;
        let position = self
            .envelope
            .iter()
            .position(|p| p.deformation > deformation)
            .unwrap_or(self.envelope.len());
        self.envelope.insert(position, EnvelopePoint::new(deformation, load));
        tracing::debug!(index = position, deformation, load, "point inserted");
        self.record_and_recompute();
        Ok(position)
    }

    // === History ===

    /// Step back one edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> CalcResult<bool> {
        self.ensure_idle("undo")?;
        match self.history.undo() {
            Some(snapshot) => {
                self.envelope = snapshot.to_vec();
                tracing::debug!(depth = self.history.depth(), "undo");
                self.recompute();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply the last undone edit. Returns `false` when there is none.
    pub fn redo(&mut self) -> CalcResult<bool> {
        self.ensure_idle("redo")?;
        match self.history.redo() {
            Some(snapshot) => {
                self.envelope = snapshot.to_vec();
                tracing::debug!(depth = self.history.depth(), "redo");
                self.recompute();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // === Internals ===

    fn record_and_recompute(&mut self) {
        self.history.record(&self.envelope);
        self.recompute();
    }

    fn recompute(&mut self) {
        match evaluate(&self.envelope, &self.config) {
            Ok(analysis) => {
                self.analysis = Some(analysis);
                self.last_error = None;
            }
            Err(err) => {
                tracing::warn!(code = err.error_code(), error = %err, "evaluation failed");
                self.last_error = Some(err);
            }
        }
    }

    fn ensure_idle(&self, operation: &str) -> CalcResult<()> {
        match self.edit {
            EditState::Idle => Ok(()),
            EditState::Editing { index, .. } => Err(CalcError::edit_rejected(
                operation,
                format!("point {} is being edited; commit or cancel first", index),
            )),
        }
    }

    fn check_index(&self, operation: &str, index: usize) -> CalcResult<()> {
        if index < self.envelope.len() {
            Ok(())
        } else {
            Err(CalcError::edit_rejected(
                operation,
                format!("index {} out of range for {} points", index, self.envelope.len()),
            ))
        }
    }
}

fn check_finite(operation: &str, deformation: f64, load: f64) -> CalcResult<()> {
    if deformation.is_finite() && load.is_finite() {
        Ok(())
    } else {
        Err(CalcError::edit_rejected(
            operation,
            format!("point ({}, {}) is not finite", deformation, load),
        ))
    }
}

/// Move a point; its reference deformation is measured separately and stays.
fn place(point: &mut EnvelopePoint, deformation: f64, load: f64) {
    point.deformation = deformation;
    point.load = load;
}
