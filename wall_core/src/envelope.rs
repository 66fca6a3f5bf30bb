//! # Envelope Construction and Polyline Queries
//!
//! Reduces a cyclic load-deformation record to a one-sided envelope and
//! provides the interpolation primitives the solvers read it through.
//!
//! The envelope keeps a sample when its absolute deformation reaches or
//! exceeds every deformation seen before it on the same side, which traces
//! the outermost excursion of each loading cycle and drops the unloading and
//! reloading branches.
//!
//! Queries never reorder the envelope. After manual edits the deformation
//! sequence may be non-monotonic; every query walks the points in their
//! stored order regardless.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::config::EnvelopeSide;
//! use wall_core::envelope::{build_envelope, Sample};
//!
//! let samples = vec![
//!     Sample::new(0.0, 0.0),
//!     Sample::new(0.002, 4.0),
//!     Sample::new(0.001, 1.0),   // unloading, dropped
//!     Sample::new(-0.002, -3.5), // other side, dropped
//!     Sample::new(0.004, 6.0),
//! ];
//! let envelope = build_envelope(&samples, EnvelopeSide::Positive);
//! assert_eq!(envelope.len(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{DeformationBasis, EnvelopeSide};

/// Tolerance used when restricting an envelope to `|deformation| ≤ limit`.
pub const DEFORMATION_TOLERANCE: f64 = 1e-12;

/// One raw measurement: signed drift angle (rad) and signed load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub deformation: f64,
    pub load: f64,
}

impl Sample {
    pub fn new(deformation: f64, load: f64) -> Self {
        Sample { deformation, load }
    }
}

/// A point on the (editable) envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    /// Signed drift angle (rad)
    pub deformation: f64,
    /// Signed load
    pub load: f64,
    /// Drift angle on the alternate gauge basis; equals `deformation` for directly entered data
    pub reference_deformation: f64,
}

impl EnvelopePoint {
    /// Point whose reference deformation equals its deformation.
    pub fn new(deformation: f64, load: f64) -> Self {
        EnvelopePoint {
            deformation,
            load,
            reference_deformation: deformation,
        }
    }

    pub fn abs_deformation(&self) -> f64 {
        self.deformation.abs()
    }

    pub fn abs_load(&self) -> f64 {
        self.load.abs()
    }

    fn deformation_on(&self, basis: DeformationBasis) -> f64 {
        match basis {
            DeformationBasis::Primary => self.deformation,
            DeformationBasis::Reference => self.reference_deformation,
        }
    }

    /// Linear interpolation between `self` and `other` at parameter `ratio`.
    fn lerp(&self, other: &EnvelopePoint, ratio: f64) -> EnvelopePoint {
        EnvelopePoint {
            deformation: self.deformation + (other.deformation - self.deformation) * ratio,
            load: self.load + (other.load - self.load) * ratio,
            reference_deformation: self.reference_deformation
                + (other.reference_deformation - self.reference_deformation) * ratio,
        }
    }
}

impl From<Sample> for EnvelopePoint {
    fn from(sample: Sample) -> Self {
        EnvelopePoint::new(sample.deformation, sample.load)
    }
}

/// Build the running-maximum deformation envelope for one side.
///
/// Samples are processed in their recorded order; nothing is sorted. If the
/// side has samples but none survive the running-maximum filter the filtered
/// samples are returned unchanged. An empty result means the side holds no
/// data and must be treated as insufficient data by the caller.
pub fn build_envelope(samples: &[Sample], side: EnvelopeSide) -> Vec<EnvelopePoint> {
    let filtered: Vec<EnvelopePoint> = samples
        .iter()
        .filter(|s| side.contains(s.deformation, s.load))
        .map(|s| EnvelopePoint::from(*s))
        .collect();

    if filtered.is_empty() {
        tracing::debug!(side = side.display_name(), samples = samples.len(), "no samples on envelope side");
        return Vec::new();
    }

    let mut envelope = Vec::with_capacity(filtered.len());
    let mut max_abs_deformation = 0.0_f64;
    for point in &filtered {
        let abs_deformation = point.abs_deformation();
        if abs_deformation >= max_abs_deformation {
            max_abs_deformation = abs_deformation;
            envelope.push(*point);
        }
    }

    if envelope.is_empty() {
        tracing::warn!(
            side = side.display_name(),
            filtered = filtered.len(),
            "running-maximum filter kept no points, using filtered samples"
        );
        return filtered;
    }

    tracing::debug!(
        side = side.display_name(),
        samples = samples.len(),
        envelope = envelope.len(),
        "built envelope"
    );
    envelope
}

/// Result of a polyline lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup {
    /// Interpolated inside a bracketing segment
    Interpolated(EnvelopePoint),
    /// No segment brackets the target; the last envelope point stands in
    Fallback(EnvelopePoint),
}

impl Lookup {
    pub fn point(&self) -> &EnvelopePoint {
        match self {
            Lookup::Interpolated(p) | Lookup::Fallback(p) => p,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lookup::Fallback(_))
    }
}

/// First crossing of `|load| = target` along the polyline.
///
/// Scans consecutive pairs and interpolates inside the first segment with
/// `|load₁| ≤ target ≤ |load₂|`. When no segment brackets the target the
/// last point is returned as a [`Lookup::Fallback`]. Returns `None` only for
/// an envelope with fewer than two points, which has no segment to scan.
pub fn find_point_at_load(envelope: &[EnvelopePoint], target: f64) -> Option<Lookup> {
    if envelope.len() < 2 {
        return None;
    }
    for pair in envelope.windows(2) {
        let (p1, p2) = (&pair[0], &pair[1]);
        let (abs1, abs2) = (p1.abs_load(), p2.abs_load());
        if abs1 <= target && abs2 >= target {
            let ratio = segment_ratio(target, abs1, abs2);
            return Some(Lookup::Interpolated(p1.lerp(p2, ratio)));
        }
    }
    envelope.last().map(|p| Lookup::Fallback(*p))
}

/// First crossing of `|deformation| = target` (on the chosen basis) along the polyline.
///
/// The interpolated point carries `|load|` interpolated between the absolute
/// loads of the bracketing pair. Fallback semantics match [`find_point_at_load`].
pub fn find_point_at_deformation(
    envelope: &[EnvelopePoint],
    target: f64,
    basis: DeformationBasis,
) -> Option<Lookup> {
    if envelope.len() < 2 {
        return None;
    }
    for pair in envelope.windows(2) {
        let (p1, p2) = (&pair[0], &pair[1]);
        let abs1 = p1.deformation_on(basis).abs();
        let abs2 = p2.deformation_on(basis).abs();
        if abs1 <= target && abs2 >= target {
            let ratio = segment_ratio(target, abs1, abs2);
            let mut point = p1.lerp(p2, ratio);
            point.load = p1.abs_load() + (p2.abs_load() - p1.abs_load()) * ratio;
            return Some(Lookup::Interpolated(point));
        }
    }
    envelope.last().map(|p| Lookup::Fallback(*p))
}

/// Interpolation parameter for `target` between `a` and `b`; 0 for a flat segment.
fn segment_ratio(target: f64, a: f64, b: f64) -> f64 {
    let span = b - a;
    if span == 0.0 {
        0.0
    } else {
        (target - a) / span
    }
}

/// Index and point of the largest `|load|`; the first one wins on ties.
pub fn peak_point(envelope: &[EnvelopePoint]) -> Option<(usize, EnvelopePoint)> {
    let mut best: Option<(usize, EnvelopePoint)> = None;
    for (i, point) in envelope.iter().enumerate() {
        match best {
            Some((_, b)) if point.abs_load() <= b.abs_load() => {}
            _ => best = Some((i, *point)),
        }
    }
    best
}

/// Points with `|deformation| ≤ limit + tolerance`, in their stored order.
pub fn restrict_to_deformation(envelope: &[EnvelopePoint], limit: f64) -> Vec<EnvelopePoint> {
    envelope
        .iter()
        .filter(|p| p.abs_deformation() <= limit + DEFORMATION_TOLERANCE)
        .copied()
        .collect()
}

/// Ultimate deformation from the post-peak drop.
///
/// Walks the envelope; once `|load|` has reached 0.99·Pmax, the first later
/// point with `|load| < 0.8·Pmax` gives the ultimate deformation. Without such
/// a drop the last point's deformation is used.
pub fn deformation_at_post_peak_drop(envelope: &[EnvelopePoint], pmax: f64) -> f64 {
    let threshold = 0.8 * pmax;
    let mut passed_max = false;
    for point in envelope {
        if point.abs_load() >= pmax * 0.99 {
            passed_max = true;
        }
        if passed_max && point.abs_load() < threshold {
            return point.abs_deformation();
        }
    }
    envelope.last().map(|p| p.abs_deformation()).unwrap_or(0.0)
}

/// Trapezoidal area under `|load|` versus `|deformation|` up to `limit`.
///
/// Integration starts at the first point and stops at the first point beyond
/// `limit`, interpolating the partial segment at the cut.
pub fn area_under(envelope: &[EnvelopePoint], limit: f64) -> f64 {
    let mut area = 0.0;
    let mut prev: Option<&EnvelopePoint> = None;
    for point in envelope {
        let abs_deformation = point.abs_deformation();
        if abs_deformation > limit {
            if let Some(p) = prev {
                let prev_deformation = p.abs_deformation();
                if prev_deformation < limit {
                    let ratio = (limit - prev_deformation) / (abs_deformation - prev_deformation);
                    let load_at_limit = p.abs_load() + (point.abs_load() - p.abs_load()) * ratio;
                    area += (limit - prev_deformation) * (p.abs_load() + load_at_limit) / 2.0;
                }
            }
            break;
        }
        if let Some(p) = prev {
            let width = abs_deformation - p.abs_deformation();
            area += width * (p.abs_load() + point.abs_load()) / 2.0;
        }
        prev = Some(point);
    }
    area
}

/// Axis extents for plotting an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotRanges {
    pub deformation: [f64; 2],
    pub load: [f64; 2],
}

/// Signed extents padded by 10% on each side, with zero-width axes widened.
pub fn envelope_ranges(envelope: &[EnvelopePoint]) -> PlotRanges {
    if envelope.is_empty() {
        return PlotRanges {
            deformation: [-1.0, 1.0],
            load: [-1.0, 1.0],
        };
    }
    let (mut min_x, mut max_x) = min_max(envelope.iter().map(|p| p.deformation));
    let (mut min_y, mut max_y) = min_max(envelope.iter().map(|p| p.load));
    if min_x == max_x {
        let pad = (min_x.abs() * 0.1).max(1e-6);
        min_x -= pad;
        max_x += pad;
    }
    if min_y == max_y {
        let pad = (min_y.abs() * 0.1).max(1e-3);
        min_y -= pad;
        max_y += pad;
    }
    let mx = (max_x - min_x) * 0.1;
    let my = (max_y - min_y) * 0.1;
    PlotRanges {
        deformation: [min_x - mx, max_x + mx],
        load: [min_y - my, max_y + my],
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
