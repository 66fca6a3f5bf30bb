//! Plain-text results table.

use std::fmt::Write;

use wall_core::calculations::{Analysis, AnalysisResult};
use wall_core::config::AnalysisConfig;
use wall_core::units::Radians;

fn rule(out: &mut String, ch: char) {
    let _ = writeln!(out, "  {}", ch.to_string().repeat(44));
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<28}{:>16}", label, value);
}

fn reciprocal(value: f64) -> String {
    Radians(value).reciprocal_label()
}

/// Input parameters followed by the characteristic values.
pub fn render(specimen: &str, config: &AnalysisConfig, analysis: &Analysis) -> String {
    let r: &AnalysisResult = analysis.result();
    let mut out = String::new();

    rule(&mut out, '═');
    let _ = writeln!(out, "  SHEAR WALL EVALUATION  {}", specimen);
    rule(&mut out, '═');
    row(&mut out, "Wall length L (m)", format!("{:.3}", config.wall_length));
    row(&mut out, "Specific deformation", config.gamma_specific().reciprocal_label());
    row(&mut out, "Ultimate deformation limit", config.delta_u_max().reciprocal_label());
    row(&mut out, "C0", format!("{:.2}", config.c0));
    row(&mut out, "α", format!("{:.2}", config.alpha));
    row(&mut out, "Envelope side", config.side.display_name());
    rule(&mut out, '─');

    row(&mut out, "Pmax (kN)", format!("{:.3}", r.pmax));
    row(&mut out, "Py (kN)", format!("{:.3}", r.py));
    row(&mut out, "δy (rad)", reciprocal(r.delta_y));
    row(&mut out, "K (kN/rad)", format!("{:.1}", r.k));
    row(&mut out, "Pu (kN)", format!("{:.3}", r.pu));
    row(&mut out, "Pu (kN/m)", format!("{:.3}", r.pu_per_length));
    row(&mut out, "δv (rad)", reciprocal(r.delta_v));
    row(&mut out, "δu (rad)", reciprocal(r.delta_u));
    row(&mut out, "μ", format!("{:.2}", r.mu));
    row(&mut out, "Ds", r.ds.map(|ds| format!("{:.3}", ds)).unwrap_or_else(|| "-".to_string()));
    rule(&mut out, '─');

    row(&mut out, "P0(a) Py", format!("{:.3}", r.p0_a));
    row(&mut out, "P0(b) C0·Pu·√(2μ-1)", format!("{:.3}", r.p0_b));
    row(&mut out, "P0(c) 2/3·Pmax", format!("{:.3}", r.p0_c));
    row(&mut out, "P0(d) at specific deform.", format!("{:.3}", r.p0_d));
    row(&mut out, "P0 (kN)", format!("{:.3}", r.p0));
    row(&mut out, "Governing", r.governing_criterion().display_name());
    row(&mut out, "Pa (kN)", format!("{:.3}", r.pa));
    row(&mut out, "Pa (kN/m)", format!("{:.3}", r.pa_per_length));
    rule(&mut out, '─');
    row(&mut out, "Wall magnification", format!("{:.1}", r.magnification_rounded));
    rule(&mut out, '═');

    if analysis.is_degenerate() {
        let _ = writeln!(out, "  Notes:");
        for reason in analysis.reasons() {
            let _ = writeln!(out, "  - {}", reason.message());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wall_core::calculations::evaluate;
    use wall_core::envelope::EnvelopePoint;

    #[test]
    fn test_render_scenario() {
        let envelope = vec![
            EnvelopePoint::new(0.0, 0.0),
            EnvelopePoint::new(0.001, 5.0),
            EnvelopePoint::new(0.002, 8.0),
            EnvelopePoint::new(0.004, 9.0),
            EnvelopePoint::new(0.008, 6.0),
        ];
        let config = AnalysisConfig::default();
        let analysis = evaluate(&envelope, &config).unwrap();
        let text = render("W-01", &config, &analysis);

        assert!(text.contains("W-01"));
        assert!(text.contains("1/120"));
        assert!(text.contains("1/15"));
        assert!(text.contains("9.000"));
        // δu = 0.008 rad
        assert!(text.contains("1/125"));
        assert!(text.contains("Notes:"));
    }
}
