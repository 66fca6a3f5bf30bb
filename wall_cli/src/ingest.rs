//! Text ingestion for test records.
//!
//! Accepts two-column numeric text (deformation, load) separated by commas,
//! tabs or semicolons, or two single-column texts paired line by line.
//! Header lines and anything else that is not a plain finite number are
//! skipped.

use wall_core::envelope::Sample;

/// Parse a finite number, rejecting `inf`/`NaN` spellings.
fn parse_number(field: &str) -> Option<f64> {
    let value: f64 = field.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse two-column text into samples, in file order.
pub fn parse_two_column(text: &str) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.split([',', '\t', ';']);
        let parsed = match (fields.next(), fields.next()) {
            (Some(d), Some(p)) => parse_number(d).zip(parse_number(p)),
            _ => None,
        };
        match parsed {
            Some((deformation, load)) => samples.push(Sample::new(deformation, load)),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, kept = samples.len(), "skipped non-numeric lines");
    }
    samples
}

/// Pair a deformation column with a load column line by line.
///
/// Stops at the shorter column; a line pair is skipped when either side is
/// blank or not a number.
pub fn parse_columns(deformations: &str, loads: &str) -> Vec<Sample> {
    deformations
        .lines()
        .zip(loads.lines())
        .filter_map(|(d, p)| Some(Sample::new(parse_number(d)?, parse_number(p)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_column_with_header_and_mixed_separators() {
        let text = "gamma,load\n0,0\n0.001\t5.0\n0.002; 8\n\n-0.001,-4.5\n";
        let samples = parse_two_column(text);
        assert_eq!(
            samples,
            vec![
                Sample::new(0.0, 0.0),
                Sample::new(0.001, 5.0),
                Sample::new(0.002, 8.0),
                Sample::new(-0.001, -4.5),
            ]
        );
    }

    #[test]
    fn test_rejects_units_and_non_finite() {
        let text = "0.001 rad,5\n1e-3,inf\nNaN,1\n1.5e-3,6.25,extra\n";
        let samples = parse_two_column(text);
        assert_eq!(samples, vec![Sample::new(0.0015, 6.25)]);
    }

    #[test]
    fn test_single_column_lines_are_skipped() {
        assert!(parse_two_column("0.001\n0.002\n").is_empty());
    }

    #[test]
    fn test_parse_columns_pairs_lines() {
        let samples = parse_columns("gamma\n0\n0.001\n0.002\n", "P\n0\n5\n\n9\n");
        assert_eq!(samples, vec![Sample::new(0.0, 0.0), Sample::new(0.001, 5.0)]);
    }
}
