//! Dimension extraction: millimetre values ranked into length × width × thickness.
//!
//! ## Why magnitude ranking?
//!
//! OCR output has no reliable layout, so there is no way to tell which
//! number on a drawing is the length and which is the thickness. The
//! extractor takes every `<number> mm` it finds, sorts the values, and calls
//! the largest the length, the next the width, the third the thickness. For
//! simple prismatic parts this matches the bounding box; for drawings with
//! hole spacings or chamfers larger than the stock it does not. That is a
//! known weakness of the heuristic and is kept deliberately stable so quotes
//! stay reproducible.

use once_cell::sync::Lazy;
use regex::Regex;

/// Value used when no measurement is found.
pub const DEFAULT_LENGTH_MM: f64 = 100.0;
/// Value used when fewer than two measurements are found.
pub const DEFAULT_WIDTH_MM: f64 = 50.0;
/// Value used when fewer than three measurements are found.
pub const DEFAULT_THICKNESS_MM: f64 = 10.0;

static RE_MM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[0-9]+(?:\.[0-9]+)?\s?mm").unwrap());

/// Bounding-box dimensions of a part in millimetres.
///
/// Always sorted so that `length_mm >= width_mm >= thickness_mm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionTriple {
    pub length_mm: f64,
    pub width_mm: f64,
    pub thickness_mm: f64,
}

impl Default for DimensionTriple {
    fn default() -> Self {
        Self {
            length_mm: DEFAULT_LENGTH_MM,
            width_mm: DEFAULT_WIDTH_MM,
            thickness_mm: DEFAULT_THICKNESS_MM,
        }
    }
}

impl DimensionTriple {
    /// Build a triple from up to three ranked values, filling gaps with
    /// defaults. Zero counts as "not found", like a blank on the drawing.
    fn from_ranked(values: &[f64]) -> Self {
        let pick = |i: usize, default: f64| {
            values
                .get(i)
                .copied()
                .filter(|v| *v > 0.0)
                .unwrap_or(default)
        };

        let mut dims = [
            pick(0, DEFAULT_LENGTH_MM),
            pick(1, DEFAULT_WIDTH_MM),
            pick(2, DEFAULT_THICKNESS_MM),
        ];
        // A single small measurement plus defaults would otherwise break the ordering.
        dims.sort_by(|a, b| b.total_cmp(a));

        Self {
            length_mm: dims[0],
            width_mm: dims[1],
            thickness_mm: dims[2],
        }
    }

    /// Bounding-box volume in cm³.
    pub fn volume_cm3(&self) -> f64 {
        (self.length_mm / 10.0) * (self.width_mm / 10.0) * (self.thickness_mm / 10.0)
    }
}

/// Extract the three largest millimetre values from OCR text.
///
/// Never fails: text without any measurement yields the default
/// 100 × 50 × 10 mm block.
pub fn extract_dimensions(text: &str) -> DimensionTriple {
    let mut values = millimetre_values(text);
    values.sort_by(|a, b| b.total_cmp(a));
    DimensionTriple::from_ranked(&values)
}

/// All `<number> mm` values in document order.
fn millimetre_values(text: &str) -> Vec<f64> {
    RE_MM
        .find_iter(text)
        .filter_map(|m| parse_measurement(m.as_str()))
        .collect()
}

/// Strip everything but digits and dots, then parse.
fn parse_measurement(raw: &str) -> Option<f64> {
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().ok()
}
