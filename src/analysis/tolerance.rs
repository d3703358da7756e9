//! Micron-tolerance detection.
//!
//! Tolerances in the µm range mean precision grinding or fine machining
//! that the per-length runtime model cannot price. Any such callout sends
//! the drawing to manual review.
//!
//! OCR rarely reproduces the micro sign faithfully: it shows up as `µ`
//! (U+00B5), as Greek `μ` (U+03BC), or degraded to a plain `u`. The pattern
//! accepts all of them in either case, with an optional space between the
//! number and the marker and between the marker and the `m`. The detector
//! errs toward manual review; a stray "5 um" in a title block is an
//! acceptable false positive.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_MICRON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\s?[µμΜuU]\s?[mM]").unwrap());

/// Returns `true` if the text contains a number followed by a micron unit.
pub fn has_micron_tolerance(text: &str) -> bool {
    RE_MICRON.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_micro_sign() {
        assert!(has_micron_tolerance("Toleranz: 5µm"));
        assert!(has_micron_tolerance("Ra 0,8 / ±10 µm"));
    }

    #[test]
    fn detects_greek_mu() {
        assert!(has_micron_tolerance("Ebenheit 20μm"));
    }

    #[test]
    fn detects_ascii_substitute_in_either_case() {
        assert!(has_micron_tolerance("5um"));
        assert!(has_micron_tolerance("5 UM"));
        assert!(has_micron_tolerance("12 Um"));
    }

    #[test]
    fn detects_split_marker() {
        assert!(has_micron_tolerance("5µ m"));
        assert!(has_micron_tolerance("5 u m"));
    }

    #[test]
    fn ignores_millimetres() {
        assert!(!has_micron_tolerance("120mm x 40 mm x 8mm"));
    }

    #[test]
    fn requires_a_number() {
        assert!(!has_micron_tolerance("µm"));
        assert!(!has_micron_tolerance("Maße in um"));
    }

    #[test]
    fn empty_text_is_safe() {
        assert!(!has_micron_tolerance(""));
    }
}
