//! Feature keyword scanning.
//!
//! Every manufacturing feature named on the drawing adds machining time.
//! The scanner counts, per keyword, how many text lines mention it. Matching
//! is a plain substring test on the case-folded line, so "Gewindebohrung"
//! counts for both `gewinde` and `bohrung`, and `nut` also fires inside
//! "Nutenstein" or "Mutter-Nut". Tightening this to word boundaries would
//! change every quote, so it stays a substring match.

use std::collections::BTreeMap;

/// Default vocabulary: thread, bore, groove, pocket, milling.
pub const DEFAULT_FEATURE_KEYWORDS: [&str; 5] = ["gewinde", "bohrung", "nut", "tasche", "fräsung"];

/// Number of lines mentioning each vocabulary keyword.
///
/// Every keyword of the vocabulary is present, with `0` when unmatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureCounts(BTreeMap<String, usize>);

impl FeatureCounts {
    /// Line count for one keyword; `0` for keywords outside the vocabulary.
    pub fn get(&self, keyword: &str) -> usize {
        self.0.get(&keyword.to_lowercase()).copied().unwrap_or(0)
    }

    /// Sum of the per-keyword line counts.
    ///
    /// A line naming two different features counts twice.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Count, for every keyword, the lines of `text` that contain it.
pub fn scan_features<S: AsRef<str>>(text: &str, vocabulary: &[S]) -> FeatureCounts {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_lowercase())
        .collect();

    let counts = vocabulary
        .iter()
        .map(|keyword| {
            let keyword = keyword.as_ref().to_lowercase();
            let hits = lines.iter().filter(|line| line.contains(&keyword)).count();
            (keyword, hits)
        })
        .collect();

    FeatureCounts(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_is_reported() {
        let counts = scan_features("", &DEFAULT_FEATURE_KEYWORDS);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts.total(), 0);
        for keyword in DEFAULT_FEATURE_KEYWORDS {
            assert_eq!(counts.get(keyword), 0);
        }
    }

    #[test]
    fn counts_lines_not_occurrences() {
        let text = "Bohrung Ø8, Bohrung Ø6\nBohrung Ø4 H7\nBOHRUNG durchgehend";
        let counts = scan_features(text, &DEFAULT_FEATURE_KEYWORDS);
        assert_eq!(counts.get("bohrung"), 3);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn substring_matches_count() {
        let counts = scan_features("Gewindebohrung M6", &DEFAULT_FEATURE_KEYWORDS);
        assert_eq!(counts.get("gewinde"), 1);
        assert_eq!(counts.get("bohrung"), 1);
        assert_eq!(counts.total(), 2);

        let counts = scan_features("Nutenstein", &DEFAULT_FEATURE_KEYWORDS);
        assert_eq!(counts.get("nut"), 1);
    }

    #[test]
    fn handles_crlf_and_umlauts() {
        let text = "Planfläche\r\nFRÄSUNG 2x\r\nTasche 20x20";
        let counts = scan_features(text, &DEFAULT_FEATURE_KEYWORDS);
        assert_eq!(counts.get("fräsung"), 1);
        assert_eq!(counts.get("tasche"), 1);
    }

    #[test]
    fn custom_vocabulary() {
        let counts = scan_features("Fase 1x45°\nfase", &["Fase"]);
        assert_eq!(counts.get("fase"), 2);
        assert_eq!(counts.get("bohrung"), 0);
        assert_eq!(counts.len(), 1);
    }
}
