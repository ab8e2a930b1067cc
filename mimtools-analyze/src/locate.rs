use std::collections::BTreeMap;

use serde::Serialize;

use mimtools_core::models::BindingRecord;

/// Floor for the estimated sequence length when positions must be bounded
/// without any retrieved sequence text.
pub const MIN_ESTIMATED_LENGTH: usize = 1000;

/// Locates a peptide on a sequence, returning inclusive 0-based `(start, end)`.
///
/// Exact substring search, first occurrence wins. When the search fails but
/// the record carries an explicit position hint, the hint is trusted as the
/// start. Returns `None` when neither resolves the peptide.
pub fn locate_peptide(sequence: &str, peptide: &str, hint: Option<u32>) -> Option<(usize, usize)> {
    if peptide.is_empty() {
        return None;
    }
    if let Some(pos) = sequence.find(peptide) {
        return Some((pos, pos + peptide.len() - 1));
    }
    hint.map(|h| (h as usize, h as usize + peptide.len() - 1))
}

/// Per-position occurrence counts of located peptides across one sequence's
/// bindings. Advisory, for visualization only; positions at or past the bound
/// are silently dropped.
#[derive(Debug, Clone, Serialize)]
pub struct PositionHistogram {
    counts: BTreeMap<usize, usize>,
    bound: usize,
}

impl PositionHistogram {
    pub fn new(bound: usize) -> Self {
        PositionHistogram {
            counts: BTreeMap::new(),
            bound,
        }
    }

    pub fn record_span(&mut self, start: usize, end: usize) {
        for position in start..=end.min(self.bound.saturating_sub(1)) {
            *self.counts.entry(position).or_insert(0) += 1;
        }
    }

    pub fn counts(&self) -> &BTreeMap<usize, usize> {
        &self.counts
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Positions every binding on its sequence and builds the positional
/// histogram over all of them.
///
/// Located records get `position_start`/`position_end` written in place;
/// unresolvable ones keep the sentinel. When no sequence text is available
/// the histogram is bounded by the longest peptide seen, floored at
/// [`MIN_ESTIMATED_LENGTH`].
pub fn annotate_bindings(sequence: &str, bindings: &mut [BindingRecord]) -> PositionHistogram {
    let bound = if sequence.is_empty() {
        bindings
            .iter()
            .map(|b| b.peptide.len())
            .max()
            .unwrap_or(0)
            .max(MIN_ESTIMATED_LENGTH)
    } else {
        sequence.len()
    };

    let mut histogram = PositionHistogram::new(bound);
    for binding in bindings.iter_mut() {
        if let Some((start, end)) = locate_peptide(sequence, &binding.peptide, binding.position_hint)
        {
            binding.position_start = start as i64;
            binding.position_end = end as i64;
            histogram.record_span(start, end);
        }
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimtools_core::models::UNRESOLVED_POSITION;
    use pretty_assertions::assert_eq;

    #[test]
    fn substring_search_first_occurrence_wins() {
        let seq = "AAMKLPAAMKLPAA";
        assert_eq!(locate_peptide(seq, "MKLP", None), Some((2, 5)));
    }

    #[test]
    fn hint_fallback_when_search_fails() {
        assert_eq!(locate_peptide("AAAA", "MKLP", Some(7)), Some((7, 10)));
        assert_eq!(locate_peptide("AAAA", "MKLP", None), None);
    }

    #[test]
    fn search_beats_hint() {
        assert_eq!(locate_peptide("AAMKLP", "MKLP", Some(99)), Some((2, 5)));
    }

    #[test]
    fn empty_peptide_is_never_located() {
        assert_eq!(locate_peptide("AAAA", "", Some(0)), None);
    }

    #[test]
    fn annotate_writes_positions_and_histogram() {
        let seq = "AAMKLPQRAA";
        let mut bindings = vec![
            BindingRecord::new("s", "MKLP", 50.0, "HLA-A*02:01", "SB"),
            BindingRecord::new("s", "LPQR", 80.0, "HLA-A*02:01", "SB"),
            BindingRecord::new("s", "WWWW", 10.0, "HLA-A*02:01", "SB"),
        ];
        let histogram = annotate_bindings(seq, &mut bindings);

        assert_eq!(bindings[0].position_start, 2);
        assert_eq!(bindings[0].position_end, 5);
        assert_eq!(bindings[1].position_start, 4);
        assert_eq!(bindings[2].position_start, UNRESOLVED_POSITION);

        // positions 4 and 5 are covered by both located peptides
        assert_eq!(histogram.counts()[&2], 1);
        assert_eq!(histogram.counts()[&4], 2);
        assert_eq!(histogram.counts()[&5], 2);
        assert_eq!(histogram.bound(), seq.len());
    }

    #[test]
    fn missing_sequence_bounds_histogram_by_peptide_floor() {
        let mut bindings = vec![BindingRecord::new("s", "MKLP", 50.0, "HLA", "SB")];
        let histogram = annotate_bindings("", &mut bindings);
        assert_eq!(histogram.bound(), MIN_ESTIMATED_LENGTH);
        // unresolved without a hint, so nothing recorded
        assert!(histogram.is_empty());
    }

    #[test]
    fn histogram_drops_positions_past_the_bound() {
        let mut histogram = PositionHistogram::new(5);
        histogram.record_span(3, 9);
        assert_eq!(histogram.counts().len(), 2);
        assert!(histogram.counts().contains_key(&4));
        assert!(!histogram.counts().contains_key(&5));
    }
}
