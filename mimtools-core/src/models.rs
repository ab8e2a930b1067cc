use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentinel written into a binding record when a peptide could not be placed
/// on its source sequence.
pub const UNRESOLVED_POSITION: i64 = -1;

/// One annotated domain region on a sequence, matched against a profile HMM.
///
/// Coordinates are 1-based inclusive, as reported by the annotation tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHit {
    pub name: String,
    pub bitscore: f64,
    pub e_value: f64,
    pub start: u32,
    pub end: u32,
}

impl DomainHit {
    /// Builds a hit from possibly-missing or malformed annotation fields,
    /// substituting documented sentinel defaults: bitscore 0.0, e-value 1.0,
    /// start/end 1. Non-finite scores are treated the same as missing ones.
    pub fn sanitized(
        name: impl Into<String>,
        bitscore: Option<f64>,
        e_value: Option<f64>,
        start: Option<u32>,
        end: Option<u32>,
    ) -> Self {
        DomainHit {
            name: name.into(),
            bitscore: bitscore.filter(|v| v.is_finite()).unwrap_or(0.0),
            e_value: e_value.filter(|v| v.is_finite()).unwrap_or(1.0),
            start: start.filter(|&v| v >= 1).unwrap_or(1),
            end: end.filter(|&v| v >= 1).unwrap_or(1),
        }
    }
}

/// One predicted peptide-MHC binding observation from the mimic pipeline.
///
/// `position_start`/`position_end` are filled in by the position locator;
/// both hold [`UNRESOLVED_POSITION`] until then (and afterwards, when the
/// peptide could not be placed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub sequence_id: String,
    pub peptide: String,
    pub affinity: f64,
    pub allele: String,
    pub bind_level: String,
    /// Explicit 0-based start position carried by the input row, used as a
    /// fallback when substring search fails.
    pub position_hint: Option<u32>,
    pub position_start: i64,
    pub position_end: i64,
}

impl BindingRecord {
    pub fn new(
        sequence_id: impl Into<String>,
        peptide: impl Into<String>,
        affinity: f64,
        allele: impl Into<String>,
        bind_level: impl Into<String>,
    ) -> Self {
        BindingRecord {
            sequence_id: sequence_id.into(),
            peptide: peptide.into(),
            affinity,
            allele: allele.into(),
            bind_level: bind_level.into(),
            position_hint: None,
            position_start: UNRESOLVED_POSITION,
            position_end: UNRESOLVED_POSITION,
        }
    }

    pub fn is_positioned(&self) -> bool {
        self.position_start != UNRESOLVED_POSITION
    }
}

/// Map from sequence id to its annotated domain hits.
///
/// Every sequence id known to a binding cohort gets at least an empty entry
/// (see [`DomainMap::ensure_ids`]) so downstream lookups never miss.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainMap {
    hits: HashMap<String, Vec<DomainHit>>,
}

impl DomainMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sequence_id: impl Into<String>, hit: DomainHit) {
        self.hits.entry(sequence_id.into()).or_default().push(hit);
    }

    /// Returns the hits for a sequence; an unknown id yields an empty slice.
    pub fn get(&self, sequence_id: &str) -> &[DomainHit] {
        self.hits.get(sequence_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, sequence_id: &str) -> bool {
        self.hits.contains_key(sequence_id)
    }

    /// Inserts an empty hit list for every id that has no entry yet.
    pub fn ensure_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.hits.entry(id.to_string()).or_default();
        }
    }

    pub fn sequence_ids(&self) -> impl Iterator<Item = &str> {
        self.hits.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DomainHit])> {
        self.hits.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Some(42.5), 42.5)]
    #[case(Some(f64::NAN), 0.0)]
    #[case(Some(f64::INFINITY), 0.0)]
    #[case(None, 0.0)]
    fn sanitized_bitscore(#[case] raw: Option<f64>, #[case] expected: f64) {
        let hit = DomainHit::sanitized("PF00001", raw, Some(1e-10), Some(5), Some(80));
        assert_eq!(hit.bitscore, expected);
    }

    #[rstest]
    #[case(Some(1e-30), 1e-30)]
    #[case(Some(f64::NAN), 1.0)]
    #[case(None, 1.0)]
    fn sanitized_e_value(#[case] raw: Option<f64>, #[case] expected: f64) {
        let hit = DomainHit::sanitized("PF00001", Some(10.0), raw, Some(5), Some(80));
        assert_eq!(hit.e_value, expected);
    }

    #[test]
    fn sanitized_coordinates_default_to_one() {
        let hit = DomainHit::sanitized("K00001", None, None, None, Some(0));
        assert_eq!(hit.start, 1);
        assert_eq!(hit.end, 1);
    }

    #[test]
    fn ensure_ids_adds_empty_entries() {
        let mut map = DomainMap::new();
        map.insert("seq_1", DomainHit::sanitized("PF00001", Some(50.0), Some(1e-5), Some(1), Some(40)));
        map.ensure_ids(["seq_1", "seq_2", "seq_3"]);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("seq_1").len(), 1);
        assert!(map.get("seq_2").is_empty());
        assert!(map.contains("seq_3"));
        // Unknown ids still resolve to an empty slice, never a missing key.
        assert!(map.get("seq_404").is_empty());
    }

    #[test]
    fn binding_record_starts_unresolved() {
        let rec = BindingRecord::new("seq_1", "MKLPQR", 120.0, "HLA-A*02:01", "SB");
        assert!(!rec.is_positioned());
        assert_eq!(rec.position_start, UNRESOLVED_POSITION);
        assert_eq!(rec.position_end, UNRESOLVED_POSITION);
    }
}
