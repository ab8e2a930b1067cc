//! Loaders for the tabular inputs the analysis consumes: the binding cohort
//! CSV and the domain-hit TSV. Malformed rows are logged and skipped; only a
//! missing required column is fatal.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Result, bail};

use mimtools_core::models::{BindingRecord, DomainHit, DomainMap};
use mimtools_core::utils::get_dynamic_reader;

/// Header names accepted for the optional 0-based position hint column.
const POSITION_HINT_COLUMNS: &[&str] = &["position", "peptide_start"];

fn header_positions(header: &str, sep: char) -> HashMap<String, usize> {
    header
        .split(sep)
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect()
}

fn column<'a>(fields: &[&'a str], index: Option<&usize>) -> Option<&'a str> {
    index
        .and_then(|&i| fields.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Loads a binding cohort CSV with columns `sequence_id, peptide,
/// affinity_nM, allele, bind_level` (any order, matched case-insensitively)
/// and an optional position hint column.
pub fn load_binding_cohort(path: &Path) -> Result<Vec<BindingRecord>> {
    let reader = get_dynamic_reader(path)?;
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => bail!("Empty binding cohort file: {:?}", path),
    };
    let cols = header_positions(&header, ',');

    for name in ["sequence_id", "peptide", "affinity_nm", "allele", "bind_level"] {
        if !cols.contains_key(name) {
            bail!("Binding cohort file {:?} is missing the '{}' column", path, name);
        }
    }
    let hint_col = POSITION_HINT_COLUMNS
        .iter()
        .find_map(|name| cols.get(*name))
        .copied();

    let mut records = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();

        let sequence_id = column(&fields, cols.get("sequence_id"));
        let peptide = column(&fields, cols.get("peptide"));
        let affinity = column(&fields, cols.get("affinity_nm")).and_then(|v| v.parse::<f64>().ok());
        let allele = column(&fields, cols.get("allele"));
        let bind_level = column(&fields, cols.get("bind_level"));

        match (sequence_id, peptide, affinity, allele, bind_level) {
            (Some(id), Some(peptide), Some(affinity), Some(allele), Some(level)) => {
                let mut record = BindingRecord::new(id, peptide, affinity, allele, level);
                record.position_hint = hint_col
                    .and_then(|i| fields.get(i))
                    .and_then(|v| v.trim().parse::<u32>().ok());
                records.push(record);
            }
            _ => eprintln!(
                "Skipping malformed binding record at {:?} line {}",
                path,
                line_no + 2
            ),
        }
    }

    Ok(records)
}

/// Loads a domain-hit TSV with columns `sequence_id, hmm_name, bitscore,
/// evalue, env_from, env_to`. Score and coordinate fields fall back to
/// sanitized defaults when missing or unparsable.
pub fn load_domain_map(path: &Path) -> Result<DomainMap> {
    let reader = get_dynamic_reader(path)?;
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => bail!("Empty domain hit file: {:?}", path),
    };
    let cols = header_positions(&header, '\t');

    for name in ["sequence_id", "hmm_name"] {
        if !cols.contains_key(name) {
            bail!("Domain hit file {:?} is missing the '{}' column", path, name);
        }
    }

    let mut map = DomainMap::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();

        let (Some(id), Some(name)) = (
            column(&fields, cols.get("sequence_id")),
            column(&fields, cols.get("hmm_name")),
        ) else {
            eprintln!(
                "Skipping malformed domain hit at {:?} line {}",
                path,
                line_no + 2
            );
            continue;
        };

        map.insert(
            id,
            DomainHit::sanitized(
                name,
                column(&fields, cols.get("bitscore")).and_then(|v| v.parse().ok()),
                column(&fields, cols.get("evalue")).and_then(|v| v.parse().ok()),
                column(&fields, cols.get("env_from")).and_then(|v| v.parse().ok()),
                column(&fields, cols.get("env_to")).and_then(|v| v.parse().ok()),
            ),
        );
    }

    Ok(map)
}

/// Loads a cohort id file: one sequence id per line, blank lines and `#`
/// comments ignored.
pub fn load_id_list(path: &Path) -> Result<Vec<String>> {
    let reader = get_dynamic_reader(path)?;
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if id.is_empty() || id.starts_with('#') {
            continue;
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}
