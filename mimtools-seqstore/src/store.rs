use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use memmap2::Mmap;

use super::index::{DuplicatePolicy, SeqRecord, build_index};

/// Extra bytes read past a sequence's residue length to absorb the line
/// breaks of wrapped FASTA text (one per 60 columns, plus slack).
const LINE_BREAK_MARGIN: usize = 10;

/// Random-access store over an indexed directory of sequence files.
///
/// Backing files are memory-mapped lazily, at most once per file, and the
/// read-only maps are shared for concurrent unsynchronized reads until
/// [`SequenceStore::close`] drops them. Lookups never fail outward: an
/// unknown id or an unreadable file yields an empty string.
#[derive(Debug)]
pub struct SequenceStore {
    index: HashMap<String, SeqRecord>,
    mapped_files: Mutex<HashMap<PathBuf, Arc<Mmap>>>,
}

impl SequenceStore {
    /// Indexes `dir` (last-file-wins duplicate policy) and wraps the result.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_policy(dir, DuplicatePolicy::default())
    }

    pub fn open_with_policy<P: AsRef<Path>>(dir: P, policy: DuplicatePolicy) -> Result<Self> {
        let index = build_index(dir.as_ref(), policy)
            .with_context(|| format!("Failed to index sequence files in {:?}", dir.as_ref()))?;
        println!("Indexed {} sequences", index.len());
        Ok(Self::from_index(index))
    }

    /// Wraps a prebuilt index without rescanning.
    pub fn from_index(index: HashMap<String, SeqRecord>) -> Self {
        SequenceStore {
            index,
            mapped_files: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, sequence_id: &str) -> bool {
        self.index.contains_key(sequence_id)
    }

    pub fn index(&self) -> &HashMap<String, SeqRecord> {
        &self.index
    }

    /// Precomputed residue length for a sequence, without touching the
    /// mapped file. Unknown ids are length 0.
    pub fn get_length(&self, sequence_id: &str) -> usize {
        self.index.get(sequence_id).map(|r| r.length).unwrap_or(0)
    }

    /// Retrieves a sequence's residue text.
    ///
    /// Returns an empty string when the id is unknown or the backing file
    /// cannot be mapped. A single trailing stop-codon marker (`*`) is
    /// dropped.
    pub fn get(&self, sequence_id: &str) -> String {
        let record = match self.index.get(sequence_id) {
            Some(record) => record,
            None => return String::new(),
        };
        let mmap = match self.mapped(&record.file) {
            Some(mmap) => mmap,
            None => return String::new(),
        };
        extract_sequence(&mmap, record)
    }

    /// Retrieves many sequences at once, grouping the requested ids by
    /// backing file so each file's map is referenced once per batch. Ids not
    /// in the index are omitted from the result.
    pub fn get_batch<S: AsRef<str>>(&self, sequence_ids: &[S]) -> HashMap<String, String> {
        let mut by_file: HashMap<&Path, Vec<(&str, &SeqRecord)>> = HashMap::new();
        for id in sequence_ids {
            let id = id.as_ref();
            if let Some(record) = self.index.get(id) {
                by_file
                    .entry(record.file.as_path())
                    .or_default()
                    .push((id, record));
            }
        }

        let mut result = HashMap::new();
        for (file, records) in by_file {
            let mmap = match self.mapped(file) {
                Some(mmap) => mmap,
                None => continue,
            };
            for (id, record) in records {
                result.insert(id.to_string(), extract_sequence(&mmap, record));
            }
        }
        result
    }

    /// Drops every memory-mapped view. Subsequent lookups re-map on demand.
    pub fn close(&self) {
        if let Ok(mut maps) = self.mapped_files.lock() {
            maps.clear();
        }
    }

    fn mapped(&self, path: &Path) -> Option<Arc<Mmap>> {
        let mut maps = self.mapped_files.lock().ok()?;
        if let Some(mmap) = maps.get(path) {
            return Some(Arc::clone(mmap));
        }

        let mapped = File::open(path)
            .with_context(|| format!("Failed to open sequence file: {}", path.display()))
            .and_then(|file| {
                unsafe { Mmap::map(&file) }.context("Failed to memory-map sequence file")
            });
        match mapped {
            Ok(mmap) => {
                let mmap = Arc::new(mmap);
                maps.insert(path.to_path_buf(), Arc::clone(&mmap));
                Some(mmap)
            }
            Err(e) => {
                eprintln!("Error memory-mapping {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Pulls one sequence out of a mapped file: read slightly past the residue
/// length to cover embedded line breaks, decode leniently, strip whitespace,
/// truncate to the indexed length, and drop a trailing stop marker.
///
/// The initial window assumes 60-column wrapping; narrower wrapping packs in
/// more line breaks than the margin covers, so the window doubles until the
/// full residue count is collected or the file ends.
fn extract_sequence(mmap: &Mmap, record: &SeqRecord) -> String {
    let start = record.offset as usize;
    if start >= mmap.len() {
        return String::new();
    }

    let mut read_length = record.length + record.length / 60 + LINE_BREAK_MARGIN;
    loop {
        let end = (start + read_length).min(mmap.len());
        let text = String::from_utf8_lossy(&mmap[start..end]);

        let mut sequence: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(record.length)
            .collect();
        if sequence.chars().count() == record.length || end == mmap.len() {
            if sequence.ends_with('*') {
                sequence.pop();
            }
            return sequence;
        }
        read_length *= 2;
    }
}
