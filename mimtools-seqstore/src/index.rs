use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use mimtools_core::errors::IndexError;
use mimtools_core::utils::{get_dynamic_reader, is_gzipped, worker_count};

/// File extensions recognized as sequence files.
pub const SEQUENCE_EXTENSIONS: &[&str] = &["faa", "fasta"];

/// Index entry for one sequence: which file it lives in, the byte offset of
/// the first byte after its header line, and its residue length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub file: PathBuf,
    pub offset: u64,
    pub length: usize,
}

/// What to do when the same sequence id appears in more than one file.
///
/// The pipeline's historical behavior is last-file-wins; files are merged in
/// sorted filename order, so the policy is deterministic either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    LastWins,
    FirstWins,
}

/// Lists recognized sequence files in `dir`, sorted by filename so every
/// downstream merge is deterministic. Gzipped variants are included; callers
/// that need random access filter them out.
pub fn list_sequence_files(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| IndexError::DirectoryReadError(format!("{}: {}", dir.display(), e)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_sequence_file(path))
        .collect();
    files.sort();

    Ok(files)
}

fn is_sequence_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    let base = name.strip_suffix(".gz").unwrap_or(name);
    SEQUENCE_EXTENSIONS
        .iter()
        .any(|ext| base.ends_with(&format!(".{}", ext)))
}

/// Scans every recognized sequence file in `dir` and builds the id ->
/// [`SeqRecord`] mapping, one scan task per file.
///
/// Gzipped files are skipped (byte offsets are not meaningful for compressed
/// data); a file that fails to scan is logged and skipped, and the index is
/// the union of whatever files succeeded.
pub fn build_index(
    dir: &Path,
    policy: DuplicatePolicy,
) -> Result<HashMap<String, SeqRecord>, IndexError> {
    let files: Vec<PathBuf> = list_sequence_files(dir)?
        .into_iter()
        .filter(|path| {
            if is_gzipped(path) {
                println!(
                    "Skipping gzipped file for random-access index: {}",
                    path.display()
                );
                false
            } else {
                true
            }
        })
        .collect();

    if files.is_empty() {
        return Err(IndexError::NoSequenceFiles(dir.display().to_string()));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count())
        .build()
        .map_err(|e| IndexError::WorkerPool(e.to_string()))?;

    // One scan task per file; results come back in file order so the merge
    // below is deterministic regardless of scheduling.
    let scans: Vec<(PathBuf, Result<Vec<(String, u64, usize)>>)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| (path.clone(), scan_file(path)))
            .collect()
    });

    let mut index: HashMap<String, SeqRecord> = HashMap::new();
    for (path, scanned) in scans {
        let records = match scanned {
            Ok(records) => records,
            Err(e) => {
                eprintln!("Error indexing {}: {}", path.display(), e);
                continue;
            }
        };
        for (id, offset, length) in records {
            let record = SeqRecord {
                file: path.clone(),
                offset,
                length,
            };
            match policy {
                DuplicatePolicy::LastWins => {
                    index.insert(id, record);
                }
                DuplicatePolicy::FirstWins => {
                    index.entry(id).or_insert(record);
                }
            }
        }
    }

    Ok(index)
}

/// Scans a single FASTA file, returning `(id, offset, length)` per sequence
/// in file order. The offset points at the first byte after the header line;
/// the length is the sum of trimmed content-line lengths.
pub fn scan_file(path: &Path) -> Result<Vec<(String, u64, usize)>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let mut reader = BufReader::new(file);

    let mut results = Vec::new();
    let mut line = String::new();

    let mut byte_position: u64 = 0;
    let mut current_id: Option<String> = None;
    let mut current_offset: u64 = 0;
    let mut length = 0;

    loop {
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            // EOF - finalize the last sequence if any
            if let Some(id) = current_id.take() {
                results.push((id, current_offset, length));
            }
            break;
        }

        byte_position += bytes_read as u64;

        if line.starts_with('>') {
            // Save previous sequence if any
            if let Some(id) = current_id.take() {
                results.push((id, current_offset, length));
            }

            // Start new sequence; the id is the first whitespace-delimited
            // token after '>'
            current_id = line[1..].split_whitespace().next().map(str::to_string);
            current_offset = byte_position;
            length = 0;
        } else if current_id.is_some() {
            length += line.trim().len();
        }

        line.clear();
    }

    Ok(results)
}

/// Full-scan id -> residue length map over every sequence file in `dir`,
/// gzipped files included. Slower than the index but usable where random
/// access is off the table.
pub fn scan_lengths(dir: &Path) -> Result<HashMap<String, usize>, IndexError> {
    let files = list_sequence_files(dir)?;
    let mut lengths = HashMap::new();

    for path in files {
        let reader = match get_dynamic_reader(&path) {
            Ok(reader) => reader,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };

        let mut current_id: Option<String> = None;
        let mut length = 0;
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    eprintln!("Error reading {}: {}", path.display(), e);
                    break;
                }
            };
            if line.starts_with('>') {
                if let Some(id) = current_id.take() {
                    lengths.insert(id, length);
                }
                current_id = line[1..].split_whitespace().next().map(str::to_string);
                length = 0;
            } else if current_id.is_some() {
                length += line.trim().len();
            }
        }
        if let Some(id) = current_id.take() {
            lengths.insert(id, length);
        }
    }

    Ok(lengths)
}

/// Writes the index as a tab-separated sidecar: `id  file  offset  length`,
/// sorted by id.
pub fn write_index_tsv(index: &HashMap<String, SeqRecord>, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
    writeln!(file, "#id\tfile\toffset\tlength")?;

    let mut ids: Vec<&String> = index.keys().collect();
    ids.sort();
    for id in ids {
        let rec = &index[id];
        writeln!(
            file,
            "{}\t{}\t{}\t{}",
            id,
            rec.file.display(),
            rec.offset,
            rec.length
        )?;
    }
    Ok(())
}
