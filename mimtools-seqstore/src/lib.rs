//! Fast, low-memory random access over directories of protein FASTA files.
//!
//! A one-time parallel scan builds a byte-offset index (sequence id ->
//! file/offset/length); retrieval then memory-maps each backing file at most
//! once and reads only the bytes a sequence occupies. Batch retrieval groups
//! requested ids by backing file so bulk analyses touch each mapping once
//! per batch instead of once per id.
//!
//! ```no_run
//! use mimtools_seqstore::SequenceStore;
//!
//! let store = SequenceStore::open("data/").expect("index failed");
//! let seq = store.get("seq_00042");
//! assert_eq!(seq.len(), store.get_length("seq_00042"));
//! ```

pub mod index;
pub mod store;

pub use self::index::{DuplicatePolicy, SeqRecord, build_index, scan_lengths};
pub use self::store::SequenceStore;
