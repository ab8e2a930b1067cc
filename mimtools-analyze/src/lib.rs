//! Intersections between predicted peptide-binding positions and annotated
//! protein domains, with cohort-vs-background enrichment statistics.
//!
//! The [`engine::IntersectionEngine`] filters a binding cohort, retrieves its
//! sequences in batches from a [`mimtools_seqstore::SequenceStore`], positions
//! every peptide, and aggregates significant peptide-domain overlaps per
//! domain across a bounded worker set. [`enrich`] compares domain frequency
//! tables between two cohorts. Long analyses run on background threads
//! through [`tasks::TaskRegistry`] and report progress over the monotone
//! [`progress::ProgressReporter`] channel.

pub mod engine;
pub mod enrich;
pub mod errors;
pub mod locate;
pub mod progress;
pub mod tasks;

pub use self::engine::{
    AnalysisOptions, AnalysisReport, DomainSummary, IntersectionEngine, SequenceReport,
};
pub use self::enrich::{
    DomainDetailSummary, EnrichmentClass, EnrichmentRecord, EnrichmentReport, domain_frequencies,
    enrichment_report,
};
pub use self::errors::AnalyzeError;
pub use self::locate::{PositionHistogram, annotate_bindings, locate_peptide};
pub use self::progress::ProgressReporter;
pub use self::tasks::{TaskId, TaskRegistry, TaskStatus};
