use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use mimtools_core::models::{BindingRecord, DomainHit, DomainMap};
use mimtools_core::utils::worker_count;
use mimtools_seqstore::SequenceStore;

use crate::errors::AnalyzeError;
use crate::locate::{PositionHistogram, annotate_bindings};
use crate::progress::ProgressReporter;

/// Sequence ids retrieved per store round-trip during analysis.
pub const RETRIEVAL_BATCH_SIZE: usize = 100;

/// Minimum percentage of a peptide's span that must fall inside a domain for
/// the pair to count toward aggregates.
pub const SIGNIFICANT_OVERLAP_PCT: f64 = 50.0;

/// Cap on the contributing sequence ids sampled into each domain summary.
pub const MAX_SAMPLE_SEQUENCES: usize = 100;

/// Cohort filter and truncation parameters for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub affinity_ceiling: Option<f64>,
    pub bind_level: Option<String>,
    pub max_sequences: Option<usize>,
}

/// One row of the per-domain aggregate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub domain: String,
    pub binding_count: usize,
    pub sequence_count: usize,
    pub pct_of_sequences: f64,
    pub avg_bitscore: f64,
    pub avg_affinity: f64,
    pub sequences: Vec<String>,
}

/// Full result of one intersection analysis run.
///
/// `total_sequences` and `total_unique_sequences` both count the distinct
/// sequences on which at least one peptide was located; that set is also the
/// denominator for every summary's `pct_of_sequences`. `processed_sequences`
/// counts every selected sequence examined, and
/// `found_sequences_with_peptides` those with retrieved text and cohort rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub total_sequences: usize,
    pub domain_binding_counts: BTreeMap<String, usize>,
    pub domain_summaries: Vec<DomainSummary>,
    pub processed_sequences: usize,
    pub total_unique_sequences: usize,
    pub found_sequences_with_peptides: usize,
    pub binding_threshold: Option<f64>,
    pub binding_level: Option<String>,
}

/// Everything known about a single sequence: its text, its cohort bindings
/// with positions resolved, its domain hits, and the positional histogram.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub sequence_id: String,
    pub sequence: String,
    pub length: usize,
    pub bindings: Vec<BindingRecord>,
    pub domain_hits: Vec<DomainHit>,
    pub histogram: PositionHistogram,
}

/// Per-domain running totals, accumulated worker-locally and merged after the
/// parallel phase. Union/sum only, so merge order never changes the result.
#[derive(Debug, Default)]
struct DomainAggregate {
    binding_count: usize,
    sequences: BTreeSet<String>,
    bitscore_sum: f64,
    affinity_sum: f64,
}

impl DomainAggregate {
    fn merge(&mut self, other: DomainAggregate) {
        self.binding_count += other.binding_count;
        self.sequences.extend(other.sequences);
        self.bitscore_sum += other.bitscore_sum;
        self.affinity_sum += other.affinity_sum;
    }
}

#[derive(Default)]
struct PartitionOutcome {
    aggregates: HashMap<String, DomainAggregate>,
    processed: usize,
    found: usize,
    located: usize,
}

/// Computes peptide-domain intersections over a loaded binding cohort.
///
/// The cohort is filtered, its sequences retrieved in batches, every peptide
/// positioned, and each `(domain, peptide)` pair scored for overlap; pairs
/// covering at least half the peptide contribute to per-domain aggregates.
/// Sequence ids are partitioned across a bounded worker set and each worker
/// aggregates locally, so the partition count never affects the totals.
pub struct IntersectionEngine {
    store: Arc<SequenceStore>,
    domains: DomainMap,
    cohort: Option<Vec<BindingRecord>>,
    partitions: Option<usize>,
}

impl IntersectionEngine {
    pub fn new(store: Arc<SequenceStore>, domains: DomainMap) -> Self {
        IntersectionEngine {
            store,
            domains,
            cohort: None,
            partitions: None,
        }
    }

    /// Overrides the partition count (normally `min(available_parallelism, 8)`).
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = Some(partitions.max(1));
        self
    }

    /// Loads the binding cohort and backfills an empty domain entry for every
    /// cohort sequence id so downstream lookups never miss.
    pub fn set_cohort(&mut self, cohort: Vec<BindingRecord>) {
        let ids: HashSet<&str> = cohort.iter().map(|r| r.sequence_id.as_str()).collect();
        self.domains.ensure_ids(ids);
        self.cohort = Some(cohort);
    }

    pub fn cohort_len(&self) -> usize {
        self.cohort.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn domains(&self) -> &DomainMap {
        &self.domains
    }

    /// Runs one analysis. The progress reporter receives its terminal 100 on
    /// every path out of here, success or failure.
    pub fn analyze(
        &self,
        opts: &AnalysisOptions,
        progress: &ProgressReporter,
    ) -> Result<AnalysisReport, AnalyzeError> {
        let result = self.run(opts, progress);
        progress.finish();
        result
    }

    fn run(
        &self,
        opts: &AnalysisOptions,
        progress: &ProgressReporter,
    ) -> Result<AnalysisReport, AnalyzeError> {
        let cohort = self.cohort.as_ref().ok_or(AnalyzeError::CohortNotLoaded)?;

        let mut filtered: Vec<&BindingRecord> = cohort
            .iter()
            .filter(|r| {
                opts.bind_level
                    .as_deref()
                    .is_none_or(|level| r.bind_level == level)
                    && opts.affinity_ceiling.is_none_or(|c| r.affinity <= c)
            })
            .collect();
        progress.report(5);

        // distinct ids in first-appearance order, so truncation is stable
        let mut ids: Vec<String> = Vec::new();
        {
            let mut seen = HashSet::new();
            for record in &filtered {
                if seen.insert(record.sequence_id.as_str()) {
                    ids.push(record.sequence_id.clone());
                }
            }
        }

        if let Some(max) = opts.max_sequences {
            if ids.len() > max {
                ids.truncate(max);
                let kept: HashSet<&str> = ids.iter().map(String::as_str).collect();
                filtered.retain(|r| kept.contains(r.sequence_id.as_str()));
            }
        }

        if filtered.is_empty() {
            // nothing survived the filters: a valid all-zero result
            return Ok(AnalysisReport {
                binding_threshold: opts.affinity_ceiling,
                binding_level: opts.bind_level.clone(),
                ..AnalysisReport::default()
            });
        }

        let mut sequences: HashMap<String, String> = HashMap::with_capacity(ids.len());
        let batch_count = ids.len().div_ceil(RETRIEVAL_BATCH_SIZE);
        for (i, chunk) in ids.chunks(RETRIEVAL_BATCH_SIZE).enumerate() {
            sequences.extend(self.store.get_batch(chunk));
            progress.report((5 + 25 * (i + 1) / batch_count) as u8);
        }

        let mut grouped: HashMap<&str, Vec<BindingRecord>> = HashMap::new();
        for record in &filtered {
            grouped
                .entry(record.sequence_id.as_str())
                .or_default()
                .push((*record).clone());
        }
        progress.report(40);

        let partition_count = self
            .partitions
            .unwrap_or_else(worker_count)
            .clamp(1, ids.len());
        let chunk_size = ids.len().div_ceil(partition_count);

        let done = AtomicUsize::new(0);
        let total = ids.len();
        let outcomes: Vec<PartitionOutcome> = ids
            .chunks(chunk_size)
            .collect::<Vec<_>>()
            .par_iter()
            .map(|partition| {
                let mut outcome = PartitionOutcome::default();
                for id in *partition {
                    let text = sequences.get(id).map(String::as_str).unwrap_or("");
                    let mut bindings = grouped.get(id.as_str()).cloned().unwrap_or_default();
                    annotate_bindings(text, &mut bindings);

                    outcome.processed += 1;
                    if !text.is_empty() && !bindings.is_empty() {
                        outcome.found += 1;
                    }
                    if bindings.iter().any(BindingRecord::is_positioned) {
                        outcome.located += 1;
                    }

                    let hits = self.domains.get(id);
                    if !hits.is_empty() {
                        intersect_sequence(id, &bindings, hits, &mut outcome.aggregates);
                    }

                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.report((40 + 50 * n / total) as u8);
                }
                outcome
            })
            .collect();

        let mut merged: HashMap<String, DomainAggregate> = HashMap::new();
        let mut processed_sequences = 0;
        let mut found_sequences_with_peptides = 0;
        let mut located_sequences = 0;
        for outcome in outcomes {
            processed_sequences += outcome.processed;
            found_sequences_with_peptides += outcome.found;
            located_sequences += outcome.located;
            for (domain, aggregate) in outcome.aggregates {
                merged.entry(domain).or_default().merge(aggregate);
            }
        }

        let mut domain_binding_counts = BTreeMap::new();
        let mut domain_summaries = Vec::with_capacity(merged.len());
        for (domain, aggregate) in merged {
            domain_binding_counts.insert(domain.clone(), aggregate.binding_count);
            let n = aggregate.binding_count as f64;
            domain_summaries.push(DomainSummary {
                domain,
                binding_count: aggregate.binding_count,
                sequence_count: aggregate.sequences.len(),
                pct_of_sequences: aggregate.sequences.len() as f64 / located_sequences as f64
                    * 100.0,
                avg_bitscore: aggregate.bitscore_sum / n,
                avg_affinity: aggregate.affinity_sum / n,
                sequences: aggregate
                    .sequences
                    .iter()
                    .take(MAX_SAMPLE_SEQUENCES)
                    .cloned()
                    .collect(),
            });
        }
        domain_summaries.sort_by(|a, b| {
            b.binding_count
                .cmp(&a.binding_count)
                .then_with(|| a.domain.cmp(&b.domain))
        });

        Ok(AnalysisReport {
            total_sequences: located_sequences,
            domain_binding_counts,
            domain_summaries,
            processed_sequences,
            total_unique_sequences: located_sequences,
            found_sequences_with_peptides,
            binding_threshold: opts.affinity_ceiling,
            binding_level: opts.bind_level.clone(),
        })
    }

    /// Assembles the full picture for one sequence id: retrieved text, its
    /// cohort bindings with positions resolved, domain hits, histogram.
    pub fn sequence_report(&self, sequence_id: &str) -> Result<SequenceReport, AnalyzeError> {
        let cohort = self.cohort.as_ref().ok_or(AnalyzeError::CohortNotLoaded)?;

        let sequence = self.store.get(sequence_id);
        let mut bindings: Vec<BindingRecord> = cohort
            .iter()
            .filter(|r| r.sequence_id == sequence_id)
            .cloned()
            .collect();
        let histogram = annotate_bindings(&sequence, &mut bindings);
        let length = if sequence.is_empty() {
            self.store.get_length(sequence_id)
        } else {
            sequence.len()
        };

        Ok(SequenceReport {
            sequence_id: sequence_id.to_string(),
            length,
            bindings,
            domain_hits: self.domains.get(sequence_id).to_vec(),
            histogram,
            sequence,
        })
    }
}

/// Scores every `(domain, positioned peptide)` pair on one sequence.
///
/// Domain coordinates come from the annotation tool (1-based inclusive);
/// peptide positions from substring search (0-based inclusive). They are
/// compared directly, matching the upstream pipeline's convention.
fn intersect_sequence(
    sequence_id: &str,
    bindings: &[BindingRecord],
    hits: &[DomainHit],
    aggregates: &mut HashMap<String, DomainAggregate>,
) {
    for binding in bindings.iter().filter(|b| b.is_positioned()) {
        let peptide_len = binding.peptide.len();
        if peptide_len == 0 {
            continue;
        }
        for hit in hits {
            let overlap = (hit.end as i64).min(binding.position_end)
                - (hit.start as i64).max(binding.position_start)
                + 1;
            if overlap <= 0 {
                continue;
            }
            let overlap_pct = overlap as f64 / peptide_len as f64 * 100.0;
            if overlap_pct < SIGNIFICANT_OVERLAP_PCT {
                continue;
            }

            let aggregate = aggregates.entry(hit.name.clone()).or_default();
            aggregate.binding_count += 1;
            aggregate.sequences.insert(sequence_id.to_string());
            aggregate.bitscore_sum += hit.bitscore;
            aggregate.affinity_sum += binding.affinity;
        }
    }
}
