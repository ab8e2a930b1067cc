use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use mimtools_core::models::DomainMap;

/// How a domain's frequency in the target cohort relates to the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrichmentClass {
    Enriched,
    Depleted,
    Exclusive,
}

/// One domain's frequency comparison between the two cohorts.
///
/// `enrichment_ratio` is `None` for exclusive domains (unbounded: the domain
/// never occurs in the background). `gene_count`/`genes` carry the distinct
/// target-cohort sequences the domain was seen on, when details were
/// collected alongside the counts.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentRecord {
    pub domain: String,
    pub target_count: usize,
    pub background_count: usize,
    pub target_fraction: f64,
    pub background_fraction: f64,
    pub enrichment_ratio: Option<f64>,
    pub classification: EnrichmentClass,
    pub gene_count: usize,
    pub genes: Vec<String>,
}

/// The three ordered classification lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentPartition {
    pub enriched: Vec<EnrichmentRecord>,
    pub depleted: Vec<EnrichmentRecord>,
    pub exclusive: Vec<EnrichmentRecord>,
}

/// Per-domain detail accumulated during the frequency pass: the distinct
/// sequences the domain was seen on and every observed score.
#[derive(Debug, Clone, Default)]
pub struct DomainDetail {
    pub genes: BTreeSet<String>,
    pub bitscores: Vec<f64>,
    pub e_values: Vec<f64>,
}

/// Domain occurrence counts and details over one cohort of sequence ids.
#[derive(Debug, Clone, Default)]
pub struct DomainFrequencies {
    pub counts: HashMap<String, usize>,
    pub details: HashMap<String, DomainDetail>,
    pub total: usize,
    pub sequence_count: usize,
}

pub fn domain_frequencies<S: AsRef<str>>(ids: &[S], map: &DomainMap) -> DomainFrequencies {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut details: HashMap<String, DomainDetail> = HashMap::new();
    let mut total = 0;
    for id in ids {
        for hit in map.get(id.as_ref()) {
            *counts.entry(hit.name.clone()).or_insert(0) += 1;
            total += 1;

            let detail = details.entry(hit.name.clone()).or_default();
            detail.genes.insert(id.as_ref().to_string());
            detail.bitscores.push(hit.bitscore);
            detail.e_values.push(hit.e_value);
        }
    }
    DomainFrequencies {
        counts,
        details,
        total,
        sequence_count: ids.len(),
    }
}

/// One domain's detail row, shaped for tables and charts: distinct gene
/// count, the genes themselves, and the score samples with their averages.
#[derive(Debug, Clone, Serialize)]
pub struct DomainDetailSummary {
    pub domain: String,
    pub count: usize,
    pub genes: Vec<String>,
    pub bitscores: Vec<f64>,
    pub e_values: Vec<f64>,
    pub avg_bitscore: f64,
    pub avg_evalue: f64,
}

/// Flattens raw details into rows sorted by distinct gene count descending
/// (ties on domain name).
pub fn domain_detail_summaries(details: &HashMap<String, DomainDetail>) -> Vec<DomainDetailSummary> {
    let mut rows: Vec<DomainDetailSummary> = details
        .iter()
        .map(|(domain, detail)| {
            let avg_bitscore = if detail.bitscores.is_empty() {
                0.0
            } else {
                detail.bitscores.iter().sum::<f64>() / detail.bitscores.len() as f64
            };
            let avg_evalue = if detail.e_values.is_empty() {
                1.0
            } else {
                detail.e_values.iter().sum::<f64>() / detail.e_values.len() as f64
            };
            DomainDetailSummary {
                domain: domain.clone(),
                count: detail.genes.len(),
                genes: detail.genes.iter().cloned().collect(),
                bitscores: detail.bitscores.clone(),
                e_values: detail.e_values.clone(),
                avg_bitscore,
                avg_evalue,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
    rows
}

/// Classifies every target domain against the background frequencies.
///
/// Either total being zero is a documented degenerate case: three empty
/// lists, not an error. Ratio is target fraction over background fraction;
/// ratios at or above 1.0 are enriched, below are depleted, and domains
/// absent from the background are exclusive. Enriched sorts descending by
/// ratio, depleted ascending by ratio, exclusive descending by target count;
/// ties break on domain name.
pub fn compare(
    target_counts: &HashMap<String, usize>,
    target_total: usize,
    background_counts: &HashMap<String, usize>,
    background_total: usize,
) -> EnrichmentPartition {
    compare_with_details(
        target_counts,
        target_total,
        background_counts,
        background_total,
        None,
    )
}

/// Like [`compare`], but annotates every record with the distinct target
/// genes each domain was observed on when `target_details` is available.
pub fn compare_with_details(
    target_counts: &HashMap<String, usize>,
    target_total: usize,
    background_counts: &HashMap<String, usize>,
    background_total: usize,
    target_details: Option<&HashMap<String, DomainDetail>>,
) -> EnrichmentPartition {
    if target_total == 0 || background_total == 0 {
        return EnrichmentPartition::default();
    }

    let genes_of = |domain: &str| -> Vec<String> {
        target_details
            .and_then(|details| details.get(domain))
            .map(|detail| detail.genes.iter().cloned().collect())
            .unwrap_or_default()
    };

    let mut partition = EnrichmentPartition::default();
    for (domain, &target_count) in target_counts {
        let target_fraction = target_count as f64 / target_total as f64;
        let genes = genes_of(domain);
        let gene_count = genes.len();
        match background_counts.get(domain).copied().unwrap_or(0) {
            0 => partition.exclusive.push(EnrichmentRecord {
                domain: domain.clone(),
                target_count,
                background_count: 0,
                target_fraction,
                background_fraction: 0.0,
                enrichment_ratio: None,
                classification: EnrichmentClass::Exclusive,
                gene_count,
                genes,
            }),
            background_count => {
                let background_fraction = background_count as f64 / background_total as f64;
                let ratio = target_fraction / background_fraction;
                let classification = if ratio >= 1.0 {
                    EnrichmentClass::Enriched
                } else {
                    EnrichmentClass::Depleted
                };
                let record = EnrichmentRecord {
                    domain: domain.clone(),
                    target_count,
                    background_count,
                    target_fraction,
                    background_fraction,
                    enrichment_ratio: Some(ratio),
                    classification,
                    gene_count,
                    genes,
                };
                match classification {
                    EnrichmentClass::Enriched => partition.enriched.push(record),
                    _ => partition.depleted.push(record),
                }
            }
        }
    }

    let ratio_of = |r: &EnrichmentRecord| r.enrichment_ratio.unwrap_or(f64::INFINITY);
    partition.enriched.sort_by(|a, b| {
        ratio_of(b)
            .total_cmp(&ratio_of(a))
            .then_with(|| a.domain.cmp(&b.domain))
    });
    partition.depleted.sort_by(|a, b| {
        ratio_of(a)
            .total_cmp(&ratio_of(b))
            .then_with(|| a.domain.cmp(&b.domain))
    });
    partition.exclusive.sort_by(|a, b| {
        b.target_count
            .cmp(&a.target_count)
            .then_with(|| a.domain.cmp(&b.domain))
    });

    partition
}

/// Aggregate counts accompanying an enrichment comparison.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentStats {
    pub target_unique_domains: usize,
    pub background_unique_domains: usize,
    pub target_total_hits: usize,
    pub background_total_hits: usize,
    pub target_sequences: usize,
    pub background_sequences: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub enriched: Vec<EnrichmentRecord>,
    pub depleted: Vec<EnrichmentRecord>,
    pub exclusive: Vec<EnrichmentRecord>,
    pub target_details: Vec<DomainDetailSummary>,
    pub stats: EnrichmentStats,
}

/// End-to-end enrichment over two cohorts of sequence ids sharing one
/// annotation map.
pub fn enrichment_report<S: AsRef<str>, T: AsRef<str>>(
    target_ids: &[S],
    background_ids: &[T],
    map: &DomainMap,
) -> EnrichmentReport {
    let target = domain_frequencies(target_ids, map);
    let background = domain_frequencies(background_ids, map);
    let partition = compare_with_details(
        &target.counts,
        target.total,
        &background.counts,
        background.total,
        Some(&target.details),
    );

    EnrichmentReport {
        enriched: partition.enriched,
        depleted: partition.depleted,
        exclusive: partition.exclusive,
        target_details: domain_detail_summaries(&target.details),
        stats: EnrichmentStats {
            target_unique_domains: target.counts.len(),
            background_unique_domains: background.counts.len(),
            target_total_hits: target.total,
            background_total_hits: background.total,
            target_sequences: target.sequence_count,
            background_sequences: background.sequence_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimtools_core::models::DomainHit;
    use pretty_assertions::assert_eq;

    fn counts(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn enriched_ratio_from_fraction_quotient() {
        let target = counts(&[("PF_A", 10)]);
        let background = counts(&[("PF_A", 2)]);
        let partition = compare(&target, 100, &background, 50);

        // 0.10 / 0.04 = 2.5
        assert_eq!(partition.enriched.len(), 1);
        let record = &partition.enriched[0];
        assert_eq!(record.enrichment_ratio, Some(2.5));
        assert_eq!(record.classification, EnrichmentClass::Enriched);
        assert!(partition.depleted.is_empty());
        assert!(partition.exclusive.is_empty());
    }

    #[test]
    fn absent_from_background_is_exclusive() {
        let target = counts(&[("PF_B", 4)]);
        let background = counts(&[("PF_A", 9)]);
        let partition = compare(&target, 10, &background, 9);

        assert_eq!(partition.exclusive.len(), 1);
        assert_eq!(partition.exclusive[0].enrichment_ratio, None);
        assert_eq!(
            partition.exclusive[0].classification,
            EnrichmentClass::Exclusive
        );
    }

    #[test]
    fn ratio_below_one_is_depleted() {
        let target = counts(&[("PF_A", 1)]);
        let background = counts(&[("PF_A", 30)]);
        let partition = compare(&target, 100, &background, 100);

        assert_eq!(partition.depleted.len(), 1);
        let record = &partition.depleted[0];
        assert_eq!(record.classification, EnrichmentClass::Depleted);
        assert!(record.enrichment_ratio.unwrap() < 1.0);
    }

    #[test]
    fn boundary_ratio_of_one_counts_as_enriched() {
        let target = counts(&[("PF_A", 5)]);
        let background = counts(&[("PF_A", 5)]);
        let partition = compare(&target, 50, &background, 50);

        assert_eq!(partition.enriched.len(), 1);
        assert_eq!(partition.enriched[0].enrichment_ratio, Some(1.0));
    }

    #[test]
    fn degenerate_totals_yield_empty_lists() {
        let target = counts(&[("PF_A", 10)]);
        let background = counts(&[("PF_A", 2)]);

        for (t_total, b_total) in [(0, 50), (100, 0), (0, 0)] {
            let partition = compare(&target, t_total, &background, b_total);
            assert!(partition.enriched.is_empty());
            assert!(partition.depleted.is_empty());
            assert!(partition.exclusive.is_empty());
        }
    }

    #[test]
    fn sort_orders_per_class() {
        let target = counts(&[
            ("PF_HI", 40),
            ("PF_LO", 10),
            ("PF_D1", 1),
            ("PF_D2", 2),
            ("PF_X1", 3),
            ("PF_X2", 7),
        ]);
        let background = counts(&[
            ("PF_HI", 10),
            ("PF_LO", 10),
            ("PF_D1", 30),
            ("PF_D2", 20),
        ]);
        let partition = compare(&target, 100, &background, 100);

        let enriched: Vec<&str> = partition.enriched.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(enriched, vec!["PF_HI", "PF_LO"]);

        let depleted: Vec<&str> = partition.depleted.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(depleted, vec!["PF_D1", "PF_D2"]);

        let exclusive: Vec<&str> =
            partition.exclusive.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(exclusive, vec!["PF_X2", "PF_X1"]);
    }

    #[test]
    fn frequencies_count_every_hit_across_the_cohort() {
        let mut map = DomainMap::new();
        map.insert("s1", DomainHit::sanitized("PF_A", Some(10.0), None, Some(1), Some(5)));
        map.insert("s1", DomainHit::sanitized("PF_B", Some(10.0), None, Some(6), Some(9)));
        map.insert("s2", DomainHit::sanitized("PF_A", Some(10.0), None, Some(1), Some(5)));

        let freq = domain_frequencies(&["s1", "s2", "s3"], &map);
        assert_eq!(freq.counts["PF_A"], 2);
        assert_eq!(freq.counts["PF_B"], 1);
        assert_eq!(freq.total, 3);
        assert_eq!(freq.sequence_count, 3);
    }

    #[test]
    fn frequencies_collect_genes_and_score_samples() {
        let mut map = DomainMap::new();
        map.insert("s1", DomainHit::sanitized("PF_A", Some(40.0), Some(1e-10), Some(1), Some(5)));
        map.insert("s2", DomainHit::sanitized("PF_A", Some(20.0), Some(1e-6), Some(1), Some(5)));
        // second hit on the same sequence: one gene, two score samples
        map.insert("s2", DomainHit::sanitized("PF_A", Some(60.0), Some(1e-8), Some(10), Some(15)));

        let freq = domain_frequencies(&["s1", "s2"], &map);
        let detail = &freq.details["PF_A"];
        assert_eq!(
            detail.genes.iter().cloned().collect::<Vec<_>>(),
            vec!["s1".to_string(), "s2".to_string()]
        );
        assert_eq!(detail.bitscores, vec![40.0, 20.0, 60.0]);
        assert_eq!(detail.e_values, vec![1e-10, 1e-6, 1e-8]);
    }

    #[test]
    fn detail_summaries_average_scores_and_sort_by_gene_count() {
        let mut map = DomainMap::new();
        map.insert("s1", DomainHit::sanitized("PF_A", Some(40.0), Some(0.2), Some(1), Some(5)));
        map.insert("s2", DomainHit::sanitized("PF_A", Some(20.0), Some(0.4), Some(1), Some(5)));
        map.insert("s1", DomainHit::sanitized("PF_B", Some(10.0), Some(0.5), Some(6), Some(9)));

        let freq = domain_frequencies(&["s1", "s2"], &map);
        let rows = domain_detail_summaries(&freq.details);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].domain, "PF_A");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].avg_bitscore, 30.0);
        assert!((rows[0].avg_evalue - 0.3).abs() < 1e-12);
        assert_eq!(rows[1].domain, "PF_B");
        assert_eq!(rows[1].count, 1);
        assert_eq!(rows[1].genes, vec!["s1".to_string()]);
    }

    #[test]
    fn report_carries_cohort_statistics() {
        let mut map = DomainMap::new();
        map.insert("t1", DomainHit::sanitized("PF_A", Some(10.0), None, Some(1), Some(5)));
        map.insert("b1", DomainHit::sanitized("PF_A", Some(10.0), None, Some(1), Some(5)));
        map.insert("b1", DomainHit::sanitized("PF_B", Some(10.0), None, Some(6), Some(9)));

        let report = enrichment_report(&["t1"], &["b1"], &map);
        assert_eq!(report.stats.target_unique_domains, 1);
        assert_eq!(report.stats.background_unique_domains, 2);
        assert_eq!(report.stats.target_total_hits, 1);
        assert_eq!(report.stats.background_total_hits, 2);
        assert_eq!(report.stats.target_sequences, 1);
        assert_eq!(report.stats.background_sequences, 1);
    }

    #[test]
    fn report_surfaces_target_genes_on_records_and_detail_rows() {
        let mut map = DomainMap::new();
        map.insert("t1", DomainHit::sanitized("PF_A", Some(40.0), Some(1e-9), Some(1), Some(5)));
        map.insert("t2", DomainHit::sanitized("PF_A", Some(20.0), Some(1e-7), Some(1), Some(5)));
        map.insert("b1", DomainHit::sanitized("PF_A", Some(15.0), Some(1e-4), Some(1), Some(5)));

        let report = enrichment_report(&["t1", "t2"], &["b1"], &map);

        assert_eq!(report.enriched.len(), 1);
        assert_eq!(report.enriched[0].gene_count, 2);
        assert_eq!(
            report.enriched[0].genes,
            vec!["t1".to_string(), "t2".to_string()]
        );

        assert_eq!(report.target_details.len(), 1);
        let detail = &report.target_details[0];
        assert_eq!(detail.domain, "PF_A");
        assert_eq!(detail.count, 2);
        assert_eq!(detail.genes, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(detail.avg_bitscore, 30.0);
        assert!(detail.avg_evalue > 0.0);
    }
}
