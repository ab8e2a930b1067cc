use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};

use mimtools_analyze::{AnalysisOptions, IntersectionEngine, TaskRegistry, TaskStatus};
use mimtools_core::models::DomainMap;
use mimtools_seqstore::{DuplicatePolicy, SequenceStore, build_index, index::write_index_tsv};

use crate::input::{load_binding_cohort, load_domain_map, load_id_list};

pub fn run_index(matches: &ArgMatches) -> Result<()> {
    let dir = matches
        .get_one::<String>("dir")
        .expect("A sequence directory is required.");

    let policy = if matches.get_flag("first-wins") {
        DuplicatePolicy::FirstWins
    } else {
        DuplicatePolicy::LastWins
    };

    let index = build_index(Path::new(dir), policy)?;
    println!("Indexed {} sequences from {}", index.len(), dir);

    if let Some(output) = matches.get_one::<String>("output") {
        write_index_tsv(&index, Path::new(output))?;
        println!("Wrote index to {}", output);
    }

    Ok(())
}

pub fn run_fetch(matches: &ArgMatches) -> Result<()> {
    let dir = matches
        .get_one::<String>("dir")
        .expect("A sequence directory is required.");
    let sequence_id = matches
        .get_one::<String>("sequence-id")
        .expect("A sequence id is required.");

    let store = Arc::new(SequenceStore::open(Path::new(dir))?);
    let domains = match matches.get_one::<String>("domains") {
        Some(path) => load_domain_map(Path::new(path))?,
        None => DomainMap::new(),
    };
    let cohort = match matches.get_one::<String>("bindings") {
        Some(path) => load_binding_cohort(Path::new(path))?,
        None => Vec::new(),
    };

    let mut engine = IntersectionEngine::new(store, domains);
    engine.set_cohort(cohort);

    let report = engine.sequence_report(sequence_id)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

pub fn run_intersect(matches: &ArgMatches) -> Result<()> {
    let dir = matches
        .get_one::<String>("dir")
        .expect("A sequence directory is required.");
    let bindings = matches
        .get_one::<String>("bindings")
        .expect("A binding cohort file is required.");
    let domains = matches
        .get_one::<String>("domains")
        .expect("A domain hit file is required.");

    let opts = AnalysisOptions {
        affinity_ceiling: matches
            .get_one::<String>("affinity-ceiling")
            .map(|v| v.parse())
            .transpose()
            .context("affinity-ceiling must be numeric")?,
        bind_level: matches.get_one::<String>("bind-level").cloned(),
        max_sequences: matches
            .get_one::<String>("max-sequences")
            .map(|v| v.parse())
            .transpose()
            .context("max-sequences must be an integer")?,
    };

    let store = Arc::new(SequenceStore::open(Path::new(dir))?);
    let mut engine = IntersectionEngine::new(store, load_domain_map(Path::new(domains))?);
    engine.set_cohort(load_binding_cohort(Path::new(bindings))?);
    println!("Loaded {} binding records", engine.cohort_len());

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/100 analysis progress")
            .unwrap(),
    );

    let registry = TaskRegistry::new();
    let task = registry.spawn(move |progress| engine.analyze(&opts, progress));

    loop {
        match registry.status(task) {
            Some(TaskStatus::Running { progress }) => {
                bar.set_position(progress as u64);
                std::thread::sleep(Duration::from_millis(100));
            }
            Some(TaskStatus::Completed { result }) => {
                bar.finish_and_clear();
                println!("{}", serde_json::to_string_pretty(&result)?);
                break;
            }
            Some(TaskStatus::Failed { error }) => {
                bar.finish_and_clear();
                bail!("Analysis failed: {}", error);
            }
            None => bail!("Analysis task record was reclaimed before completion"),
        }
    }

    Ok(())
}

pub fn run_enrich(matches: &ArgMatches) -> Result<()> {
    let domains = matches
        .get_one::<String>("domains")
        .expect("A domain hit file is required.");
    let target = matches
        .get_one::<String>("target")
        .expect("A target cohort id file is required.");
    let background = matches
        .get_one::<String>("background")
        .expect("A background cohort id file is required.");

    let map = load_domain_map(Path::new(domains))?;
    let target_ids = load_id_list(Path::new(target))?;
    let background_ids = load_id_list(Path::new(background))?;

    let report = mimtools_analyze::enrichment_report(&target_ids, &background_ids, &map);
    println!(
        "{} enriched, {} depleted, {} exclusive domains",
        report.enriched.len(),
        report.depleted.len(),
        report.exclusive.len()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
