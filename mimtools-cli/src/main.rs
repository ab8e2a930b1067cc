mod cli;
mod handlers;
mod input;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "mimtools";
    pub const BIN_NAME: &str = "mimtools";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Fast indexing and peptide-domain intersection analysis for mimic-protein sequence sets.")
        .subcommand_required(true)
        .subcommand(cli::create_index_cli())
        .subcommand(cli::create_fetch_cli())
        .subcommand(cli::create_intersect_cli())
        .subcommand(cli::create_enrich_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // INDEX
        //
        Some((cli::INDEX_CMD, matches)) => {
            handlers::run_index(matches)?;
        }

        //
        // FETCH
        //
        Some((cli::FETCH_CMD, matches)) => {
            handlers::run_fetch(matches)?;
        }

        //
        // INTERSECT
        //
        Some((cli::INTERSECT_CMD, matches)) => {
            handlers::run_intersect(matches)?;
        }

        //
        // ENRICH
        //
        Some((cli::ENRICH_CMD, matches)) => {
            handlers::run_enrich(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_requires_a_directory() {
        let result = build_parser().try_get_matches_from(["mimtools", "index"]);
        assert!(result.is_err());

        let matches = build_parser()
            .try_get_matches_from(["mimtools", "index", "/data/seqs"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("dir").unwrap(), "/data/seqs");
    }

    #[test]
    fn fetch_requires_directory_and_sequence_id() {
        assert!(
            build_parser()
                .try_get_matches_from(["mimtools", "fetch", "/data/seqs"])
                .is_err()
        );

        let matches = build_parser()
            .try_get_matches_from(["mimtools", "fetch", "/data/seqs", "seq_1"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("sequence-id").unwrap(), "seq_1");
    }

    #[test]
    fn intersect_requires_cohort_and_domain_files() {
        assert!(
            build_parser()
                .try_get_matches_from(["mimtools", "intersect", "/data/seqs"])
                .is_err()
        );

        let matches = build_parser()
            .try_get_matches_from([
                "mimtools",
                "intersect",
                "/data/seqs",
                "--bindings",
                "cohort.csv",
                "--domains",
                "hits.tsv",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("bindings").unwrap(), "cohort.csv");
        assert_eq!(sub.get_one::<String>("domains").unwrap(), "hits.tsv");
    }

    #[test]
    fn enrich_requires_both_cohorts_and_the_domain_file() {
        assert!(
            build_parser()
                .try_get_matches_from(["mimtools", "enrich", "--domains", "hits.tsv"])
                .is_err()
        );

        let matches = build_parser()
            .try_get_matches_from([
                "mimtools",
                "enrich",
                "--domains",
                "hits.tsv",
                "--target",
                "target.txt",
                "--background",
                "background.txt",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("target").unwrap(), "target.txt");
        assert_eq!(
            sub.get_one::<String>("background").unwrap(),
            "background.txt"
        );
    }
}
