use clap::{Arg, Command, arg};

pub const INDEX_CMD: &str = "index";
pub const FETCH_CMD: &str = "fetch";
pub const INTERSECT_CMD: &str = "intersect";
pub const ENRICH_CMD: &str = "enrich";

pub fn create_index_cli() -> Command {
    Command::new(INDEX_CMD)
        .about("Index a directory of protein sequence files for random access.")
        .arg(Arg::new("dir").required(true))
        .arg(arg!(--output <output>).help("Write the index as a tab-separated sidecar file"))
        .arg(
            arg!(--"first-wins")
                .help("Keep the first occurrence of a duplicated sequence id instead of the last")
                .action(clap::ArgAction::SetTrue),
        )
}

pub fn create_fetch_cli() -> Command {
    Command::new(FETCH_CMD)
        .about("Fetch one sequence with its bindings, domain hits, and position histogram.")
        .arg(Arg::new("dir").required(true))
        .arg(Arg::new("sequence-id").required(true))
        .arg(arg!(--bindings <bindings>).help("Binding cohort CSV"))
        .arg(arg!(--domains <domains>).help("Domain hit TSV"))
}

pub fn create_intersect_cli() -> Command {
    Command::new(INTERSECT_CMD)
        .about("Compute peptide-domain intersections over a binding cohort.")
        .arg(Arg::new("dir").required(true))
        .arg(
            arg!(--bindings <bindings>)
                .help("Binding cohort CSV")
                .required(true),
        )
        .arg(
            arg!(--domains <domains>)
                .help("Domain hit TSV")
                .required(true),
        )
        .arg(
            arg!(--"affinity-ceiling" <nM>)
                .help("Keep cohort rows with affinity at or below this value"),
        )
        .arg(arg!(--"bind-level" <level>).help("Keep cohort rows with exactly this bind level"))
        .arg(arg!(--"max-sequences" <n>).help("Analyze at most this many distinct sequences"))
}

pub fn create_enrich_cli() -> Command {
    Command::new(ENRICH_CMD)
        .about("Compare domain frequencies between a target and a background cohort.")
        .arg(
            arg!(--domains <domains>)
                .help("Domain hit TSV")
                .required(true),
        )
        .arg(
            arg!(--target <target>)
                .help("Target cohort sequence ids, one per line")
                .required(true),
        )
        .arg(
            arg!(--background <background>)
                .help("Background cohort sequence ids, one per line")
                .required(true),
        )
}
