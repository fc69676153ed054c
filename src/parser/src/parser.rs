use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

#[derive(Parser, Debug, Serialize)]
#[clap(name = "crispr-scan", version, about = "Genome-scale CRISPR guide search")]
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. With multiple levels
    ///    -v : Info  |  -vv : Debug  | -vvv : Trace
    /// By default, the program will still output Warnings. Use --quiet/-q to disable them
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,
    /// Disable warnings.
    ///
    /// By default, warnings are emitted and redirected to the console, even without verbose mode on.
    /// Use this argument to disable this. Only errors will be displayed.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,
    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Dump the parsed arguments into the log, in YAML form.
    pub fn serialize(&self) {
        let serialized = serde_yaml::to_string(&self).unwrap_or_default();
        info!("\n---- Command line args ----\n{}\n---", serialized);
    }
}

#[derive(Subcommand, Debug, Serialize)]
pub enum Commands {
    /// Scan a FASTA reference for PAM-flanked candidate sites on both strands.
    Gather {
        #[clap(flatten)]
        gather: Gather,
    },
    /// Convert gathered text records into a binary index file.
    Index {
        #[clap(flatten)]
        index: Index,
    },
    /// Exact-match search for a guide sequence.
    Search {
        #[clap(flatten)]
        search: Search,
    },
    /// Enumerate 0-4 mismatch off-targets for stored guides or a raw sequence.
    Align {
        #[clap(flatten)]
        align: Align,
    },
}

#[derive(Parser, Debug, Serialize)]
pub struct Gather {
    /// Input reference genome (FASTA).
    #[clap(short = 'i', long)]
    pub input: PathBuf,
    /// Output text records file.
    #[clap(short = 'o', long)]
    pub output: PathBuf,
    /// Numeric species id stamped into every emitted record.
    #[clap(short = 's', long, default_value("1"))]
    pub species_id: u8,
    /// PAM bases, matched literally (e.g. 'GGG' for the canonical NGG).
    #[clap(short = 'p', long, default_value("GGG"))]
    pub pam: String,
}

#[derive(Parser, Debug, Serialize)]
pub struct Index {
    /// Input record files, concatenated in id order.
    #[clap(short = 'i', long, required(true), multiple_values(true))]
    pub inputs: Vec<PathBuf>,
    /// Output binary index file.
    #[clap(short = 'o', long)]
    pub output: PathBuf,
    /// Species name stored in the index metadata (at most 30 bytes).
    #[clap(short = 's', long)]
    pub species: String,
    /// Assembly name stored in the index metadata (at most 30 bytes).
    #[clap(short = 'a', long)]
    pub assembly: String,
    /// Numeric species id stored in the index metadata.
    #[clap(short = 'e', long, default_value("1"))]
    pub species_id: u8,
    /// Offset added to 1-based slot numbers to form globally unique ids.
    ///
    /// Lets several species share a flat id space: ids of this index start
    /// at offset + 1.
    #[clap(short = 'f', long, default_value("0"))]
    pub offset: u64,
    /// Guide length in bases.
    #[clap(short = 'l', long, default_value("20"))]
    pub seq_length: u64,
}

/// Where query commands find their loaded indexes.
#[derive(Parser, Debug, Serialize)]
pub struct IndexSource {
    /// Binary index file to load for --species.
    #[clap(short = 'i', long, conflicts_with("config"))]
    pub index: Option<PathBuf>,
    /// Species config file ('species = /path/to/index.bin' per line).
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Species to query.
    #[clap(short = 'n', long, default_value("human"))]
    pub species: String,
}

#[derive(Parser, Debug, Serialize)]
pub struct Search {
    #[clap(flatten)]
    pub source: IndexSource,
    /// Guide sequence to search for. Length must match the index.
    #[clap(short = 's', long)]
    pub seq: String,
    /// PAM orientation: 0 = left, 1 = right, 2 = either.
    #[clap(short = 'p', long, default_value("2"))]
    pub pam_right: u8,
}

#[derive(Parser, Debug, Serialize)]
pub struct Align {
    #[clap(flatten)]
    pub source: IndexSource,
    /// Global guide ids to enumerate off-targets for (comma or space separated).
    #[clap(long, multiple_values(true), use_value_delimiter(true), conflicts_with("seq"))]
    pub ids: Vec<u64>,
    /// Raw guide sequence to enumerate off-targets for (reported as id 0).
    #[clap(short = 's', long)]
    pub seq: Option<String>,
    /// With --seq: the PAM sits on the 3' side of the guide.
    #[clap(short = 'p', long)]
    pub pam_right: bool,
    /// Report per-distance summaries only, dropping the off-target id lists.
    #[clap(long)]
    pub summary_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_gather() {
        let cli = Cli::parse_from([
            "crispr-scan", "gather", "-i", "genome.fa", "-o", "crisprs.csv", "-s", "4", "-p", "AGG",
        ]);
        match cli.commands {
            Commands::Gather { gather } => {
                assert_eq!(gather.input, PathBuf::from("genome.fa"));
                assert_eq!(gather.output, PathBuf::from("crisprs.csv"));
                assert_eq!(gather.species_id, 4);
                assert_eq!(gather.pam, "AGG");
            }
            other => panic!("expected gather, parsed {other:?}"),
        }
    }

    #[test]
    fn parse_index_defaults() {
        let cli = Cli::parse_from([
            "crispr-scan", "index", "-i", "a.csv", "b.csv", "-o", "out.bin", "-s", "Human", "-a",
            "GRCh38",
        ]);
        match cli.commands {
            Commands::Index { index } => {
                assert_eq!(index.inputs, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
                assert_eq!(index.offset, 0);
                assert_eq!(index.seq_length, 20);
                assert_eq!(index.species_id, 1);
            }
            other => panic!("expected index, parsed {other:?}"),
        }
    }

    #[test]
    fn parse_search_defaults_to_pam_agnostic() {
        let cli = Cli::parse_from([
            "crispr-scan", "search", "-i", "out.bin", "--seq", "ACGTACGTACGTACGTACGT",
        ]);
        match cli.commands {
            Commands::Search { search } => {
                assert_eq!(search.pam_right, 2);
                assert_eq!(search.source.species, "human");
            }
            other => panic!("expected search, parsed {other:?}"),
        }
    }

    #[test]
    fn align_ids_conflict_with_seq() {
        let result = Cli::try_parse_from([
            "crispr-scan", "align", "-i", "out.bin", "--ids", "1", "--seq", "ACGT",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_accumulates() {
        let cli = Cli::parse_from([
            "crispr-scan", "-vvv", "search", "-i", "out.bin", "--seq", "ACGTACGTACGTACGTACGT",
        ]);
        assert_eq!(cli.verbose, 3);
        assert!(!cli.quiet);
    }
}
